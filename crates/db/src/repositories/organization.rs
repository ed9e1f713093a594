use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use pourwatch_core::domain::organization::{NotificationChannels, Organization, OrganizationId};

use super::{decode_error, timestamp_text, OrganizationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrganizationRepository {
    pool: DbPool,
}

impl SqlOrganizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrganizationRepository for SqlOrganizationRepository {
    async fn list_ids(&self) -> Result<Vec<OrganizationId>, RepositoryError> {
        let rows = sqlx::query("SELECT id FROM organization ORDER BY id").fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map(OrganizationId).map_err(decode_error))
            .collect()
    }

    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM organization WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Organization {
                id: OrganizationId(row.try_get("id").map_err(decode_error)?),
                name: row.try_get("name").map_err(decode_error)?,
            })),
            None => Ok(None),
        }
    }

    async fn save(&self, organization: Organization) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO organization (id, name, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&organization.id.0)
        .bind(&organization.name)
        .bind(timestamp_text(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn alert_settings(&self, id: &OrganizationId) -> Result<Option<Value>, RepositoryError> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT alert_settings FROM organization WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        // Unparseable blobs read as absent so the caller falls back to defaults.
        Ok(raw.flatten().and_then(|text| serde_json::from_str::<Value>(&text).ok()))
    }

    async fn save_alert_settings(
        &self,
        id: &OrganizationId,
        settings: Value,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE organization SET alert_settings = ? WHERE id = ?")
            .bind(settings.to_string())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!("organization `{}` does not exist", id)));
        }
        Ok(())
    }

    async fn notification_channels(
        &self,
        id: &OrganizationId,
    ) -> Result<NotificationChannels, RepositoryError> {
        let row = sqlx::query(
            "SELECT slack_webhook_url, alert_email_recipients FROM organization WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(NotificationChannels::default());
        };

        let slack_webhook_url: Option<String> =
            row.try_get("slack_webhook_url").map_err(decode_error)?;
        let recipients: String = row.try_get("alert_email_recipients").map_err(decode_error)?;
        let alert_email_recipients =
            serde_json::from_str::<Vec<String>>(&recipients).map_err(decode_error)?;

        Ok(NotificationChannels { slack_webhook_url, alert_email_recipients })
    }

    async fn save_notification_channels(
        &self,
        id: &OrganizationId,
        channels: NotificationChannels,
    ) -> Result<(), RepositoryError> {
        let recipients =
            serde_json::to_string(&channels.alert_email_recipients).map_err(decode_error)?;

        let result = sqlx::query(
            "UPDATE organization SET slack_webhook_url = ?, alert_email_recipients = ? WHERE id = ?",
        )
        .bind(&channels.slack_webhook_url)
        .bind(recipients)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!("organization `{}` does not exist", id)));
        }
        Ok(())
    }
}
