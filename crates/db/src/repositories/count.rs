use sqlx::Row;

use pourwatch_core::domain::count::{CountArea, CountEvent, CountStatus};
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::reconciliation::UsageWindow;

use super::{
    decode_error, parse_timestamp, timestamp_text, CountEventRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlCountEventRepository {
    pool: DbPool,
}

impl SqlCountEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_count(row: &sqlx::sqlite::SqliteRow) -> Result<CountEvent, RepositoryError> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    let completed_at: Option<String> = row.try_get("completed_at").map_err(decode_error)?;
    let areas: String = row.try_get("areas").map_err(decode_error)?;

    Ok(CountEvent {
        count_id: row.try_get("id").map_err(decode_error)?,
        organization_id: OrganizationId(row.try_get("organization_id").map_err(decode_error)?),
        location_id: row.try_get("location_id").map_err(decode_error)?,
        status: CountStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown count status `{status}`")))?,
        completed_at: completed_at
            .map(|value| parse_timestamp("completed_at", &value))
            .transpose()?,
        areas: serde_json::from_str::<Vec<CountArea>>(&areas).map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl CountEventRepository for SqlCountEventRepository {
    async fn list_completed_in_window(
        &self,
        organization_id: &OrganizationId,
        window: &UsageWindow,
    ) -> Result<Vec<CountEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, organization_id, location_id, status, completed_at, areas
             FROM count_event
             WHERE organization_id = ? AND status = 'COMPLETED'
               AND completed_at >= ? AND completed_at < ?
             ORDER BY completed_at, id",
        )
        .bind(&organization_id.0)
        .bind(timestamp_text(window.start))
        .bind(timestamp_text(window.end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_count).collect()
    }

    async fn save(&self, count: CountEvent) -> Result<(), RepositoryError> {
        let areas = serde_json::to_string(&count.areas).map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO count_event (id, organization_id, location_id, status, completed_at, areas)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 completed_at = excluded.completed_at,
                 areas = excluded.areas",
        )
        .bind(&count.count_id)
        .bind(&count.organization_id.0)
        .bind(&count.location_id)
        .bind(count.status.as_str())
        .bind(count.completed_at.map(timestamp_text))
        .bind(areas)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
