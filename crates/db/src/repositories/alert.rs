use chrono::{DateTime, Utc};
use sqlx::Row;

use pourwatch_core::domain::alert::{
    Alert, AlertId, AlertRuleId, AlertSeverity, AlertStatus, AlertType,
};
use pourwatch_core::domain::inventory::InventoryItemId;
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::domain::product::ProductId;

use super::{
    decode_error, parse_decimal, parse_timestamp, timestamp_text, AlertPage, AlertQuery,
    AlertRepository, AlertSummary, RepositoryError,
};
use crate::DbPool;

const ALERT_COLUMNS: &str = "id, organization_id, rule_id, inventory_item_id, product_id,
    alert_type, severity, title, message, trigger_value, threshold_value, cost_impact, status,
    dedupe_key, created_at, acknowledged_at, acknowledged_by, resolved_at, resolved_by";

pub struct SqlAlertRepository {
    pool: DbPool,
}

impl SqlAlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|text| parse_timestamp(column, &text)).transpose()
}

fn row_to_alert(row: &sqlx::sqlite::SqliteRow) -> Result<Alert, RepositoryError> {
    let alert_type: String = row.try_get("alert_type").map_err(decode_error)?;
    let severity: String = row.try_get("severity").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let cost_impact: String = row.try_get("cost_impact").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Alert {
        id: AlertId(row.try_get("id").map_err(decode_error)?),
        organization_id: OrganizationId(row.try_get("organization_id").map_err(decode_error)?),
        rule_id: AlertRuleId(row.try_get("rule_id").map_err(decode_error)?),
        inventory_item_id: InventoryItemId(
            row.try_get("inventory_item_id").map_err(decode_error)?,
        ),
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        alert_type: AlertType::parse(&alert_type)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown alert type `{alert_type}`")))?,
        severity: AlertSeverity::parse(&severity)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown severity `{severity}`")))?,
        title: row.try_get("title").map_err(decode_error)?,
        message: row.try_get("message").map_err(decode_error)?,
        trigger_value: row.try_get("trigger_value").map_err(decode_error)?,
        threshold_value: row.try_get("threshold_value").map_err(decode_error)?,
        cost_impact: parse_decimal("cost_impact", &cost_impact)?,
        status: AlertStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown alert status `{status}`")))?,
        dedupe_key: row.try_get("dedupe_key").map_err(decode_error)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        acknowledged_at: optional_timestamp(
            "acknowledged_at",
            row.try_get("acknowledged_at").map_err(decode_error)?,
        )?,
        acknowledged_by: row.try_get("acknowledged_by").map_err(decode_error)?,
        resolved_at: optional_timestamp(
            "resolved_at",
            row.try_get("resolved_at").map_err(decode_error)?,
        )?,
        resolved_by: row.try_get("resolved_by").map_err(decode_error)?,
    })
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait::async_trait]
impl AlertRepository for SqlAlertRepository {
    async fn latest_for_title(
        &self,
        organization_id: &OrganizationId,
        alert_type: AlertType,
        title: &str,
    ) -> Result<Option<Alert>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alert
             WHERE organization_id = ? AND alert_type = ? AND title = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(&organization_id.0)
        .bind(alert_type.as_str())
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_alert).transpose()
    }

    async fn find_open_since(
        &self,
        organization_id: &OrganizationId,
        alert_type: AlertType,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alert
             WHERE organization_id = ? AND alert_type = ? AND title = ?
               AND status IN ('ACTIVE', 'ACKNOWLEDGED')
               AND created_at >= ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(&organization_id.0)
        .bind(alert_type.as_str())
        .bind(title)
        .bind(timestamp_text(since))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_alert).transpose()
    }

    async fn insert_if_absent(&self, alert: Alert) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&format!(
            "INSERT INTO alert ({ALERT_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(dedupe_key) DO NOTHING"
        ))
        .bind(&alert.id.0)
        .bind(&alert.organization_id.0)
        .bind(&alert.rule_id.0)
        .bind(&alert.inventory_item_id.0)
        .bind(&alert.product_id.0)
        .bind(alert.alert_type.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.trigger_value)
        .bind(alert.threshold_value)
        .bind(alert.cost_impact.to_string())
        .bind(alert.status.as_str())
        .bind(&alert.dedupe_key)
        .bind(timestamp_text(alert.created_at))
        .bind(alert.acknowledged_at.map(timestamp_text))
        .bind(&alert.acknowledged_by)
        .bind(alert.resolved_at.map(timestamp_text))
        .bind(&alert.resolved_by)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &AlertId,
    ) -> Result<Option<Alert>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alert WHERE id = ? AND organization_id = ?"
        ))
        .bind(&id.0)
        .bind(&organization_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_alert).transpose()
    }

    async fn save_transition(
        &self,
        alert: &Alert,
        expected: AlertStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE alert SET
                 status = ?,
                 acknowledged_at = ?,
                 acknowledged_by = ?,
                 resolved_at = ?,
                 resolved_by = ?
             WHERE id = ? AND organization_id = ? AND status = ?",
        )
        .bind(alert.status.as_str())
        .bind(alert.acknowledged_at.map(timestamp_text))
        .bind(&alert.acknowledged_by)
        .bind(alert.resolved_at.map(timestamp_text))
        .bind(&alert.resolved_by)
        .bind(&alert.id.0)
        .bind(&alert.organization_id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "alert `{}` is no longer {}",
                alert.id.0,
                expected.as_str()
            )));
        }
        Ok(())
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
        query: &AlertQuery,
    ) -> Result<AlertPage, RepositoryError> {
        let status = query.status.map(|status| status.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM alert
             WHERE organization_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(&organization_id.0)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alert
             WHERE organization_id = ? AND (? IS NULL OR status = ?)
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(&organization_id.0)
        .bind(status)
        .bind(status)
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await?;

        let alerts = rows.iter().map(row_to_alert).collect::<Result<Vec<_>, _>>()?;
        Ok(AlertPage { alerts, total: count(total) })
    }

    async fn summary(
        &self,
        organization_id: &OrganizationId,
        recent_since: DateTime<Utc>,
    ) -> Result<AlertSummary, RepositoryError> {
        let rows = sqlx::query(
            "SELECT alert_type, severity, COUNT(*) AS total
             FROM alert
             WHERE organization_id = ? AND status = 'ACTIVE'
             GROUP BY alert_type, severity",
        )
        .bind(&organization_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = AlertSummary::default();
        for row in &rows {
            let alert_type: String = row.try_get("alert_type").map_err(decode_error)?;
            let severity: String = row.try_get("severity").map_err(decode_error)?;
            let total = count(row.try_get::<i64, _>("total").map_err(decode_error)?);

            let alert_type = AlertType::parse(&alert_type).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown alert type `{alert_type}`"))
            })?;
            summary.active += total;
            if severity == AlertSeverity::Critical.as_str() {
                summary.critical += total;
            }
            *summary.by_type.entry(alert_type).or_default() += total;
        }

        let recent: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM alert WHERE organization_id = ? AND created_at >= ?",
        )
        .bind(&organization_id.0)
        .bind(timestamp_text(recent_since))
        .fetch_one(&self.pool)
        .await?;
        summary.recent = count(recent);

        Ok(summary)
    }

    async fn recent_active(
        &self,
        organization_id: &OrganizationId,
        limit: u32,
    ) -> Result<Vec<Alert>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alert
             WHERE organization_id = ? AND status = 'ACTIVE'
             ORDER BY created_at DESC, id DESC
             LIMIT ?"
        ))
        .bind(&organization_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_alert).collect()
    }
}
