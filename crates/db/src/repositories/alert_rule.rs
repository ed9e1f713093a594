use sqlx::Row;

use pourwatch_core::domain::alert::{AlertRule, AlertRuleId, AlertType, ThresholdType};
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::domain::product::ProductId;

use super::{decode_error, parse_timestamp, timestamp_text, AlertRuleRepository, RepositoryError};
use crate::DbPool;

const RULE_COLUMNS: &str = "id, organization_id, alert_type, product_id, name, threshold_type,
    threshold_value, enabled, notify_email, notify_dashboard, cooldown_hours, created_at, updated_at";

pub struct SqlAlertRuleRepository {
    pool: DbPool,
}

impl SqlAlertRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Result<AlertRule, RepositoryError> {
    let alert_type: String = row.try_get("alert_type").map_err(decode_error)?;
    let threshold_type: String = row.try_get("threshold_type").map_err(decode_error)?;
    let cooldown_hours: i64 = row.try_get("cooldown_hours").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(AlertRule {
        id: AlertRuleId(row.try_get("id").map_err(decode_error)?),
        organization_id: OrganizationId(row.try_get("organization_id").map_err(decode_error)?),
        alert_type: AlertType::parse(&alert_type)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown alert type `{alert_type}`")))?,
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        threshold_type: ThresholdType::parse(&threshold_type).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown threshold type `{threshold_type}`"))
        })?,
        threshold_value: row.try_get("threshold_value").map_err(decode_error)?,
        enabled: row.try_get("enabled").map_err(decode_error)?,
        notify_email: row.try_get("notify_email").map_err(decode_error)?,
        notify_dashboard: row.try_get("notify_dashboard").map_err(decode_error)?,
        cooldown_hours: u32::try_from(cooldown_hours).map_err(decode_error)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl AlertRuleRepository for SqlAlertRuleRepository {
    async fn upsert(&self, rule: AlertRule) -> Result<AlertRule, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO alert_rule ({RULE_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(organization_id, alert_type, product_id) DO UPDATE SET
                 threshold_value = excluded.threshold_value,
                 cooldown_hours = excluded.cooldown_hours,
                 updated_at = excluded.updated_at
             RETURNING {RULE_COLUMNS}"
        ))
        .bind(&rule.id.0)
        .bind(&rule.organization_id.0)
        .bind(rule.alert_type.as_str())
        .bind(&rule.product_id.0)
        .bind(&rule.name)
        .bind(rule.threshold_type.as_str())
        .bind(rule.threshold_value)
        .bind(rule.enabled)
        .bind(rule.notify_email)
        .bind(rule.notify_dashboard)
        .bind(i64::from(rule.cooldown_hours))
        .bind(timestamp_text(rule.created_at))
        .bind(timestamp_text(rule.updated_at))
        .fetch_one(&self.pool)
        .await?;

        row_to_rule(&row)
    }

    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<AlertRule>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM alert_rule
             WHERE organization_id = ?
             ORDER BY alert_type, product_id"
        ))
        .bind(&organization_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }
}
