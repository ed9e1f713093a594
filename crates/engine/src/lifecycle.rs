use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use pourwatch_core::domain::alert::{
    dedupe_key, Alert, AlertId, AlertRule, AlertRuleId, AlertStatus, ThresholdType,
};
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::errors::{ApplicationError, DomainError};
use pourwatch_core::evaluation::AlertCandidate;
use pourwatch_db::repositories::{AlertRepository, AlertRuleRepository, InventoryItemRepository};
use pourwatch_db::{Repositories, RepositoryError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("alert not found: {0}")]
    NotFound(String),
}

impl From<LifecycleError> for ApplicationError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Repository(RepositoryError::Conflict(message)) => {
                ApplicationError::Conflict(message)
            }
            LifecycleError::Repository(error) => ApplicationError::Persistence(error.to_string()),
            LifecycleError::Domain(error) => ApplicationError::Domain(error),
            LifecycleError::NotFound(id) => ApplicationError::NotFound(format!("alert {id}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CandidateOutcome {
    Created { alert: Alert, rule: AlertRule },
    /// An open alert for the same key is still inside its cooldown, or a
    /// concurrent pass won the insert.
    Suppressed,
    /// No inventory item backs the product.
    Dropped,
}

/// Turns evaluated candidates into persisted alerts and applies operator
/// status changes.
#[derive(Clone)]
pub struct AlertLifecycleManager {
    rules: Arc<dyn AlertRuleRepository>,
    inventory: Arc<dyn InventoryItemRepository>,
    alerts: Arc<dyn AlertRepository>,
}

impl AlertLifecycleManager {
    pub fn new(
        rules: Arc<dyn AlertRuleRepository>,
        inventory: Arc<dyn InventoryItemRepository>,
        alerts: Arc<dyn AlertRepository>,
    ) -> Self {
        Self { rules, inventory, alerts }
    }

    pub fn from_repositories(repositories: &Repositories) -> Self {
        Self::new(
            repositories.rules.clone(),
            repositories.inventory.clone(),
            repositories.alerts.clone(),
        )
    }

    pub async fn apply(
        &self,
        organization_id: &OrganizationId,
        candidate: &AlertCandidate,
        cooldown_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<CandidateOutcome, LifecycleError> {
        let cooldown_start = now - Duration::hours(i64::from(cooldown_hours));

        if let Some(open) = self
            .alerts
            .find_open_since(organization_id, candidate.alert_type, &candidate.title, cooldown_start)
            .await?
        {
            debug!(
                event_name = "engine.lifecycle.cooldown",
                organization_id = %organization_id,
                alert_type = candidate.alert_type.as_str(),
                open_alert_id = %open.id.0,
                "candidate suppressed by cooldown"
            );
            return Ok(CandidateOutcome::Suppressed);
        }

        let rule = self
            .rules
            .upsert(AlertRule {
                id: AlertRuleId(format!("rule-{}", Uuid::new_v4())),
                organization_id: organization_id.clone(),
                alert_type: candidate.alert_type,
                product_id: candidate.product_id.clone(),
                name: candidate.title.clone(),
                threshold_type: ThresholdType::Percentage,
                threshold_value: candidate.threshold_value,
                enabled: true,
                notify_email: true,
                notify_dashboard: true,
                cooldown_hours,
                created_at: now,
                updated_at: now,
            })
            .await?;

        let Some(item) =
            self.inventory.find_for_product(organization_id, &candidate.product_id).await?
        else {
            debug!(
                event_name = "engine.lifecycle.no_inventory_item",
                organization_id = %organization_id,
                product_id = %candidate.product_id,
                alert_type = candidate.alert_type.as_str(),
                "candidate dropped without a backing inventory item"
            );
            return Ok(CandidateOutcome::Dropped);
        };

        let anchor = self
            .alerts
            .latest_for_title(organization_id, candidate.alert_type, &candidate.title)
            .await?;
        // A pass that read "nothing open" before a racing pass inserted sees
        // that insert here.
        if let Some(latest) = &anchor {
            if latest.status.is_open() && latest.created_at >= cooldown_start {
                return Ok(CandidateOutcome::Suppressed);
            }
        }

        let alert = Alert {
            id: AlertId(format!("alert-{}", Uuid::new_v4())),
            organization_id: organization_id.clone(),
            rule_id: rule.id.clone(),
            inventory_item_id: item.id,
            product_id: candidate.product_id.clone(),
            alert_type: candidate.alert_type,
            severity: candidate.severity,
            title: candidate.title.clone(),
            message: candidate.message.clone(),
            trigger_value: candidate.trigger_value,
            threshold_value: candidate.threshold_value,
            cost_impact: candidate.cost_impact,
            status: AlertStatus::Active,
            dedupe_key: dedupe_key(
                organization_id,
                candidate.alert_type,
                &candidate.title,
                anchor.as_ref().map(|latest| &latest.id),
            ),
            created_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
        };

        if !self.alerts.insert_if_absent(alert.clone()).await? {
            debug!(
                event_name = "engine.lifecycle.dedupe_lost",
                organization_id = %organization_id,
                alert_type = candidate.alert_type.as_str(),
                "concurrent pass already raised this alert"
            );
            return Ok(CandidateOutcome::Suppressed);
        }

        info!(
            event_name = "engine.lifecycle.alert_created",
            organization_id = %organization_id,
            alert_id = %alert.id.0,
            alert_type = alert.alert_type.as_str(),
            severity = alert.severity.as_str(),
            product_id = %alert.product_id,
            "alert created"
        );
        Ok(CandidateOutcome::Created { alert, rule })
    }

    pub async fn acknowledge(
        &self,
        organization_id: &OrganizationId,
        alert_id: &AlertId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, LifecycleError> {
        self.transition(organization_id, alert_id, |alert| alert.acknowledge(actor, now)).await
    }

    pub async fn resolve(
        &self,
        organization_id: &OrganizationId,
        alert_id: &AlertId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, LifecycleError> {
        self.transition(organization_id, alert_id, |alert| alert.resolve(actor, now)).await
    }

    async fn transition<F>(
        &self,
        organization_id: &OrganizationId,
        alert_id: &AlertId,
        apply: F,
    ) -> Result<Alert, LifecycleError>
    where
        F: FnOnce(&mut Alert) -> Result<(), DomainError>,
    {
        let mut alert = self
            .alerts
            .find_by_id(organization_id, alert_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(alert_id.0.clone()))?;
        let expected = alert.status;

        apply(&mut alert)?;
        self.alerts.save_transition(&alert, expected).await?;

        info!(
            event_name = "engine.lifecycle.alert_transitioned",
            organization_id = %organization_id,
            alert_id = %alert.id.0,
            from = expected.as_str(),
            to = alert.status.as_str(),
            "alert status changed"
        );
        Ok(alert)
    }
}
