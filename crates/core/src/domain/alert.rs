use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::InventoryItemId;
use crate::domain::organization::OrganizationId;
use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertRuleId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    UsageVariance,
    EfficiencyLow,
    OveruseDetected,
}

impl AlertType {
    pub const ALL: [AlertType; 3] =
        [AlertType::UsageVariance, AlertType::EfficiencyLow, AlertType::OveruseDetected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsageVariance => "USAGE_VARIANCE",
            Self::EfficiencyLow => "EFFICIENCY_LOW",
            Self::OveruseDetected => "OVERUSE_DETECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USAGE_VARIANCE" => Some(Self::UsageVariance),
            "EFFICIENCY_LOW" => Some(Self::EfficiencyLow),
            "OVERUSE_DETECTED" => Some(Self::OveruseDetected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UsageVariance => "Usage variance",
            Self::EfficiencyLow => "Low efficiency",
            Self::OveruseDetected => "Overuse detected",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Email goes out for HIGH and above.
    pub fn warrants_email(&self) -> bool {
        *self >= Self::High
    }

    pub fn warrants_slack(&self) -> bool {
        *self == Self::Critical
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(Self::Active),
            "ACKNOWLEDGED" => Some(Self::Acknowledged),
            "RESOLVED" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Statuses that still hold the cooldown window open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Acknowledged)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdType {
    Percentage,
    Absolute,
}

impl ThresholdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "PERCENTAGE",
            Self::Absolute => "ABSOLUTE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PERCENTAGE" => Some(Self::Percentage),
            "ABSOLUTE" => Some(Self::Absolute),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: AlertRuleId,
    pub organization_id: OrganizationId,
    pub alert_type: AlertType,
    pub product_id: ProductId,
    pub name: String,
    pub threshold_type: ThresholdType,
    pub threshold_value: f64,
    pub enabled: bool,
    pub notify_email: bool,
    pub notify_dashboard: bool,
    pub cooldown_hours: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub organization_id: OrganizationId,
    pub rule_id: AlertRuleId,
    pub inventory_item_id: InventoryItemId,
    pub product_id: ProductId,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub trigger_value: f64,
    pub threshold_value: f64,
    pub cost_impact: Decimal,
    pub status: AlertStatus,
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl Alert {
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self.status, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }

    pub fn acknowledge(&mut self, actor: &str, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition_to(AlertStatus::Acknowledged)?;
        self.acknowledged_at = Some(at);
        self.acknowledged_by = Some(actor.to_string());
        Ok(())
    }

    pub fn resolve(&mut self, actor: &str, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition_to(AlertStatus::Resolved)?;
        self.resolved_at = Some(at);
        self.resolved_by = Some(actor.to_string());
        Ok(())
    }

    fn transition_to(&mut self, next: AlertStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidAlertTransition { from: self.status, to: next })
    }
}

/// Key that collides for two passes racing to raise the same alert.
///
/// `anchor` is the id of the newest alert already stored for the same
/// organization, type and title, so a fresh key only becomes available once a
/// new alert has actually been written.
pub fn dedupe_key(
    organization_id: &OrganizationId,
    alert_type: AlertType,
    title: &str,
    anchor: Option<&AlertId>,
) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [
        organization_id.0.as_str(),
        alert_type.as_str(),
        title,
        anchor.map(|id| id.0.as_str()).unwrap_or("genesis"),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(&[0x1f]);
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{dedupe_key, Alert, AlertId, AlertRuleId, AlertSeverity, AlertStatus, AlertType};
    use crate::domain::inventory::InventoryItemId;
    use crate::domain::organization::OrganizationId;
    use crate::domain::product::ProductId;
    use crate::errors::DomainError;

    fn alert(status: AlertStatus) -> Alert {
        Alert {
            id: AlertId("ALR-1".to_string()),
            organization_id: OrganizationId("org-1".to_string()),
            rule_id: AlertRuleId("RULE-1".to_string()),
            inventory_item_id: InventoryItemId("INV-1".to_string()),
            product_id: ProductId("vodka".to_string()),
            alert_type: AlertType::UsageVariance,
            severity: AlertSeverity::High,
            title: "Usage variance: Vodka".to_string(),
            message: "Vodka usage is 30.0% above expected".to_string(),
            trigger_value: 30.0,
            threshold_value: 15.0,
            cost_impact: Decimal::new(1500, 2),
            status,
            dedupe_key: "key".to_string(),
            created_at: Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
        }
    }

    #[test]
    fn acknowledge_stamps_actor_and_time() {
        let mut alert = alert(AlertStatus::Active);
        let at = Utc::now();

        alert.acknowledge("manager-7", at).expect("active -> acknowledged");

        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert_eq!(alert.acknowledged_by.as_deref(), Some("manager-7"));
        assert_eq!(alert.acknowledged_at, Some(at));
    }

    #[test]
    fn acknowledged_alert_can_still_be_resolved() {
        let mut alert = alert(AlertStatus::Acknowledged);

        alert.resolve("manager-7", Utc::now()).expect("acknowledged -> resolved");

        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.resolved_by.as_deref(), Some("manager-7"));
    }

    #[test]
    fn resolved_alert_rejects_further_transitions() {
        let mut alert = alert(AlertStatus::Resolved);

        let error = alert.acknowledge("manager-7", Utc::now()).expect_err("resolved is terminal");

        assert_eq!(
            error,
            DomainError::InvalidAlertTransition {
                from: AlertStatus::Resolved,
                to: AlertStatus::Acknowledged
            }
        );
        assert!(alert.resolve("manager-7", Utc::now()).is_err());
    }

    #[test]
    fn severity_channel_gates_follow_ordering() {
        assert!(!AlertSeverity::Medium.warrants_email());
        assert!(AlertSeverity::High.warrants_email());
        assert!(AlertSeverity::Critical.warrants_email());
        assert!(!AlertSeverity::High.warrants_slack());
        assert!(AlertSeverity::Critical.warrants_slack());
    }

    #[test]
    fn dedupe_key_changes_only_with_anchor_or_identity() {
        let org = OrganizationId("org-1".to_string());
        let first = dedupe_key(&org, AlertType::UsageVariance, "Usage variance: Vodka", None);
        let again = dedupe_key(&org, AlertType::UsageVariance, "Usage variance: Vodka", None);
        let anchored = dedupe_key(
            &org,
            AlertType::UsageVariance,
            "Usage variance: Vodka",
            Some(&AlertId("ALR-1".to_string())),
        );
        let other_type = dedupe_key(&org, AlertType::OveruseDetected, "Usage variance: Vodka", None);

        assert_eq!(first, again);
        assert_ne!(first, anchored);
        assert_ne!(first, other_type);
    }

    #[test]
    fn wire_names_round_trip_through_parse() {
        for alert_type in AlertType::ALL {
            assert_eq!(AlertType::parse(alert_type.as_str()), Some(alert_type));
        }
        assert_eq!(AlertStatus::parse("ACKNOWLEDGED"), Some(AlertStatus::Acknowledged));
        assert_eq!(AlertSeverity::parse("bogus"), None);
    }
}
