//! Variance alert evaluation.
//!
//! Turns usage records into alert candidates using an organization's
//! [`AlertConfig`]. A record may raise any combination of the three alert
//! types; each candidate carries its own severity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::alert::{AlertSeverity, AlertType};
use crate::domain::alert_config::AlertConfig;
use crate::domain::product::ProductId;
use crate::reconciliation::ProductUsageRecord;

/// Badness (in percent) at or above which a candidate is HIGH.
pub const HIGH_SEVERITY_PERCENT: f64 = 30.0;
/// Badness (in percent) at or above which a candidate is MEDIUM.
pub const MEDIUM_SEVERITY_PERCENT: f64 = 20.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCandidate {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub product_id: ProductId,
    pub product_name: String,
    pub title: String,
    pub message: String,
    pub trigger_value: f64,
    pub threshold_value: f64,
    pub cost_impact: Decimal,
}

/// Cost impact dominates: an expensive variance is CRITICAL however small
/// its percentage.
pub fn classify_severity(
    badness_percent: f64,
    cost_impact: Decimal,
    config: &AlertConfig,
) -> AlertSeverity {
    if cost_impact.abs() >= config.cost_impact_threshold {
        AlertSeverity::Critical
    } else if badness_percent >= HIGH_SEVERITY_PERCENT {
        AlertSeverity::High
    } else if badness_percent >= MEDIUM_SEVERITY_PERCENT {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

pub fn evaluate(records: &[ProductUsageRecord], config: &AlertConfig) -> Vec<AlertCandidate> {
    records.iter().flat_map(|record| evaluate_record(record, config)).collect()
}

pub fn evaluate_record(record: &ProductUsageRecord, config: &AlertConfig) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();
    if !record.variance_percent.is_finite() || !record.efficiency.is_finite() {
        return candidates;
    }

    let variance_magnitude = record.variance_percent.abs();

    if config.usage_variance_enabled && variance_magnitude >= config.usage_variance_threshold {
        let direction = if record.variance_percent >= 0.0 { "above" } else { "below" };
        candidates.push(candidate(
            record,
            AlertType::UsageVariance,
            classify_severity(variance_magnitude, record.cost_impact, config),
            format!(
                "{} usage is {:.1}% {direction} expected ({} cost impact).",
                record.product_name,
                variance_magnitude,
                format_money(record.cost_impact)
            ),
            record.variance_percent,
            config.usage_variance_threshold,
        ));
    }

    if config.low_efficiency_enabled && record.efficiency < config.low_efficiency_threshold {
        candidates.push(candidate(
            record,
            AlertType::EfficiencyLow,
            classify_severity(100.0 - record.efficiency, record.cost_impact, config),
            format!(
                "{} is running at {:.1}% efficiency against a {:.1}% target ({} cost impact).",
                record.product_name,
                record.efficiency,
                config.low_efficiency_threshold,
                format_money(record.cost_impact)
            ),
            record.efficiency,
            config.low_efficiency_threshold,
        ));
    }

    if config.overuse_enabled && record.variance_percent > config.overuse_threshold {
        candidates.push(candidate(
            record,
            AlertType::OveruseDetected,
            classify_severity(variance_magnitude, record.cost_impact, config),
            format!(
                "{} was used {:.2} units more than sales explain ({:.1}% over, {} cost impact).",
                record.product_name,
                record.variance,
                record.variance_percent,
                format_money(record.cost_impact)
            ),
            record.variance_percent,
            config.overuse_threshold,
        ));
    }

    candidates
}

/// Stable per (type, product) so repeated passes hit the same cooldown key.
pub fn alert_title(alert_type: AlertType, product_name: &str) -> String {
    format!("{}: {product_name}", alert_type.label())
}

pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

fn candidate(
    record: &ProductUsageRecord,
    alert_type: AlertType,
    severity: AlertSeverity,
    message: String,
    trigger_value: f64,
    threshold_value: f64,
) -> AlertCandidate {
    AlertCandidate {
        alert_type,
        severity,
        product_id: record.product_id.clone(),
        product_name: record.product_name.clone(),
        title: alert_title(alert_type, &record.product_name),
        message,
        trigger_value,
        threshold_value,
        cost_impact: record.cost_impact,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{classify_severity, evaluate, evaluate_record, format_money};
    use crate::domain::alert::{AlertSeverity, AlertType};
    use crate::domain::alert_config::AlertConfig;
    use crate::domain::product::ProductId;
    use crate::reconciliation::ProductUsageRecord;

    fn record(theoretical: f64, actual: f64, unit_cost_cents: i64) -> ProductUsageRecord {
        ProductUsageRecord::from_quantities(
            ProductId("vodka".to_string()),
            "House Vodka",
            theoretical,
            actual,
            Decimal::new(unit_cost_cents, 2),
        )
    }

    fn types(candidates: &[super::AlertCandidate]) -> Vec<AlertType> {
        candidates.iter().map(|candidate| candidate.alert_type).collect()
    }

    #[test]
    fn severity_table() {
        let config = AlertConfig::default();
        let cases = [
            (0.0, Decimal::ZERO, AlertSeverity::Low),
            (19.99, Decimal::new(4999, 2), AlertSeverity::Low),
            (20.0, Decimal::ZERO, AlertSeverity::Medium),
            (29.9, Decimal::new(-4999, 2), AlertSeverity::Medium),
            (30.0, Decimal::ZERO, AlertSeverity::High),
            (95.0, Decimal::new(10, 0), AlertSeverity::High),
            (1.0, Decimal::new(50, 0), AlertSeverity::Critical),
            (1.0, Decimal::new(-50, 0), AlertSeverity::Critical),
            (45.0, Decimal::new(12000, 2), AlertSeverity::Critical),
        ];

        for (badness, cost, expected) in cases {
            assert_eq!(
                classify_severity(badness, cost, &config),
                expected,
                "badness {badness} cost {cost}"
            );
        }
    }

    #[test]
    fn scenario_a_thirty_percent_over_is_high() {
        let record = record(10.0, 13.0, 500);
        assert_eq!(record.variance, 3.0);
        assert_eq!(record.variance_percent, 30.0);
        assert_eq!(record.cost_impact, Decimal::new(1500, 2));

        let candidates = evaluate_record(&record, &AlertConfig::default());

        let usage = candidates
            .iter()
            .find(|candidate| candidate.alert_type == AlertType::UsageVariance)
            .expect("usage variance alert");
        assert_eq!(usage.severity, AlertSeverity::High);
        assert_eq!(usage.title, "Usage variance: House Vodka");
        assert!(usage.message.contains("30.0% above expected"));
        assert!(usage.message.contains("$15.00"));
    }

    #[test]
    fn cost_just_under_threshold_is_not_critical() {
        let record = record(10.0, 14.9996, 1000);
        assert!(record.cost_impact < Decimal::new(50, 0), "cost {}", record.cost_impact);

        let candidates = evaluate_record(&record, &AlertConfig::default());

        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|candidate| candidate.severity == AlertSeverity::High));
        assert!(candidates.iter().all(|candidate| candidate.message.contains("$50.00")));
    }

    #[test]
    fn scenario_b_cost_overrides_percentage_tier() {
        let record = record(20.0, 28.0, 1000);
        assert_eq!(record.variance_percent, 40.0);
        assert_eq!(record.cost_impact, Decimal::new(80, 0));

        let candidates = evaluate_record(&record, &AlertConfig::default());

        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|candidate| candidate.severity == AlertSeverity::Critical));
    }

    #[test]
    fn scenario_c_small_variance_stays_quiet() {
        let candidates = evaluate_record(&record(15.0, 16.0, 500), &AlertConfig::default());

        assert!(candidates.iter().all(|candidate| candidate.alert_type != AlertType::UsageVariance));
        assert!(candidates.is_empty());
    }

    #[test]
    fn one_record_can_raise_all_three_types() {
        let candidates = evaluate_record(&record(10.0, 20.0, 100), &AlertConfig::default());

        assert_eq!(
            types(&candidates),
            vec![AlertType::UsageVariance, AlertType::EfficiencyLow, AlertType::OveruseDetected]
        );
        let efficiency = &candidates[1];
        assert_eq!(efficiency.trigger_value, 50.0);
        assert_eq!(efficiency.severity, AlertSeverity::High, "badness is 100 - 50");
    }

    #[test]
    fn underuse_never_raises_overuse() {
        let candidates = evaluate_record(&record(10.0, 6.0, 100), &AlertConfig::default());

        assert_eq!(types(&candidates), vec![AlertType::UsageVariance]);
        assert!(candidates[0].message.contains("below expected"));
    }

    #[test]
    fn disabled_types_are_not_raised() {
        let config = AlertConfig {
            usage_variance_enabled: false,
            low_efficiency_enabled: false,
            ..AlertConfig::default()
        };

        let candidates = evaluate_record(&record(10.0, 20.0, 100), &config);

        assert_eq!(types(&candidates), vec![AlertType::OveruseDetected]);
    }

    #[test]
    fn evaluate_preserves_record_order() {
        let mut gin = record(10.0, 13.0, 100);
        gin.product_id = ProductId("gin".to_string());
        gin.product_name = "Gin".to_string();
        let quiet = record(10.0, 10.0, 100);

        let candidates = evaluate(&[gin, quiet, record(10.0, 12.5, 100)], &AlertConfig::default());

        let names: Vec<_> = candidates.iter().map(|c| c.product_name.as_str()).collect();
        assert_eq!(names, vec!["Gin", "Gin", "House Vodka", "House Vodka"]);
    }

    #[test]
    fn money_formatting_keeps_sign_and_cents() {
        assert_eq!(format_money(Decimal::new(15, 0)), "$15.00");
        assert_eq!(format_money(Decimal::new(-1234, 2)), "-$12.34");
        assert_eq!(format_money(Decimal::ZERO), "$0.00");
    }
}
