use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

pub const MIN_COOLDOWN_HOURS: u32 = 1;
pub const MAX_COOLDOWN_HOURS: u32 = 168;

/// Per-organization alerting thresholds, stored as a JSON settings blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    pub usage_variance_threshold: f64,
    pub low_efficiency_threshold: f64,
    pub overuse_threshold: f64,
    pub cost_impact_threshold: Decimal,
    pub usage_variance_enabled: bool,
    pub low_efficiency_enabled: bool,
    pub overuse_enabled: bool,
    pub cooldown_hours: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            usage_variance_threshold: 15.0,
            low_efficiency_threshold: 70.0,
            overuse_threshold: 20.0,
            cost_impact_threshold: Decimal::new(50, 0),
            usage_variance_enabled: true,
            low_efficiency_enabled: true,
            overuse_enabled: true,
            cooldown_hours: 24,
        }
    }
}

impl AlertConfig {
    /// Reads a stored settings blob, keeping defaults for anything missing or
    /// of the wrong shape.
    pub fn from_settings(blob: Option<&Value>) -> Self {
        let mut config = Self::default();
        let Some(Value::Object(fields)) = blob else {
            return config;
        };

        if let Some(value) = fields.get("usageVarianceThreshold").and_then(finite_f64) {
            config.usage_variance_threshold = value;
        }
        if let Some(value) = fields.get("lowEfficiencyThreshold").and_then(finite_f64) {
            config.low_efficiency_threshold = value;
        }
        if let Some(value) = fields.get("overuseThreshold").and_then(finite_f64) {
            config.overuse_threshold = value;
        }
        if let Some(value) = fields.get("costImpactThreshold").and_then(decimal) {
            config.cost_impact_threshold = value;
        }
        if let Some(value) = fields.get("usageVarianceEnabled").and_then(Value::as_bool) {
            config.usage_variance_enabled = value;
        }
        if let Some(value) = fields.get("lowEfficiencyEnabled").and_then(Value::as_bool) {
            config.low_efficiency_enabled = value;
        }
        if let Some(value) = fields.get("overuseEnabled").and_then(Value::as_bool) {
            config.overuse_enabled = value;
        }
        if let Some(value) = fields
            .get("cooldownHours")
            .and_then(Value::as_u64)
            .and_then(|hours| u32::try_from(hours).ok())
            .filter(|hours| (MIN_COOLDOWN_HOURS..=MAX_COOLDOWN_HOURS).contains(hours))
        {
            config.cooldown_hours = value;
        }

        config
    }

    pub fn to_settings(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, value) in [
            ("usageVarianceThreshold", self.usage_variance_threshold),
            ("lowEfficiencyThreshold", self.low_efficiency_threshold),
            ("overuseThreshold", self.overuse_threshold),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(DomainError::InvalidAlertConfig(format!(
                    "{name} must be between 0 and 100"
                )));
            }
        }

        if self.cost_impact_threshold.is_sign_negative() {
            return Err(DomainError::InvalidAlertConfig(
                "costImpactThreshold must not be negative".to_string(),
            ));
        }

        if !(MIN_COOLDOWN_HOURS..=MAX_COOLDOWN_HOURS).contains(&self.cooldown_hours) {
            return Err(DomainError::InvalidAlertConfig(format!(
                "cooldownHours must be in range {MIN_COOLDOWN_HOURS}..={MAX_COOLDOWN_HOURS}"
            )));
        }

        Ok(())
    }
}

/// Partial update accepted from the dashboard.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfigPatch {
    pub usage_variance_threshold: Option<f64>,
    pub low_efficiency_threshold: Option<f64>,
    pub overuse_threshold: Option<f64>,
    pub cost_impact_threshold: Option<Decimal>,
    pub usage_variance_enabled: Option<bool>,
    pub low_efficiency_enabled: Option<bool>,
    pub overuse_enabled: Option<bool>,
    pub cooldown_hours: Option<u32>,
}

impl AlertConfigPatch {
    pub fn apply_to(self, mut config: AlertConfig) -> Result<AlertConfig, DomainError> {
        if let Some(value) = self.usage_variance_threshold {
            config.usage_variance_threshold = value;
        }
        if let Some(value) = self.low_efficiency_threshold {
            config.low_efficiency_threshold = value;
        }
        if let Some(value) = self.overuse_threshold {
            config.overuse_threshold = value;
        }
        if let Some(value) = self.cost_impact_threshold {
            config.cost_impact_threshold = value;
        }
        if let Some(value) = self.usage_variance_enabled {
            config.usage_variance_enabled = value;
        }
        if let Some(value) = self.low_efficiency_enabled {
            config.low_efficiency_enabled = value;
        }
        if let Some(value) = self.overuse_enabled {
            config.overuse_enabled = value;
        }
        if let Some(value) = self.cooldown_hours {
            config.cooldown_hours = value;
        }

        config.validate()?;
        Ok(config)
    }
}

fn finite_f64(value: &Value) -> Option<f64> {
    value.as_f64().filter(|number| number.is_finite())
}

fn decimal(value: &Value) -> Option<Decimal> {
    let amount = match value {
        Value::Number(number) => number.as_f64().and_then(Decimal::from_f64),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    };
    amount.filter(|amount| !amount.is_sign_negative())
}
