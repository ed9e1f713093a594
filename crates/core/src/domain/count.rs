use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationId;
use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountStatus {
    Draft,
    InProgress,
    Completed,
}

impl CountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountItem {
    pub product_id: ProductId,
    pub variance: Option<f64>,
    pub expected_qty: Option<f64>,
    pub total_quantity: f64,
    pub unit_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountArea {
    pub area_id: String,
    pub items: Vec<CountItem>,
}

/// A physical inventory count session for one location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountEvent {
    pub count_id: String,
    pub organization_id: OrganizationId,
    pub location_id: String,
    pub status: CountStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub areas: Vec<CountArea>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountLineEvent {
    pub count_id: String,
    pub area_id: String,
    pub product_id: ProductId,
    pub variance: Option<f64>,
    pub expected_qty: Option<f64>,
    pub total_quantity: f64,
    pub unit_cost: Decimal,
    pub completed_at: DateTime<Utc>,
}

impl CountLineEvent {
    /// Magnitude of the deviation this line observed, if it observed one.
    pub fn observed_deviation(&self) -> Option<f64> {
        match (self.variance, self.expected_qty) {
            (Some(variance), _) => Some(variance.abs()),
            (None, Some(expected)) => Some((expected - self.total_quantity).abs()),
            (None, None) => None,
        }
    }
}

impl CountEvent {
    /// Flattened lines; only completed counts produce any.
    pub fn lines(&self) -> Vec<CountLineEvent> {
        let completed_at = match (self.status, self.completed_at) {
            (CountStatus::Completed, Some(completed_at)) => completed_at,
            _ => return Vec::new(),
        };

        self.areas
            .iter()
            .flat_map(|area| {
                area.items.iter().map(move |item| CountLineEvent {
                    count_id: self.count_id.clone(),
                    area_id: area.area_id.clone(),
                    product_id: item.product_id.clone(),
                    variance: item.variance,
                    expected_qty: item.expected_qty,
                    total_quantity: item.total_quantity,
                    unit_cost: item.unit_cost,
                    completed_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{CountArea, CountEvent, CountItem, CountStatus};
    use crate::domain::organization::OrganizationId;
    use crate::domain::product::ProductId;

    fn count(status: CountStatus) -> CountEvent {
        CountEvent {
            count_id: "CNT-1".to_string(),
            organization_id: OrganizationId("org-1".to_string()),
            location_id: "main-bar".to_string(),
            status,
            completed_at: Some(Utc::now()),
            areas: vec![CountArea {
                area_id: "back-bar".to_string(),
                items: vec![
                    CountItem {
                        product_id: ProductId("vodka".to_string()),
                        variance: Some(-2.5),
                        expected_qty: Some(10.0),
                        total_quantity: 7.5,
                        unit_cost: Decimal::new(1800, 2),
                    },
                    CountItem {
                        product_id: ProductId("gin".to_string()),
                        variance: None,
                        expected_qty: Some(4.0),
                        total_quantity: 5.0,
                        unit_cost: Decimal::new(2200, 2),
                    },
                ],
            }],
        }
    }

    #[test]
    fn draft_counts_have_no_lines() {
        assert!(count(CountStatus::Draft).lines().is_empty());
        assert!(count(CountStatus::InProgress).lines().is_empty());
    }

    #[test]
    fn completed_count_flattens_every_area_item() {
        let lines = count(CountStatus::Completed).lines();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].area_id, "back-bar");
        assert_eq!(lines[1].product_id, ProductId("gin".to_string()));
    }

    #[test]
    fn deviation_prefers_recorded_variance_over_expected_quantity() {
        let lines = count(CountStatus::Completed).lines();

        assert_eq!(lines[0].observed_deviation(), Some(2.5));
        assert_eq!(lines[1].observed_deviation(), Some(1.0));
    }
}
