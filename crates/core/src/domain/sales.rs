use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationId;
use crate::domain::product::ProductId;
use crate::domain::recipe::RecipeId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: Option<ProductId>,
    pub recipe_id: Option<RecipeId>,
    pub quantity: f64,
    pub unit_price: Decimal,
}

/// A point-of-sale transaction as recorded by the POS integration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub sale_id: String,
    pub organization_id: OrganizationId,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<SaleItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleLineEvent {
    pub sale_id: String,
    pub timestamp: DateTime<Utc>,
    pub product_id: Option<ProductId>,
    pub recipe_id: Option<RecipeId>,
    pub quantity: f64,
    pub unit_price: Decimal,
}

impl SaleEvent {
    pub fn lines(&self) -> impl Iterator<Item = SaleLineEvent> + '_ {
        self.items.iter().map(move |item| SaleLineEvent {
            sale_id: self.sale_id.clone(),
            timestamp: self.timestamp,
            product_id: item.product_id.clone(),
            recipe_id: item.recipe_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
    }
}
