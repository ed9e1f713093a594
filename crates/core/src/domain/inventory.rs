use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationId;
use crate::domain::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryItemId(pub String);

/// Stock-keeping record an alert is attached to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub organization_id: OrganizationId,
    pub product_id: ProductId,
    pub location_id: Option<String>,
    pub quantity_on_hand: f64,
}
