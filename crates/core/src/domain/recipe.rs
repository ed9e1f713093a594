use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationId;
use crate::domain::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub product_id: ProductId,
    pub quantity_per_serving: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    pub recipe_id: RecipeId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
}
