//! Usage reconciliation.
//!
//! Rebuilds *theoretical* consumption per product from sales (exploding
//! recipe sales into their ingredients) and *actual* consumption from the
//! deviations observed by completed inventory counts, then derives variance,
//! efficiency and cost impact for every product that saw activity.
//!
//! Everything here is pure: identical inputs produce identical, product-id
//! ordered output.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::count::{CountEvent, CountLineEvent};
use crate::domain::product::{Product, ProductId};
use crate::domain::recipe::{RecipeDefinition, RecipeId};
use crate::domain::sales::{SaleEvent, SaleLineEvent};

/// Floor applied to the efficiency denominator.
pub const EFFICIENCY_EPSILON: f64 = 1e-6;

/// Half-open time window `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn trailing(end: DateTime<Utc>, hours: u32) -> Self {
        Self { start: end - Duration::hours(i64::from(hours)), end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUsageRecord {
    pub product_id: ProductId,
    pub product_name: String,
    pub theoretical_quantity: f64,
    pub actual_quantity: f64,
    pub variance: f64,
    pub variance_percent: f64,
    pub efficiency: f64,
    pub unit_cost: Decimal,
    pub cost_impact: Decimal,
}

impl ProductUsageRecord {
    /// Derives the comparison metrics from a theoretical/actual pair.
    pub fn from_quantities(
        product_id: ProductId,
        product_name: impl Into<String>,
        theoretical_quantity: f64,
        actual_quantity: f64,
        unit_cost: Decimal,
    ) -> Self {
        let variance = actual_quantity - theoretical_quantity;
        let variance_percent = if theoretical_quantity > 0.0 {
            variance * 100.0 / theoretical_quantity
        } else {
            0.0
        };
        // Full precision; only display paths round to cents.
        let cost_impact = Decimal::from_f64(variance)
            .and_then(|variance| variance.checked_mul(unit_cost))
            .unwrap_or(Decimal::ZERO);

        Self {
            product_id,
            product_name: product_name.into(),
            theoretical_quantity,
            actual_quantity,
            variance,
            variance_percent,
            efficiency: efficiency(theoretical_quantity, actual_quantity),
            unit_cost,
            cost_impact,
        }
    }
}

/// Theoretical over actual usage as a percentage, capped at 100.
pub fn efficiency(theoretical_quantity: f64, actual_quantity: f64) -> f64 {
    let ratio = theoretical_quantity / actual_quantity.max(EFFICIENCY_EPSILON) * 100.0;
    if ratio.is_finite() {
        ratio.clamp(0.0, 100.0)
    } else {
        100.0
    }
}

/// Read-only inputs for one reconciliation pass.
#[derive(Clone, Copy, Debug)]
pub struct ReconciliationInput<'a> {
    pub window: UsageWindow,
    pub sales: &'a [SaleEvent],
    pub counts: &'a [CountEvent],
    pub recipes: &'a [RecipeDefinition],
    pub products: &'a [Product],
}

#[derive(Debug, Default)]
struct UsageAccumulator {
    theoretical: f64,
    deviation: f64,
    latest_count: Option<(DateTime<Utc>, Decimal)>,
}

pub fn reconcile(input: ReconciliationInput<'_>) -> Vec<ProductUsageRecord> {
    let recipes: HashMap<&RecipeId, &RecipeDefinition> =
        input.recipes.iter().map(|recipe| (&recipe.recipe_id, recipe)).collect();
    let products: HashMap<&ProductId, &Product> =
        input.products.iter().map(|product| (&product.id, product)).collect();

    let mut usage: BTreeMap<ProductId, UsageAccumulator> = BTreeMap::new();

    for sale in input.sales.iter().filter(|sale| input.window.contains(sale.timestamp)) {
        for line in sale.lines() {
            accumulate_sale_line(&mut usage, &recipes, &line);
        }
    }

    for line in input.counts.iter().flat_map(CountEvent::lines) {
        if input.window.contains(line.completed_at) {
            accumulate_count_line(&mut usage, &line);
        }
    }

    usage
        .into_iter()
        .filter(|(_, acc)| acc.theoretical > 0.0 || acc.deviation > 0.0)
        .map(|(product_id, acc)| {
            let product = products.get(&product_id);
            let unit_cost = acc
                .latest_count
                .map(|(_, unit_cost)| unit_cost)
                .or_else(|| product.map(|product| product.unit_cost))
                .unwrap_or(Decimal::ZERO);
            let product_name = product
                .map(|product| product.name.clone())
                .unwrap_or_else(|| product_id.0.clone());

            ProductUsageRecord::from_quantities(
                product_id,
                product_name,
                acc.theoretical,
                acc.theoretical + acc.deviation,
                unit_cost,
            )
        })
        .collect()
}

fn accumulate_sale_line(
    usage: &mut BTreeMap<ProductId, UsageAccumulator>,
    recipes: &HashMap<&RecipeId, &RecipeDefinition>,
    line: &SaleLineEvent,
) {
    if !line.quantity.is_finite() || line.quantity <= 0.0 {
        return;
    }

    if let Some(recipe_id) = &line.recipe_id {
        let Some(recipe) = recipes.get(recipe_id) else {
            return;
        };
        for ingredient in &recipe.ingredients {
            let per_serving = ingredient.quantity_per_serving;
            if !per_serving.is_finite() || per_serving <= 0.0 {
                continue;
            }
            usage.entry(ingredient.product_id.clone()).or_default().theoretical +=
                per_serving * line.quantity;
        }
        return;
    }

    if let Some(product_id) = &line.product_id {
        usage.entry(product_id.clone()).or_default().theoretical += line.quantity;
    }
}

fn accumulate_count_line(
    usage: &mut BTreeMap<ProductId, UsageAccumulator>,
    line: &CountLineEvent,
) {
    // Counts without sales have no baseline to compare against.
    let Some(acc) = usage.get_mut(&line.product_id) else {
        return;
    };

    if let Some(deviation) = line.observed_deviation().filter(|value| value.is_finite()) {
        acc.deviation += deviation;
    }

    let newer = acc.latest_count.map(|(seen_at, _)| line.completed_at >= seen_at).unwrap_or(true);
    if newer {
        acc.latest_count = Some((line.completed_at, line.unit_cost));
    }
}
