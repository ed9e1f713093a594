use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pourwatch_core::domain::count::{CountArea, CountEvent, CountItem, CountStatus};
use pourwatch_core::domain::inventory::{InventoryItem, InventoryItemId};
use pourwatch_core::domain::organization::{NotificationChannels, Organization, OrganizationId};
use pourwatch_core::domain::product::{Product, ProductId};
use pourwatch_core::domain::recipe::{RecipeDefinition, RecipeId, RecipeIngredient};
use pourwatch_core::domain::sales::{SaleEvent, SaleItem};

use crate::repositories::{Repositories, RepositoryError};

const DEMO_ORGANIZATION_ID: &str = "org-demo";
const DEMO_SALES_DAYS: i64 = 6;

/// (id, name, unit cost in cents, stocked)
const DEMO_PRODUCTS: &[(&str, &str, i64, bool)] = &[
    ("prod-gin", "London Dry Gin", 110, true),
    ("prod-ipa", "Draft IPA", 160, true),
    ("prod-lime", "Lime Wedge", 10, false),
    ("prod-tonic", "Tonic Water", 15, true),
    ("prod-vodka", "House Vodka", 85, true),
];

/// Deterministic demo bar: two highballs, one draft beer, a week of sales
/// and a completed count showing vodka and IPA shrinkage.
pub struct DemoSeedDataset;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub organization_id: String,
    pub products: usize,
    pub inventory_items: usize,
    pub recipes: usize,
    pub sales: usize,
    pub counts: usize,
}

impl DemoSeedDataset {
    pub fn organization_id() -> OrganizationId {
        OrganizationId(DEMO_ORGANIZATION_ID.to_string())
    }

    /// Writes the dataset relative to `now`. Re-running is safe; recorded
    /// sales keep their original timestamps.
    pub async fn load(
        repositories: &Repositories,
        now: DateTime<Utc>,
    ) -> Result<SeedResult, RepositoryError> {
        let organization_id = Self::organization_id();

        repositories
            .organizations
            .save(Organization { id: organization_id.clone(), name: "The Copper Tap".to_string() })
            .await?;
        repositories
            .organizations
            .save_notification_channels(
                &organization_id,
                NotificationChannels {
                    slack_webhook_url: None,
                    alert_email_recipients: vec!["manager@coppertap.example".to_string()],
                },
            )
            .await?;

        let mut inventory_items = 0;
        for (id, name, cents, stocked) in DEMO_PRODUCTS {
            repositories
                .products
                .save(Product {
                    id: ProductId((*id).to_string()),
                    organization_id: organization_id.clone(),
                    name: (*name).to_string(),
                    unit_cost: Decimal::new(*cents, 2),
                })
                .await?;

            if *stocked {
                repositories
                    .inventory
                    .save(InventoryItem {
                        id: InventoryItemId(format!("inv-{id}")),
                        organization_id: organization_id.clone(),
                        product_id: ProductId((*id).to_string()),
                        location_id: Some("main-bar".to_string()),
                        quantity_on_hand: 40.0,
                    })
                    .await?;
                inventory_items += 1;
            }
        }

        let recipes = demo_recipes(&organization_id);
        for recipe in &recipes {
            repositories.recipes.save(recipe.clone()).await?;
        }

        let sales = demo_sales(&organization_id, now);
        for sale in &sales {
            repositories.sales.save(sale.clone()).await?;
        }

        let counts = demo_counts(&organization_id, now);
        for count in &counts {
            repositories.counts.save(count.clone()).await?;
        }

        tracing::info!(
            event_name = "db.seed.demo_loaded",
            organization_id = %organization_id,
            sales = sales.len(),
            counts = counts.len(),
            "demo dataset loaded"
        );

        Ok(SeedResult {
            organization_id: organization_id.0,
            products: DEMO_PRODUCTS.len(),
            inventory_items,
            recipes: recipes.len(),
            sales: sales.len(),
            counts: counts.len(),
        })
    }
}

fn ingredient(product_id: &str, quantity_per_serving: f64) -> RecipeIngredient {
    RecipeIngredient { product_id: ProductId(product_id.to_string()), quantity_per_serving }
}

fn demo_recipes(organization_id: &OrganizationId) -> Vec<RecipeDefinition> {
    vec![
        RecipeDefinition {
            recipe_id: RecipeId("rcp-gin-tonic".to_string()),
            organization_id: organization_id.clone(),
            name: "Gin & Tonic".to_string(),
            ingredients: vec![
                ingredient("prod-gin", 1.5),
                ingredient("prod-tonic", 4.0),
                ingredient("prod-lime", 1.0),
            ],
        },
        RecipeDefinition {
            recipe_id: RecipeId("rcp-vodka-tonic".to_string()),
            organization_id: organization_id.clone(),
            name: "Vodka Tonic".to_string(),
            ingredients: vec![
                ingredient("prod-vodka", 1.5),
                ingredient("prod-tonic", 4.0),
                ingredient("prod-lime", 1.0),
            ],
        },
    ]
}

/// One close-out sale per day: 8 vodka tonics, 6 gin & tonics, 10 IPAs.
fn demo_sales(organization_id: &OrganizationId, now: DateTime<Utc>) -> Vec<SaleEvent> {
    (1..=DEMO_SALES_DAYS)
        .map(|day| SaleEvent {
            sale_id: format!("sale-demo-{day:02}"),
            organization_id: organization_id.clone(),
            timestamp: now - Duration::days(day) + Duration::hours(1),
            items: vec![
                SaleItem {
                    product_id: None,
                    recipe_id: Some(RecipeId("rcp-vodka-tonic".to_string())),
                    quantity: 8.0,
                    unit_price: Decimal::new(900, 2),
                },
                SaleItem {
                    product_id: None,
                    recipe_id: Some(RecipeId("rcp-gin-tonic".to_string())),
                    quantity: 6.0,
                    unit_price: Decimal::new(1000, 2),
                },
                SaleItem {
                    product_id: Some(ProductId("prod-ipa".to_string())),
                    recipe_id: None,
                    quantity: 10.0,
                    unit_price: Decimal::new(700, 2),
                },
            ],
        })
        .collect()
}

fn count_item(
    product_id: &str,
    variance: Option<f64>,
    expected_qty: Option<f64>,
    total_quantity: f64,
    cents: i64,
) -> CountItem {
    CountItem {
        product_id: ProductId(product_id.to_string()),
        variance,
        expected_qty,
        total_quantity,
        unit_cost: Decimal::new(cents, 2),
    }
}

fn demo_counts(organization_id: &OrganizationId, now: DateTime<Utc>) -> Vec<CountEvent> {
    vec![
        CountEvent {
            count_id: "count-demo-weekly".to_string(),
            organization_id: organization_id.clone(),
            location_id: "main-bar".to_string(),
            status: CountStatus::Completed,
            completed_at: Some(now - Duration::hours(2)),
            areas: vec![
                CountArea {
                    area_id: "back-bar".to_string(),
                    items: vec![
                        count_item("prod-vodka", Some(-18.0), Some(58.0), 40.0, 85),
                        count_item("prod-gin", None, Some(20.0), 19.5, 110),
                    ],
                },
                CountArea {
                    area_id: "cooler".to_string(),
                    items: vec![
                        count_item("prod-ipa", Some(-24.0), Some(64.0), 40.0, 160),
                        count_item("prod-tonic", Some(10.0), Some(30.0), 40.0, 15),
                    ],
                },
            ],
        },
        CountEvent {
            count_id: "count-demo-spot".to_string(),
            organization_id: organization_id.clone(),
            location_id: "main-bar".to_string(),
            status: CountStatus::Draft,
            completed_at: None,
            areas: vec![CountArea {
                area_id: "back-bar".to_string(),
                items: vec![count_item("prod-vodka", Some(-50.0), None, 0.0, 85)],
            }],
        },
    ]
}
