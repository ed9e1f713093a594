use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use pourwatch_core::domain::alert::{
    Alert, AlertId, AlertRule, AlertSeverity, AlertStatus, AlertType,
};
use pourwatch_core::domain::count::{CountEvent, CountStatus};
use pourwatch_core::domain::inventory::InventoryItem;
use pourwatch_core::domain::organization::{NotificationChannels, Organization, OrganizationId};
use pourwatch_core::domain::product::{Product, ProductId};
use pourwatch_core::domain::recipe::RecipeDefinition;
use pourwatch_core::domain::sales::SaleEvent;
use pourwatch_core::reconciliation::UsageWindow;

use super::{
    AlertPage, AlertQuery, AlertRepository, AlertRuleRepository, AlertSummary,
    CountEventRepository, InventoryItemRepository, OrganizationRepository, ProductRepository,
    RecipeRepository, RepositoryError, SaleEventRepository,
};

#[derive(Clone, Default)]
struct OrganizationRecord {
    organization: Option<Organization>,
    alert_settings: Option<Value>,
    channels: NotificationChannels,
}

#[derive(Default)]
pub struct InMemoryOrganizationRepository {
    organizations: RwLock<HashMap<String, OrganizationRecord>>,
}

#[async_trait::async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn list_ids(&self) -> Result<Vec<OrganizationId>, RepositoryError> {
        let organizations = self.organizations.read().await;
        let mut ids: Vec<_> = organizations
            .values()
            .filter_map(|record| record.organization.as_ref().map(|org| org.id.clone()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(&id.0).and_then(|record| record.organization.clone()))
    }

    async fn save(&self, organization: Organization) -> Result<(), RepositoryError> {
        let mut organizations = self.organizations.write().await;
        let key = organization.id.0.clone();
        organizations.entry(key).or_default().organization = Some(organization);
        Ok(())
    }

    async fn alert_settings(&self, id: &OrganizationId) -> Result<Option<Value>, RepositoryError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(&id.0).and_then(|record| record.alert_settings.clone()))
    }

    async fn save_alert_settings(
        &self,
        id: &OrganizationId,
        settings: Value,
    ) -> Result<(), RepositoryError> {
        let mut organizations = self.organizations.write().await;
        let record = organizations
            .get_mut(&id.0)
            .filter(|record| record.organization.is_some())
            .ok_or_else(|| {
                RepositoryError::Conflict(format!("organization `{}` does not exist", id))
            })?;
        record.alert_settings = Some(settings);
        Ok(())
    }

    async fn notification_channels(
        &self,
        id: &OrganizationId,
    ) -> Result<NotificationChannels, RepositoryError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(&id.0).map(|record| record.channels.clone()).unwrap_or_default())
    }

    async fn save_notification_channels(
        &self,
        id: &OrganizationId,
        channels: NotificationChannels,
    ) -> Result<(), RepositoryError> {
        let mut organizations = self.organizations.write().await;
        let record = organizations
            .get_mut(&id.0)
            .filter(|record| record.organization.is_some())
            .ok_or_else(|| {
                RepositoryError::Conflict(format!("organization `{}` does not exist", id))
            })?;
        record.channels = channels;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<_> = products
            .values()
            .filter(|product| &product.organization_id == organization_id)
            .cloned()
            .collect();
        found.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(found)
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInventoryItemRepository {
    items: RwLock<HashMap<String, InventoryItem>>,
}

#[async_trait::async_trait]
impl InventoryItemRepository for InMemoryInventoryItemRepository {
    async fn find_for_product(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|item| {
                &item.organization_id == organization_id && &item.product_id == product_id
            })
            .min_by(|left, right| left.id.0.cmp(&right.id.0))
            .cloned())
    }

    async fn save(&self, item: InventoryItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id.0.clone(), item);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRecipeRepository {
    recipes: RwLock<HashMap<String, RecipeDefinition>>,
}

#[async_trait::async_trait]
impl RecipeRepository for InMemoryRecipeRepository {
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RecipeDefinition>, RepositoryError> {
        let recipes = self.recipes.read().await;
        let mut found: Vec<_> = recipes
            .values()
            .filter(|recipe| &recipe.organization_id == organization_id)
            .cloned()
            .collect();
        found.sort_by(|left, right| left.recipe_id.cmp(&right.recipe_id));
        Ok(found)
    }

    async fn save(&self, recipe: RecipeDefinition) -> Result<(), RepositoryError> {
        let mut recipes = self.recipes.write().await;
        recipes.insert(recipe.recipe_id.0.clone(), recipe);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySaleEventRepository {
    sales: RwLock<HashMap<String, SaleEvent>>,
}

#[async_trait::async_trait]
impl SaleEventRepository for InMemorySaleEventRepository {
    async fn list_in_window(
        &self,
        organization_id: &OrganizationId,
        window: &UsageWindow,
    ) -> Result<Vec<SaleEvent>, RepositoryError> {
        let sales = self.sales.read().await;
        let mut found: Vec<_> = sales
            .values()
            .filter(|sale| {
                &sale.organization_id == organization_id && window.contains(sale.timestamp)
            })
            .cloned()
            .collect();
        found.sort_by(|left, right| {
            left.timestamp.cmp(&right.timestamp).then_with(|| left.sale_id.cmp(&right.sale_id))
        });
        Ok(found)
    }

    async fn save(&self, sale: SaleEvent) -> Result<(), RepositoryError> {
        let mut sales = self.sales.write().await;
        sales.entry(sale.sale_id.clone()).or_insert(sale);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCountEventRepository {
    counts: RwLock<HashMap<String, CountEvent>>,
}

#[async_trait::async_trait]
impl CountEventRepository for InMemoryCountEventRepository {
    async fn list_completed_in_window(
        &self,
        organization_id: &OrganizationId,
        window: &UsageWindow,
    ) -> Result<Vec<CountEvent>, RepositoryError> {
        let counts = self.counts.read().await;
        let mut found: Vec<_> = counts
            .values()
            .filter(|count| {
                &count.organization_id == organization_id
                    && count.status == CountStatus::Completed
                    && count.completed_at.is_some_and(|at| window.contains(at))
            })
            .cloned()
            .collect();
        found.sort_by(|left, right| {
            left.completed_at
                .cmp(&right.completed_at)
                .then_with(|| left.count_id.cmp(&right.count_id))
        });
        Ok(found)
    }

    async fn save(&self, count: CountEvent) -> Result<(), RepositoryError> {
        let mut counts = self.counts.write().await;
        counts.insert(count.count_id.clone(), count);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAlertRuleRepository {
    rules: RwLock<Vec<AlertRule>>,
}

#[async_trait::async_trait]
impl AlertRuleRepository for InMemoryAlertRuleRepository {
    async fn upsert(&self, rule: AlertRule) -> Result<AlertRule, RepositoryError> {
        let mut rules = self.rules.write().await;
        let existing = rules.iter_mut().find(|stored| {
            stored.organization_id == rule.organization_id
                && stored.alert_type == rule.alert_type
                && stored.product_id == rule.product_id
        });

        match existing {
            Some(stored) => {
                stored.threshold_value = rule.threshold_value;
                stored.cooldown_hours = rule.cooldown_hours;
                stored.updated_at = rule.updated_at;
                Ok(stored.clone())
            }
            None => {
                rules.push(rule.clone());
                Ok(rule)
            }
        }
    }

    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<AlertRule>, RepositoryError> {
        let rules = self.rules.read().await;
        let mut found: Vec<_> =
            rules.iter().filter(|rule| &rule.organization_id == organization_id).cloned().collect();
        found.sort_by(|left, right| {
            left.alert_type
                .as_str()
                .cmp(right.alert_type.as_str())
                .then_with(|| left.product_id.cmp(&right.product_id))
        });
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<Vec<Alert>>,
}

fn newest_first(left: &Alert, right: &Alert) -> std::cmp::Ordering {
    right.created_at.cmp(&left.created_at).then_with(|| right.id.0.cmp(&left.id.0))
}

fn matches_key(
    alert: &Alert,
    organization_id: &OrganizationId,
    alert_type: AlertType,
    title: &str,
) -> bool {
    &alert.organization_id == organization_id
        && alert.alert_type == alert_type
        && alert.title == title
}

#[async_trait::async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn latest_for_title(
        &self,
        organization_id: &OrganizationId,
        alert_type: AlertType,
        title: &str,
    ) -> Result<Option<Alert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|alert| matches_key(alert, organization_id, alert_type, title))
            .min_by(|left, right| newest_first(left, right))
            .cloned())
    }

    async fn find_open_since(
        &self,
        organization_id: &OrganizationId,
        alert_type: AlertType,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|alert| {
                matches_key(alert, organization_id, alert_type, title)
                    && alert.status.is_open()
                    && alert.created_at >= since
            })
            .min_by(|left, right| newest_first(left, right))
            .cloned())
    }

    async fn insert_if_absent(&self, alert: Alert) -> Result<bool, RepositoryError> {
        let mut alerts = self.alerts.write().await;
        if alerts.iter().any(|stored| stored.dedupe_key == alert.dedupe_key) {
            return Ok(false);
        }
        alerts.push(alert);
        Ok(true)
    }

    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &AlertId,
    ) -> Result<Option<Alert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .find(|alert| &alert.id == id && &alert.organization_id == organization_id)
            .cloned())
    }

    async fn save_transition(
        &self,
        alert: &Alert,
        expected: AlertStatus,
    ) -> Result<(), RepositoryError> {
        let mut alerts = self.alerts.write().await;
        let stored = alerts
            .iter_mut()
            .find(|stored| {
                stored.id == alert.id
                    && stored.organization_id == alert.organization_id
                    && stored.status == expected
            })
            .ok_or_else(|| {
                RepositoryError::Conflict(format!(
                    "alert `{}` is no longer {}",
                    alert.id.0,
                    expected.as_str()
                ))
            })?;

        stored.status = alert.status;
        stored.acknowledged_at = alert.acknowledged_at;
        stored.acknowledged_by = alert.acknowledged_by.clone();
        stored.resolved_at = alert.resolved_at;
        stored.resolved_by = alert.resolved_by.clone();
        Ok(())
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
        query: &AlertQuery,
    ) -> Result<AlertPage, RepositoryError> {
        let alerts = self.alerts.read().await;
        let mut matching: Vec<_> = alerts
            .iter()
            .filter(|alert| {
                &alert.organization_id == organization_id
                    && query.status.map_or(true, |status| alert.status == status)
            })
            .cloned()
            .collect();
        matching.sort_by(newest_first);

        let total = matching.len() as u64;
        let alerts = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(AlertPage { alerts, total })
    }

    async fn summary(
        &self,
        organization_id: &OrganizationId,
        recent_since: DateTime<Utc>,
    ) -> Result<AlertSummary, RepositoryError> {
        let alerts = self.alerts.read().await;
        let mut summary = AlertSummary::default();

        for alert in alerts.iter().filter(|alert| &alert.organization_id == organization_id) {
            if alert.status == AlertStatus::Active {
                summary.active += 1;
                if alert.severity == AlertSeverity::Critical {
                    summary.critical += 1;
                }
                *summary.by_type.entry(alert.alert_type).or_default() += 1;
            }
            if alert.created_at >= recent_since {
                summary.recent += 1;
            }
        }

        Ok(summary)
    }

    async fn recent_active(
        &self,
        organization_id: &OrganizationId,
        limit: u32,
    ) -> Result<Vec<Alert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        let mut active: Vec<_> = alerts
            .iter()
            .filter(|alert| {
                &alert.organization_id == organization_id && alert.status == AlertStatus::Active
            })
            .cloned()
            .collect();
        active.sort_by(newest_first);
        active.truncate(limit as usize);
        Ok(active)
    }
}
