use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use pourwatch_core::domain::alert::{Alert, AlertId, AlertRule, AlertStatus, AlertType};
use pourwatch_core::domain::count::CountEvent;
use pourwatch_core::domain::inventory::InventoryItem;
use pourwatch_core::domain::organization::{NotificationChannels, Organization, OrganizationId};
use pourwatch_core::domain::product::{Product, ProductId};
use pourwatch_core::domain::recipe::RecipeDefinition;
use pourwatch_core::domain::sales::SaleEvent;
use pourwatch_core::reconciliation::UsageWindow;

pub mod alert;
pub mod alert_rule;
pub mod count;
pub mod inventory;
pub mod memory;
pub mod organization;
pub mod product;
pub mod recipe;
pub mod sales;

pub use alert::SqlAlertRepository;
pub use alert_rule::SqlAlertRuleRepository;
pub use count::SqlCountEventRepository;
pub use inventory::SqlInventoryItemRepository;
pub use memory::{
    InMemoryAlertRepository, InMemoryAlertRuleRepository, InMemoryCountEventRepository,
    InMemoryInventoryItemRepository, InMemoryOrganizationRepository, InMemoryProductRepository,
    InMemoryRecipeRepository, InMemorySaleEventRepository,
};
pub use organization::SqlOrganizationRepository;
pub use product::SqlProductRepository;
pub use recipe::SqlRecipeRepository;
pub use sales::SqlSaleEventRepository;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflicting write: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn list_ids(&self) -> Result<Vec<OrganizationId>, RepositoryError>;
    async fn find_by_id(&self, id: &OrganizationId)
        -> Result<Option<Organization>, RepositoryError>;
    async fn save(&self, organization: Organization) -> Result<(), RepositoryError>;

    /// Raw alert settings blob; interpretation belongs to `AlertConfig`.
    async fn alert_settings(&self, id: &OrganizationId) -> Result<Option<Value>, RepositoryError>;
    async fn save_alert_settings(
        &self,
        id: &OrganizationId,
        settings: Value,
    ) -> Result<(), RepositoryError>;

    async fn notification_channels(
        &self,
        id: &OrganizationId,
    ) -> Result<NotificationChannels, RepositoryError>;
    async fn save_notification_channels(
        &self,
        id: &OrganizationId,
        channels: NotificationChannels,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InventoryItemRepository: Send + Sync {
    async fn find_for_product(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Option<InventoryItem>, RepositoryError>;
    async fn save(&self, item: InventoryItem) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RecipeDefinition>, RepositoryError>;
    async fn save(&self, recipe: RecipeDefinition) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SaleEventRepository: Send + Sync {
    async fn list_in_window(
        &self,
        organization_id: &OrganizationId,
        window: &UsageWindow,
    ) -> Result<Vec<SaleEvent>, RepositoryError>;
    async fn save(&self, sale: SaleEvent) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CountEventRepository: Send + Sync {
    /// Completed counts whose completion falls inside the window.
    async fn list_completed_in_window(
        &self,
        organization_id: &OrganizationId,
        window: &UsageWindow,
    ) -> Result<Vec<CountEvent>, RepositoryError>;
    async fn save(&self, count: CountEvent) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AlertRuleRepository: Send + Sync {
    /// Inserts the rule or, when one already exists for the same
    /// (organization, type, product), refreshes its threshold, cooldown and
    /// `updated_at`. Returns the stored rule.
    async fn upsert(&self, rule: AlertRule) -> Result<AlertRule, RepositoryError>;
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<AlertRule>, RepositoryError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertQuery {
    /// `None` lists every status.
    pub status: Option<AlertStatus>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlertPage {
    pub alerts: Vec<Alert>,
    pub total: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub active: u64,
    pub critical: u64,
    pub by_type: BTreeMap<AlertType, u64>,
    pub recent: u64,
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Newest alert of any status for the key, used as the dedupe anchor.
    async fn latest_for_title(
        &self,
        organization_id: &OrganizationId,
        alert_type: AlertType,
        title: &str,
    ) -> Result<Option<Alert>, RepositoryError>;

    /// Newest ACTIVE or ACKNOWLEDGED alert for the key created at or after `since`.
    async fn find_open_since(
        &self,
        organization_id: &OrganizationId,
        alert_type: AlertType,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, RepositoryError>;

    /// Returns `false` when another alert already holds the dedupe key.
    async fn insert_if_absent(&self, alert: Alert) -> Result<bool, RepositoryError>;

    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &AlertId,
    ) -> Result<Option<Alert>, RepositoryError>;

    /// Persists status fields, failing with `Conflict` if the stored status is
    /// no longer `expected`.
    async fn save_transition(
        &self,
        alert: &Alert,
        expected: AlertStatus,
    ) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        organization_id: &OrganizationId,
        query: &AlertQuery,
    ) -> Result<AlertPage, RepositoryError>;

    async fn summary(
        &self,
        organization_id: &OrganizationId,
        recent_since: DateTime<Utc>,
    ) -> Result<AlertSummary, RepositoryError>;

    async fn recent_active(
        &self,
        organization_id: &OrganizationId,
        limit: u32,
    ) -> Result<Vec<Alert>, RepositoryError>;
}

/// Every repository the engine and API consume, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub organizations: Arc<dyn OrganizationRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub inventory: Arc<dyn InventoryItemRepository>,
    pub recipes: Arc<dyn RecipeRepository>,
    pub sales: Arc<dyn SaleEventRepository>,
    pub counts: Arc<dyn CountEventRepository>,
    pub rules: Arc<dyn AlertRuleRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

impl Repositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            organizations: Arc::new(SqlOrganizationRepository::new(pool.clone())),
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            inventory: Arc::new(SqlInventoryItemRepository::new(pool.clone())),
            recipes: Arc::new(SqlRecipeRepository::new(pool.clone())),
            sales: Arc::new(SqlSaleEventRepository::new(pool.clone())),
            counts: Arc::new(SqlCountEventRepository::new(pool.clone())),
            rules: Arc::new(SqlAlertRuleRepository::new(pool.clone())),
            alerts: Arc::new(SqlAlertRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            organizations: Arc::new(InMemoryOrganizationRepository::default()),
            products: Arc::new(InMemoryProductRepository::default()),
            inventory: Arc::new(InMemoryInventoryItemRepository::default()),
            recipes: Arc::new(InMemoryRecipeRepository::default()),
            sales: Arc::new(InMemorySaleEventRepository::default()),
            counts: Arc::new(InMemoryCountEventRepository::default()),
            rules: Arc::new(InMemoryAlertRuleRepository::default()),
            alerts: Arc::new(InMemoryAlertRepository::default()),
        }
    }
}

/// Fixed-width UTC text so stored timestamps order lexically.
pub(crate) fn timestamp_text(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value.trim())
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
