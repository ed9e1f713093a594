pub mod config;
pub mod domain;
pub mod errors;
pub mod evaluation;
pub mod notify;
pub mod reconciliation;

pub use domain::alert::{
    Alert, AlertId, AlertRule, AlertRuleId, AlertSeverity, AlertStatus, AlertType, ThresholdType,
};
pub use domain::alert_config::{AlertConfig, AlertConfigPatch};
pub use domain::count::{CountEvent, CountLineEvent, CountStatus};
pub use domain::inventory::{InventoryItem, InventoryItemId};
pub use domain::organization::{NotificationChannels, Organization, OrganizationId};
pub use domain::product::{Product, ProductId};
pub use domain::recipe::{RecipeDefinition, RecipeId, RecipeIngredient};
pub use domain::sales::{SaleEvent, SaleItem, SaleLineEvent};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use evaluation::{evaluate, AlertCandidate};
pub use notify::{AlertNotification, DashboardSink, EmailSink, NotificationError, SlackSink};
pub use reconciliation::{reconcile, ProductUsageRecord, ReconciliationInput, UsageWindow};
