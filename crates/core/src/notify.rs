//! Contracts for the channels alerts are delivered through.
//!
//! Each sink owns its transport, timeout and formatting. The dispatcher only
//! decides *whether* a channel is attempted and records how it went.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::alert::{Alert, AlertId, AlertSeverity, AlertType};
use crate::domain::organization::OrganizationId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected by remote: status {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("notification rendering failed: {0}")]
    Render(String),
    #[error("notification channel is not configured: {0}")]
    NotConfigured(String),
}

/// Display-ready projection of an alert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    pub id: AlertId,
    pub organization_id: OrganizationId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Alert> for AlertNotification {
    fn from(alert: &Alert) -> Self {
        Self {
            id: alert.id.clone(),
            organization_id: alert.organization_id.clone(),
            alert_type: alert.alert_type,
            severity: alert.severity,
            title: alert.title.clone(),
            message: alert.message.clone(),
            created_at: alert.created_at,
        }
    }
}

#[async_trait]
pub trait DashboardSink: Send + Sync {
    async fn publish(&self, alert: &Alert) -> Result<(), NotificationError>;
}

#[async_trait]
pub trait EmailSink: Send + Sync {
    async fn send(&self, recipients: &[String], alert: &Alert) -> Result<(), NotificationError>;
}

#[async_trait]
pub trait SlackSink: Send + Sync {
    async fn post(&self, webhook_url: &str, alert: &Alert) -> Result<(), NotificationError>;
}
