//! Slack delivery for variance alerts.
//!
//! - **Block Kit** (`blocks`) - typed message builders and the alert card
//! - **Webhook** (`webhook`) - incoming-webhook sink used for CRITICAL alerts

pub mod blocks;
pub mod webhook;

pub use webhook::SlackWebhookSink;
