use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use pourwatch_core::domain::alert::{Alert, AlertId, AlertRule};
use pourwatch_core::domain::organization::NotificationChannels;
use pourwatch_core::notify::{DashboardSink, EmailSink, NotificationError, SlackSink};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    Skipped,
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub alert_id: AlertId,
    pub dashboard: ChannelOutcome,
    pub email: ChannelOutcome,
    pub slack: ChannelOutcome,
}

impl DispatchReport {
    pub fn failures(&self) -> usize {
        [&self.dashboard, &self.email, &self.slack]
            .into_iter()
            .filter(|outcome| outcome.is_failure())
            .count()
    }
}

/// Fans a freshly created alert out to the channels it qualifies for.
///
/// Channels run concurrently and fail independently; a failed channel is
/// never retried and never affects the stored alert.
#[derive(Clone)]
pub struct NotificationDispatcher {
    dashboard: Arc<dyn DashboardSink>,
    email: Arc<dyn EmailSink>,
    slack: Arc<dyn SlackSink>,
}

impl NotificationDispatcher {
    pub fn new(
        dashboard: Arc<dyn DashboardSink>,
        email: Arc<dyn EmailSink>,
        slack: Arc<dyn SlackSink>,
    ) -> Self {
        Self { dashboard, email, slack }
    }

    pub async fn dispatch(
        &self,
        alert: &Alert,
        rule: &AlertRule,
        channels: &NotificationChannels,
    ) -> DispatchReport {
        let dashboard = async {
            if !rule.notify_dashboard {
                return ChannelOutcome::Skipped;
            }
            record("dashboard", alert, self.dashboard.publish(alert).await)
        };

        let email = async {
            if !(alert.severity.warrants_email()
                && rule.notify_email
                && channels.has_email_recipients())
            {
                return ChannelOutcome::Skipped;
            }
            record("email", alert, self.email.send(&channels.alert_email_recipients, alert).await)
        };

        let slack = async {
            match channels.slack_webhook() {
                Some(webhook_url) if alert.severity.warrants_slack() => {
                    record("slack", alert, self.slack.post(webhook_url, alert).await)
                }
                _ => ChannelOutcome::Skipped,
            }
        };

        let (dashboard, email, slack) = tokio::join!(dashboard, email, slack);
        DispatchReport { alert_id: alert.id.clone(), dashboard, email, slack }
    }
}

fn record(
    channel: &'static str,
    alert: &Alert,
    result: Result<(), NotificationError>,
) -> ChannelOutcome {
    match result {
        Ok(()) => ChannelOutcome::Delivered,
        Err(error) => {
            warn!(
                event_name = "engine.notify.channel_failed",
                channel,
                organization_id = %alert.organization_id,
                alert_id = %alert.id.0,
                error = %error,
                "notification channel failed"
            );
            ChannelOutcome::Failed(error.to_string())
        }
    }
}
