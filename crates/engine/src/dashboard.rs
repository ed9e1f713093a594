use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use pourwatch_core::domain::alert::Alert;
use pourwatch_core::notify::{AlertNotification, DashboardSink, NotificationError};

/// In-process feed of new alerts for live dashboard connections.
#[derive(Clone, Debug)]
pub struct BroadcastDashboardSink {
    sender: broadcast::Sender<AlertNotification>,
}

impl BroadcastDashboardSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertNotification> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl DashboardSink for BroadcastDashboardSink {
    async fn publish(&self, alert: &Alert) -> Result<(), NotificationError> {
        // Nobody watching is not a delivery failure.
        let receivers = self.sender.send(AlertNotification::from(alert)).unwrap_or(0);
        debug!(
            event_name = "engine.dashboard.published",
            organization_id = %alert.organization_id,
            alert_id = %alert.id.0,
            receivers,
            "dashboard notification published"
        );
        Ok(())
    }
}
