use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use pourwatch_core::domain::alert::Alert;
use pourwatch_core::notify::{NotificationError, SlackSink};

use crate::blocks::alert_message;

/// Posts Block Kit alert messages to an organization's incoming webhook.
#[derive(Clone, Debug)]
pub struct SlackWebhookSink {
    client: Client,
}

impl SlackWebhookSink {
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotificationError::Transport(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SlackSink for SlackWebhookSink {
    async fn post(&self, webhook_url: &str, alert: &Alert) -> Result<(), NotificationError> {
        if !webhook_url.starts_with("https://") && !webhook_url.starts_with("http://") {
            return Err(NotificationError::NotConfigured(
                "slack webhook url must be http(s)".to_string(),
            ));
        }

        let response = self
            .client
            .post(webhook_url)
            .json(&alert_message(alert))
            .send()
            .await
            .map_err(|error| NotificationError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected { status: status.as_u16(), detail });
        }

        debug!(
            event_name = "slack.webhook.posted",
            organization_id = %alert.organization_id,
            alert_id = %alert.id.0,
            "slack alert posted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use pourwatch_core::domain::alert::{
        Alert, AlertId, AlertRuleId, AlertSeverity, AlertStatus, AlertType,
    };
    use pourwatch_core::domain::inventory::InventoryItemId;
    use pourwatch_core::domain::organization::OrganizationId;
    use pourwatch_core::domain::product::ProductId;
    use pourwatch_core::notify::{NotificationError, SlackSink};

    use super::SlackWebhookSink;

    fn alert() -> Alert {
        Alert {
            id: AlertId("alert-9".to_string()),
            organization_id: OrganizationId("org-1".to_string()),
            rule_id: AlertRuleId("rule-9".to_string()),
            inventory_item_id: InventoryItemId("inv-9".to_string()),
            product_id: ProductId("prod-tequila".to_string()),
            alert_type: AlertType::OveruseDetected,
            severity: AlertSeverity::Critical,
            title: "Overuse detected: Tequila".to_string(),
            message: "Tequila usage is 35.0% above theoretical".to_string(),
            trigger_value: 35.0,
            threshold_value: 20.0,
            cost_impact: Decimal::new(6200, 2),
            status: AlertStatus::Active,
            dedupe_key: "key".to_string(),
            created_at: Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
        }
    }

    /// Accepts one request, replies with `status_line`, and returns what it read.
    async fn one_shot_server(
        status_line: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            let mut buffer = [0_u8; 4096];
            loop {
                let read = socket.read(&mut buffer).await.expect("read");
                received.extend_from_slice(&buffer[..read]);
                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let body_len = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            line.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|value| value.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + body_len {
                        break;
                    }
                }
                if read == 0 {
                    break;
                }
            }
            let response =
                format!("{status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok");
            socket.write_all(response.as_bytes()).await.expect("write");
            String::from_utf8_lossy(&received).to_string()
        });
        (format!("http://{address}/services/T000/B000/XXX"), handle)
    }

    #[tokio::test]
    async fn posts_block_kit_payload_to_webhook() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let sink = SlackWebhookSink::new(Duration::from_secs(5)).expect("client");

        sink.post(&url, &alert()).await.expect("post succeeds");

        let request = server.await.expect("server task");
        assert!(request.starts_with("POST /services/T000/B000/XXX"));
        assert!(request.contains("\"text\":\"[CRITICAL] Overuse detected: Tequila ($62.00)\""));
        assert!(request.contains("\"type\":\"header\""));
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (url, server) = one_shot_server("HTTP/1.1 404 Not Found").await;
        let sink = SlackWebhookSink::new(Duration::from_secs(5)).expect("client");

        let error = sink.post(&url, &alert()).await.expect_err("webhook rejects");

        assert!(matches!(error, NotificationError::Rejected { status: 404, .. }));
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn non_http_webhook_is_not_configured() {
        let sink = SlackWebhookSink::new(Duration::from_secs(5)).expect("client");

        let error = sink.post("hooks.slack.com/abc", &alert()).await.expect_err("invalid url");

        assert!(matches!(error, NotificationError::NotConfigured(_)));
    }
}
