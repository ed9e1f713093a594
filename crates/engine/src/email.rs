use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use pourwatch_core::config::NotificationConfig;
use pourwatch_core::domain::alert::Alert;
use pourwatch_core::evaluation::format_money;
use pourwatch_core::notify::{EmailSink, NotificationError};

const SUBJECT_TEMPLATE_NAME: &str = "alert_subject.txt";
const BODY_TEMPLATE_NAME: &str = "alert_body.txt";
const EMAIL_TIMEOUT_SECS: u64 = 15;

const SUBJECT_TEMPLATE: &str = "[{{ severity }}] {{ title }}";

const BODY_TEMPLATE: &str = r#"{{ title }}

{{ message }}

Severity:     {{ severity }}
Type:         {{ type_label }}
Observed:     {{ trigger_value }}% (threshold {{ threshold_value }}%)
Cost impact:  {{ cost_impact }}
Raised at:    {{ created_at }}

Review and acknowledge this alert from the Pourwatch dashboard.
Alert reference: {{ alert_id }}
"#;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Posts messages as JSON to a transactional email relay.
pub struct HttpRelayTransport {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl HttpRelayTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotificationError::Transport(error.to_string()))?;
        Ok(Self { client, endpoint: endpoint.into(), api_key })
    }
}

#[async_trait]
impl EmailTransport for HttpRelayTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(message)
            .send()
            .await
            .map_err(|error| NotificationError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected { status: status.as_u16(), detail });
        }
        Ok(())
    }
}

/// Writes the message to the log instead of sending it.
#[derive(Clone, Debug, Default)]
pub struct LogOnlyTransport;

#[async_trait]
impl EmailTransport for LogOnlyTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        info!(
            event_name = "engine.email.logged",
            recipients = message.to.len(),
            subject = %message.subject,
            "email relay not configured; message logged only"
        );
        Ok(())
    }
}

/// Renders alert emails with tera and hands them to a transport.
pub struct TemplatedEmailSink {
    templates: Arc<Tera>,
    from: String,
    transport: Arc<dyn EmailTransport>,
}

impl TemplatedEmailSink {
    pub fn new(
        from: impl Into<String>,
        transport: Arc<dyn EmailTransport>,
    ) -> Result<Self, NotificationError> {
        let mut tera = Tera::default();
        tera.add_raw_template(SUBJECT_TEMPLATE_NAME, SUBJECT_TEMPLATE)
            .map_err(|error| NotificationError::Render(error.to_string()))?;
        tera.add_raw_template(BODY_TEMPLATE_NAME, BODY_TEMPLATE)
            .map_err(|error| NotificationError::Render(error.to_string()))?;

        Ok(Self { templates: Arc::new(tera), from: from.into(), transport })
    }

    /// Relay transport when one is configured, otherwise log-only.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let transport: Arc<dyn EmailTransport> =
            match (&config.email_relay_url, &config.email_api_key) {
                (Some(url), Some(api_key)) => Arc::new(HttpRelayTransport::new(
                    url.clone(),
                    api_key.clone(),
                    Duration::from_secs(EMAIL_TIMEOUT_SECS),
                )?),
                _ => Arc::new(LogOnlyTransport),
            };
        Self::new(config.email_from.clone(), transport)
    }

    pub fn render(
        &self,
        recipients: &[String],
        alert: &Alert,
    ) -> Result<EmailMessage, NotificationError> {
        let mut context = Context::new();
        context.insert("alert_id", &alert.id.0);
        context.insert("title", &alert.title);
        context.insert("message", &alert.message);
        context.insert("severity", alert.severity.as_str());
        context.insert("type_label", alert.alert_type.label());
        context.insert("trigger_value", &format!("{:.1}", alert.trigger_value));
        context.insert("threshold_value", &format!("{:.1}", alert.threshold_value));
        context.insert("cost_impact", &format_money(alert.cost_impact));
        context.insert("created_at", &alert.created_at.format("%Y-%m-%d %H:%M UTC").to_string());

        let subject = self
            .templates
            .render(SUBJECT_TEMPLATE_NAME, &context)
            .map_err(|error| NotificationError::Render(error.to_string()))?;
        let text = self
            .templates
            .render(BODY_TEMPLATE_NAME, &context)
            .map_err(|error| NotificationError::Render(error.to_string()))?;

        Ok(EmailMessage {
            from: self.from.clone(),
            to: recipients.to_vec(),
            subject: subject.trim().to_string(),
            text,
        })
    }
}

#[async_trait]
impl EmailSink for TemplatedEmailSink {
    async fn send(&self, recipients: &[String], alert: &Alert) -> Result<(), NotificationError> {
        if recipients.is_empty() {
            return Err(NotificationError::NotConfigured("no alert email recipients".to_string()));
        }
        let message = self.render(recipients, alert)?;
        self.transport.deliver(&message).await
    }
}
