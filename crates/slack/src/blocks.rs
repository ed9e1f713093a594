use serde::Serialize;

use pourwatch_core::domain::alert::{Alert, AlertSeverity};
use pourwatch_core::evaluation::format_money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        block_id: String,
        text: TextObject,
    },
    Section {
        block_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Divider {
        block_id: String,
    },
}

/// Incoming-webhook payload: `text` is the notification fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(rename = "text")]
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, fields) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, fields });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    fields: Vec<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    /// Two-column label/value pair.
    pub fn field(&mut self, label: &str, value: impl AsRef<str>) -> &mut Self {
        self.fields.push(TextObject::mrkdwn(format!("*{label}*\n{}", value.as_ref())));
        self
    }

    fn build(self) -> (Option<TextObject>, Vec<TextObject>) {
        let text = match (&self.text, self.fields.is_empty()) {
            (None, true) => Some(TextObject::plain("")),
            _ => self.text,
        };
        (text, self.fields)
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

fn severity_emoji(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => ":rotating_light:",
        AlertSeverity::High => ":warning:",
        AlertSeverity::Medium => ":large_orange_diamond:",
        AlertSeverity::Low => ":information_source:",
    }
}

pub fn alert_message(alert: &Alert) -> MessageTemplate {
    let severity = alert.severity.as_str();
    let cost_impact = format_money(alert.cost_impact);

    MessageBuilder::new(format!("[{severity}] {} ({cost_impact})", alert.title))
        .header("alert.header.v1", format!("{} {}", severity_emoji(alert.severity), alert.title))
        .section("alert.message.v1", |section| {
            section.mrkdwn(alert.message.clone());
        })
        .section("alert.details.v1", |section| {
            section
                .field("Severity", severity)
                .field("Type", alert.alert_type.label())
                .field("Product", format!("`{}`", alert.product_id))
                .field("Cost impact", &cost_impact)
                .field(
                    "Observed",
                    format!(
                        "{:.1}% (threshold {:.1}%)",
                        alert.trigger_value, alert.threshold_value
                    ),
                );
        })
        .divider("alert.divider.v1")
        .context("alert.context.v1", |context| {
            context.mrkdwn(format!(
                "Alert `{}` raised {}",
                alert.id.0,
                alert.created_at.format("%Y-%m-%d %H:%M UTC")
            ));
        })
        .build()
}
