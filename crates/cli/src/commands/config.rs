use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pourwatch_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One rendered setting: dotted key, display value, overriding env var.
struct Field {
    key: &'static str,
    value: String,
    env_key: &'static str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let notifications = &config.notifications;

    vec![
        field("database.url", config.database.url.clone(), "POURWATCH_DATABASE_URL"),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            "POURWATCH_DATABASE_MAX_CONNECTIONS",
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "POURWATCH_DATABASE_TIMEOUT_SECS",
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            "POURWATCH_SERVER_BIND_ADDRESS",
        ),
        field("server.port", config.server.port.to_string(), "POURWATCH_SERVER_PORT"),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "POURWATCH_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        field(
            "scheduler.enabled",
            config.scheduler.enabled.to_string(),
            "POURWATCH_SCHEDULER_ENABLED",
        ),
        field(
            "scheduler.interval_secs",
            config.scheduler.interval_secs.to_string(),
            "POURWATCH_SCHEDULER_INTERVAL_SECS",
        ),
        field(
            "scheduler.window_hours",
            config.scheduler.window_hours.to_string(),
            "POURWATCH_SCHEDULER_WINDOW_HOURS",
        ),
        field(
            "notifications.slack_timeout_secs",
            notifications.slack_timeout_secs.to_string(),
            "POURWATCH_NOTIFICATIONS_SLACK_TIMEOUT_SECS",
        ),
        field(
            "notifications.email_relay_url",
            notifications.email_relay_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "POURWATCH_NOTIFICATIONS_EMAIL_RELAY_URL",
        ),
        field(
            "notifications.email_api_key",
            redact_secret(notifications.email_api_key.is_some()).to_string(),
            "POURWATCH_NOTIFICATIONS_EMAIL_API_KEY",
        ),
        field(
            "notifications.email_from",
            notifications.email_from.clone(),
            "POURWATCH_NOTIFICATIONS_EMAIL_FROM",
        ),
        field(
            "notifications.dashboard_buffer",
            notifications.dashboard_buffer.to_string(),
            "POURWATCH_NOTIFICATIONS_DASHBOARD_BUFFER",
        ),
        field("logging.level", config.logging.level.clone(), "POURWATCH_LOGGING_LEVEL"),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            "POURWATCH_LOGGING_FORMAT",
        ),
    ]
}

fn field(key: &'static str, value: String, env_key: &'static str) -> Field {
    Field { key, value, env_key }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pourwatch.toml"), PathBuf::from("config/pourwatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_secret(present: bool) -> &'static str {
    if present {
        "<redacted>"
    } else {
        "<unset>"
    }
}
