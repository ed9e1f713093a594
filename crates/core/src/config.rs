use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub window_hours: u32,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub slack_timeout_secs: u64,
    pub email_relay_url: Option<String>,
    pub email_api_key: Option<SecretString>,
    pub email_from: String,
    pub dashboard_buffer: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub scheduler_enabled: Option<bool>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://pourwatch.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            scheduler: SchedulerConfig { enabled: true, interval_secs: 3600, window_hours: 168 },
            notifications: NotificationConfig {
                slack_timeout_secs: 10,
                email_relay_url: None,
                email_api_key: None,
                email_from: "alerts@pourwatch.local".to_string(),
                dashboard_buffer: 256,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pourwatch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Redacted view for operator output.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "database": {
                "url": self.database.url,
                "max_connections": self.database.max_connections,
                "timeout_secs": self.database.timeout_secs,
            },
            "server": {
                "bind_address": self.server.bind_address,
                "port": self.server.port,
                "graceful_shutdown_secs": self.server.graceful_shutdown_secs,
            },
            "scheduler": {
                "enabled": self.scheduler.enabled,
                "interval_secs": self.scheduler.interval_secs,
                "window_hours": self.scheduler.window_hours,
            },
            "notifications": {
                "slack_timeout_secs": self.notifications.slack_timeout_secs,
                "email_relay_url": self.notifications.email_relay_url,
                "email_api_key": self.notifications.email_api_key.as_ref().map(|_| "<redacted>"),
                "email_from": self.notifications.email_from,
                "dashboard_buffer": self.notifications.dashboard_buffer,
            },
            "logging": {
                "level": self.logging.level,
                "format": self.logging.format,
            },
        })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(scheduler) = patch.scheduler {
            if let Some(enabled) = scheduler.enabled {
                self.scheduler.enabled = enabled;
            }
            if let Some(interval_secs) = scheduler.interval_secs {
                self.scheduler.interval_secs = interval_secs;
            }
            if let Some(window_hours) = scheduler.window_hours {
                self.scheduler.window_hours = window_hours;
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(slack_timeout_secs) = notifications.slack_timeout_secs {
                self.notifications.slack_timeout_secs = slack_timeout_secs;
            }
            if let Some(email_relay_url) = notifications.email_relay_url {
                self.notifications.email_relay_url = Some(email_relay_url);
            }
            if let Some(email_api_key_value) = notifications.email_api_key {
                self.notifications.email_api_key = Some(secret_value(email_api_key_value));
            }
            if let Some(email_from) = notifications.email_from {
                self.notifications.email_from = email_from;
            }
            if let Some(dashboard_buffer) = notifications.dashboard_buffer {
                self.notifications.dashboard_buffer = dashboard_buffer;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("POURWATCH_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("POURWATCH_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("POURWATCH_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("POURWATCH_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("POURWATCH_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("POURWATCH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("POURWATCH_SERVER_PORT") {
            self.server.port = parse_u16("POURWATCH_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("POURWATCH_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("POURWATCH_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("POURWATCH_SCHEDULER_ENABLED") {
            self.scheduler.enabled = parse_bool("POURWATCH_SCHEDULER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("POURWATCH_SCHEDULER_INTERVAL_SECS") {
            self.scheduler.interval_secs = parse_u64("POURWATCH_SCHEDULER_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("POURWATCH_SCHEDULER_WINDOW_HOURS") {
            self.scheduler.window_hours = parse_u32("POURWATCH_SCHEDULER_WINDOW_HOURS", &value)?;
        }

        if let Some(value) = read_env("POURWATCH_NOTIFICATIONS_SLACK_TIMEOUT_SECS") {
            self.notifications.slack_timeout_secs =
                parse_u64("POURWATCH_NOTIFICATIONS_SLACK_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("POURWATCH_NOTIFICATIONS_EMAIL_RELAY_URL") {
            self.notifications.email_relay_url = Some(value);
        }
        if let Some(value) = read_env("POURWATCH_NOTIFICATIONS_EMAIL_API_KEY") {
            self.notifications.email_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("POURWATCH_NOTIFICATIONS_EMAIL_FROM") {
            self.notifications.email_from = value;
        }
        if let Some(value) = read_env("POURWATCH_NOTIFICATIONS_DASHBOARD_BUFFER") {
            self.notifications.dashboard_buffer =
                parse_usize("POURWATCH_NOTIFICATIONS_DASHBOARD_BUFFER", &value)?;
        }

        let log_level =
            read_env("POURWATCH_LOGGING_LEVEL").or_else(|| read_env("POURWATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("POURWATCH_LOGGING_FORMAT").or_else(|| read_env("POURWATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.scheduler_enabled {
            self.scheduler.enabled = enabled;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_scheduler(&self.scheduler)?;
        validate_notifications(&self.notifications)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pourwatch.toml"), PathBuf::from("config/pourwatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_scheduler(scheduler: &SchedulerConfig) -> Result<(), ConfigError> {
    if scheduler.interval_secs < 60 {
        return Err(ConfigError::Validation(
            "scheduler.interval_secs must be at least 60".to_string(),
        ));
    }

    if scheduler.window_hours == 0 || scheduler.window_hours > 24 * 90 {
        return Err(ConfigError::Validation(
            "scheduler.window_hours must be in range 1..=2160".to_string(),
        ));
    }

    Ok(())
}

fn validate_notifications(notifications: &NotificationConfig) -> Result<(), ConfigError> {
    if notifications.slack_timeout_secs == 0 || notifications.slack_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "notifications.slack_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if notifications.dashboard_buffer == 0 {
        return Err(ConfigError::Validation(
            "notifications.dashboard_buffer must be greater than zero".to_string(),
        ));
    }

    if !notifications.email_from.contains('@') {
        return Err(ConfigError::Validation(
            "notifications.email_from must be an email address".to_string(),
        ));
    }

    if let Some(relay_url) = &notifications.email_relay_url {
        if !relay_url.starts_with("http://") && !relay_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "notifications.email_relay_url must start with http:// or https://".to_string(),
            ));
        }

        let missing_key = notifications
            .email_api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing_key {
            return Err(ConfigError::Validation(
                "notifications.email_api_key is required when email_relay_url is set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    scheduler: Option<SchedulerPatch>,
    notifications: Option<NotificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    enabled: Option<bool>,
    interval_secs: Option<u64>,
    window_hours: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationPatch {
    slack_timeout_secs: Option<u64>,
    email_relay_url: Option<String>,
    email_api_key: Option<String>,
    email_from: Option<String>,
    dashboard_buffer: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
