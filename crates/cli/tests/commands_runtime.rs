use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use pourwatch_cli::commands::{doctor, evaluate, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("POURWATCH_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("POURWATCH_DATABASE_URL", "postgres://localhost/pourwatch")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("database.url"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let database = TempDatabase::new("seed");
    let url = database.url();
    with_env(&[("POURWATCH_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");
        assert!(first_payload["message"].as_str().unwrap_or_default().contains("`org-demo`"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn evaluate_creates_alerts_once_and_suppresses_repeats() {
    let database = TempDatabase::new("evaluate");
    let url = database.url();
    with_env(&[("POURWATCH_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let first = evaluate::run("org-demo", None);
        assert_eq!(first.exit_code, 0, "expected first evaluation success");
        let first_payload = parse_payload(&first.output);
        let first_message = first_payload["message"].as_str().unwrap_or_default();
        assert!(first_message.contains("4 candidates, 4 created, 0 suppressed"));

        let second = evaluate::run("org-demo", Some(168));
        assert_eq!(second.exit_code, 0, "expected second evaluation success");
        let second_payload = parse_payload(&second.output);
        let second_message = second_payload["message"].as_str().unwrap_or_default();
        assert!(second_message.contains("4 candidates, 0 created, 4 suppressed"));
    });
}

#[test]
fn evaluate_unknown_organization_reports_empty_pass() {
    with_env(&[("POURWATCH_DATABASE_URL", "sqlite::memory:")], || {
        let result = evaluate::run("org-missing", Some(24));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "evaluate");
        assert!(payload["message"]
            .as_str()
            .unwrap_or_default()
            .starts_with("evaluated `org-missing` over trailing 24h: 0 records"));
    });
}

#[test]
fn doctor_json_reports_pass_for_in_memory_database() {
    with_env(&[("POURWATCH_DATABASE_URL", "sqlite::memory:")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn doctor_fails_when_config_is_invalid() {
    with_env(&[("POURWATCH_SCHEDULER_WINDOW_HOURS", "not-a-number")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [skip] database_connectivity"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    fn new(label: &str) -> Self {
        let path =
            env::temp_dir().join(format!("pourwatch-cli-{label}-{}.db", std::process::id()));
        let database = Self { path };
        database.remove_files();
        database
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    fn remove_files(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        self.remove_files();
    }
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "POURWATCH_DATABASE_URL",
        "POURWATCH_DATABASE_MAX_CONNECTIONS",
        "POURWATCH_DATABASE_TIMEOUT_SECS",
        "POURWATCH_SERVER_BIND_ADDRESS",
        "POURWATCH_SERVER_PORT",
        "POURWATCH_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "POURWATCH_SCHEDULER_ENABLED",
        "POURWATCH_SCHEDULER_INTERVAL_SECS",
        "POURWATCH_SCHEDULER_WINDOW_HOURS",
        "POURWATCH_NOTIFICATIONS_SLACK_TIMEOUT_SECS",
        "POURWATCH_NOTIFICATIONS_EMAIL_RELAY_URL",
        "POURWATCH_NOTIFICATIONS_EMAIL_API_KEY",
        "POURWATCH_NOTIFICATIONS_EMAIL_FROM",
        "POURWATCH_NOTIFICATIONS_DASHBOARD_BUFFER",
        "POURWATCH_LOGGING_LEVEL",
        "POURWATCH_LOGGING_FORMAT",
        "POURWATCH_LOG_LEVEL",
        "POURWATCH_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
