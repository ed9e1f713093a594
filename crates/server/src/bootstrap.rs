use std::sync::Arc;
use std::time::Duration;

use pourwatch_core::config::{AppConfig, ConfigError, LoadOptions};
use pourwatch_core::notify::NotificationError;
use pourwatch_db::{connect_with_config, migrations, DbPool, Repositories};
use pourwatch_engine::{
    BroadcastDashboardSink, EvaluationPipeline, EvaluationScheduler, NotificationDispatcher,
    TemplatedEmailSink,
};
use pourwatch_slack::SlackWebhookSink;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub repositories: Repositories,
    pub pipeline: EvaluationPipeline,
    pub dashboard: BroadcastDashboardSink,
}

impl Application {
    pub fn scheduler(&self) -> EvaluationScheduler {
        EvaluationScheduler::new(
            self.pipeline.clone(),
            self.repositories.organizations.clone(),
            &self.config.scheduler,
        )
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notification channel setup failed: {0}")]
    Notifications(#[from] NotificationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let repositories = Repositories::sql(db_pool.clone());
    let dashboard = BroadcastDashboardSink::new(config.notifications.dashboard_buffer);
    let email = TemplatedEmailSink::from_config(&config.notifications)?;
    let slack =
        SlackWebhookSink::new(Duration::from_secs(config.notifications.slack_timeout_secs))?;
    info!(
        event_name = "system.bootstrap.notifications_ready",
        correlation_id = "bootstrap",
        email_transport =
            if config.notifications.email_relay_url.is_some() { "relay" } else { "log_only" },
        "notification sinks initialized"
    );

    let dispatcher =
        NotificationDispatcher::new(Arc::new(dashboard.clone()), Arc::new(email), Arc::new(slack));
    let pipeline = EvaluationPipeline::new(repositories.clone(), dispatcher);

    Ok(Application { config, db_pool, repositories, pipeline, dashboard })
}
