mod alerts_api;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use pourwatch_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

use crate::alerts_api::AlertsState;

fn init_logging(config: &AppConfig) {
    use pourwatch_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits its first event.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if app.config.scheduler.enabled {
        Some(tokio::spawn(app.scheduler().run(shutdown_rx)))
    } else {
        tracing::info!(
            event_name = "system.server.scheduler_disabled",
            correlation_id = "bootstrap",
            "periodic evaluation disabled; use POST /api/v1/alerts/evaluate"
        );
        None
    };

    let router = Router::new()
        .merge(health::router(app.db_pool.clone(), app.config.scheduler.enabled))
        .nest(
            "/api/v1/alerts",
            alerts_api::router(AlertsState::new(
                app.repositories.clone(),
                app.pipeline.clone(),
                app.config.scheduler.window_hours,
            )),
        );

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "pourwatch-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(shutdown_tx)).await?;

    if let Some(handle) = scheduler {
        let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!(
                event_name = "system.server.scheduler_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "scheduler did not stop within the grace period"
            );
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "pourwatch-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown(shutdown: watch::Sender<bool>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for ctrl-c; shutting down"
        );
    }
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "pourwatch-server stopping"
    );
    let _ = shutdown.send(true);
}
