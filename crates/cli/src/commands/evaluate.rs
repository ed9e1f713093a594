use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pourwatch_core::config::AppConfig;
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::reconciliation::UsageWindow;
use pourwatch_db::Repositories;
use pourwatch_engine::{
    BroadcastDashboardSink, EvaluationPipeline, EvaluationSummary, NotificationDispatcher,
    TemplatedEmailSink,
};
use pourwatch_slack::SlackWebhookSink;

use crate::commands::{open_database, prepare, CommandResult, StepFailure};

pub fn run(organization: &str, window_hours: Option<u32>) -> CommandResult {
    let organization = organization.trim();
    if organization.is_empty() {
        return CommandResult::failure(
            "evaluate",
            "invalid_argument",
            "--organization must not be empty",
            2,
        );
    }
    if window_hours == Some(0) {
        return CommandResult::failure(
            "evaluate",
            "invalid_argument",
            "--window-hours must be greater than zero",
            2,
        );
    }

    let (config, runtime) = match prepare("evaluate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };
    let hours = window_hours.unwrap_or(config.scheduler.window_hours);
    let organization_id = OrganizationId(organization.to_string());

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let pipeline = build_pipeline(&config, Repositories::sql(pool.clone()))?;
        let now = Utc::now();
        let summary = pipeline
            .run(&organization_id, UsageWindow::trailing(now, hours), now)
            .await
            .map_err(|error| ("evaluation", error.to_string(), 6u8));
        pool.close().await;
        summary
    });

    match result {
        Ok(summary) => CommandResult::success("evaluate", describe(organization, hours, &summary)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("evaluate", error_class, message, exit_code)
        }
    }
}

fn build_pipeline(
    config: &AppConfig,
    repositories: Repositories,
) -> Result<EvaluationPipeline, StepFailure> {
    let notification_failure = |error: pourwatch_core::NotificationError| {
        ("notification_setup", error.to_string(), 5u8)
    };
    let email =
        TemplatedEmailSink::from_config(&config.notifications).map_err(notification_failure)?;
    let slack = SlackWebhookSink::new(Duration::from_secs(config.notifications.slack_timeout_secs))
        .map_err(notification_failure)?;
    let dashboard = BroadcastDashboardSink::new(config.notifications.dashboard_buffer);

    let dispatcher =
        NotificationDispatcher::new(Arc::new(dashboard), Arc::new(email), Arc::new(slack));
    Ok(EvaluationPipeline::new(repositories, dispatcher))
}

fn describe(organization: &str, hours: u32, summary: &EvaluationSummary) -> String {
    format!(
        "evaluated `{organization}` over trailing {hours}h: {} records, {} candidates, {} created, {} suppressed, {} dropped, {} notification failures",
        summary.records_analyzed,
        summary.alerts_evaluated,
        summary.alerts_created,
        summary.alerts_suppressed,
        summary.alerts_dropped,
        summary.notifications_failed
    )
}
