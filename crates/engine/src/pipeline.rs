use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use pourwatch_core::domain::alert_config::AlertConfig;
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::errors::ApplicationError;
use pourwatch_core::evaluation::evaluate;
use pourwatch_core::reconciliation::{reconcile, ReconciliationInput, UsageWindow};
use pourwatch_db::{Repositories, RepositoryError};

use crate::dispatcher::NotificationDispatcher;
use crate::lifecycle::{AlertLifecycleManager, CandidateOutcome, LifecycleError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl From<PipelineError> for ApplicationError {
    fn from(value: PipelineError) -> Self {
        match value {
            PipelineError::Repository(error) => ApplicationError::Persistence(error.to_string()),
            PipelineError::Lifecycle(error) => error.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub records_analyzed: usize,
    pub alerts_evaluated: usize,
    pub alerts_created: usize,
    pub alerts_suppressed: usize,
    pub alerts_dropped: usize,
    pub notifications_failed: usize,
}

/// One evaluation pass: reconcile, evaluate, persist, notify.
#[derive(Clone)]
pub struct EvaluationPipeline {
    repositories: Repositories,
    lifecycle: AlertLifecycleManager,
    dispatcher: NotificationDispatcher,
}

impl EvaluationPipeline {
    pub fn new(repositories: Repositories, dispatcher: NotificationDispatcher) -> Self {
        let lifecycle = AlertLifecycleManager::from_repositories(&repositories);
        Self { repositories, lifecycle, dispatcher }
    }

    pub fn lifecycle(&self) -> &AlertLifecycleManager {
        &self.lifecycle
    }

    pub async fn run(
        &self,
        organization_id: &OrganizationId,
        window: UsageWindow,
        now: DateTime<Utc>,
    ) -> Result<EvaluationSummary, PipelineError> {
        let repositories = &self.repositories;
        let sales = repositories.sales.list_in_window(organization_id, &window).await?;
        let counts = repositories.counts.list_completed_in_window(organization_id, &window).await?;
        let recipes = repositories.recipes.list_for_organization(organization_id).await?;
        let products = repositories.products.list_for_organization(organization_id).await?;
        let settings = repositories.organizations.alert_settings(organization_id).await?;
        let channels = repositories.organizations.notification_channels(organization_id).await?;

        let config = AlertConfig::from_settings(settings.as_ref());
        let records = reconcile(ReconciliationInput {
            window,
            sales: &sales,
            counts: &counts,
            recipes: &recipes,
            products: &products,
        });
        let candidates = evaluate(&records, &config);

        let mut summary = EvaluationSummary {
            records_analyzed: records.len(),
            alerts_evaluated: candidates.len(),
            ..EvaluationSummary::default()
        };

        for candidate in &candidates {
            let outcome =
                self.lifecycle.apply(organization_id, candidate, config.cooldown_hours, now).await?;
            match outcome {
                CandidateOutcome::Created { alert, rule } => {
                    summary.alerts_created += 1;
                    let report = self.dispatcher.dispatch(&alert, &rule, &channels).await;
                    summary.notifications_failed += report.failures();
                }
                CandidateOutcome::Suppressed => summary.alerts_suppressed += 1,
                CandidateOutcome::Dropped => summary.alerts_dropped += 1,
            }
        }

        info!(
            event_name = "engine.pipeline.completed",
            organization_id = %organization_id,
            window_start = %window.start,
            window_end = %window.end,
            records = summary.records_analyzed,
            evaluated = summary.alerts_evaluated,
            created = summary.alerts_created,
            suppressed = summary.alerts_suppressed,
            dropped = summary.alerts_dropped,
            notifications_failed = summary.notifications_failed,
            "evaluation pass completed"
        );
        Ok(summary)
    }
}
