use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use pourwatch_core::config::SchedulerConfig;
use pourwatch_core::reconciliation::UsageWindow;
use pourwatch_db::repositories::OrganizationRepository;

use crate::pipeline::{EvaluationPipeline, PipelineError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerReport {
    pub organizations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub alerts_created: usize,
}

/// Runs the evaluation pipeline for every organization on a fixed cadence.
pub struct EvaluationScheduler {
    pipeline: EvaluationPipeline,
    organizations: Arc<dyn OrganizationRepository>,
    interval: Duration,
    window_hours: u32,
}

impl EvaluationScheduler {
    pub fn new(
        pipeline: EvaluationPipeline,
        organizations: Arc<dyn OrganizationRepository>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            pipeline,
            organizations,
            interval: Duration::from_secs(config.interval_secs),
            window_hours: config.window_hours,
        }
    }

    /// One sweep over all organizations. A failing organization is logged
    /// and counted; the sweep carries on.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SchedulerReport, PipelineError> {
        let organization_ids = self.organizations.list_ids().await?;
        let window = UsageWindow::trailing(now, self.window_hours);
        let mut report =
            SchedulerReport { organizations: organization_ids.len(), ..SchedulerReport::default() };

        for organization_id in &organization_ids {
            match self.pipeline.run(organization_id, window, now).await {
                Ok(summary) => {
                    report.succeeded += 1;
                    report.alerts_created += summary.alerts_created;
                }
                Err(pass_error) => {
                    report.failed += 1;
                    error!(
                        event_name = "engine.scheduler.organization_failed",
                        organization_id = %organization_id,
                        error = %pass_error,
                        "scheduled evaluation failed for organization"
                    );
                }
            }
        }

        info!(
            event_name = "engine.scheduler.sweep_completed",
            organizations = report.organizations,
            succeeded = report.succeeded,
            failed = report.failed,
            alerts_created = report.alerts_created,
            "scheduled evaluation sweep completed"
        );
        Ok(report)
    }

    /// Sweeps immediately, then every interval, until `shutdown` flips to
    /// `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            event_name = "engine.scheduler.started",
            interval_secs = self.interval.as_secs(),
            window_hours = self.window_hours,
            "evaluation scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(sweep_error) = self.run_once(Utc::now()).await {
                        error!(
                            event_name = "engine.scheduler.sweep_failed",
                            error = %sweep_error,
                            "scheduled evaluation sweep failed"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(event_name = "engine.scheduler.stopped", "evaluation scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::watch;

    use pourwatch_core::config::AppConfig;
    use pourwatch_core::domain::organization::{Organization, OrganizationId};
    use pourwatch_core::domain::sales::SaleEvent;
    use pourwatch_core::reconciliation::UsageWindow;
    use pourwatch_db::repositories::SaleEventRepository;
    use pourwatch_db::{DemoSeedDataset, Repositories, RepositoryError};

    use super::EvaluationScheduler;
    use crate::pipeline::tests::{pipeline, seed_time};

    /// Sales store that is down for one organization.
    struct PartiallyDownSales {
        inner: Arc<dyn SaleEventRepository>,
        broken: OrganizationId,
    }

    #[async_trait]
    impl SaleEventRepository for PartiallyDownSales {
        async fn list_in_window(
            &self,
            organization_id: &OrganizationId,
            window: &UsageWindow,
        ) -> Result<Vec<SaleEvent>, RepositoryError> {
            if *organization_id == self.broken {
                return Err(RepositoryError::Decode("sale_event.items: truncated".to_string()));
            }
            self.inner.list_in_window(organization_id, window).await
        }

        async fn save(&self, sale: SaleEvent) -> Result<(), RepositoryError> {
            self.inner.save(sale).await
        }
    }

    #[tokio::test]
    async fn sweep_continues_past_a_failing_organization() {
        let mut repositories = Repositories::in_memory();
        DemoSeedDataset::load(&repositories, seed_time()).await.expect("seed");
        let broken = OrganizationId("org-broken".to_string());
        repositories
            .organizations
            .save(Organization { id: broken.clone(), name: "Broken Bar".to_string() })
            .await
            .expect("organization");
        repositories.sales =
            Arc::new(PartiallyDownSales { inner: repositories.sales.clone(), broken });

        let (pipeline, _dashboard) = pipeline(repositories.clone());
        let scheduler = EvaluationScheduler::new(
            pipeline,
            repositories.organizations.clone(),
            &AppConfig::default().scheduler,
        );

        let report = scheduler.run_once(seed_time()).await.expect("sweep");

        assert_eq!(report.organizations, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.alerts_created, 4);
    }

    #[tokio::test]
    async fn run_stops_when_shutdown_is_signalled() {
        let repositories = Repositories::in_memory();
        let (pipeline, _dashboard) = pipeline(repositories.clone());
        let scheduler = EvaluationScheduler::new(
            pipeline,
            repositories.organizations.clone(),
            &AppConfig::default().scheduler,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        shutdown_tx.send(true).expect("scheduler is listening");

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler stops promptly")
            .expect("scheduler task completes");
    }
}
