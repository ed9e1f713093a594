pub mod dashboard;
pub mod dispatcher;
pub mod email;
pub mod lifecycle;
pub mod pipeline;
pub mod scheduler;

pub use dashboard::BroadcastDashboardSink;
pub use dispatcher::{ChannelOutcome, DispatchReport, NotificationDispatcher};
pub use email::{EmailMessage, EmailTransport, HttpRelayTransport, LogOnlyTransport, TemplatedEmailSink};
pub use lifecycle::{AlertLifecycleManager, CandidateOutcome, LifecycleError};
pub use pipeline::{EvaluationPipeline, EvaluationSummary, PipelineError};
pub use scheduler::{EvaluationScheduler, SchedulerReport};
