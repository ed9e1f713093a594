//! Alert endpoints, nested under `/api/v1/alerts`.
//!
//! - `GET  /config`                  effective alert thresholds
//! - `PUT  /config`                  partial threshold update
//! - `POST /evaluate`                run one evaluation pass now
//! - `GET  /`                        paginated alerts (`status`, `limit`, `offset`)
//! - `PUT  /{alert_id}/acknowledge`  ACTIVE -> ACKNOWLEDGED
//! - `PUT  /{alert_id}/resolve`      ACTIVE | ACKNOWLEDGED -> RESOLVED
//! - `GET  /summary`                 counts for the dashboard header
//! - `GET  /notifications`           latest ACTIVE alerts as display items
//!
//! The caller's organization comes from `x-organization-id`; the acting user
//! from `x-actor-id`.

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use pourwatch_core::domain::alert::{Alert, AlertId, AlertSeverity, AlertStatus, AlertType};
use pourwatch_core::domain::alert_config::{AlertConfig, AlertConfigPatch};
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::errors::{ApplicationError, InterfaceError};
use pourwatch_core::notify::AlertNotification;
use pourwatch_core::reconciliation::UsageWindow;
use pourwatch_db::repositories::AlertQuery;
use pourwatch_db::{Repositories, RepositoryError};
use pourwatch_engine::{EvaluationPipeline, EvaluationSummary};

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const ACTOR_HEADER: &str = "x-actor-id";
pub const CORRELATION_HEADER: &str = "x-correlation-id";
const DEFAULT_ACTOR: &str = "operator";
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_NOTIFICATION_LIMIT: u32 = 10;
const RECENT_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AlertsState {
    repositories: Repositories,
    pipeline: EvaluationPipeline,
    window_hours: u32,
}

impl AlertsState {
    pub fn new(
        repositories: Repositories,
        pipeline: EvaluationPipeline,
        window_hours: u32,
    ) -> Self {
        Self { repositories, pipeline, window_hours }
    }
}

pub fn router(state: AlertsState) -> Router {
    Router::new()
        .route("/", get(list_alerts))
        .route("/config", get(get_config).put(update_config))
        .route("/evaluate", post(evaluate))
        .route("/summary", get(summary))
        .route("/notifications", get(notifications))
        .route("/{alert_id}/acknowledge", put(acknowledge))
        .route("/{alert_id}/resolve", put(resolve))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Caller identity and errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Caller {
    pub organization_id: OrganizationId,
    pub actor: String,
    pub correlation_id: String,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let correlation_id =
            header(CORRELATION_HEADER).unwrap_or_else(|| format!("req-{}", Uuid::new_v4()));
        let Some(organization_id) = header(ORGANIZATION_HEADER) else {
            return Err(ApiError(InterfaceError::BadRequest {
                message: format!("missing {ORGANIZATION_HEADER} header"),
                correlation_id,
            }));
        };

        Ok(Self {
            organization_id: OrganizationId(organization_id),
            actor: header(ACTOR_HEADER).unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
            correlation_id,
        })
    }
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn from_application(error: impl Into<ApplicationError>, caller: &Caller) -> Self {
        Self(error.into().into_interface(caller.correlation_id.clone()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            InterfaceError::Conflict { message, .. } => (StatusCode::CONFLICT, message.clone()),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.user_message().to_string())
            }
            InterfaceError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.user_message().to_string())
            }
        };
        let body = ErrorBody { error, correlation_id: self.0.correlation_id().to_string() };
        (status, Json(body)).into_response()
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub id: AlertId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub title: String,
    pub message: String,
    pub product_id: String,
    pub inventory_item_id: String,
    pub rule_id: String,
    pub trigger_value: f64,
    pub threshold_value: f64,
    pub cost_impact: Decimal,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            status: alert.status,
            title: alert.title,
            message: alert.message,
            product_id: alert.product_id.0,
            inventory_item_id: alert.inventory_item_id.0,
            rule_id: alert.rule_id.0,
            trigger_value: alert.trigger_value,
            threshold_value: alert.threshold_value,
            cost_impact: alert.cost_impact.round_dp(2),
            created_at: alert.created_at,
            acknowledged_at: alert.acknowledged_at,
            acknowledged_by: alert.acknowledged_by,
            resolved_at: alert.resolved_at,
            resolved_by: alert.resolved_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListResponse {
    pub alerts: Vec<AlertView>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub active: u64,
    pub critical: u64,
    pub by_type: BTreeMap<&'static str, u64>,
    #[serde(rename = "recent24h")]
    pub recent_24h: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvaluateRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_config(
    State(state): State<AlertsState>,
    caller: Caller,
) -> Result<Json<AlertConfig>, ApiError> {
    let settings = state
        .repositories
        .organizations
        .alert_settings(&caller.organization_id)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &caller))?;
    Ok(Json(AlertConfig::from_settings(settings.as_ref())))
}

async fn update_config(
    State(state): State<AlertsState>,
    caller: Caller,
    Json(patch): Json<AlertConfigPatch>,
) -> Result<Json<AlertConfig>, ApiError> {
    let organizations = &state.repositories.organizations;
    let current = organizations
        .alert_settings(&caller.organization_id)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &caller))?;

    let updated = patch
        .apply_to(AlertConfig::from_settings(current.as_ref()))
        .map_err(|error| ApiError::from_application(error, &caller))?;

    organizations
        .save_alert_settings(&caller.organization_id, updated.to_settings())
        .await
        .map_err(|error| match error {
            RepositoryError::Conflict(_) => ApiError::from_application(
                ApplicationError::NotFound(format!("organization {}", caller.organization_id)),
                &caller,
            ),
            other => ApiError::from_application(persistence(other), &caller),
        })?;

    info!(
        event_name = "api.alerts.config_updated",
        organization_id = %caller.organization_id,
        actor = %caller.actor,
        correlation_id = %caller.correlation_id,
        cooldown_hours = updated.cooldown_hours,
        "alert configuration updated"
    );
    Ok(Json(updated))
}

async fn evaluate(
    State(state): State<AlertsState>,
    caller: Caller,
    body: Option<Json<EvaluateRequest>>,
) -> Result<Json<EvaluationSummary>, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let now = Utc::now();
    let end = request.end.unwrap_or(now);
    let start =
        request.start.unwrap_or_else(|| end - Duration::hours(i64::from(state.window_hours)));
    if start >= end {
        return Err(ApiError(InterfaceError::BadRequest {
            message: "start must be before end".to_string(),
            correlation_id: caller.correlation_id,
        }));
    }

    let summary = state
        .pipeline
        .run(&caller.organization_id, UsageWindow::new(start, end), now)
        .await
        .map_err(|pass_error| {
            error!(
                event_name = "api.alerts.evaluate_failed",
                organization_id = %caller.organization_id,
                correlation_id = %caller.correlation_id,
                error = %pass_error,
                "on-demand evaluation failed"
            );
            ApiError::from_application(pass_error, &caller)
        })?;

    Ok(Json(summary))
}

async fn list_alerts(
    State(state): State<AlertsState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<AlertListResponse>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => Some(AlertStatus::Active),
        Some(value) if value.eq_ignore_ascii_case("ALL") => None,
        Some(value) => match AlertStatus::parse(&value.to_ascii_uppercase()) {
            Some(status) => Some(status),
            None => {
                return Err(ApiError(InterfaceError::BadRequest {
                    message: format!("unknown status `{value}`"),
                    correlation_id: caller.correlation_id,
                }))
            }
        },
    };
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let page = state
        .repositories
        .alerts
        .list(&caller.organization_id, &AlertQuery { status, limit, offset })
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &caller))?;

    Ok(Json(AlertListResponse {
        alerts: page.alerts.into_iter().map(AlertView::from).collect(),
        total: page.total,
        limit,
        offset,
    }))
}

async fn acknowledge(
    State(state): State<AlertsState>,
    caller: Caller,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertView>, ApiError> {
    let alert = state
        .pipeline
        .lifecycle()
        .acknowledge(&caller.organization_id, &AlertId(alert_id), &caller.actor, Utc::now())
        .await
        .map_err(|error| ApiError::from_application(error, &caller))?;
    Ok(Json(AlertView::from(alert)))
}

async fn resolve(
    State(state): State<AlertsState>,
    caller: Caller,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertView>, ApiError> {
    let alert = state
        .pipeline
        .lifecycle()
        .resolve(&caller.organization_id, &AlertId(alert_id), &caller.actor, Utc::now())
        .await
        .map_err(|error| ApiError::from_application(error, &caller))?;
    Ok(Json(AlertView::from(alert)))
}

async fn summary(
    State(state): State<AlertsState>,
    caller: Caller,
) -> Result<Json<SummaryResponse>, ApiError> {
    let recent_since = Utc::now() - Duration::hours(RECENT_WINDOW_HOURS);
    let summary = state
        .repositories
        .alerts
        .summary(&caller.organization_id, recent_since)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &caller))?;

    let by_type = AlertType::ALL
        .iter()
        .map(|alert_type| {
            (alert_type.as_str(), summary.by_type.get(alert_type).copied().unwrap_or(0))
        })
        .collect();

    Ok(Json(SummaryResponse {
        active: summary.active,
        critical: summary.critical,
        by_type,
        recent_24h: summary.recent,
    }))
}

async fn notifications(
    State(state): State<AlertsState>,
    caller: Caller,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<AlertNotification>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).clamp(1, MAX_PAGE_SIZE);
    let alerts = state
        .repositories
        .alerts
        .recent_active(&caller.organization_id, limit)
        .await
        .map_err(|error| ApiError::from_application(persistence(error), &caller))?;

    Ok(Json(alerts.iter().map(AlertNotification::from).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use pourwatch_core::domain::alert::Alert;
    use pourwatch_core::domain::organization::OrganizationId;
    use pourwatch_core::domain::sales::SaleEvent;
    use pourwatch_core::notify::{NotificationError, SlackSink};
    use pourwatch_core::reconciliation::UsageWindow;
    use pourwatch_db::repositories::SaleEventRepository;
    use pourwatch_db::{DemoSeedDataset, Repositories, RepositoryError};
    use pourwatch_engine::{
        BroadcastDashboardSink, EvaluationPipeline, LogOnlyTransport, NotificationDispatcher,
        TemplatedEmailSink,
    };

    use super::{router, AlertsState};

    struct NullSlack;

    #[async_trait]
    impl SlackSink for NullSlack {
        async fn post(&self, _webhook_url: &str, _alert: &Alert) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    struct UnavailableSales;

    #[async_trait]
    impl SaleEventRepository for UnavailableSales {
        async fn list_in_window(
            &self,
            _organization_id: &OrganizationId,
            _window: &UsageWindow,
        ) -> Result<Vec<SaleEvent>, RepositoryError> {
            Err(RepositoryError::Decode("sale_event.items: disk I/O error".to_string()))
        }

        async fn save(&self, _sale: SaleEvent) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    fn app(repositories: Repositories) -> Router {
        let email = TemplatedEmailSink::new("alerts@pourwatch.local", Arc::new(LogOnlyTransport))
            .expect("templates compile");
        let dispatcher = NotificationDispatcher::new(
            Arc::new(BroadcastDashboardSink::new(16)),
            Arc::new(email),
            Arc::new(NullSlack),
        );
        let pipeline = EvaluationPipeline::new(repositories.clone(), dispatcher);
        Router::new().nest("/api/v1/alerts", router(AlertsState::new(repositories, pipeline, 168)))
    }

    async fn seeded() -> Repositories {
        let repositories = Repositories::in_memory();
        // Sales land an hour after each day boundary; keep them inside the
        // trailing window that `POST /evaluate` uses by default.
        DemoSeedDataset::load(&repositories, Utc::now() - Duration::hours(2))
            .await
            .expect("seed");
        repositories
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        organization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri).header("x-actor-id", "ana");
        if let Some(organization) = organization {
            request = request.header("x-organization-id", organization);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => request.body(Body::empty()).expect("request"),
        };

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    const ORG: Option<&str> = Some("org-demo");

    #[test]
    fn alert_view_presents_cost_in_cents() {
        use chrono::TimeZone;
        use pourwatch_core::domain::alert::{
            AlertId, AlertRuleId, AlertSeverity, AlertStatus, AlertType,
        };
        use pourwatch_core::domain::inventory::InventoryItemId;
        use pourwatch_core::domain::product::ProductId;
        use rust_decimal::Decimal;

        let alert = Alert {
            id: AlertId("alert-1".to_string()),
            organization_id: OrganizationId("org-demo".to_string()),
            rule_id: AlertRuleId("rule-1".to_string()),
            inventory_item_id: InventoryItemId("inv-1".to_string()),
            product_id: ProductId("prod-vodka".to_string()),
            alert_type: AlertType::UsageVariance,
            severity: AlertSeverity::High,
            title: "Usage variance: House Vodka".to_string(),
            message: "House Vodka usage is 50.0% above expected ($50.00 cost impact).".to_string(),
            trigger_value: 49.996,
            threshold_value: 15.0,
            cost_impact: Decimal::new(49_996, 3),
            status: AlertStatus::Active,
            dedupe_key: "key".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 8, 18, 0, 0).single().expect("timestamp"),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
        };

        let view = super::AlertView::from(alert);

        assert_eq!(view.cost_impact, Decimal::new(5000, 2));
        assert_eq!(view.severity, AlertSeverity::High);
    }

    #[tokio::test]
    async fn missing_organization_header_is_bad_request() {
        let app = app(Repositories::in_memory());

        let (status, body) = call(&app, "GET", "/api/v1/alerts/config", None, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing x-organization-id header");
        assert!(body["correlationId"].as_str().is_some_and(|id| id.starts_with("req-")));
    }

    #[tokio::test]
    async fn config_defaults_then_partial_update_round_trips() {
        let app = app(seeded().await);

        let (status, defaults) = call(&app, "GET", "/api/v1/alerts/config", ORG, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(defaults["usageVarianceThreshold"], json!(15.0));
        assert_eq!(defaults["cooldownHours"], json!(24));

        let (status, updated) = call(
            &app,
            "PUT",
            "/api/v1/alerts/config",
            ORG,
            Some(json!({ "cooldownHours": 48, "overuseEnabled": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["cooldownHours"], json!(48));
        assert_eq!(updated["overuseEnabled"], json!(false));
        assert_eq!(updated["usageVarianceThreshold"], json!(15.0));

        let (_, stored) = call(&app, "GET", "/api/v1/alerts/config", ORG, None).await;
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn config_update_rejects_out_of_range_values() {
        let app = app(seeded().await);

        let (status, body) = call(
            &app,
            "PUT",
            "/api/v1/alerts/config",
            ORG,
            Some(json!({ "cooldownHours": 500 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|message| message.contains("cooldownHours")));
    }

    #[tokio::test]
    async fn config_update_for_unknown_organization_is_not_found() {
        let app = app(Repositories::in_memory());

        let (status, _) = call(
            &app,
            "PUT",
            "/api/v1/alerts/config",
            Some("org-ghost"),
            Some(json!({ "cooldownHours": 12 })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn evaluate_then_list_summary_and_notifications() {
        let app = app(seeded().await);

        let (status, summary) = call(&app, "POST", "/api/v1/alerts/evaluate", ORG, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["alertsEvaluated"], json!(4));
        assert_eq!(summary["alertsCreated"], json!(4));

        let (status, again) = call(&app, "POST", "/api/v1/alerts/evaluate", ORG, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["alertsCreated"], json!(0));
        assert_eq!(again["alertsSuppressed"], json!(4));

        let (status, page) = call(&app, "GET", "/api/v1/alerts?limit=2", ORG, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], json!(4));
        assert_eq!(page["alerts"].as_array().map(Vec::len), Some(2));
        assert_eq!(page["alerts"][0]["status"], "ACTIVE");

        let (_, header) = call(&app, "GET", "/api/v1/alerts/summary", ORG, None).await;
        assert_eq!(header["active"], json!(4));
        assert_eq!(header["critical"], json!(0));
        assert_eq!(header["byType"]["USAGE_VARIANCE"], json!(2));
        assert_eq!(header["byType"]["OVERUSE_DETECTED"], json!(2));
        assert_eq!(header["byType"]["EFFICIENCY_LOW"], json!(0));
        assert_eq!(header["recent24h"], json!(4));

        let (_, feed) = call(&app, "GET", "/api/v1/alerts/notifications?limit=3", ORG, None).await;
        let feed = feed.as_array().cloned().unwrap_or_default();
        assert_eq!(feed.len(), 3);
        assert!(feed[0].get("type").is_some());
        assert!(feed[0].get("createdAt").is_some());
    }

    #[tokio::test]
    async fn evaluate_with_inverted_window_is_bad_request() {
        let app = app(seeded().await);
        let now = Utc::now();

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/alerts/evaluate",
            ORG,
            Some(json!({
                "start": now.to_rfc3339(),
                "end": (now - Duration::hours(1)).to_rfc3339(),
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn evaluate_hides_repository_failures() {
        let mut repositories = seeded().await;
        repositories.sales = Arc::new(UnavailableSales);
        let app = app(repositories);

        let (status, body) = call(&app, "POST", "/api/v1/alerts/evaluate", ORG, None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An unexpected internal error occurred.");
    }

    #[tokio::test]
    async fn acknowledge_resolve_and_invalid_transitions() {
        let app = app(seeded().await);
        call(&app, "POST", "/api/v1/alerts/evaluate", ORG, None).await;
        let (_, page) = call(&app, "GET", "/api/v1/alerts", ORG, None).await;
        let alert_id = page["alerts"][0]["id"].as_str().expect("alert id").to_string();

        let (status, acknowledged) =
            call(&app, "PUT", &format!("/api/v1/alerts/{alert_id}/acknowledge"), ORG, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(acknowledged["status"], "ACKNOWLEDGED");
        assert_eq!(acknowledged["acknowledgedBy"], "ana");

        let (status, _) =
            call(&app, "PUT", &format!("/api/v1/alerts/{alert_id}/acknowledge"), ORG, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, resolved) =
            call(&app, "PUT", &format!("/api/v1/alerts/{alert_id}/resolve"), ORG, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resolved["status"], "RESOLVED");

        let (_, active) = call(&app, "GET", "/api/v1/alerts", ORG, None).await;
        assert_eq!(active["total"], json!(3));
        let (_, everything) = call(&app, "GET", "/api/v1/alerts?status=ALL", ORG, None).await;
        assert_eq!(everything["total"], json!(4));
        let (_, done) = call(&app, "GET", "/api/v1/alerts?status=resolved", ORG, None).await;
        assert_eq!(done["total"], json!(1));
    }

    #[tokio::test]
    async fn alerts_are_scoped_to_the_calling_organization() {
        let app = app(seeded().await);
        call(&app, "POST", "/api/v1/alerts/evaluate", ORG, None).await;
        let (_, page) = call(&app, "GET", "/api/v1/alerts", ORG, None).await;
        let alert_id = page["alerts"][0]["id"].as_str().expect("alert id").to_string();

        let (status, _) = call(
            &app,
            "PUT",
            &format!("/api/v1/alerts/{alert_id}/resolve"),
            Some("org-other"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, other) =
            call(&app, "GET", "/api/v1/alerts?status=ALL", Some("org-other"), None).await;
        assert_eq!(other["total"], json!(0));
    }

    #[tokio::test]
    async fn unknown_status_filter_is_bad_request() {
        let app = app(Repositories::in_memory());

        let (status, _) = call(&app, "GET", "/api/v1/alerts?status=SNOOZED", ORG, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
