//! HTTP API for report jobs, per-store reports, health checks and metrics

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uptime_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    ingest::{parse_utc_timestamp, Dataset, ObservationSource},
    observability::{ReportMetrics, StructuredLogger},
    report::{build_store_report, to_csv_string, ReportOptions, ReportRegistry, ReportState},
    IngestError, StoreId, WindowPolicy,
};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ReportMetrics,
    pub reports: ReportRegistry,
    pub source: Arc<dyn ObservationSource>,
    pub policy: WindowPolicy,
    logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        source: Arc<dyn ObservationSource>,
        policy: WindowPolicy,
        logger: StructuredLogger,
    ) -> Self {
        let reports = ReportRegistry::new(logger.clone()).with_health(health_registry.clone());
        Self {
            health_registry,
            metrics: ReportMetrics::new(),
            reports,
            source,
            policy,
            logger,
        }
    }

    /// Number of finished reports kept for polling
    pub fn with_report_retention(mut self, retain_finished: usize) -> Self {
        self.reports = self.reports.with_retention(retain_finished);
        self
    }

    /// Load the dataset from the source and cache it for per-store queries
    pub async fn load_dataset(&self) -> Result<Arc<Dataset>, IngestError> {
        let dataset = match self.source.load().await {
            Ok(dataset) => Arc::new(dataset),
            Err(e) => {
                self.health_registry.mark_dataset_failed(e.to_string()).await;
                return Err(e);
            }
        };

        self.metrics.add_rejected_records(dataset.rejected.len());
        self.metrics
            .set_dataset_size(dataset.stores().len(), dataset.observation_count());
        self.logger
            .log_dataset_loaded(&self.source.describe(), &dataset);
        self.health_registry
            .mark_dataset_loaded(dataset.rejected.len())
            .await;

        self.reports.publish_dataset(dataset.clone()).await;
        Ok(dataset)
    }

    /// Most recently loaded dataset, loading it on first use
    ///
    /// Every triggered report reloads the source and replaces this snapshot.
    pub async fn dataset(&self) -> Result<Arc<Dataset>, IngestError> {
        if let Some(dataset) = self.reports.latest_dataset().await {
            return Ok(dataset);
        }
        self.load_dataset().await
    }

    fn options(&self, params: &ReportParams) -> Result<ReportOptions, ApiError> {
        let mut options = ReportOptions::default().with_policy(self.policy);
        if let Some(policy) = &params.policy {
            options.policy = policy.parse().map_err(ApiError::bad_request)?;
        }
        if let Some(now) = &params.now {
            let now = parse_utc_timestamp(now).map_err(|e| ApiError::bad_request(e.to_string()))?;
            options = options.with_now(now);
        }
        Ok(options)
    }
}

/// Optional query parameters shared by report endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    /// `full` or `hours`
    pub policy: Option<String>,
    /// Override for the week reference instant (UTC)
    pub now: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub report_id: Uuid,
}

/// JSON error body with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Start a report over a fresh load of the dataset
async fn trigger_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let options = state.options(&params)?;
    let report_id = state.reports.trigger(state.source.clone(), options).await;
    info!(report_id = %report_id, policy = %options.policy, "Report triggered");
    Ok(Json(TriggerResponse { report_id }))
}

/// Poll a report: JSON while running, CSV once complete
async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<Response, ApiError> {
    let unknown = || ApiError::not_found(format!("unknown report id {}", report_id));
    let id = Uuid::parse_str(&report_id).map_err(|_| unknown())?;
    let report_state = state.reports.status(id).await.ok_or_else(unknown)?;

    let response = match report_state {
        ReportState::Running => Json(json!({ "status": "Running" })).into_response(),
        ReportState::Complete { report } => {
            let body = to_csv_string(&report.rows).map_err(|e| ApiError::internal(e.to_string()))?;
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response()
        }
        ReportState::Failed { error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "Failed", "error": error })),
        )
            .into_response(),
    };
    Ok(response)
}

/// Compute one store's report with per-horizon detail
async fn store_report(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<u64>,
    Query(params): Query<ReportParams>,
) -> Result<Response, ApiError> {
    let options = state.options(&params)?;
    let dataset = state.dataset().await.map_err(|e| ApiError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: e.to_string(),
    })?;

    let store_id = StoreId(store_id);
    if !dataset.contains_store(store_id) {
        return Err(ApiError::not_found(format!("unknown store {}", store_id)));
    }

    let report = build_store_report(&dataset, store_id, &options).map_err(|e| {
        warn!(store_id = %store_id, error = %e, "Store report failed");
        ApiError::internal(e.to_string())
    })?;
    Ok(Json(report).into_response())
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once a dataset has loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/trigger_report", post(trigger_report))
        .route("/get_report/:report_id", get(get_report))
        .route("/stores/:store_id/report", get(store_report))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Register health components for the service
pub async fn register_components(health_registry: &HealthRegistry) {
    health_registry.register(components::REPORTER).await;
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
