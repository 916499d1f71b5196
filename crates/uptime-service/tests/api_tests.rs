//! Integration tests for the service API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use chrono::NaiveTime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uptime_lib::{
    health::{components, HealthRegistry},
    hours::OperatingHoursIndex,
    ingest::{Dataset, ObservationSource, StaticSource},
    observability::StructuredLogger,
    IngestError, Observation, OperatingHoursRule, Status, StoreId, Weekday, WindowPolicy,
};
use uptime_service::{api, create_router, AppState};

/// Source whose every load fails
struct BrokenSource;

#[async_trait]
impl ObservationSource for BrokenSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        Err(IngestError::Task("export directory missing".to_string()))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

/// Source that gains store 3 from its second load onwards
#[derive(Default)]
struct GrowingSource {
    loads: AtomicUsize,
}

#[async_trait]
impl ObservationSource for GrowingSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        let mut dataset = sample_dataset();
        if self.loads.fetch_add(1, Ordering::SeqCst) > 0 {
            dataset.add_store(StoreId(3));
        }
        Ok(dataset)
    }

    fn describe(&self) -> String {
        "growing".to_string()
    }
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn sample_dataset() -> Dataset {
    let hours = OperatingHoursIndex::from_rules([OperatingHoursRule {
        store_id: StoreId(1),
        weekday: Weekday::MONDAY,
        open: t(8, 0),
        close: t(22, 0),
    }]);
    let mut dataset = Dataset::new(hours);
    dataset.push_observation(Observation::new(StoreId(1), Weekday::MONDAY, t(9, 0), Status::Active));
    dataset.push_observation(Observation::new(
        StoreId(1),
        Weekday::MONDAY,
        t(9, 45),
        Status::Inactive,
    ));
    dataset.add_store(StoreId(2));
    dataset
}

async fn setup_state(source: Arc<dyn ObservationSource>) -> Arc<AppState> {
    let health_registry = HealthRegistry::new();
    api::register_components(&health_registry).await;
    Arc::new(AppState::new(
        health_registry,
        source,
        WindowPolicy::FullHorizon,
        StructuredLogger::new("test-service"),
    ))
}

async fn setup_loaded_state() -> Arc<AppState> {
    let state = setup_state(Arc::new(StaticSource::new(sample_dataset()))).await;
    state.load_dataset().await.unwrap();
    state
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str) -> Response {
    create_router(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_readyz_returns_503_before_dataset_load() {
    let state = setup_state(Arc::new(StaticSource::new(sample_dataset()))).await;

    let response = send(&state, "GET", "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_after_dataset_load() {
    let state = setup_loaded_state().await;

    let response = send(&state, "GET", "/readyz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let state = setup_loaded_state().await;

    let response = send(&state, "GET", "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"][components::DATASET].is_object());
    assert!(health["components"][components::REPORTER].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_when_dataset_fails() {
    let state = setup_state(Arc::new(BrokenSource)).await;
    assert!(state.load_dataset().await.is_err());

    let response = send(&state, "GET", "/healthz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_trigger_then_fetch_csv() {
    let state = setup_loaded_state().await;

    let response = send(&state, "POST", "/trigger_report").await;
    assert_eq!(response.status(), StatusCode::OK);
    let report_id = body_json(response).await["report_id"]
        .as_str()
        .unwrap()
        .to_string();

    let id = report_id.parse().unwrap();
    assert!(state.reports.wait(id).await.is_some());

    let response = send(&state, "GET", &format!("/get_report/{}", report_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/csv"));

    let csv = body_text(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("store_id,uptime_last_hour"));
    assert!(lines[1].starts_with("1,"));
    assert_eq!(lines[2], "2,0.00,0.00,0.00,0.00,0.00,0.00");
}

#[tokio::test]
async fn test_failed_report_returns_500() {
    let state = setup_state(Arc::new(BrokenSource)).await;

    let response = send(&state, "POST", "/trigger_report").await;
    let report_id = body_json(response).await["report_id"]
        .as_str()
        .unwrap()
        .to_string();
    state.reports.wait(report_id.parse().unwrap()).await;

    let response = send(&state, "GET", &format!("/get_report/{}", report_id)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "Failed");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("export directory missing"));
}

#[tokio::test]
async fn test_unknown_report_id_returns_404() {
    let state = setup_loaded_state().await;

    let response = send(
        &state,
        "GET",
        "/get_report/8c1f2a4e-55b0-4b8e-9a55-0d6f4c0f3f11",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&state, "GET", "/get_report/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_report_has_three_horizons() {
    let state = setup_loaded_state().await;

    let response = send(&state, "GET", "/stores/1/report").await;
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    assert_eq!(report["row"]["store_id"], 1);
    assert_eq!(report["horizons"].as_array().unwrap().len(), 3);
    // 09:00 active then 09:45 inactive; the hour window ends at 09:45
    assert_eq!(report["row"]["uptime_last_hour"], 60.0);
}

#[tokio::test]
async fn test_store_report_rejects_unknown_store_and_policy() {
    let state = setup_loaded_state().await;

    let response = send(&state, "GET", "/stores/99/report").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&state, "GET", "/stores/1/report?policy=sometimes").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&state, "GET", "/stores/1/report?policy=hours").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_store_report_follows_latest_triggered_load() {
    let state = setup_state(Arc::new(GrowingSource::default())).await;
    state.load_dataset().await.unwrap();

    let response = send(&state, "GET", "/stores/3/report").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&state, "POST", "/trigger_report").await;
    let report_id = body_json(response).await["report_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    state.reports.wait(report_id).await.unwrap();

    let response = send(&state, "GET", "/stores/3/report").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["row"]["store_id"], 3);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let state = setup_loaded_state().await;

    let response = send(&state, "POST", "/trigger_report").await;
    let report_id = body_json(response).await["report_id"]
        .as_str()
        .unwrap()
        .to_string();
    state.reports.wait(report_id.parse().unwrap()).await;

    let response = send(&state, "GET", "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let metrics_text = body_text(response).await;
    assert!(metrics_text.contains("store_uptime_report_latency_seconds_bucket"));
    assert!(metrics_text.contains("store_uptime_stores_processed_total"));
    assert!(metrics_text.contains("store_uptime_running_reports"));
}
