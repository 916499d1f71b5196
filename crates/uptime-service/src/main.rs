//! Store uptime service
//!
//! Serves uptime/downtime reports computed from a directory of CSV exports.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uptime_lib::{
    health::HealthRegistry, ingest::CsvDirectorySource, observability::StructuredLogger,
    ObservationSource,
};
use uptime_service::{api, ServiceConfig};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        service = %config.service_name,
        data_dir = %config.data_dir.display(),
        policy = %config.window_policy,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    api::register_components(&health_registry).await;

    let source: Arc<dyn ObservationSource> = Arc::new(
        CsvDirectorySource::new(&config.data_dir)
            .with_assume_open_when_unlisted(config.assume_open_when_unlisted),
    );

    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SERVICE_VERSION, &source.describe());

    let app_state = Arc::new(
        api::AppState::new(
            health_registry,
            source,
            config.window_policy,
            logger.clone(),
        )
        .with_report_retention(config.retained_reports),
    );

    // Readiness stays false until a dataset loads; reports retry the load
    if let Err(e) = app_state.load_dataset().await {
        warn!(error = %e, "Initial dataset load failed");
    }

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
