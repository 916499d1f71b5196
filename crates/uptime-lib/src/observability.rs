//! Observability infrastructure for the uptime service
//!
//! Provides:
//! - Prometheus metrics (report latency, stores processed, rejected records, running jobs)
//! - Structured JSON logging with tracing

use crate::ingest::Dataset;
use crate::models::StoreId;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for report build time (in seconds)
const REPORT_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ReportMetricsInner> = OnceLock::new();

struct ReportMetricsInner {
    report_latency_seconds: Histogram,
    stores_processed: IntCounter,
    empty_horizons: IntCounter,
    rejected_records: IntCounter,
    failed_reports: IntCounter,
    running_reports: IntGauge,
    dataset_stores: IntGauge,
    dataset_observations: IntGauge,
}

impl ReportMetricsInner {
    fn new() -> Self {
        Self {
            report_latency_seconds: register_histogram!(
                "store_uptime_report_latency_seconds",
                "Time spent building a full uptime report",
                REPORT_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register report_latency_seconds"),

            stores_processed: register_int_counter!(
                "store_uptime_stores_processed_total",
                "Total number of store rows produced across all reports"
            )
            .expect("Failed to register stores_processed"),

            empty_horizons: register_int_counter!(
                "store_uptime_empty_horizons_total",
                "Store horizons reported as zero for lack of eligible polls"
            )
            .expect("Failed to register empty_horizons"),

            rejected_records: register_int_counter!(
                "store_uptime_rejected_records_total",
                "Input records dropped during ingest"
            )
            .expect("Failed to register rejected_records"),

            failed_reports: register_int_counter!(
                "store_uptime_failed_reports_total",
                "Report jobs that ended in failure"
            )
            .expect("Failed to register failed_reports"),

            running_reports: register_int_gauge!(
                "store_uptime_running_reports",
                "Report jobs currently running"
            )
            .expect("Failed to register running_reports"),

            dataset_stores: register_int_gauge!(
                "store_uptime_dataset_stores",
                "Stores in the most recently loaded dataset"
            )
            .expect("Failed to register dataset_stores"),

            dataset_observations: register_int_gauge!(
                "store_uptime_dataset_observations",
                "Polls in the most recently loaded dataset"
            )
            .expect("Failed to register dataset_observations"),
        }
    }
}

/// Report metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct ReportMetrics {
    _private: (),
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ReportMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ReportMetricsInner {
        GLOBAL_METRICS.get_or_init(ReportMetricsInner::new)
    }

    pub fn observe_report_latency(&self, duration_secs: f64) {
        self.inner().report_latency_seconds.observe(duration_secs);
    }

    pub fn add_stores_processed(&self, count: usize) {
        self.inner().stores_processed.inc_by(count as u64);
    }

    pub fn add_empty_horizons(&self, count: usize) {
        self.inner().empty_horizons.inc_by(count as u64);
    }

    pub fn add_rejected_records(&self, count: usize) {
        self.inner().rejected_records.inc_by(count as u64);
    }

    pub fn inc_failed_reports(&self) {
        self.inner().failed_reports.inc();
    }

    pub fn inc_running_reports(&self) {
        self.inner().running_reports.inc();
    }

    pub fn dec_running_reports(&self) {
        self.inner().running_reports.dec();
    }

    /// Update dataset size gauges after a load
    pub fn set_dataset_size(&self, stores: usize, observations: usize) {
        self.inner().dataset_stores.set(stores as i64);
        self.inner().dataset_observations.set(observations as i64);
    }
}

/// Structured logger for service events
///
/// Keeps the JSON field names of report lifecycle events consistent across
/// the service and the CLI.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, data_source: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            data_source = %data_source,
            "Store uptime service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Store uptime service shutting down"
        );
    }

    /// Log a finished dataset load
    pub fn log_dataset_loaded(&self, source: &str, dataset: &Dataset) {
        let rejected = dataset.rejected.len();
        if rejected > 0 {
            warn!(
                event = "dataset_loaded",
                service = %self.service_name,
                source = %source,
                stores = dataset.stores().len(),
                observations = dataset.observation_count(),
                hours_rules = dataset.hours.len(),
                rejected = rejected,
                "Dataset loaded with rejected records"
            );
        } else {
            info!(
                event = "dataset_loaded",
                service = %self.service_name,
                source = %source,
                stores = dataset.stores().len(),
                observations = dataset.observation_count(),
                hours_rules = dataset.hours.len(),
                "Dataset loaded"
            );
        }
    }

    pub fn log_report_started(&self, report_id: &str, source: &str) {
        info!(
            event = "report_started",
            service = %self.service_name,
            report_id = %report_id,
            source = %source,
            "Report generation started"
        );
    }

    pub fn log_report_completed(
        &self,
        report_id: &str,
        stores: usize,
        failures: usize,
        empty_horizons: usize,
        duration_secs: f64,
    ) {
        info!(
            event = "report_completed",
            service = %self.service_name,
            report_id = %report_id,
            stores = stores,
            failures = failures,
            empty_horizons = empty_horizons,
            duration_secs = duration_secs,
            "Report generation completed"
        );
    }

    pub fn log_report_failed(&self, report_id: &str, reason: &str) {
        error!(
            event = "report_failed",
            service = %self.service_name,
            report_id = %report_id,
            reason = %reason,
            "Report generation failed"
        );
    }

    /// Log a store left out of a report because estimation failed
    pub fn log_store_failure(&self, store_id: StoreId, reason: &str) {
        error!(
            event = "store_failed",
            service = %self.service_name,
            store_id = %store_id,
            reason = %reason,
            "Store omitted from report"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hours::OperatingHoursIndex;

    #[test]
    fn test_report_metrics_creation() {
        // Metrics live in the global Prometheus registry and are registered
        // once per process, so repeated handles must be cheap and safe.
        let metrics = ReportMetrics::new();
        let again = ReportMetrics::new();

        metrics.observe_report_latency(0.25);
        metrics.add_stores_processed(3);
        metrics.add_empty_horizons(1);
        metrics.add_rejected_records(2);
        again.inc_running_reports();
        again.dec_running_reports();
        again.set_dataset_size(3, 120);

        let names: Vec<String> = prometheus::gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"store_uptime_stores_processed_total".to_string()));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-service");
        assert_eq!(logger.service_name, "test-service");

        // Logging without a subscriber must not panic
        logger.log_dataset_loaded("test", &Dataset::new(OperatingHoursIndex::new()));
        logger.log_store_failure(StoreId(1), "boom");
    }
}
