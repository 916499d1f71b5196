//! Store availability estimation
//!
//! This crate provides the core functionality for:
//! - Loading store polls, operating hours and time zones
//! - Selecting the polls that belong to each trailing horizon
//! - Gap-fill estimation of uptime and downtime
//! - Multi-horizon report assembly, background jobs and CSV export
//! - Health checks and observability

pub mod error;
pub mod estimator;
pub mod health;
pub mod hours;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod report;
pub mod selector;

pub use error::{EstimateError, IngestError, MonitorError, RecordError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use hours::{OpenInterval, OperatingHoursIndex};
pub use ingest::{CsvDirectorySource, Dataset, ObservationSource, RejectedRecord, StaticSource};
pub use models::*;
pub use observability::{ReportMetrics, StructuredLogger};
pub use report::{
    aggregate, build_report, Report, ReportId, ReportOptions, ReportRegistry, ReportState,
    StoreReport, WindowPolicy,
};
