//! Error types for ingest, estimation and report assembly

use crate::models::{Horizon, StoreId};
use std::path::PathBuf;
use thiserror::Error;

/// A single input record that could not be turned into a typed value
///
/// Records failing with this error are dropped; the rest of the store's data
/// is still used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("day_of_week {0} is outside 0..=6")]
    InvalidWeekday(i64),
    #[error("invalid local time {0:?}")]
    InvalidTime(String),
    #[error("unknown status {0:?}")]
    InvalidStatus(String),
    #[error("invalid UTC timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Broken preconditions of the gap-fill estimator
///
/// These indicate a bug in the caller, not bad data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("estimator requires at least one observation")]
    EmptyObservations,
    #[error("window end {end}s precedes window start {start}s")]
    InvalidWindow { start: i64, end: i64 },
    #[error("observation {index} is earlier than its predecessor")]
    OutOfOrder { index: usize },
    #[error("observation {index} at {at}s lies outside the window [{start}s, {end}s]")]
    OutsideWindow {
        index: usize,
        at: i64,
        start: i64,
        end: i64,
    },
}

/// Failures loading a dataset from disk
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("ingest task failed: {0}")]
    Task(String),
}

/// Top-level error for report generation
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("estimation failed for store {store_id} ({horizon}): {source}")]
    Estimate {
        store_id: StoreId,
        horizon: Horizon,
        #[source]
        source: EstimateError,
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("failed to write report: {0}")]
    Export(#[from] csv::Error),
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report task failed: {0}")]
    Task(String),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
