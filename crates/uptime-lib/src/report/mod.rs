//! Report assembly
//!
//! This module provides:
//! - Per-store aggregation over the last hour, day and week
//! - Dataset-wide report building, one row per store
//! - Background report jobs addressed by id
//! - CSV export of finished reports

mod aggregator;
mod export;
mod job;

pub use aggregator::{aggregate, HorizonOutcome, HorizonReport, StoreReport, WindowPolicy};
pub use export::{to_csv_string, write_csv, CSV_HEADER};
pub use job::{ReportId, ReportRegistry, ReportState, DEFAULT_RETAINED_REPORTS};

use crate::ingest::Dataset;
use crate::models::{ReportRow, StoreId};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Knobs for a report run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Reference instant for the week horizon; defaults to the latest poll
    pub now: Option<DateTime<Utc>>,
    pub policy: WindowPolicy,
}

impl ReportOptions {
    pub fn with_policy(mut self, policy: WindowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// A store left out of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFailure {
    pub store_id: StoreId,
    pub error: String,
}

/// A finished report over a whole dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// UTC instant the week horizon ended at
    pub reference_utc: DateTime<Utc>,
    pub policy: WindowPolicy,
    /// One row per store, ascending by store id
    pub rows: Vec<ReportRow>,
    pub failures: Vec<StoreFailure>,
    pub empty_horizons: usize,
}

impl Report {
    pub fn row(&self, store_id: StoreId) -> Option<&ReportRow> {
        self.rows
            .binary_search_by_key(&store_id, |row| row.store_id)
            .ok()
            .map(|index| &self.rows[index])
    }
}

/// Resolve the UTC reference instant for a run
///
/// Falls back to the latest poll in the dataset, then to the wall clock when
/// the dataset has no polls at all.
pub fn reference_instant(dataset: &Dataset, options: &ReportOptions) -> DateTime<Utc> {
    options
        .now
        .or_else(|| dataset.latest_poll_utc())
        .unwrap_or_else(Utc::now)
}

/// Aggregate a single store of a dataset
pub fn build_store_report(
    dataset: &Dataset,
    store_id: StoreId,
    options: &ReportOptions,
) -> crate::Result<StoreReport> {
    let reference_utc = reference_instant(dataset, options);
    aggregate(
        store_id,
        dataset.observations_for(store_id),
        &dataset.hours,
        dataset.local_stamp(store_id, reference_utc),
        options.policy,
    )
}

/// Build one row for every store in the dataset
///
/// Stores are processed in parallel and are independent of each other; a
/// store whose estimation fails is recorded in `failures` and the rest of
/// the report is still produced.
pub fn build_report(dataset: &Dataset, options: &ReportOptions) -> Report {
    let reference_utc = reference_instant(dataset, options);
    let options = ReportOptions {
        now: Some(reference_utc),
        policy: options.policy,
    };

    let results: Vec<(StoreId, crate::Result<StoreReport>)> = dataset
        .stores()
        .into_par_iter()
        .map(|store_id| (store_id, build_store_report(dataset, store_id, &options)))
        .collect();

    let mut report = Report {
        reference_utc,
        policy: options.policy,
        rows: Vec::with_capacity(results.len()),
        failures: Vec::new(),
        empty_horizons: 0,
    };

    for (store_id, result) in results {
        match result {
            Ok(store) => {
                report.empty_horizons += store.empty_horizons();
                report.rows.push(store.row);
            }
            Err(e) => {
                error!(store_id = %store_id, error = %e, "Store estimation failed");
                report.failures.push(StoreFailure {
                    store_id,
                    error: e.to_string(),
                });
            }
        }
    }

    report.rows.sort_by_key(|row| row.store_id);
    debug!(
        rows = report.rows.len(),
        failures = report.failures.len(),
        empty_horizons = report.empty_horizons,
        reference = %reference_utc,
        "Report built"
    );
    report
}
