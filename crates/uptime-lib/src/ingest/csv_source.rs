//! CSV directory source
//!
//! Reads `store_status.csv`, `business_hours.csv` and the optional
//! `store_timezones.csv` from one directory.

use super::{Dataset, ObservationSource, RejectedRecord, DEFAULT_TIMEZONE};
use crate::error::{IngestError, RecordError};
use crate::hours::OperatingHoursIndex;
use crate::models::{
    LocalStamp, Observation, OperatingHoursRule, RawOperatingHours, Status, StoreId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const STATUS_FILE: &str = "store_status.csv";
pub const HOURS_FILE: &str = "business_hours.csv";
pub const TIMEZONES_FILE: &str = "store_timezones.csv";

#[derive(Debug, Deserialize)]
struct StatusRecord {
    store_id: u64,
    timestamp_utc: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TimezoneRecord {
    store_id: u64,
    timezone_str: String,
}

/// Loads a dataset from a directory of CSV exports
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
    assume_open_when_unlisted: bool,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            assume_open_when_unlisted: false,
        }
    }

    /// Treat stores absent from the hours file as open around the clock
    pub fn with_assume_open_when_unlisted(mut self, assume_open: bool) -> Self {
        self.assume_open_when_unlisted = assume_open;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and convert all files on the current thread
    pub fn load_blocking(&self) -> Result<Dataset, IngestError> {
        let mut rejected = Vec::new();

        let timezones = self.load_timezones(&mut rejected)?;
        let hours = self.load_hours(&mut rejected)?;
        let mut dataset = Dataset::new(hours);
        for (store_id, tz) in timezones {
            dataset.set_timezone(store_id, tz);
        }

        let mut polls = self.load_polls(&mut rejected)?;
        // Stable sort: per-store feeds become chronological
        polls.sort_by_key(|(store_id, at, _)| (*store_id, *at));
        for (store_id, at, status) in polls {
            let local = at.with_timezone(&dataset.timezone_for(store_id));
            dataset.push_observation(Observation {
                store_id,
                stamp: LocalStamp::from_datetime(&local),
                status,
            });
            dataset.note_poll_time(at);
        }

        dataset.rejected = rejected;
        info!(
            dir = %self.dir.display(),
            stores = dataset.stores().len(),
            observations = dataset.observation_count(),
            rejected = dataset.rejected.len(),
            "Loaded CSV dataset"
        );
        Ok(dataset)
    }

    fn load_timezones(
        &self,
        rejected: &mut Vec<RejectedRecord>,
    ) -> Result<HashMap<StoreId, Tz>, IngestError> {
        let path = self.dir.join(TIMEZONES_FILE);
        if !path.exists() {
            info!(
                path = %path.display(),
                default = %DEFAULT_TIMEZONE,
                "No time zone file, using default zone for all stores"
            );
            return Ok(HashMap::new());
        }

        let mut timezones = HashMap::new();
        for (_, record) in read_records::<TimezoneRecord>(&path, rejected)? {
            let tz = record.timezone_str.trim().parse::<Tz>().unwrap_or_else(|_| {
                warn!(
                    store_id = record.store_id,
                    timezone = %record.timezone_str,
                    default = %DEFAULT_TIMEZONE,
                    "Unknown time zone, using default"
                );
                DEFAULT_TIMEZONE
            });
            timezones.entry(StoreId(record.store_id)).or_insert(tz);
        }
        Ok(timezones)
    }

    fn load_hours(
        &self,
        rejected: &mut Vec<RejectedRecord>,
    ) -> Result<OperatingHoursIndex, IngestError> {
        let path = self.dir.join(HOURS_FILE);
        let mut index = OperatingHoursIndex::new()
            .with_assume_open_when_unlisted(self.assume_open_when_unlisted);

        for (line, record) in read_records::<RawOperatingHours>(&path, rejected)? {
            match OperatingHoursRule::try_from(&record) {
                Ok(rule) => {
                    index.insert(rule);
                }
                Err(e) => reject(rejected, HOURS_FILE, line, &e),
            }
        }
        Ok(index)
    }

    fn load_polls(
        &self,
        rejected: &mut Vec<RejectedRecord>,
    ) -> Result<Vec<(StoreId, DateTime<Utc>, Status)>, IngestError> {
        let path = self.dir.join(STATUS_FILE);
        let mut polls = Vec::new();

        for (line, record) in read_records::<StatusRecord>(&path, rejected)? {
            let parsed = parse_utc_timestamp(&record.timestamp_utc)
                .and_then(|at| Ok((at, record.status.parse::<Status>()?)));
            match parsed {
                Ok((at, status)) => polls.push((StoreId(record.store_id), at, status)),
                Err(e) => reject(rejected, STATUS_FILE, line, &e),
            }
        }
        Ok(polls)
    }
}

#[async_trait]
impl ObservationSource for CsvDirectorySource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.load_blocking())
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?
    }

    fn describe(&self) -> String {
        format!("csv directory {}", self.dir.display())
    }
}

/// Deserialize every row of a CSV file, collecting malformed rows as rejects
fn read_records<T: DeserializeOwned>(
    path: &Path,
    rejected: &mut Vec<RejectedRecord>,
) -> Result<Vec<(u64, T)>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut records = Vec::new();
    // Line 1 is the header
    for (index, result) in reader.deserialize::<T>().enumerate() {
        let line = index as u64 + 2;
        match result {
            Ok(record) => records.push((line, record)),
            Err(e) if e.is_io_error() => {
                return Err(IngestError::Csv {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => reject(rejected, &file, line, &RecordError::Malformed(e.to_string())),
        }
    }
    Ok(records)
}

fn reject(rejected: &mut Vec<RejectedRecord>, file: &str, line: u64, error: &RecordError) {
    warn!(
        event = "record_rejected",
        file = %file,
        line = line,
        reason = %error,
        "Dropping malformed record"
    );
    rejected.push(RejectedRecord {
        file: file.to_string(),
        line,
        reason: error.to_string(),
    });
}

/// Parse a poll timestamp in UTC
///
/// Accepts RFC 3339 as well as `YYYY-MM-DD HH:MM:SS[.fff][ UTC]`.
pub fn parse_utc_timestamp(value: &str) -> Result<DateTime<Utc>, RecordError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = trimmed.strip_suffix("UTC").map(str::trim_end).unwrap_or(trimmed);
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
        .ok_or_else(|| RecordError::InvalidTimestamp(value.to_string()))
}
