//! Observation feeds
//!
//! Loads polls, operating hours and store time zones into an in-memory
//! [`Dataset`] the report builder reads from. Poll timestamps arrive in UTC
//! and are converted to each store's local weekday and time of day here, so
//! the estimation core only ever sees local stamps.

mod csv_source;


pub use csv_source::{
    parse_utc_timestamp, CsvDirectorySource, HOURS_FILE, STATUS_FILE, TIMEZONES_FILE,
};

use crate::error::IngestError;
use crate::hours::OperatingHoursIndex;
use crate::models::{LocalStamp, Observation, StoreId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Zone used for stores missing from the time zone table
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Trait for dataset providers
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Load a full snapshot of observations and operating hours
    async fn load(&self) -> Result<Dataset, IngestError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// An input row dropped during ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub file: String,
    pub line: u64,
    pub reason: String,
}

/// Everything a report run needs, already converted to store-local time
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub hours: OperatingHoursIndex,
    pub rejected: Vec<RejectedRecord>,
    stores: BTreeSet<StoreId>,
    observations: HashMap<StoreId, Vec<Observation>>,
    timezones: HashMap<StoreId, Tz>,
    latest_poll_utc: Option<DateTime<Utc>>,
}

impl Dataset {
    pub fn new(hours: OperatingHoursIndex) -> Self {
        let stores = hours.stores().collect();
        Self {
            hours,
            stores,
            ..Default::default()
        }
    }

    /// Register a store that should appear in reports even without polls
    pub fn add_store(&mut self, store_id: StoreId) {
        self.stores.insert(store_id);
    }

    /// Append a poll to its store's feed; feeds must be pushed chronologically
    pub fn push_observation(&mut self, observation: Observation) {
        self.stores.insert(observation.store_id);
        self.observations
            .entry(observation.store_id)
            .or_default()
            .push(observation);
    }

    pub fn set_timezone(&mut self, store_id: StoreId, tz: Tz) {
        self.stores.insert(store_id);
        self.timezones.insert(store_id, tz);
    }

    /// Record the UTC time of a poll so the most recent one is known
    pub fn note_poll_time(&mut self, at: DateTime<Utc>) {
        if self.latest_poll_utc.map_or(true, |latest| at > latest) {
            self.latest_poll_utc = Some(at);
        }
    }

    /// All known stores, ascending
    pub fn stores(&self) -> Vec<StoreId> {
        self.stores.iter().copied().collect()
    }

    pub fn contains_store(&self, store_id: StoreId) -> bool {
        self.stores.contains(&store_id)
    }

    /// The store's polls in chronological order
    pub fn observations_for(&self, store_id: StoreId) -> &[Observation] {
        self.observations
            .get(&store_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn observation_count(&self) -> usize {
        self.observations.values().map(Vec::len).sum()
    }

    pub fn timezone_for(&self, store_id: StoreId) -> Tz {
        self.timezones
            .get(&store_id)
            .copied()
            .unwrap_or(DEFAULT_TIMEZONE)
    }

    /// Local stamp of a UTC instant in the store's zone
    pub fn local_stamp(&self, store_id: StoreId, at: DateTime<Utc>) -> LocalStamp {
        LocalStamp::from_datetime(&at.with_timezone(&self.timezone_for(store_id)))
    }

    /// UTC time of the most recent poll across all stores
    pub fn latest_poll_utc(&self) -> Option<DateTime<Utc>> {
        self.latest_poll_utc
    }
}

/// Source serving a fixed, preloaded dataset
#[derive(Debug, Clone)]
pub struct StaticSource {
    dataset: Dataset,
}

impl StaticSource {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl ObservationSource for StaticSource {
    async fn load(&self) -> Result<Dataset, IngestError> {
        Ok(self.dataset.clone())
    }

    fn describe(&self) -> String {
        format!("static dataset ({} stores)", self.dataset.stores.len())
    }
}
