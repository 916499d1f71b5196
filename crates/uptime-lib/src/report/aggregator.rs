//! Per-store aggregation across the three horizons

use crate::error::MonitorError;
use crate::estimator::{estimate, Estimate};
use crate::hours::OperatingHoursIndex;
use crate::models::{Horizon, LocalStamp, Observation, ReportRow, StoreId};
use crate::selector::{select, HorizonFrame};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Which part of a horizon window the reported figures cover
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// The whole trailing window; active + inactive equals its length
    #[default]
    FullHorizon,
    /// Only the parts of the window inside operating hours
    OperatingHoursOnly,
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowPolicy::FullHorizon => "full_horizon",
            WindowPolicy::OperatingHoursOnly => "operating_hours_only",
        })
    }
}

impl FromStr for WindowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "full_horizon" => Ok(WindowPolicy::FullHorizon),
            "hours" | "operating_hours_only" => Ok(WindowPolicy::OperatingHoursOnly),
            other => Err(format!("unknown window policy '{}', expected full or hours", other)),
        }
    }
}

/// Result of one horizon for one store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HorizonOutcome {
    /// No eligible observations; reported as zero
    Empty,
    Estimated(Estimate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonReport {
    pub horizon: Horizon,
    /// None when the store has no observations to anchor the window on
    pub frame: Option<HorizonFrame>,
    pub selected: usize,
    pub active_secs: i64,
    pub inactive_secs: i64,
    pub outcome: HorizonOutcome,
}

impl HorizonReport {
    fn empty(horizon: Horizon, frame: Option<HorizonFrame>) -> Self {
        Self {
            horizon,
            frame,
            selected: 0,
            active_secs: 0,
            inactive_secs: 0,
            outcome: HorizonOutcome::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.outcome, HorizonOutcome::Empty)
    }
}

/// Report row for one store plus the per-horizon detail behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReport {
    pub row: ReportRow,
    pub horizons: Vec<HorizonReport>,
}

impl StoreReport {
    pub fn horizon(&self, horizon: Horizon) -> Option<&HorizonReport> {
        self.horizons.iter().find(|h| h.horizon == horizon)
    }

    pub fn empty_horizons(&self) -> usize {
        self.horizons.iter().filter(|h| h.is_empty()).count()
    }
}

/// Estimate uptime and downtime of one store over the last hour, day and week
///
/// `observations` is the store's feed in chronological order; its last entry
/// anchors the hour and day windows. The week window ends at `now`.
pub fn aggregate(
    store_id: StoreId,
    observations: &[Observation],
    hours: &OperatingHoursIndex,
    now: LocalStamp,
    policy: WindowPolicy,
) -> Result<StoreReport, MonitorError> {
    let latest = observations
        .iter()
        .rev()
        .find(|o| o.store_id == store_id)
        .map(|o| o.stamp);

    let mut row = ReportRow::empty(store_id);
    let mut horizons = Vec::with_capacity(Horizon::ALL.len());

    for horizon in Horizon::ALL {
        let reference = match horizon {
            Horizon::LastWeek => Some(now),
            Horizon::LastHour | Horizon::LastDay => latest,
        };
        let report = match reference {
            Some(reference) => {
                estimate_horizon(store_id, observations, hours, reference, horizon, policy)?
            }
            None => HorizonReport::empty(horizon, None),
        };
        row.set(horizon, report.active_secs, report.inactive_secs);
        horizons.push(report);
    }

    Ok(StoreReport { row, horizons })
}

fn estimate_horizon(
    store_id: StoreId,
    observations: &[Observation],
    hours: &OperatingHoursIndex,
    reference: LocalStamp,
    horizon: Horizon,
    policy: WindowPolicy,
) -> Result<HorizonReport, MonitorError> {
    let selection = select(store_id, observations, reference, horizon, hours);
    let frame = selection.frame;

    if selection.is_empty() {
        debug!(
            event = "horizon_empty",
            store_id = %store_id,
            horizon = %horizon,
            reference = %reference,
            outside_window = selection.outside_window,
            outside_hours = selection.outside_hours,
            "No eligible observations, reporting zero"
        );
        return Ok(HorizonReport::empty(horizon, Some(frame)));
    }

    let estimate = estimate(&selection.points(), frame.window()).map_err(|source| {
        MonitorError::Estimate {
            store_id,
            horizon,
            source,
        }
    })?;

    let (active_secs, inactive_secs) = match policy {
        WindowPolicy::FullHorizon => (estimate.estimated_active, estimate.estimated_inactive),
        WindowPolicy::OperatingHoursOnly => {
            estimate.integrate_over(&frame.open_spans(store_id, hours))
        }
    };

    trace!(
        event = "timeline_synthesized",
        store_id = %store_id,
        horizon = %horizon,
        points = estimate.timeline.points.len(),
        synthetic = estimate.timeline.synthetic_points(),
        observed_secs = estimate.observed_active + estimate.observed_inactive,
        extrapolated_secs = estimate.extrapolated(),
        "Timeline synthesized"
    );

    Ok(HorizonReport {
        horizon,
        frame: Some(frame),
        selected: selection.len(),
        active_secs,
        inactive_secs,
        outcome: HorizonOutcome::Estimated(estimate),
    })
}
