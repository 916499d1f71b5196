//! Forward-hold gap filling
//!
//! Reconstructs a step function from sparse status polls: each poll's status
//! holds until the next poll, the first poll's status is carried back to the
//! window start and the last poll's status is carried forward to the window
//! end. Integrating that step function gives active and inactive time.

use super::timeline::{Span, Timeline};
use crate::error::EstimateError;
use crate::models::{Status, TimelinePoint};
use serde::{Deserialize, Serialize};

/// Active/inactive seconds for one window, with the timeline they came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Active seconds strictly between two real polls
    pub observed_active: i64,
    /// Inactive seconds strictly between two real polls
    pub observed_inactive: i64,
    /// Total active seconds, including boundary extrapolation
    pub estimated_active: i64,
    /// Total inactive seconds, including boundary extrapolation
    pub estimated_inactive: i64,
    pub timeline: Timeline,
}

impl Estimate {
    /// Active plus inactive seconds; equals the window length
    pub fn total(&self) -> i64 {
        self.estimated_active + self.estimated_inactive
    }

    /// Seconds attributed by extrapolation rather than bracketed by real polls
    pub fn extrapolated(&self) -> i64 {
        self.total() - self.observed_active - self.observed_inactive
    }

    /// Active and inactive seconds restricted to the given disjoint spans
    pub fn integrate_over(&self, spans: &[Span]) -> (i64, i64) {
        self.timeline.integrate_over(spans)
    }
}

/// Estimate active and inactive time over `window`
///
/// `points` must be non-empty, ascending by `at`, and inside the window.
/// Calling this with no points is a caller bug; an empty selection should be
/// reported as an all-zero result without invoking the estimator.
pub fn estimate(points: &[TimelinePoint], window: Span) -> Result<Estimate, EstimateError> {
    validate(points, window)?;

    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(EstimateError::EmptyObservations),
    };

    let mut timeline = Vec::with_capacity(points.len() + 2);
    if first.at > window.start {
        timeline.push(TimelinePoint::synthetic(window.start, first.status));
    }
    timeline.extend(points.iter().map(|p| TimelinePoint::observed(p.at, p.status)));
    if last.at < window.end {
        timeline.push(TimelinePoint::synthetic(window.end, last.status));
    }

    let mut estimate = Estimate {
        observed_active: 0,
        observed_inactive: 0,
        estimated_active: 0,
        estimated_inactive: 0,
        timeline: Timeline {
            window,
            points: Vec::new(),
        },
    };

    // The earlier point's status governs the gap up to the next point.
    for pair in timeline.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let duration = to.at - from.at;
        let bracketed = !from.synthetic && !to.synthetic;
        match from.status {
            Status::Active => {
                estimate.estimated_active += duration;
                if bracketed {
                    estimate.observed_active += duration;
                }
            }
            Status::Inactive => {
                estimate.estimated_inactive += duration;
                if bracketed {
                    estimate.observed_inactive += duration;
                }
            }
        }
    }

    estimate.timeline.points = timeline;
    debug_assert_eq!(estimate.total(), window.len());
    Ok(estimate)
}

fn validate(points: &[TimelinePoint], window: Span) -> Result<(), EstimateError> {
    if window.end < window.start {
        return Err(EstimateError::InvalidWindow {
            start: window.start,
            end: window.end,
        });
    }
    if points.is_empty() {
        return Err(EstimateError::EmptyObservations);
    }
    for (index, point) in points.iter().enumerate() {
        if point.at < window.start || point.at > window.end {
            return Err(EstimateError::OutsideWindow {
                index,
                at: point.at,
                start: window.start,
                end: window.end,
            });
        }
        if index > 0 && point.at < points[index - 1].at {
            return Err(EstimateError::OutOfOrder { index });
        }
    }
    Ok(())
}
