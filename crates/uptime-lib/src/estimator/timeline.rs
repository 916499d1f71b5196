//! Synthesized step-function timelines

use crate::models::{Status, TimelinePoint};
use serde::{Deserialize, Serialize};

/// Closed interval of timeline seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn intersect(&self, other: &Span) -> Option<Span> {
        let span = Span::new(self.start.max(other.start), self.end.min(other.end));
        (!span.is_empty()).then_some(span)
    }
}

/// Sort spans and merge the overlapping ones
pub fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.retain(|s| !s.is_empty());
    spans.sort_by_key(|s| s.start);

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Full-coverage status timeline over a window
///
/// Each point's status holds until the next point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub window: Span,
    pub points: Vec<TimelinePoint>,
}

impl Timeline {
    /// Consecutive (start, end, status) segments
    pub fn segments(&self) -> impl Iterator<Item = (i64, i64, Status)> + '_ {
        self.points
            .windows(2)
            .map(|pair| (pair[0].at, pair[1].at, pair[0].status))
    }

    /// Active and inactive seconds of the step function restricted to `spans`
    ///
    /// Spans are expected to be disjoint, see [`merge_spans`].
    pub fn integrate_over(&self, spans: &[Span]) -> (i64, i64) {
        let mut active = 0;
        let mut inactive = 0;
        for (start, end, status) in self.segments() {
            let segment = Span::new(start, end);
            let covered: i64 = spans
                .iter()
                .filter_map(|s| s.intersect(&segment))
                .map(|s| s.len())
                .sum();
            match status {
                Status::Active => active += covered,
                Status::Inactive => inactive += covered,
            }
        }
        (active, inactive)
    }

    pub fn synthetic_points(&self) -> usize {
        self.points.iter().filter(|p| p.synthetic).count()
    }
}
