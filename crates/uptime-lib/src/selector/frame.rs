//! Placement of local stamps on a horizon timeline
//!
//! A frame fixes the reference stamp the window ends at. Timeline seconds run
//! from 0 at the window start to the horizon length at the reference.

use crate::estimator::{merge_spans, Span};
use crate::hours::OperatingHoursIndex;
use crate::models::{Horizon, LocalStamp, StoreId, SECS_PER_DAY, SECS_PER_WEEK};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonFrame {
    pub horizon: Horizon,
    pub reference: LocalStamp,
}

impl HorizonFrame {
    pub fn new(horizon: Horizon, reference: LocalStamp) -> Self {
        Self { horizon, reference }
    }

    /// Bounding interval of the horizon
    pub fn window(&self) -> Span {
        Span::new(0, self.horizon.length_secs())
    }

    /// Timeline position of `stamp`, or None if the horizon excludes it
    ///
    /// - Hour: reference weekday only, at most one hour before the reference.
    /// - Day: reference weekday up to the reference time, or the previous
    ///   weekday from the reference time onwards.
    /// - Week: every stamp, folded onto the week ending at the reference.
    pub fn place(&self, stamp: LocalStamp) -> Option<i64> {
        let back = self.distance_back(stamp)?;
        Some(self.horizon.length_secs() - back)
    }

    fn distance_back(&self, stamp: LocalStamp) -> Option<i64> {
        let ref_tod = self.reference.seconds_of_day();
        let tod = stamp.seconds_of_day();
        let same_day = stamp.weekday == self.reference.weekday;

        match self.horizon {
            Horizon::LastHour => {
                let back = ref_tod - tod;
                (same_day && (0..=self.horizon.length_secs()).contains(&back)).then_some(back)
            }
            Horizon::LastDay => {
                if same_day && tod <= ref_tod {
                    Some(ref_tod - tod)
                } else if stamp.weekday == self.reference.weekday.previous() && tod >= ref_tod {
                    Some(SECS_PER_DAY + ref_tod - tod)
                } else {
                    None
                }
            }
            Horizon::LastWeek => {
                let days = self.reference.weekday.index() as i64 - stamp.weekday.index() as i64;
                Some((days * SECS_PER_DAY + ref_tod - tod).rem_euclid(SECS_PER_WEEK))
            }
        }
    }

    /// Disjoint spans of the window during which the store is open
    pub fn open_spans(&self, store_id: StoreId, hours: &OperatingHoursIndex) -> Vec<Span> {
        let window = self.window();
        let len = self.horizon.length_secs();
        let ref_tod = self.reference.seconds_of_day();
        let days = (len + SECS_PER_DAY - 1) / SECS_PER_DAY;

        let spans = (0..=days)
            .filter_map(|d| {
                let weekday = self.reference.weekday.back(d);
                let interval = hours.lookup(store_id, weekday)?;
                Some((len - ref_tod - d * SECS_PER_DAY, interval))
            })
            .flat_map(|(midnight, interval)| {
                interval.day_spans().into_iter().filter_map(move |(open, close)| {
                    Span::new(midnight + open, midnight + close).intersect(&window)
                })
            })
            .collect();

        merge_spans(spans)
    }
}
