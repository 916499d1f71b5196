//! Observation window selection
//!
//! Picks the polls of one store that belong to a horizon ending at a
//! reference stamp, keeps only those taken during operating hours for their
//! own weekday, and orders them on the horizon timeline.

mod frame;

pub use frame::HorizonFrame;

use crate::hours::OperatingHoursIndex;
use crate::models::{Horizon, LocalStamp, Observation, StoreId, TimelinePoint};
use serde::{Deserialize, Serialize};

/// An observation with its position on the horizon timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedObservation {
    pub observation: Observation,
    pub at: i64,
}

/// Observations selected for one (store, horizon) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub frame: HorizonFrame,
    pub placed: Vec<PlacedObservation>,
    /// Polls outside the horizon window
    pub outside_window: usize,
    /// Polls inside the window but outside operating hours
    pub outside_hours: usize,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    /// Timeline points for the estimator, ascending by position
    pub fn points(&self) -> Vec<TimelinePoint> {
        self.placed
            .iter()
            .map(|p| TimelinePoint::observed(p.at, p.observation.status))
            .collect()
    }
}

/// Select the polls of `store_id` that count toward `horizon`
///
/// Polls of other stores are ignored. Ties in position keep input order.
pub fn select(
    store_id: StoreId,
    observations: &[Observation],
    reference: LocalStamp,
    horizon: Horizon,
    hours: &OperatingHoursIndex,
) -> Selection {
    let frame = HorizonFrame::new(horizon, reference);
    let mut selection = Selection {
        frame,
        placed: Vec::new(),
        outside_window: 0,
        outside_hours: 0,
    };

    for observation in observations.iter().filter(|o| o.store_id == store_id) {
        let Some(at) = frame.place(observation.stamp) else {
            selection.outside_window += 1;
            continue;
        };
        if !hours.is_open(store_id, observation.stamp) {
            selection.outside_hours += 1;
            continue;
        }
        selection.placed.push(PlacedObservation {
            observation: *observation,
            at,
        });
    }

    selection.placed.sort_by_key(|p| p.at);
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OperatingHoursRule, Status, Weekday};
    use chrono::NaiveTime;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn poll(store: u64, day: i64, h: u32, m: u32, status: Status) -> Observation {
        Observation::new(StoreId(store), Weekday::new(day).unwrap(), time(h, m), status)
    }

    fn hours_for(store: u64, days: &[i64]) -> OperatingHoursIndex {
        OperatingHoursIndex::from_rules(days.iter().map(|&d| OperatingHoursRule {
            store_id: StoreId(store),
            weekday: Weekday::new(d).unwrap(),
            open: time(8, 0),
            close: time(22, 0),
        }))
    }

    fn reference(day: i64, h: u32, m: u32) -> LocalStamp {
        LocalStamp::new(Weekday::new(day).unwrap(), time(h, m))
    }

    #[test]
    fn test_hour_selection_filters_window_and_hours() {
        let hours = hours_for(1, &[2]);
        let polls = vec![
            poll(1, 2, 7, 45, Status::Active),   // in window, before opening
            poll(1, 2, 8, 10, Status::Inactive), // selected
            poll(1, 2, 7, 0, Status::Active),    // outside window
            poll(1, 1, 8, 30, Status::Active),   // other weekday
            poll(2, 2, 8, 30, Status::Active),   // other store
            poll(1, 2, 8, 40, Status::Active),   // selected
        ];

        let selection = select(StoreId(1), &polls, reference(2, 8, 45), Horizon::LastHour, &hours);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.outside_hours, 1);
        assert_eq!(selection.outside_window, 2);
        assert_eq!(selection.placed[0].at, 3600 - 35 * 60);
        assert_eq!(selection.placed[1].at, 3600 - 5 * 60);
    }

    #[test]
    fn test_day_selection_orders_across_midnight() {
        let hours = hours_for(1, &[1, 2]);
        let polls = vec![
            poll(1, 2, 9, 0, Status::Active),
            poll(1, 1, 21, 0, Status::Inactive),
            poll(1, 1, 9, 0, Status::Active), // before the window start on the previous day
        ];

        let selection = select(StoreId(1), &polls, reference(2, 10, 0), Horizon::LastDay, &hours);
        let statuses: Vec<Status> = selection.placed.iter().map(|p| p.observation.status).collect();
        assert_eq!(statuses, vec![Status::Inactive, Status::Active]);
        assert_eq!(selection.outside_window, 1);
    }

    #[test]
    fn test_day_selection_checks_hours_per_own_weekday() {
        // Open on the reference day only
        let hours = hours_for(1, &[2]);
        let polls = vec![
            poll(1, 1, 12, 0, Status::Inactive),
            poll(1, 2, 9, 0, Status::Active),
        ];

        let selection = select(StoreId(1), &polls, reference(2, 10, 0), Horizon::LastDay, &hours);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.outside_hours, 1);
    }

    #[test]
    fn test_week_selection_uses_full_history() {
        let hours = hours_for(1, &[0, 1, 2, 3, 4, 5, 6]);
        let polls: Vec<Observation> = (0..7)
            .map(|d| poll(1, d, 12, 0, Status::Active))
            .collect();

        let selection = select(StoreId(1), &polls, reference(2, 10, 0), Horizon::LastWeek, &hours);
        assert_eq!(selection.len(), 7);
        assert_eq!(selection.outside_window, 0);
        assert!(selection.placed.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn test_no_rules_means_nothing_selected() {
        let hours = OperatingHoursIndex::new();
        let polls = vec![poll(1, 2, 9, 0, Status::Active)];
        let selection = select(StoreId(1), &polls, reference(2, 10, 0), Horizon::LastDay, &hours);
        assert!(selection.is_empty());
        assert_eq!(selection.outside_hours, 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let hours = hours_for(1, &[2]);
        let polls = vec![
            poll(1, 2, 9, 30, Status::Inactive),
            poll(1, 2, 9, 30, Status::Active),
        ];
        let selection = select(StoreId(1), &polls, reference(2, 10, 0), Horizon::LastHour, &hours);
        let points = selection.points();
        assert_eq!(points[0].status, Status::Inactive);
        assert_eq!(points[1].status, Status::Active);
    }
}
