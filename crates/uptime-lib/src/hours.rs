//! Operating-hours index
//!
//! Maps (store, weekday) to the local open interval for that day. A missing
//! entry means the store has no operating hours that day and all of its data
//! for that weekday is excluded from estimation.

use crate::models::{LocalStamp, OperatingHoursRule, StoreId, Weekday, SECS_PER_DAY};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Local open/close interval of one store on one weekday
///
/// A close earlier than the open denotes hours running past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInterval {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl OpenInterval {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Open for the whole local day
    pub fn all_day() -> Self {
        Self {
            open: NaiveTime::MIN,
            close: end_of_day(),
        }
    }

    pub fn is_overnight(&self) -> bool {
        self.close < self.open
    }

    /// Whether the interval runs to the end of the local day
    pub fn ends_at_midnight(&self) -> bool {
        self.close == end_of_day()
    }

    /// Inclusive membership test for a local time of day
    ///
    /// An interval closing at 23:59:59 also covers the fractional second
    /// before midnight.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.is_overnight() {
            time >= self.open || time <= self.close
        } else if self.ends_at_midnight() {
            self.open <= time
        } else {
            self.open <= time && time <= self.close
        }
    }

    /// Open spans in seconds from the local midnight of the interval's weekday
    ///
    /// Both pieces of an overnight interval stay on its own weekday: the early
    /// hours up to the close, then the evening from the open to midnight. This
    /// matches `contains`, which judges a time against its own weekday's rule.
    pub fn day_spans(&self) -> Vec<(i64, i64)> {
        let open = self.open.num_seconds_from_midnight() as i64;
        let close = if self.ends_at_midnight() {
            SECS_PER_DAY
        } else {
            self.close.num_seconds_from_midnight() as i64
        };
        if self.is_overnight() {
            vec![(0, close), (open, SECS_PER_DAY)]
        } else {
            vec![(open, close)]
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Lookup table of operating hours keyed by store and weekday
#[derive(Debug, Clone, Default)]
pub struct OperatingHoursIndex {
    rules: HashMap<(StoreId, Weekday), OpenInterval>,
    listed: HashSet<StoreId>,
    assume_open_when_unlisted: bool,
    duplicates: usize,
}

impl OperatingHoursIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from rules in input order
    pub fn from_rules(rules: impl IntoIterator<Item = OperatingHoursRule>) -> Self {
        let mut index = Self::new();
        for rule in rules {
            index.insert(rule);
        }
        index
    }

    /// Treat stores with no rules at all as open around the clock
    ///
    /// Stores that have at least one rule keep strict per-weekday semantics.
    pub fn with_assume_open_when_unlisted(mut self, assume_open: bool) -> Self {
        self.assume_open_when_unlisted = assume_open;
        self
    }

    /// Add a rule; the first rule for a (store, weekday) wins
    ///
    /// Returns false when the rule was ignored as a duplicate.
    pub fn insert(&mut self, rule: OperatingHoursRule) -> bool {
        self.listed.insert(rule.store_id);
        let key = (rule.store_id, rule.weekday);
        if self.rules.contains_key(&key) {
            self.duplicates += 1;
            debug!(
                store_id = %rule.store_id,
                weekday = rule.weekday.index(),
                "Ignoring duplicate operating-hours rule"
            );
            return false;
        }
        self.rules.insert(key, OpenInterval::new(rule.open, rule.close));
        true
    }

    /// Open interval for a store on a weekday, if it operates that day
    pub fn lookup(&self, store_id: StoreId, weekday: Weekday) -> Option<OpenInterval> {
        if let Some(interval) = self.rules.get(&(store_id, weekday)) {
            return Some(*interval);
        }
        if self.assume_open_when_unlisted && !self.listed.contains(&store_id) {
            return Some(OpenInterval::all_day());
        }
        None
    }

    /// Whether a local stamp falls inside the store's hours for its own weekday
    pub fn is_open(&self, store_id: StoreId, stamp: LocalStamp) -> bool {
        self.lookup(store_id, stamp.weekday)
            .map(|interval| interval.contains(stamp.time))
            .unwrap_or(false)
    }

    /// Stores with at least one rule
    pub fn stores(&self) -> impl Iterator<Item = StoreId> + '_ {
        self.listed.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules ignored as duplicates
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule(store: u64, day: i64, open: NaiveTime, close: NaiveTime) -> OperatingHoursRule {
        OperatingHoursRule {
            store_id: StoreId(store),
            weekday: Weekday::new(day).unwrap(),
            open,
            close,
        }
    }

    #[test]
    fn test_lookup_missing_weekday_is_closed() {
        let index = OperatingHoursIndex::from_rules([rule(1, 2, t(8, 0), t(22, 0))]);
        assert!(index.lookup(StoreId(1), Weekday::new(2).unwrap()).is_some());
        assert!(index.lookup(StoreId(1), Weekday::new(3).unwrap()).is_none());
        assert!(index.lookup(StoreId(2), Weekday::new(2).unwrap()).is_none());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let mut index = OperatingHoursIndex::new();
        assert!(index.insert(rule(1, 0, t(8, 0), t(12, 0))));
        assert!(!index.insert(rule(1, 0, t(13, 0), t(20, 0))));

        let interval = index.lookup(StoreId(1), Weekday::MONDAY).unwrap();
        assert_eq!(interval.open, t(8, 0));
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_inclusive_bounds() {
        let interval = OpenInterval::new(t(8, 0), t(22, 0));
        assert!(interval.contains(t(8, 0)));
        assert!(interval.contains(t(22, 0)));
        assert!(!interval.contains(t(7, 59)));
        assert!(!interval.contains(t(22, 1)));
    }

    #[test]
    fn test_overnight_interval() {
        let interval = OpenInterval::new(t(20, 0), t(2, 0));
        assert!(interval.is_overnight());
        assert!(interval.contains(t(23, 0)));
        assert!(interval.contains(t(1, 0)));
        assert!(!interval.contains(t(12, 0)));
        assert_eq!(
            interval.day_spans(),
            vec![(0, 2 * 3600), (20 * 3600, SECS_PER_DAY)]
        );
    }

    #[test]
    fn test_all_day_span_covers_whole_day() {
        assert_eq!(OpenInterval::all_day().day_spans(), vec![(0, SECS_PER_DAY)]);
    }

    #[test]
    fn test_all_day_contains_last_fraction_of_second() {
        let late = NaiveTime::from_hms_milli_opt(23, 59, 59, 500).unwrap();
        assert!(OpenInterval::all_day().contains(late));

        let index = OperatingHoursIndex::new().with_assume_open_when_unlisted(true);
        assert!(index.is_open(StoreId(3), LocalStamp::new(Weekday::SUNDAY, late)));
    }

    #[test]
    fn test_assume_open_only_for_unlisted_stores() {
        let index = OperatingHoursIndex::from_rules([rule(1, 0, t(8, 0), t(9, 0))])
            .with_assume_open_when_unlisted(true);

        // Listed store keeps its per-day rules
        assert!(index.lookup(StoreId(1), Weekday::SUNDAY).is_none());
        // Unlisted store is open all day
        assert_eq!(
            index.lookup(StoreId(5), Weekday::SUNDAY),
            Some(OpenInterval::all_day())
        );
    }

    #[test]
    fn test_is_open_uses_stamp_weekday() {
        let index = OperatingHoursIndex::from_rules([rule(1, 4, t(8, 0), t(22, 0))]);
        let friday_noon = LocalStamp::new(Weekday::new(4).unwrap(), t(12, 0));
        let saturday_noon = LocalStamp::new(Weekday::new(5).unwrap(), t(12, 0));
        assert!(index.is_open(StoreId(1), friday_noon));
        assert!(!index.is_open(StoreId(1), saturday_noon));
    }
}
