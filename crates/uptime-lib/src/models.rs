//! Core data models for store availability estimation

use crate::error::RecordError;
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seconds in one local day
pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Seconds in one local week
pub const SECS_PER_WEEK: i64 = 7 * SECS_PER_DAY;

/// Identifier of a monitored store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Two-valued status reported by a store poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            _ => Err(RecordError::InvalidStatus(s.to_string())),
        }
    }
}

/// Local weekday index, Monday = 0 through Sunday = 6
///
/// Matches chrono's `num_days_from_monday`. Observations and operating-hours
/// rules must both use this numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Weekday(u8);

impl Weekday {
    pub const MONDAY: Weekday = Weekday(0);
    pub const SUNDAY: Weekday = Weekday(6);

    /// Validate a raw `day_of_week` value
    pub fn new(index: i64) -> Result<Self, RecordError> {
        if (0..=6).contains(&index) {
            Ok(Weekday(index as u8))
        } else {
            Err(RecordError::InvalidWeekday(index))
        }
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// Weekday `days` before this one, wrapping around the week
    pub fn back(&self, days: i64) -> Weekday {
        Weekday((self.0 as i64 - days).rem_euclid(7) as u8)
    }

    pub fn previous(&self) -> Weekday {
        self.back(1)
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        Weekday(day.num_days_from_monday() as u8)
    }
}

impl<'de> Deserialize<'de> for Weekday {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let index = i64::deserialize(deserializer)?;
        Weekday::new(index).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        f.write_str(NAMES[self.0 as usize])
    }
}

/// A store-local (weekday, time-of-day) pair
///
/// Polls carry no calendar date once converted to local time, so this is the
/// only notion of "when" the estimation core works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalStamp {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl LocalStamp {
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// Local stamp of a zoned instant
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            weekday: Weekday::from_chrono(dt.weekday()),
            time: dt.time(),
        }
    }

    /// Whole seconds since local midnight
    pub fn seconds_of_day(&self) -> i64 {
        self.time.num_seconds_from_midnight() as i64
    }
}

impl fmt::Display for LocalStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.weekday, self.time.format("%H:%M:%S"))
    }
}

/// A single status poll in store-local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub store_id: StoreId,
    pub stamp: LocalStamp,
    pub status: Status,
}

impl Observation {
    pub fn new(store_id: StoreId, weekday: Weekday, time: NaiveTime, status: Status) -> Self {
        Self {
            store_id,
            stamp: LocalStamp::new(weekday, time),
            status,
        }
    }
}

/// Opening hours of one store on one weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHoursRule {
    pub store_id: StoreId,
    pub weekday: Weekday,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// Operating-hours record as read from `business_hours.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOperatingHours {
    pub store_id: u64,
    pub day_of_week: i64,
    pub start_time_local: String,
    pub end_time_local: String,
}

impl TryFrom<&RawOperatingHours> for OperatingHoursRule {
    type Error = RecordError;

    fn try_from(raw: &RawOperatingHours) -> Result<Self, Self::Error> {
        Ok(OperatingHoursRule {
            store_id: StoreId(raw.store_id),
            weekday: Weekday::new(raw.day_of_week)?,
            open: parse_local_time(&raw.start_time_local)?,
            close: parse_local_time(&raw.end_time_local)?,
        })
    }
}

/// Parse a `HH:MM:SS` local time, tolerating fractional seconds
pub fn parse_local_time(value: &str) -> Result<NaiveTime, RecordError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| RecordError::InvalidTime(value.to_string()))
}

/// Trailing estimation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    LastHour,
    LastDay,
    LastWeek,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::LastHour, Horizon::LastDay, Horizon::LastWeek];

    /// Window length in seconds
    pub fn length_secs(&self) -> i64 {
        match self {
            Horizon::LastHour => 60 * 60,
            Horizon::LastDay => SECS_PER_DAY,
            Horizon::LastWeek => SECS_PER_WEEK,
        }
    }

    /// Convert seconds into the unit reported for this horizon
    ///
    /// Minutes for the hour horizon, hours for day and week.
    pub fn to_report_units(&self, secs: i64) -> f64 {
        match self {
            Horizon::LastHour => secs as f64 / 60.0,
            Horizon::LastDay | Horizon::LastWeek => secs as f64 / 3600.0,
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match self {
            Horizon::LastHour => "min",
            Horizon::LastDay | Horizon::LastWeek => "h",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Horizon::LastHour => "last_hour",
            Horizon::LastDay => "last_day",
            Horizon::LastWeek => "last_week",
        })
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" | "last_hour" => Ok(Horizon::LastHour),
            "day" | "last_day" => Ok(Horizon::LastDay),
            "week" | "last_week" => Ok(Horizon::LastWeek),
            other => Err(format!("unknown horizon '{}', expected hour, day or week", other)),
        }
    }
}

/// A point on a synthesized availability timeline
///
/// `at` is measured in seconds from the start of the horizon window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub at: i64,
    pub status: Status,
    /// True for boundary points added by extrapolation
    pub synthetic: bool,
}

impl TimelinePoint {
    pub fn observed(at: i64, status: Status) -> Self {
        Self {
            at,
            status,
            synthetic: false,
        }
    }

    pub fn synthetic(at: i64, status: Status) -> Self {
        Self {
            at,
            status,
            synthetic: true,
        }
    }
}

/// One row of the availability report
///
/// Hour figures are minutes, day and week figures are hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub store_id: StoreId,
    pub uptime_last_hour: f64,
    pub uptime_last_day: f64,
    pub uptime_last_week: f64,
    pub downtime_last_hour: f64,
    pub downtime_last_day: f64,
    pub downtime_last_week: f64,
}

impl ReportRow {
    /// Row with every estimate at zero
    pub fn empty(store_id: StoreId) -> Self {
        Self {
            store_id,
            uptime_last_hour: 0.0,
            uptime_last_day: 0.0,
            uptime_last_week: 0.0,
            downtime_last_hour: 0.0,
            downtime_last_day: 0.0,
            downtime_last_week: 0.0,
        }
    }

    /// Store the active/inactive seconds of one horizon in report units
    pub fn set(&mut self, horizon: Horizon, active_secs: i64, inactive_secs: i64) {
        let uptime = horizon.to_report_units(active_secs);
        let downtime = horizon.to_report_units(inactive_secs);
        match horizon {
            Horizon::LastHour => {
                self.uptime_last_hour = uptime;
                self.downtime_last_hour = downtime;
            }
            Horizon::LastDay => {
                self.uptime_last_day = uptime;
                self.downtime_last_day = downtime;
            }
            Horizon::LastWeek => {
                self.uptime_last_week = uptime;
                self.downtime_last_week = downtime;
            }
        }
    }

    pub fn uptime(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::LastHour => self.uptime_last_hour,
            Horizon::LastDay => self.uptime_last_day,
            Horizon::LastWeek => self.uptime_last_week,
        }
    }

    pub fn downtime(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::LastHour => self.downtime_last_hour,
            Horizon::LastDay => self.downtime_last_day,
            Horizon::LastWeek => self.downtime_last_week,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_bounds() {
        assert!(Weekday::new(0).is_ok());
        assert!(Weekday::new(6).is_ok());
        assert_eq!(Weekday::new(7), Err(RecordError::InvalidWeekday(7)));
        assert_eq!(Weekday::new(-1), Err(RecordError::InvalidWeekday(-1)));
    }

    #[test]
    fn test_weekday_wraps_backwards() {
        assert_eq!(Weekday::MONDAY.previous(), Weekday::SUNDAY);
        assert_eq!(Weekday::new(3).unwrap().back(10), Weekday::new(0).unwrap());
    }

    #[test]
    fn test_weekday_matches_chrono_convention() {
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Mon), Weekday::MONDAY);
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Sun), Weekday::SUNDAY);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("active".parse::<Status>().unwrap(), Status::Active);
        assert_eq!(" Inactive ".parse::<Status>().unwrap(), Status::Inactive);
        assert!("open".parse::<Status>().is_err());
    }

    #[test]
    fn test_raw_operating_hours_conversion() {
        let raw = RawOperatingHours {
            store_id: 7,
            day_of_week: 2,
            start_time_local: "09:30:00".to_string(),
            end_time_local: "21:00".to_string(),
        };
        let rule = OperatingHoursRule::try_from(&raw).unwrap();
        assert_eq!(rule.store_id, StoreId(7));
        assert_eq!(rule.weekday, Weekday::new(2).unwrap());
        assert_eq!(rule.open, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(rule.close, NaiveTime::from_hms_opt(21, 0, 0).unwrap());

        let bad_time = RawOperatingHours {
            start_time_local: "25:99:00".to_string(),
            ..raw.clone()
        };
        assert!(matches!(
            OperatingHoursRule::try_from(&bad_time),
            Err(RecordError::InvalidTime(_))
        ));

        let bad_day = RawOperatingHours {
            day_of_week: 9,
            ..raw
        };
        assert!(matches!(
            OperatingHoursRule::try_from(&bad_day),
            Err(RecordError::InvalidWeekday(9))
        ));
    }

    #[test]
    fn test_report_units() {
        assert_eq!(Horizon::LastHour.to_report_units(1800), 30.0);
        assert_eq!(Horizon::LastDay.to_report_units(5400), 1.5);
        assert_eq!(Horizon::LastWeek.to_report_units(SECS_PER_WEEK), 168.0);
    }

    #[test]
    fn test_horizon_from_str() {
        assert_eq!("hour".parse::<Horizon>().unwrap(), Horizon::LastHour);
        assert_eq!("last_week".parse::<Horizon>().unwrap(), Horizon::LastWeek);
        assert!("month".parse::<Horizon>().is_err());
    }
}
