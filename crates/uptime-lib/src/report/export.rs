//! CSV export of report rows

use crate::error::MonitorError;
use crate::models::ReportRow;
use std::io::Write;

pub const CSV_HEADER: [&str; 7] = [
    "store_id",
    "uptime_last_hour",
    "uptime_last_day",
    "uptime_last_week",
    "downtime_last_hour",
    "downtime_last_day",
    "downtime_last_week",
];

/// Write rows as CSV, figures rounded to two decimals
pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), MonitorError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for row in rows {
        csv.write_record([
            row.store_id.to_string(),
            format!("{:.2}", row.uptime_last_hour),
            format!("{:.2}", row.uptime_last_day),
            format!("{:.2}", row.uptime_last_week),
            format!("{:.2}", row.downtime_last_hour),
            format!("{:.2}", row.downtime_last_day),
            format!("{:.2}", row.downtime_last_week),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn to_csv_string(rows: &[ReportRow]) -> Result<String, MonitorError> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| MonitorError::Task(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Horizon, StoreId};

    #[test]
    fn test_header_and_rounding() {
        let mut row = ReportRow::empty(StoreId(42));
        row.set(Horizon::LastHour, 20 * 60, 40 * 60);
        row.set(Horizon::LastDay, 3600 * 20 + 1200, 3600 * 3 + 2400);

        let csv = to_csv_string(&[row]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "store_id,uptime_last_hour,uptime_last_day,uptime_last_week,\
             downtime_last_hour,downtime_last_day,downtime_last_week"
        );
        assert_eq!(lines.next().unwrap(), "42,20.00,20.33,0.00,40.00,3.67,0.00");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_report_has_only_header() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
