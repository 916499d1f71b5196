//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use uptime_lib::{Horizon, ReportRow};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Warnings go to stderr so JSON on stdout stays parseable
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a figure in the unit its horizon reports in
pub fn format_figure(horizon: Horizon, value: f64) -> String {
    format!("{:.2}{}", value, horizon.unit_label())
}

/// Format a timeline offset in seconds as `+HH:MM:SS` (days shown when present)
pub fn format_offset(secs: i64) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    if days > 0 {
        format!("+{}d {:02}:{:02}:{:02}", days, h, m, s)
    } else {
        format!("+{:02}:{:02}:{:02}", h, m, s)
    }
}

/// Share of a horizon a store was up, as a percentage
pub fn uptime_percent(uptime: f64, downtime: f64) -> Option<f64> {
    let total = uptime + downtime;
    (total > 0.0).then(|| uptime / total * 100.0)
}

/// Color an uptime percentage by threshold
pub fn color_percent(percent: Option<f64>) -> String {
    match percent {
        None => "n/a".dimmed().to_string(),
        Some(p) if p >= 95.0 => format!("{:.1}%", p).green().to_string(),
        Some(p) if p >= 80.0 => format!("{:.1}%", p).yellow().to_string(),
        Some(p) => format!("{:.1}%", p).red().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "active" | "complete" => status.green().to_string(),
        "running" => status.blue().to_string(),
        "inactive" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Table row for one store of a report
#[derive(Tabled, Serialize)]
pub struct ReportTableRow {
    #[tabled(rename = "Store")]
    pub store_id: String,
    #[tabled(rename = "Up 1h")]
    pub uptime_last_hour: String,
    #[tabled(rename = "Down 1h")]
    pub downtime_last_hour: String,
    #[tabled(rename = "Up 24h")]
    pub uptime_last_day: String,
    #[tabled(rename = "Down 24h")]
    pub downtime_last_day: String,
    #[tabled(rename = "Up 7d")]
    pub uptime_last_week: String,
    #[tabled(rename = "Down 7d")]
    pub downtime_last_week: String,
    #[tabled(rename = "Week uptime")]
    pub week_percent: String,
}

impl From<&ReportRow> for ReportTableRow {
    fn from(row: &ReportRow) -> Self {
        Self {
            store_id: row.store_id.to_string(),
            uptime_last_hour: format_figure(Horizon::LastHour, row.uptime_last_hour),
            downtime_last_hour: format_figure(Horizon::LastHour, row.downtime_last_hour),
            uptime_last_day: format_figure(Horizon::LastDay, row.uptime_last_day),
            downtime_last_day: format_figure(Horizon::LastDay, row.downtime_last_day),
            uptime_last_week: format_figure(Horizon::LastWeek, row.uptime_last_week),
            downtime_last_week: format_figure(Horizon::LastWeek, row.downtime_last_week),
            week_percent: color_percent(uptime_percent(
                row.uptime_last_week,
                row.downtime_last_week,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uptime_lib::StoreId;

    #[test]
    fn test_format_figure_uses_horizon_unit() {
        assert_eq!(format_figure(Horizon::LastHour, 42.0), "42.00min");
        assert_eq!(format_figure(Horizon::LastWeek, 1.5), "1.50h");
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "+00:00:00");
        assert_eq!(format_offset(3661), "+01:01:01");
        assert_eq!(format_offset(86_400 + 60), "+1d 00:01:00");
    }

    #[test]
    fn test_uptime_percent() {
        assert_eq!(uptime_percent(0.0, 0.0), None);
        assert_eq!(uptime_percent(3.0, 1.0), Some(75.0));
    }

    #[test]
    fn test_table_row_from_report_row() {
        let mut row = ReportRow::empty(StoreId(9));
        row.set(Horizon::LastHour, 30 * 60, 30 * 60);
        let table_row = ReportTableRow::from(&row);
        assert_eq!(table_row.store_id, "9");
        assert_eq!(table_row.uptime_last_hour, "30.00min");
        assert_eq!(table_row.uptime_last_day, "0.00h");
    }
}
