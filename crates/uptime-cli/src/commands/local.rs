//! Commands that compute reports from local CSV exports

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tabled::Tabled;
use tracing::debug;
use uptime_lib::{
    ingest::parse_utc_timestamp,
    report::{build_report, build_store_report, write_csv, HorizonOutcome, ReportOptions},
    CsvDirectorySource, Dataset, Horizon, ObservationSource, StoreId, StoreReport, WindowPolicy,
};

use crate::output::{
    color_percent, color_status, format_figure, format_offset, print_info, print_json,
    print_success, print_table, print_warning, uptime_percent, OutputFormat, ReportTableRow,
};

/// Row for a synthesized timeline table
#[derive(Tabled, Serialize)]
struct TimelineRow {
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// Options shared by local commands
pub struct LocalOptions {
    pub data: PathBuf,
    pub policy: WindowPolicy,
    pub now: Option<String>,
    pub assume_open: bool,
}

impl LocalOptions {
    fn report_options(&self) -> Result<ReportOptions> {
        let mut options = ReportOptions::default().with_policy(self.policy);
        if let Some(now) = &self.now {
            let now = parse_utc_timestamp(now).context("Invalid --now timestamp")?;
            options = options.with_now(now);
        }
        Ok(options)
    }

    async fn load(&self) -> Result<Dataset> {
        let source = CsvDirectorySource::new(&self.data)
            .with_assume_open_when_unlisted(self.assume_open);
        debug!(dir = %self.data.display(), policy = %self.policy, "Loading local dataset");
        let dataset = source
            .load()
            .await
            .with_context(|| format!("Failed to load {}", source.describe()))?;

        if !dataset.rejected.is_empty() {
            print_warning(&format!(
                "{} malformed records were skipped (run with --verbose for details)",
                dataset.rejected.len()
            ));
        }
        Ok(dataset)
    }
}

/// Build the full report and print it or write it as CSV
pub async fn run_report(
    options: &LocalOptions,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let dataset = options.load().await?;
    let report_options = options.report_options()?;
    let report = tokio::task::spawn_blocking(move || build_report(&dataset, &report_options))
        .await
        .context("Report task failed")?;

    if let Some(path) = output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_csv(&report.rows, file)?;
        print_success(&format!(
            "Wrote {} rows to {}",
            report.rows.len(),
            path.display()
        ));
    } else {
        match format {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Table => {
                let rows: Vec<ReportTableRow> = report.rows.iter().map(Into::into).collect();
                print_table(&rows, format);
                println!(
                    "Week ending {} ({} policy)",
                    report.reference_utc.to_rfc3339().cyan(),
                    report.policy
                );
            }
        }
    }

    for failure in &report.failures {
        print_warning(&format!(
            "Store {} omitted: {}",
            failure.store_id, failure.error
        ));
    }
    Ok(())
}

/// Compute one store's report and print its timelines
pub async fn show_store(
    options: &LocalOptions,
    store_id: u64,
    horizon: Option<Horizon>,
    format: OutputFormat,
) -> Result<()> {
    let dataset = options.load().await?;
    let store_id = StoreId(store_id);
    if !dataset.contains_store(store_id) {
        anyhow::bail!("Store {} is not in {}", store_id, options.data.display());
    }

    let report = build_store_report(&dataset, store_id, &options.report_options()?)?;
    print_store_report(&report, horizon, format)
}

/// Print a store report, optionally limited to one horizon
pub fn print_store_report(
    report: &StoreReport,
    horizon: Option<Horizon>,
    format: OutputFormat,
) -> Result<()> {
    let horizons: Vec<_> = report
        .horizons
        .iter()
        .filter(|h| horizon.map_or(true, |wanted| h.horizon == wanted))
        .collect();

    if format == OutputFormat::Json {
        return print_json(&horizons);
    }

    println!("{} {}", "Store".bold(), report.row.store_id.to_string().cyan());
    for h in horizons {
        let up = report.row.uptime(h.horizon);
        let down = report.row.downtime(h.horizon);
        println!();
        println!("{}", h.horizon.to_string().bold());
        println!("{}", "-".repeat(50));
        match &h.frame {
            Some(frame) => println!("Window ends:   {}", frame.reference),
            None => println!("Window ends:   {}", "no polls".dimmed()),
        }
        println!("Polls used:    {}", h.selected);
        println!(
            "Uptime:        {}  Downtime: {}  ({})",
            format_figure(h.horizon, up).green(),
            format_figure(h.horizon, down).red(),
            color_percent(uptime_percent(up, down))
        );

        match &h.outcome {
            HorizonOutcome::Empty => print_info("No eligible polls; reported as zero"),
            HorizonOutcome::Estimated(estimate) => {
                let rows: Vec<TimelineRow> = estimate
                    .timeline
                    .points
                    .iter()
                    .map(|p| TimelineRow {
                        offset: format_offset(p.at),
                        status: color_status(p.status.as_str()),
                        source: (if p.synthetic { "extrapolated" } else { "observed" }).to_string(),
                    })
                    .collect();
                print_table(&rows, OutputFormat::Table);
            }
        }
    }
    Ok(())
}
