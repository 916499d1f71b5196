//! Commands that drive a running uptime service

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use uptime_lib::Horizon;

use crate::client::{ApiClient, RemoteReport};
use crate::commands::local::print_store_report;
use crate::output::{color_status, print_error, print_info, print_json, print_success, OutputFormat};

/// Trigger a report and print its id
pub async fn trigger(client: &ApiClient, policy: Option<&str>, format: OutputFormat) -> Result<()> {
    let response = client.trigger_report(policy).await?;
    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success("Report triggered");
            println!("Report ID: {}", response.report_id.cyan());
        }
    }
    Ok(())
}

/// Print the current state of a report
pub async fn status(
    client: &ApiClient,
    report_id: &str,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.fetch_report(report_id).await?;
    show(report_id, report, output, format)
}

/// Poll a report until it leaves the running state
pub async fn wait(
    client: &ApiClient,
    report_id: &str,
    interval_secs: u64,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let interval = Duration::from_secs(interval_secs.max(1));
    loop {
        let report = client.fetch_report(report_id).await?;
        if report != RemoteReport::Running {
            return show(report_id, report, output, format);
        }
        if format == OutputFormat::Table {
            print_info(&format!("Report {} still running", report_id));
        }
        tokio::time::sleep(interval).await;
    }
}

/// Fetch one store's report from the service
pub async fn store(
    client: &ApiClient,
    store_id: u64,
    horizon: Option<Horizon>,
    policy: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.store_report(store_id, policy).await?;
    print_store_report(&report, horizon, format)
}

fn show(
    report_id: &str,
    report: RemoteReport,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    if let RemoteReport::Failed { error } = &report {
        print_error(&format!("Report {} failed: {}", report_id, error));
        anyhow::bail!("report {} failed", report_id);
    }

    match (&report, output) {
        (RemoteReport::Complete { csv }, Some(path)) => {
            std::fs::write(path, csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Saved report to {}", path.display()));
        }
        (RemoteReport::Complete { csv }, None) if format == OutputFormat::Table => {
            println!("{} {}", "Status:".bold(), color_status("complete"));
            print!("{}", csv);
        }
        (RemoteReport::Running, _) if format == OutputFormat::Table => {
            println!("{} {}", "Status:".bold(), color_status("running"));
        }
        _ => print_json(&report)?,
    }
    Ok(())
}
