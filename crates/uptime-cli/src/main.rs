//! Store uptime CLI
//!
//! Computes uptime/downtime reports from local CSV exports or drives a
//! running uptime service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{local, remote};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uptime_lib::{Horizon, WindowPolicy};

/// Store uptime CLI
#[derive(Parser)]
#[command(name = "uptime")]
#[command(author, version, about = "CLI for Store Uptime reports", long_about = None)]
pub struct Cli {
    /// Service URL for remote commands (can also be set via UPTIME_API_URL env var)
    #[arg(long, env = "UPTIME_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute reports from local CSV exports
    #[command(subcommand)]
    Local(LocalCommands),

    /// Drive a running uptime service
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(clap::Args)]
pub struct DataArgs {
    /// Directory with store_status.csv, business_hours.csv and store_timezones.csv
    #[arg(long, env = "UPTIME_DATA_DIR")]
    pub data: Option<PathBuf>,

    /// Window policy: full or hours
    #[arg(long, default_value = "full")]
    pub policy: WindowPolicy,

    /// UTC instant the week window ends at (defaults to the latest poll)
    #[arg(long)]
    pub now: Option<String>,

    /// Treat stores without operating hours as open around the clock
    #[arg(long)]
    pub assume_open: bool,
}

#[derive(Subcommand)]
pub enum LocalCommands {
    /// Build the report for every store
    Report {
        #[command(flatten)]
        data: DataArgs,

        /// Write the report as CSV to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show one store's figures and synthesized timelines
    Store {
        /// Store ID
        id: u64,

        #[command(flatten)]
        data: DataArgs,

        /// Limit output to one horizon (hour, day or week)
        #[arg(long)]
        horizon: Option<Horizon>,
    },
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Start a report on the service
    Trigger {
        /// Window policy: full or hours (service default if omitted)
        #[arg(long)]
        policy: Option<String>,
    },

    /// Show the state of a report
    Status {
        /// Report ID returned by trigger
        report_id: String,

        /// Save the CSV to this file once complete
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Wait for a report to finish
    Wait {
        /// Report ID returned by trigger
        report_id: String,

        /// Seconds between polls
        #[arg(long, default_value = "2")]
        interval: u64,

        /// Save the CSV to this file once complete
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show one store's report computed by the service
    Store {
        /// Store ID
        id: u64,

        /// Limit output to one horizon (hour, day or week)
        #[arg(long)]
        horizon: Option<Horizon>,

        /// Window policy: full or hours
        #[arg(long)]
        policy: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "uptime_lib=debug,info" } else { "error" };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn local_options(data: DataArgs, config: &config::Config) -> Result<local::LocalOptions> {
    Ok(local::LocalOptions {
        data: config.resolve_data_dir(data.data)?,
        policy: data.policy,
        now: data.now,
        assume_open: data.assume_open,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(|f| output::OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or_default();

    match cli.command {
        Commands::Local(local_cmd) => match local_cmd {
            LocalCommands::Report { data, output } => {
                let options = local_options(data, &config)?;
                local::run_report(&options, output.as_deref(), format).await?;
            }
            LocalCommands::Store { id, data, horizon } => {
                let options = local_options(data, &config)?;
                local::show_store(&options, id, horizon, format).await?;
            }
        },
        Commands::Remote(remote_cmd) => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;
            match remote_cmd {
                RemoteCommands::Trigger { policy } => {
                    remote::trigger(&client, policy.as_deref(), format).await?;
                }
                RemoteCommands::Status { report_id, output } => {
                    remote::status(&client, &report_id, output.as_deref(), format).await?;
                }
                RemoteCommands::Wait {
                    report_id,
                    interval,
                    output,
                } => {
                    remote::wait(&client, &report_id, interval, output.as_deref(), format).await?;
                }
                RemoteCommands::Store {
                    id,
                    horizon,
                    policy,
                } => {
                    remote::store(&client, id, horizon, policy.as_deref(), format).await?;
                }
            }
        }
    }

    Ok(())
}
