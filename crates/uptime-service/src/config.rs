//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use uptime_lib::{report::DEFAULT_RETAINED_REPORTS, WindowPolicy};

/// Service configuration
///
/// Read from an optional `uptime.toml` in the working directory, then from
/// `UPTIME_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HTTP port for reports, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the CSV exports
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub window_policy: WindowPolicy,

    /// Treat stores missing from the hours file as open around the clock
    #[serde(default)]
    pub assume_open_when_unlisted: bool,

    /// Finished reports kept for polling before the oldest are evicted
    #[serde(default = "default_retained_reports")]
    pub retained_reports: usize,
}

fn default_service_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "uptime-service".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_retained_reports() -> usize {
    DEFAULT_RETAINED_REPORTS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            data_dir: default_data_dir(),
            window_policy: WindowPolicy::default(),
            assume_open_when_unlisted: false,
            retained_reports: default_retained_reports(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("uptime").required(false))
            .add_source(config::Environment::with_prefix("UPTIME").try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration values")
    }
}
