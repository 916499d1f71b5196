//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration
///
/// Every field is optional; command-line flags and environment variables
/// take precedence.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Service endpoint URL
    pub api_url: Option<String>,
    /// Directory of CSV exports for local commands
    pub data_dir: Option<PathBuf>,
    /// Default output format (table or json)
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from the user config directory
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// `~/.config/uptime/config.json` on Linux
    fn config_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("uptime").join("config.json"))
    }

    /// Flag or env value first, then the config file, then the default
    pub fn resolve_api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn resolve_data_dir(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.data_dir.clone())
            .context("No data directory given; pass --data or set UPTIME_DATA_DIR")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_and_resolve() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_url": "http://uptime:9000", "data_dir": "/srv/exports"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.resolve_api_url(None), "http://uptime:9000");
        assert_eq!(
            config.resolve_api_url(Some("http://override".into())),
            "http://override"
        );
        assert_eq!(
            config.resolve_data_dir(None).unwrap(),
            PathBuf::from("/srv/exports")
        );
    }

    #[test]
    fn test_no_data_dir_is_an_error() {
        assert!(Config::default().resolve_data_dir(None).is_err());
        assert_eq!(Config::default().resolve_api_url(None), DEFAULT_API_URL);
    }
}
