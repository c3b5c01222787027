//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument / environment variable (passed in as [`Overrides`])
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! The TOML file itself is located by: explicit path (`--config` or
//! `SHELFWATCH_CONFIG`), then `~/.config/shelfwatch/config.toml`, then
//! `/etc/shelfwatch/config.toml`. A missing default file is not an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SSE_CAPACITY: usize = 100;

/// What to do when a poll tick fires while the previous cycle is still waiting
/// on the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Start the cycle anyway; only the newest cycle (by start order) may
    /// apply its result
    #[default]
    Sequenced,
    /// Skip the tick
    Skip,
}

impl FromStr for OverlapPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequenced" => Ok(OverlapPolicy::Sequenced),
            "skip" => Ok(OverlapPolicy::Skip),
            other => Err(Error::Config(format!(
                "Unknown overlap policy '{}' (expected 'sequenced' or 'skip')",
                other
            ))),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Sequenced => write!(f, "sequenced"),
            OverlapPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Bootstrap configuration as read from the TOML file
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the inventory API (`{base}/items`, `{base}/chat`)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// HTTP port the dashboard service listens on
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Transport timeout for upstream requests
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    #[serde(default)]
    pub overlap_policy: Option<OverlapPolicy>,

    /// Buffered render events per SSE client before it lags
    #[serde(default)]
    pub sse_capacity: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Highest-priority settings from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
    pub overlap_policy: Option<OverlapPolicy>,
}

/// Fully resolved dashboard configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_base_url: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub overlap_policy: OverlapPolicy,
    pub sse_capacity: usize,
    pub logging: LoggingConfig,
    /// File the TOML layer was read from, if any
    pub source: Option<PathBuf>,
}

impl DashboardConfig {
    /// Locate and read the TOML file, then apply `overrides` on top
    ///
    /// Runs before the subscriber exists (the log level comes from here), so
    /// the outcome is recorded in `source` and reported by [`Self::log_source`].
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let (toml, source) = match locate_config_file(overrides.config_path.as_deref())? {
            Some(path) => (load_toml_config(&path)?, Some(path)),
            None => (TomlConfig::default(), None),
        };

        let mut config = Self::from_parts(toml, overrides)?;
        config.source = source;
        Ok(config)
    }

    /// Log where the configuration came from
    pub fn log_source(&self) {
        match &self.source {
            Some(path) => info!("Loaded configuration from {}", path.display()),
            None => warn!("No config file found, using compiled defaults and overrides"),
        }
    }

    /// Merge a parsed TOML layer with overrides and validate the result
    pub fn from_parts(toml: TomlConfig, overrides: Overrides) -> Result<Self> {
        let api_base_url = overrides
            .api_base_url
            .or(toml.api_base_url)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "api_base_url is required (config file, --api-base-url or SHELFWATCH_API_BASE_URL)"
                        .to_string(),
                )
            })?;

        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                api_base_url
            )));
        }

        let poll_interval_ms = overrides
            .poll_interval_ms
            .or(toml.poll_interval_ms)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be greater than 0".to_string()));
        }

        let sse_capacity = toml.sse_capacity.unwrap_or(DEFAULT_SSE_CAPACITY);
        if sse_capacity == 0 {
            return Err(Error::Config("sse_capacity must be greater than 0".to_string()));
        }

        Ok(Self {
            api_base_url,
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            poll_interval_ms,
            request_timeout_ms: toml.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            overlap_policy: overrides
                .overlap_policy
                .or(toml.overlap_policy)
                .unwrap_or_default(),
            sse_capacity,
            logging: toml.logging,
            source: None,
        })
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Find the config file to read
///
/// An explicit path must exist. Default locations are optional.
pub fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }

    Ok(default_config_paths().into_iter().find(|path| path.exists()))
}

/// Default config file locations, highest priority first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("shelfwatch").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/shelfwatch/config.toml"));
    }
    paths
}
