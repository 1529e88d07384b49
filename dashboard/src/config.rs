//! Dashboard configuration: parsing, normalization, and loading.
//!
//! The configuration is a small TOML document:
//!
//! ```toml
//! tickers = ["AAPL", "ibm ", "AAPL"]
//! moving_average_periods = [10, 25, 100, 200]
//!
//! [feed]
//! base_url = "https://www.quandl.com/api/v3/datasets/WIKI"
//! max_in_flight = 2
//!
//! [storage]
//! path = "dashboard_store.json"
//!
//! [simulation]
//! min_delay_secs = 5
//! max_delay_secs = 15
//! ```
//!
//! Every section is optional and falls back to the defaults above.
//! Normalization trims and uppercases ticker symbols and drops duplicates
//! while preserving order. `DASHBOARD_FEED_URL` and `DASHBOARD_STORE_PATH`
//! override the file when set.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]
//! - File (or defaults) + environment overrides: [`resolve_config`]

use std::{collections::HashSet, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared_utils::env::env_override;
use thiserror::Error;
use ticker_data::{MovingAveragePeriods, providers::quandl_rest::DEFAULT_BASE_URL, synthetic::SimulationSchedule};
use tracing::debug;

pub const DEFAULT_TICKERS: [&str; 6] = ["AAPL", "IBM", "AXP", "CVS", "GE", "MSFT"];
pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;
pub const DEFAULT_STORE_PATH: &str = "dashboard_store.json";

pub const FEED_URL_ENV: &str = "DASHBOARD_FEED_URL";
pub const STORE_PATH_ENV: &str = "DASHBOARD_STORE_PATH";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one ticker symbol must be configured")]
    NoTickers,

    #[error("ticker symbol cannot be empty after trimming")]
    EmptyTicker,

    #[error("feed.base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("feed.max_in_flight must be at least 1")]
    ZeroInFlight,

    #[error("simulation delay range is inverted: min {min}s > max {max}s")]
    InvalidDelay { min: u64, max: u64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Symbols loaded at login, in display order.
    pub tickers: Vec<String>,
    pub moving_average_periods: MovingAveragePeriods,
    pub feed: FeedConfig,
    pub storage: StorageConfig,
    pub simulation: SimulationConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect(),
            moving_average_periods: MovingAveragePeriods::default(),
            feed: FeedConfig::default(),
            storage: StorageConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub base_url: String,
    /// Upper bound on concurrent dataset requests during a load.
    pub max_in_flight: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let schedule = SimulationSchedule::default();
        Self {
            min_delay_secs: schedule.min_delay.as_secs(),
            max_delay_secs: schedule.max_delay.as_secs(),
        }
    }
}

impl SimulationConfig {
    pub fn schedule(&self) -> SimulationSchedule {
        SimulationSchedule::new(
            Duration::from_secs(self.min_delay_secs),
            Duration::from_secs(self.max_delay_secs),
        )
    }
}

/// What [`normalize_config`] changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Symbols whose spelling changed when trimming/uppercasing.
    pub tickers_renamed: usize,
    /// Duplicate symbols removed after normalization.
    pub tickers_deduped: usize,
}

/// Normalizes `cfg` in place and validates it.
///
/// - Trim + uppercase ticker symbols; drop repeats, keeping the first
/// - Trim the feed base URL
///
/// Errors on an empty ticker list, a blank symbol, a blank base URL, a zero
/// concurrency cap or an inverted simulation delay range.
pub fn normalize_config(cfg: &mut DashboardConfig) -> Result<NormalizationReport, ConfigError> {
    let mut report = NormalizationReport::default();

    let mut seen = HashSet::new();
    let mut tickers = Vec::with_capacity(cfg.tickers.len());
    for raw in std::mem::take(&mut cfg.tickers) {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ConfigError::EmptyTicker);
        }
        if symbol != raw {
            report.tickers_renamed += 1;
        }
        if seen.insert(symbol.clone()) {
            tickers.push(symbol);
        } else {
            report.tickers_deduped += 1;
        }
    }
    if tickers.is_empty() {
        return Err(ConfigError::NoTickers);
    }
    cfg.tickers = tickers;

    cfg.feed.base_url = cfg.feed.base_url.trim().to_string();
    if cfg.feed.base_url.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if cfg.feed.max_in_flight == 0 {
        return Err(ConfigError::ZeroInFlight);
    }

    let SimulationConfig {
        min_delay_secs: min,
        max_delay_secs: max,
    } = cfg.simulation;
    if min > max {
        return Err(ConfigError::InvalidDelay { min, max });
    }

    Ok(report)
}

/// Applies overrides produced by `lookup` (normally the process environment).
pub fn apply_overrides_with<F>(cfg: &mut DashboardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(FEED_URL_ENV) {
        debug!(%url, "feed base URL overridden from environment");
        cfg.feed.base_url = url;
    }
    if let Some(path) = lookup(STORE_PATH_ENV) {
        debug!(%path, "store path overridden from environment");
        cfg.storage.path = PathBuf::from(path);
    }
}

pub fn apply_env_overrides(cfg: &mut DashboardConfig) {
    apply_overrides_with(cfg, env_override);
}

/// Parse and normalize a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<DashboardConfig> {
    let mut cfg: DashboardConfig =
        toml::from_str(toml_str).context("failed to parse dashboard config TOML")?;
    let report = normalize_config(&mut cfg).context("invalid dashboard config")?;
    debug!(?report, "normalized dashboard config");
    Ok(cfg)
}

/// Read a configuration file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<DashboardConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

/// Loads `path` (or the defaults when `None`), then applies environment
/// overrides and normalizes again so overridden values are validated too.
pub fn resolve_config(path: Option<&std::path::Path>) -> anyhow::Result<DashboardConfig> {
    let mut cfg = match path {
        Some(p) => load_config_path(p)?,
        None => DashboardConfig::default(),
    };
    apply_env_overrides(&mut cfg);
    normalize_config(&mut cfg).context("invalid dashboard config after environment overrides")?;
    Ok(cfg)
}
