//! Monitor configuration: ticker list, threshold and run settings.
//!
//! Loaded once per invocation from a JSON or TOML file and validated before
//! any ticker is touched. A config that fails to load or validate aborts the
//! invocation; nothing downstream sees missing keys or unnormalized symbols.

use crate::notifier::NotifyMode;
use emawatch_core::DEFAULT_EMA_PERIOD;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_THRESHOLD_PERCENTAGE: f64 = 2.0;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;
/// One hundred years of calendar days.
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const MAX_WORKERS: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format {0:?} (expected .json or .toml)")]
    UnsupportedFormat(String),

    #[error("config has no `tickers` list")]
    MissingTickers,

    #[error("invalid ticker symbol {0:?}")]
    InvalidSymbol(String),

    #[error("duplicate ticker symbol {0}")]
    DuplicateSymbol(String),

    #[error("invalid threshold_percentage for {context}: {value} (must be finite and > 0)")]
    InvalidThreshold { context: String, value: f64 },

    #[error("ema_period must be >= 1")]
    InvalidPeriod,

    #[error("lookback_days {lookback_days} covers about {trading_days} trading days, fewer than ema_period {ema_period}")]
    LookbackTooShort {
        lookback_days: u32,
        trading_days: u32,
        ema_period: usize,
    },

    #[error("lookback_days must be between 1 and {max}, got {lookback_days}")]
    LookbackOutOfRange { lookback_days: u32, max: u32 },

    #[error("max_workers must be between 1 and 32, got {0}")]
    InvalidWorkers(usize),
}

/// One ticker to check, with its effective threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerConfig {
    symbol: String,
    threshold_percentage: f64,
}

impl TickerConfig {
    /// Normalize (trim, uppercase) and validate a symbol and threshold.
    pub fn new(symbol: &str, threshold_percentage: f64) -> Result<Self, ConfigError> {
        let symbol = normalize_symbol(symbol)?;
        check_threshold(&symbol, threshold_percentage)?;
        Ok(Self {
            symbol,
            threshold_percentage,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn threshold_percentage(&self) -> f64 {
        self.threshold_percentage
    }
}

fn normalize_symbol(raw: &str) -> Result<String, ConfigError> {
    let symbol = raw.trim().to_uppercase();
    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=');
    if symbol.is_empty() || symbol.len() > 16 || !symbol.chars().all(valid_char) {
        return Err(ConfigError::InvalidSymbol(raw.to_string()));
    }
    Ok(symbol)
}

fn check_threshold(context: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidThreshold {
            context: context.to_string(),
            value,
        });
    }
    Ok(())
}

/// Rough trading days in a span of calendar days (252 sessions a year,
/// rounded down to 250 to allow for holidays and missing bars).
pub fn estimated_trading_days(lookback_days: u32) -> u32 {
    lookback_days.saturating_mul(250) / 365
}

/// A ticker entry as written in the file: a bare symbol or an object with
/// a per-ticker threshold.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TickerEntry {
    Symbol(String),
    Detailed(DetailedTicker),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetailedTicker {
    symbol: String,
    threshold_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    tickers: Option<Vec<TickerEntry>>,
    threshold_percentage: Option<f64>,
    ema_period: Option<usize>,
    lookback_days: Option<u32>,
    max_workers: Option<usize>,
    notify_mode: Option<NotifyMode>,
}

/// Validated, immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorConfig {
    tickers: Vec<TickerConfig>,
    threshold_percentage: f64,
    ema_period: usize,
    lookback_days: u32,
    max_workers: usize,
    notify_mode: NotifyMode,
}

impl MonitorConfig {
    /// Load from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::validate(raw)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let threshold_percentage = raw
            .threshold_percentage
            .unwrap_or(DEFAULT_THRESHOLD_PERCENTAGE);
        check_threshold("default", threshold_percentage)?;

        let ema_period = raw.ema_period.unwrap_or(DEFAULT_EMA_PERIOD);
        if ema_period == 0 {
            return Err(ConfigError::InvalidPeriod);
        }

        let lookback_days = raw.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
        if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
            return Err(ConfigError::LookbackOutOfRange {
                lookback_days,
                max: MAX_LOOKBACK_DAYS,
            });
        }
        let trading_days = estimated_trading_days(lookback_days);
        if (trading_days as usize) < ema_period {
            return Err(ConfigError::LookbackTooShort {
                lookback_days,
                trading_days,
                ema_period,
            });
        }

        let max_workers = raw.max_workers.unwrap_or(DEFAULT_MAX_WORKERS);
        if !(1..=MAX_WORKERS).contains(&max_workers) {
            return Err(ConfigError::InvalidWorkers(max_workers));
        }

        let entries = raw.tickers.ok_or(ConfigError::MissingTickers)?;
        let mut seen = HashSet::with_capacity(entries.len());
        let mut tickers = Vec::with_capacity(entries.len());
        for entry in entries {
            let ticker = match entry {
                TickerEntry::Symbol(symbol) => TickerConfig::new(&symbol, threshold_percentage)?,
                TickerEntry::Detailed(detailed) => TickerConfig::new(
                    &detailed.symbol,
                    detailed.threshold_percentage.unwrap_or(threshold_percentage),
                )?,
            };
            if !seen.insert(ticker.symbol.clone()) {
                return Err(ConfigError::DuplicateSymbol(ticker.symbol));
            }
            tickers.push(ticker);
        }

        Ok(Self {
            tickers,
            threshold_percentage,
            ema_period,
            lookback_days,
            max_workers,
            notify_mode: raw.notify_mode.unwrap_or_default(),
        })
    }

    pub fn tickers(&self) -> &[TickerConfig] {
        &self.tickers
    }

    pub fn threshold_percentage(&self) -> f64 {
        self.threshold_percentage
    }

    pub fn ema_period(&self) -> usize {
        self.ema_period
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn notify_mode(&self) -> NotifyMode {
        self.notify_mode
    }

    /// BLAKE3 hex digest of the normalized config.
    ///
    /// Two files that normalize to the same settings share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&canonical).to_hex().to_string()
    }
}
