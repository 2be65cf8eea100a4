//! Price provider trait and structured error types.

use crate::domain::DailyClose;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar-day window of daily bars to request, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LookbackWindow {
    /// Window of `days` calendar days ending on `end`.
    ///
    /// 365 days is roughly 250 trading bars, enough for a 200-day EMA.
    /// A span reaching past the calendar's lower bound starts at `NaiveDate::MIN`.
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Structured error types for provider calls.
///
/// `NoData` and `SymbolNotFound` mean the provider answered but had nothing
/// for the symbol; everything else is a failed fetch.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no price data returned for {symbol}")]
    NoData { symbol: String },

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// True when the provider answered but had no bars for the symbol.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            ProviderError::NoData { .. } | ProviderError::SymbolNotFound { .. }
        )
    }
}

/// Source of daily closing prices.
///
/// Implementations return closes oldest first. They do not retry; one call
/// is one attempt.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for `symbol` inside `window`.
    fn fetch_daily_closes(
        &self,
        symbol: &str,
        window: &LookbackWindow,
    ) -> Result<Vec<DailyClose>, ProviderError>;
}
