//! Daily closes and the validated price series the EMA engine consumes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

impl DailyClose {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates out of order for {symbol}: {previous} is followed by {next}")]
    OutOfOrder {
        symbol: String,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("duplicate date {date} for {symbol}")]
    DuplicateDate { symbol: String, date: NaiveDate },

    #[error("invalid close {close} on {date} for {symbol}")]
    InvalidClose {
        symbol: String,
        date: NaiveDate,
        close: f64,
    },
}

/// Chronologically ordered daily closes for one symbol.
///
/// Invariants (checked by [`PriceSeries::new`]):
/// - dates strictly ascending, so no duplicates
/// - every close is finite and > 0
///
/// Length is not checked here; the EMA engine owns the minimum-length rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    closes: Vec<DailyClose>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, closes: Vec<DailyClose>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();

        for bar in &closes {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(SeriesError::InvalidClose {
                    symbol,
                    date: bar.date,
                    close: bar.close,
                });
            }
        }

        for pair in closes.windows(2) {
            let (prev, next) = (pair[0].date, pair[1].date);
            if prev == next {
                return Err(SeriesError::DuplicateDate { symbol, date: next });
            }
            if prev > next {
                return Err(SeriesError::OutOfOrder {
                    symbol,
                    previous: prev,
                    next,
                });
            }
        }

        Ok(Self { symbol, closes })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn closes(&self) -> &[DailyClose] {
        &self.closes
    }

    /// Closing prices only, oldest first.
    pub fn prices(&self) -> Vec<f64> {
        self.closes.iter().map(|c| c.close).collect()
    }

    /// Most recent close.
    pub fn latest(&self) -> Option<&DailyClose> {
        self.closes.last()
    }
}
