//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA[period-1] = SMA of first `period` close values.
//! alpha = 2 / (period + 1).
//!
//! The final value depends on the whole series, not only the last `period`
//! closes: the seed anchors the recursion and every later close folds in.

use thiserror::Error;

/// Period used for the daily proximity check.
pub const DEFAULT_EMA_PERIOD: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmaError {
    #[error("insufficient data: EMA({required}) needs {required} closes, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("EMA period must be >= 1")]
    InvalidPeriod,
}

/// EMA with a validated period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, EmaError> {
        if period == 0 {
            return Err(EmaError::InvalidPeriod);
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor derived from the period.
    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }

    /// Final EMA value after consuming every close, oldest first.
    pub fn compute(&self, prices: &[f64]) -> Result<f64, EmaError> {
        if prices.len() < self.period {
            return Err(EmaError::InsufficientData {
                required: self.period,
                available: prices.len(),
            });
        }

        let alpha = self.alpha();
        let seed = prices[..self.period].iter().sum::<f64>() / self.period as f64;

        Ok(prices[self.period..]
            .iter()
            .fold(seed, |prev, &price| alpha * price + (1.0 - alpha) * prev))
    }
}

impl Default for Ema {
    fn default() -> Self {
        Self {
            period: DEFAULT_EMA_PERIOD,
        }
    }
}

/// Compute the EMA of `prices` (oldest first) and return the final value.
pub fn compute_ema(prices: &[f64], period: usize) -> Result<f64, EmaError> {
    Ema::new(period)?.compute(prices)
}

/// Full EMA series aligned with `prices`.
///
/// Entries before the seed index (`period - 1`) are NaN. A NaN close taints
/// every value from that point on. Too-short input or period 0 yields all NaN.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    let mut sum = 0.0;
    for &v in prices.iter().take(period) {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        if prices[i].is_nan() {
            return result;
        }
        let ema = alpha * prices[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
