//! Proximity of the current price to its EMA.
//!
//! `percent_distance = (price - ema) / ema * 100`; positive means the price
//! sits above the EMA. A ticker is "near" when the absolute distance is at
//! most the threshold (inclusive).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProximityError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Side of the EMA the current price is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
    At,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Above => write!(f, "above"),
            Direction::Below => write!(f, "below"),
            Direction::At => write!(f, "at"),
        }
    }
}

/// Evaluation of one ticker against its EMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaResult {
    pub symbol: String,
    pub current_price: f64,
    pub ema_value: f64,
    pub ema_period: usize,
    /// Signed distance in percent; positive = above EMA.
    pub percent_distance: f64,
    pub threshold_percentage: f64,
    pub is_near: bool,
    pub direction: Direction,
}

impl EmaResult {
    /// Absolute distance in percent.
    pub fn abs_distance(&self) -> f64 {
        self.percent_distance.abs()
    }
}

/// Classify `current_price` against `ema_value`.
///
/// Prices and EMA must be finite and > 0; the threshold must be finite and >= 0.
pub fn evaluate(
    symbol: &str,
    current_price: f64,
    ema_value: f64,
    threshold_percentage: f64,
    ema_period: usize,
) -> Result<EmaResult, ProximityError> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(ProximityError::InvalidInput(format!(
            "current price must be positive, got {current_price}"
        )));
    }
    if !ema_value.is_finite() || ema_value <= 0.0 {
        return Err(ProximityError::InvalidInput(format!(
            "EMA must be positive, got {ema_value}"
        )));
    }
    if !threshold_percentage.is_finite() || threshold_percentage < 0.0 {
        return Err(ProximityError::InvalidInput(format!(
            "threshold must be >= 0, got {threshold_percentage}"
        )));
    }

    let percent_distance = (current_price - ema_value) / ema_value * 100.0;
    let direction = if current_price > ema_value {
        Direction::Above
    } else if current_price < ema_value {
        Direction::Below
    } else {
        Direction::At
    };

    Ok(EmaResult {
        symbol: symbol.to_string(),
        current_price,
        ema_value,
        ema_period,
        percent_distance,
        threshold_percentage,
        is_near: percent_distance.abs() <= threshold_percentage,
        direction,
    })
}
