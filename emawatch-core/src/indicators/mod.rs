//! Indicator implementations.
//!
//! Only the exponential moving average is needed to decide EMA proximity.

pub mod ema;

pub use ema::{compute_ema, ema_series, Ema, EmaError, DEFAULT_EMA_PERIOD};

/// Default epsilon for floating-point indicator comparisons in tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Assert two f64 values are approximately equal.
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual} (diff {})",
        (actual - expected).abs()
    );
}
