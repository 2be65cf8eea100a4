//! EMAWatch Core: price series, EMA engine, proximity evaluation, data providers.
//!
//! This crate holds everything that does not depend on how an invocation is
//! wired together:
//! - Domain types (daily closes, validated price series)
//! - EMA engine (SMA-seeded exponential moving average)
//! - Proximity evaluator (signed distance to EMA, near/above/below)
//! - Price-history providers (Yahoo Finance, CSV import, synthetic) behind one trait

pub mod data;
pub mod domain;
pub mod indicators;
pub mod proximity;

pub use domain::{DailyClose, PriceSeries, SeriesError};
pub use indicators::ema::{compute_ema, ema_series, Ema, EmaError, DEFAULT_EMA_PERIOD};
pub use proximity::{evaluate, Direction, EmaResult, ProximityError};
