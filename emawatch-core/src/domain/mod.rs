//! Domain types for EMAWatch

pub mod series;

pub use series::{DailyClose, PriceSeries, SeriesError};
