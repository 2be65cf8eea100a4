//! Price-history providers.
//!
//! Every source (Yahoo Finance, CSV files, synthetic walk) implements
//! [`PriceProvider`] so the runner can swap them and tests can mock them.

pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use csv_import::CsvProvider;
pub use provider::{LookbackWindow, PriceProvider, ProviderError};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
