//! Synthetic price provider for dry runs without network access.
//!
//! Generates a deterministic random walk per symbol: the RNG is seeded from
//! a BLAKE3 hash of the symbol, so repeated runs see identical closes.
//! Weekends are skipped. Results from this provider are not market data.

use super::provider::{LookbackWindow, PriceProvider, ProviderError};
use crate::domain::DailyClose;
use chrono::{Datelike, Duration, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SyntheticProvider {
    start_price: f64,
    max_daily_move: f64,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self {
            start_price: 100.0,
            max_daily_move: 0.02,
        }
    }

    /// Largest absolute daily return, as a fraction (0.02 = 2%).
    pub fn with_max_daily_move(mut self, max_daily_move: f64) -> Self {
        self.max_daily_move = max_daily_move.abs();
        self
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_daily_closes(
        &self,
        symbol: &str,
        window: &LookbackWindow,
    ) -> Result<Vec<DailyClose>, ProviderError> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut closes = Vec::new();
        let mut price = self.start_price;
        let mut current = window.start;

        while current <= window.end {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                let daily_return: f64 = if self.max_daily_move > 0.0 {
                    rng.gen_range(-self.max_daily_move..self.max_daily_move)
                } else {
                    0.0
                };
                price *= 1.0 + daily_return;
                closes.push(DailyClose::new(current, price));
            }
            current += Duration::days(1);
        }

        if closes.is_empty() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(closes)
    }
}
