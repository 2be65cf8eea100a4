//! CSV price provider for offline runs.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a header row containing `date` and
//! `close` columns (Yahoo's `Date`/`Close` export headers also work; other
//! columns are ignored). Rows with an empty or `null` close are skipped.

use super::provider::{LookbackWindow, PriceProvider, ProviderError};
use crate::domain::DailyClose;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
}

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn read_file(path: &Path, symbol: &str) -> Result<Vec<DailyClose>, ProviderError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
            csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }
            }
            _ => ProviderError::Io(format!("{}: {e}", path.display())),
        })?;

        let mut closes = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| {
                ProviderError::ResponseFormatChanged(format!("{}: {e}", path.display()))
            })?;
            if let Some(close) = row.close {
                closes.push(DailyClose::new(row.date, close));
            }
        }
        Ok(closes)
    }
}

impl PriceProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch_daily_closes(
        &self,
        symbol: &str,
        window: &LookbackWindow,
    ) -> Result<Vec<DailyClose>, ProviderError> {
        let path = self.path_for(symbol);
        let mut closes = Self::read_file(&path, symbol)?;

        // Exports are sometimes newest-first.
        closes.sort_by_key(|c| c.date);
        closes.retain(|c| window.contains(c.date));

        tracing::debug!(
            symbol = %symbol,
            path = %path.display(),
            bars = closes.len(),
            "loaded closes from CSV"
        );
        Ok(closes)
    }
}
