//! Per-ticker processing: fetch → validate → EMA → proximity.
//!
//! [`TickerProcessor::process`] is total: every error is converted into a
//! [`TickerFailure`] at this boundary, so the batch runner only aggregates.

use crate::config::TickerConfig;
use chrono::{NaiveDate, Utc};
use emawatch_core::data::{LookbackWindow, PriceProvider, ProviderError};
use emawatch_core::{evaluate, Ema, EmaError, EmaResult, PriceSeries};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Failure category reported per ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Provider returned nothing, or fewer bars than the EMA period.
    #[serde(rename = "NoDataError")]
    NoData,
    /// Provider call failed (network, rate limit, format change, ban).
    #[serde(rename = "FetchError")]
    Fetch,
    /// EMA engine refused the series.
    #[serde(rename = "InsufficientDataError")]
    InsufficientData,
    /// Series or evaluator inputs violated their contract.
    #[serde(rename = "InvalidInputError")]
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoData => "NoDataError",
            ErrorKind::Fetch => "FetchError",
            ErrorKind::InsufficientData => "InsufficientDataError",
            ErrorKind::InvalidInput => "InvalidInputError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFailure {
    pub symbol: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl TickerFailure {
    pub fn new(symbol: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TickerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.symbol, self.kind, self.message)
    }
}

/// Result of processing one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Success(EmaResult),
    Failure(TickerFailure),
}

impl ProcessingOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            ProcessingOutcome::Success(r) => &r.symbol,
            ProcessingOutcome::Failure(f) => &f.symbol,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingOutcome::Success(_))
    }
}

impl From<Result<EmaResult, TickerFailure>> for ProcessingOutcome {
    fn from(result: Result<EmaResult, TickerFailure>) -> Self {
        match result {
            Ok(r) => ProcessingOutcome::Success(r),
            Err(f) => ProcessingOutcome::Failure(f),
        }
    }
}

pub struct TickerProcessor {
    provider: Arc<dyn PriceProvider>,
    ema: Ema,
    lookback_days: u32,
    as_of: Option<NaiveDate>,
}

impl TickerProcessor {
    pub fn new(provider: Arc<dyn PriceProvider>, ema: Ema, lookback_days: u32) -> Self {
        Self {
            provider,
            ema,
            lookback_days,
            as_of: None,
        }
    }

    /// Fix the end of the lookback window instead of using today's UTC date.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn ema_period(&self) -> usize {
        self.ema.period()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn window(&self) -> LookbackWindow {
        let end = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        LookbackWindow::trailing_days(end, self.lookback_days)
    }

    pub fn process(&self, ticker: &TickerConfig) -> ProcessingOutcome {
        let symbol = ticker.symbol();
        tracing::debug!(symbol = %symbol, provider = self.provider.name(), "processing ticker");

        let outcome = ProcessingOutcome::from(self.try_process(ticker));
        match &outcome {
            ProcessingOutcome::Success(r) => tracing::info!(
                symbol = %symbol,
                price = r.current_price,
                ema = r.ema_value,
                percent_distance = r.percent_distance,
                is_near = r.is_near,
                "ticker evaluated"
            ),
            ProcessingOutcome::Failure(f) => tracing::warn!(
                symbol = %symbol,
                kind = %f.kind,
                error = %f.message,
                "ticker failed"
            ),
        }
        outcome
    }

    /// Fetch and validate the price series for `symbol`.
    pub fn load_series(&self, symbol: &str) -> Result<PriceSeries, TickerFailure> {
        let period = self.ema.period();
        let closes = self
            .provider
            .fetch_daily_closes(symbol, &self.window())
            .map_err(|e| provider_failure(symbol, &e))?;

        if closes.len() < period {
            return Err(TickerFailure::new(
                symbol,
                ErrorKind::NoData,
                format!(
                    "provider returned {} daily closes, need at least {period}",
                    closes.len()
                ),
            ));
        }

        PriceSeries::new(symbol, closes)
            .map_err(|e| TickerFailure::new(symbol, ErrorKind::InvalidInput, e.to_string()))
    }

    fn try_process(&self, ticker: &TickerConfig) -> Result<EmaResult, TickerFailure> {
        let series = self.load_series(ticker.symbol())?;
        self.evaluate_series(ticker, &series)
    }

    /// EMA and proximity for an already loaded series.
    pub fn evaluate_series(
        &self,
        ticker: &TickerConfig,
        series: &PriceSeries,
    ) -> Result<EmaResult, TickerFailure> {
        let symbol = ticker.symbol();
        let current_price = series
            .latest()
            .map(|c| c.close)
            .ok_or_else(|| TickerFailure::new(symbol, ErrorKind::NoData, "empty price series"))?;

        let ema_value = self
            .ema
            .compute(&series.prices())
            .map_err(|e| ema_failure(symbol, e))?;

        evaluate(
            symbol,
            current_price,
            ema_value,
            ticker.threshold_percentage(),
            self.ema.period(),
        )
        .map_err(|e| TickerFailure::new(symbol, ErrorKind::InvalidInput, e.to_string()))
    }
}

fn provider_failure(symbol: &str, err: &ProviderError) -> TickerFailure {
    let kind = if err.is_no_data() {
        ErrorKind::NoData
    } else {
        ErrorKind::Fetch
    };
    TickerFailure::new(symbol, kind, err.to_string())
}

fn ema_failure(symbol: &str, err: EmaError) -> TickerFailure {
    let kind = match err {
        EmaError::InsufficientData { .. } => ErrorKind::InsufficientData,
        EmaError::InvalidPeriod => ErrorKind::InvalidInput,
    };
    TickerFailure::new(symbol, kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emawatch_core::DailyClose;

    /// Returns canned closes or an error keyed by symbol.
    struct FixedProvider {
        closes: Vec<DailyClose>,
    }

    impl PriceProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_daily_closes(
            &self,
            symbol: &str,
            _window: &LookbackWindow,
        ) -> Result<Vec<DailyClose>, ProviderError> {
            match symbol {
                "DOWN" => Err(ProviderError::NetworkUnreachable("connection refused".into())),
                "GONE" => Err(ProviderError::SymbolNotFound {
                    symbol: symbol.into(),
                }),
                "EMPTY" => Ok(Vec::new()),
                _ => Ok(self.closes.clone()),
            }
        }
    }

    fn closes(prices: &[f64]) -> Vec<DailyClose> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| DailyClose::new(base + chrono::Duration::days(i as i64), p))
            .collect()
    }

    fn processor(prices: &[f64], period: usize) -> TickerProcessor {
        let provider = Arc::new(FixedProvider {
            closes: closes(prices),
        });
        TickerProcessor::new(provider, Ema::new(period).unwrap(), 365)
            .with_as_of(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    fn ticker(symbol: &str, threshold: f64) -> TickerConfig {
        TickerConfig::new(symbol, threshold).unwrap()
    }

    fn failure(outcome: ProcessingOutcome) -> TickerFailure {
        match outcome {
            ProcessingOutcome::Failure(f) => f,
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn success_uses_latest_close_and_full_series() {
        // period 3: seed 11, then 12, then 13
        let p = processor(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        match p.process(&ticker("SPY", 10.0)) {
            ProcessingOutcome::Success(r) => {
                assert_eq!(r.symbol, "SPY");
                assert_eq!(r.current_price, 14.0);
                assert!((r.ema_value - 13.0).abs() < 1e-12);
                assert!((r.percent_distance - 100.0 / 13.0).abs() < 1e-9);
                assert!(r.is_near);
                assert_eq!(r.ema_period, 3);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn threshold_comes_from_ticker() {
        let p = processor(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        let outcome = p.process(&ticker("SPY", 5.0));
        match outcome {
            ProcessingOutcome::Success(r) => {
                assert!(!r.is_near);
                assert_eq!(r.threshold_percentage, 5.0);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn fetch_error_is_captured() {
        let f = failure(processor(&[1.0; 5], 3).process(&ticker("DOWN", 2.0)));
        assert_eq!(f.kind, ErrorKind::Fetch);
        assert!(f.message.contains("connection refused"));
    }

    #[test]
    fn not_found_and_empty_are_no_data() {
        let p = processor(&[1.0; 5], 3);
        assert_eq!(failure(p.process(&ticker("GONE", 2.0))).kind, ErrorKind::NoData);
        assert_eq!(failure(p.process(&ticker("EMPTY", 2.0))).kind, ErrorKind::NoData);
    }

    #[test]
    fn short_series_is_no_data() {
        let f = failure(processor(&[1.0; 4], 5).process(&ticker("SPY", 2.0)));
        assert_eq!(f.kind, ErrorKind::NoData);
        assert!(f.message.contains("need at least 5"));
    }

    #[test]
    fn unordered_series_is_invalid_input() {
        let mut bad = closes(&[1.0, 2.0, 3.0]);
        bad.swap(0, 2);
        let p = TickerProcessor::new(Arc::new(FixedProvider { closes: bad }), Ema::new(2).unwrap(), 365);
        assert_eq!(failure(p.process(&ticker("SPY", 2.0))).kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn window_ends_on_as_of() {
        let p = processor(&[1.0], 1);
        let window = p.window();
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn huge_lookback_clamps_window_and_still_evaluates() {
        let p = TickerProcessor::new(
            Arc::new(FixedProvider {
                closes: closes(&[10.0, 11.0, 12.0, 13.0, 14.0]),
            }),
            Ema::new(3).unwrap(),
            u32::MAX,
        )
        .with_as_of(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(p.window().start, NaiveDate::MIN);
        assert!(p.process(&ticker("SPY", 10.0)).is_success());
    }

    #[test]
    fn evaluate_series_matches_process() {
        let p = processor(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        let spy = ticker("SPY", 10.0);
        let series = p.load_series("SPY").unwrap();
        let direct = p.evaluate_series(&spy, &series).unwrap();
        assert_eq!(ProcessingOutcome::Success(direct), p.process(&spy));
    }

    #[test]
    fn error_kind_names() {
        assert_eq!(ErrorKind::NoData.to_string(), "NoDataError");
        assert_eq!(
            serde_json::to_string(&ErrorKind::InsufficientData).unwrap(),
            "\"InsufficientDataError\""
        );
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let outcome = ProcessingOutcome::Failure(TickerFailure::new("X", ErrorKind::Fetch, "down"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["kind"], "FetchError");
        assert_eq!(outcome.symbol(), "X");
        assert!(!outcome.is_success());
    }
}
