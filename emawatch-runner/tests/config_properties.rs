//! Property tests for configuration validation.
//!
//! 1. Symbols normalize the same way regardless of case and padding
//! 2. Positive finite thresholds are accepted, everything else rejected
//! 3. A lookback is accepted iff its trading-day estimate covers the EMA period
//! 4. Per-ticker thresholds override the default; the fingerprint tracks them

use emawatch_runner::config::{estimated_trading_days, ConfigError};
use emawatch_runner::{MonitorConfig, TickerConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn symbol_normalization_ignores_case_and_padding(
        symbol in "[A-Za-z0-9]{1,12}",
        left in 0usize..4,
        right in 0usize..4,
    ) {
        let padded = format!("{}{}{}", " ".repeat(left), symbol.to_lowercase(), " ".repeat(right));
        let a = TickerConfig::new(&padded, 2.0).unwrap();
        let b = TickerConfig::new(&symbol.to_uppercase(), 2.0).unwrap();
        prop_assert_eq!(a.symbol(), b.symbol());
        prop_assert_eq!(a.symbol(), symbol.to_uppercase());
    }

    #[test]
    fn threshold_must_be_positive_and_finite(t in -100.0f64..100.0) {
        let result = TickerConfig::new("SPY", t);
        if t > 0.0 {
            prop_assert_eq!(result.unwrap().threshold_percentage(), t);
        } else {
            let rejected = matches!(result, Err(ConfigError::InvalidThreshold { .. }));
            prop_assert!(rejected);
        }
    }

    #[test]
    fn trading_day_estimate_is_monotone_and_below_calendar_days(days in 0u32..20_000) {
        let estimate = estimated_trading_days(days);
        prop_assert!(estimate <= days);
        prop_assert!(estimated_trading_days(days + 1) >= estimate);
    }

    #[test]
    fn lookback_accepted_iff_it_covers_the_period(period in 1usize..400, days in 1u32..2_000) {
        let json = format!(
            r#"{{"tickers": ["SPY"], "ema_period": {period}, "lookback_days": {days}}}"#
        );
        let result = MonitorConfig::from_json_str(&json);
        if (estimated_trading_days(days) as usize) >= period {
            let config = result.unwrap();
            prop_assert_eq!(config.ema_period(), period);
            prop_assert_eq!(config.lookback_days(), days);
        } else {
            let too_short = matches!(result, Err(ConfigError::LookbackTooShort { .. }));
            prop_assert!(too_short);
        }
    }

    #[test]
    fn per_ticker_threshold_overrides_default(own_tenths in 1u32..100, default_tenths in 1u32..100) {
        let own = f64::from(own_tenths) / 10.0;
        let default = f64::from(default_tenths) / 10.0;
        let json = format!(
            r#"{{"tickers": ["SPY", {{"symbol": "QQQ", "threshold_percentage": {own}}}],
                "threshold_percentage": {default}}}"#
        );
        let config = MonitorConfig::from_json_str(&json).unwrap();
        prop_assert_eq!(config.tickers()[0].threshold_percentage(), default);
        prop_assert_eq!(config.tickers()[1].threshold_percentage(), own);

        let same = MonitorConfig::from_json_str(&json).unwrap();
        prop_assert_eq!(config.fingerprint(), same.fingerprint());
    }
}
