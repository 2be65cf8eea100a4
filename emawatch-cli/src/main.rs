//! EMAWatch CLI: run a monitoring invocation, check one ticker, validate a config.
//!
//! Commands:
//! - `run`: one stateless invocation; prints the JSON response, exits 1 on a 500
//! - `check`: fetch one symbol and show where it sits relative to its EMA
//! - `validate`: load the config and print the normalized ticker list

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use emawatch_core::data::{CsvProvider, PriceProvider, SyntheticProvider, YahooProvider};
use emawatch_core::{ema_series, Ema, DEFAULT_EMA_PERIOD};
use emawatch_runner::config::{
    estimated_trading_days, DEFAULT_LOOKBACK_DAYS, DEFAULT_THRESHOLD_PERCENTAGE, MAX_LOOKBACK_DAYS,
};
use emawatch_runner::{
    init_logging, ConsoleSink, HttpTopicSink, Invocation, MonitorConfig, NotificationSink,
    ProcessingOutcome, TickerConfig, TickerProcessor,
};
use std::path::PathBuf;
use std::sync::Arc;

/// How many trailing EMA values `check` prints.
const CHECK_TAIL: usize = 5;

#[derive(Parser)]
#[command(
    name = "emawatch",
    about = "EMAWatch, alert when stocks trade near their long-term EMA"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, env = "EMAWATCH_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    /// Yahoo Finance v8 chart API.
    Yahoo,
    /// `<csv-dir>/<SYMBOL>.csv` files with date and close columns.
    Csv,
    /// Deterministic random walk seeded by the symbol.
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one monitoring invocation and print the response JSON.
    Run {
        /// Path to a JSON or TOML config file.
        #[arg(long, env = "EMAWATCH_CONFIG", default_value = "tickers.json")]
        config: PathBuf,

        /// Notification topic endpoint. Without it no alerts are published.
        #[arg(long, env = "EMAWATCH_TOPIC_URL")]
        topic_url: Option<String>,

        /// Print alerts to stderr instead of publishing them.
        #[arg(long, default_value_t = false, conflicts_with = "topic_url")]
        console_sink: bool,

        #[arg(long, value_enum, default_value = "yahoo")]
        provider: ProviderKind,

        /// Directory of per-symbol CSV files (with --provider csv).
        #[arg(long, default_value = "data")]
        csv_dir: PathBuf,

        /// End of the lookback window (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Evaluate a single symbol without notifying.
    Check {
        symbol: String,

        /// Proximity threshold in percent.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD_PERCENTAGE)]
        threshold: f64,

        /// EMA period in trading days.
        #[arg(long, default_value_t = DEFAULT_EMA_PERIOD)]
        period: usize,

        /// Calendar days of history to request.
        #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
        lookback_days: u32,

        #[arg(long, value_enum, default_value = "yahoo")]
        provider: ProviderKind,

        #[arg(long, default_value = "data")]
        csv_dir: PathBuf,

        #[arg(long)]
        as_of: Option<String>,
    },
    /// Load and validate a config file.
    Validate {
        #[arg(long, env = "EMAWATCH_CONFIG", default_value = "tickers.json")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    match cli.command {
        Commands::Run {
            config,
            topic_url,
            console_sink,
            provider,
            csv_dir,
            as_of,
        } => run_invocation(config, topic_url, console_sink, provider, csv_dir, as_of),
        Commands::Check {
            symbol,
            threshold,
            period,
            lookback_days,
            provider,
            csv_dir,
            as_of,
        } => run_check(&symbol, threshold, period, lookback_days, provider, csv_dir, as_of),
        Commands::Validate { config } => run_validate(config),
    }
}

fn build_provider(kind: ProviderKind, csv_dir: PathBuf) -> Result<Arc<dyn PriceProvider>> {
    let provider: Arc<dyn PriceProvider> = match kind {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new().context("building Yahoo client")?),
        ProviderKind::Csv => Arc::new(CsvProvider::new(csv_dir)),
        ProviderKind::Synthetic => Arc::new(SyntheticProvider::new()),
    };
    Ok(provider)
}

fn parse_as_of(as_of: Option<&str>) -> Result<Option<NaiveDate>> {
    as_of
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid --as-of date '{s}', expected YYYY-MM-DD"))
        })
        .transpose()
}

fn run_invocation(
    config: PathBuf,
    topic_url: Option<String>,
    console_sink: bool,
    provider: ProviderKind,
    csv_dir: PathBuf,
    as_of: Option<String>,
) -> Result<()> {
    let as_of = parse_as_of(as_of.as_deref())?;
    let mut invocation = Invocation::new(build_provider(provider, csv_dir)?);

    let sink: Option<Arc<dyn NotificationSink>> = if console_sink {
        Some(Arc::new(ConsoleSink::stderr()))
    } else if let Some(url) = topic_url {
        Some(Arc::new(HttpTopicSink::new(url).context("building topic sink")?))
    } else {
        tracing::info!("no topic configured, alerts will not be published");
        None
    };
    if let Some(sink) = sink {
        invocation = invocation.with_sink(sink);
    }
    if let Some(date) = as_of {
        invocation = invocation.with_as_of(date);
    }

    let response = invocation.run_from_path(&config);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_check(
    symbol: &str,
    threshold: f64,
    period: usize,
    lookback_days: u32,
    provider: ProviderKind,
    csv_dir: PathBuf,
    as_of: Option<String>,
) -> Result<()> {
    let ticker = TickerConfig::new(symbol, threshold)?;
    let ema = Ema::new(period)?;
    if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
        bail!("--lookback-days must be between 1 and {MAX_LOOKBACK_DAYS}, got {lookback_days}");
    }
    let trading_days = estimated_trading_days(lookback_days) as usize;
    if trading_days < period {
        bail!(
            "--lookback-days {lookback_days} gives about {trading_days} trading days, fewer than the EMA period {period}"
        );
    }

    let mut processor = TickerProcessor::new(build_provider(provider, csv_dir)?, ema, lookback_days);
    if let Some(date) = parse_as_of(as_of.as_deref())? {
        processor = processor.with_as_of(date);
    }

    let window = processor.window();
    println!(
        "{} via {} ({} to {})",
        ticker.symbol(),
        processor.provider_name(),
        window.start,
        window.end
    );

    let outcome = match processor.load_series(ticker.symbol()) {
        Ok(series) => {
            let prices = series.prices();
            let emas = ema_series(&prices, period);
            println!("{} closes loaded", series.len());
            println!("{:<12} {:>12} {:>12}", "Date", "Close", "EMA");
            println!("{}", "-".repeat(38));
            let skip = series.len().saturating_sub(CHECK_TAIL);
            for (day, ema) in series.closes().iter().zip(&emas).skip(skip) {
                println!("{:<12} {:>12.2} {:>12.2}", day.date, day.close, ema);
            }
            println!();
            ProcessingOutcome::from(processor.evaluate_series(&ticker, &series))
        }
        Err(failure) => ProcessingOutcome::Failure(failure),
    };
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let ProcessingOutcome::Success(result) = &outcome {
        let verdict = if result.is_near { "NEAR" } else { "not near" };
        println!(
            "{}: {verdict} its {}-day EMA ({:+.2}%, threshold {:.2}%)",
            result.symbol, result.ema_period, result.percent_distance, result.threshold_percentage
        );
    }
    Ok(())
}

fn run_validate(config: PathBuf) -> Result<()> {
    let loaded = MonitorConfig::load(&config)
        .with_context(|| format!("validating {}", config.display()))?;

    println!("Config: {}", config.display());
    println!("Fingerprint: {}", loaded.fingerprint());
    println!(
        "EMA period: {}  lookback: {} days (~{} trading)  workers: {}  notify: {:?}",
        loaded.ema_period(),
        loaded.lookback_days(),
        estimated_trading_days(loaded.lookback_days()),
        loaded.max_workers(),
        loaded.notify_mode()
    );
    println!();
    println!("{:<10} {:>10}", "Symbol", "Threshold");
    println!("{}", "-".repeat(21));
    for ticker in loaded.tickers() {
        println!("{:<10} {:>9.2}%", ticker.symbol(), ticker.threshold_percentage());
    }
    Ok(())
}
