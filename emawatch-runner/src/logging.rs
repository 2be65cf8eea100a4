//! Structured logging setup.
//!
//! Everything logs through `tracing` macros; this module installs the
//! `tracing-subscriber` formatter once per process. Logs go to stderr so the
//! invocation response on stdout stays machine-readable. `RUST_LOG`
//! overrides the level passed in.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Parse a level name, falling back to INFO for anything unrecognized.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn default_directives(level: Level) -> String {
    // HTTP internals are noisy at DEBUG
    format!("{level},reqwest=warn,hyper=warn,hyper_util=warn")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(level: &str, json: bool) {
    INIT.call_once(|| {
        let level = parse_level(level);
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr);

        let installed = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        match installed {
            Ok(()) => tracing::debug!(level = %level, json, "logging initialized"),
            Err(e) => eprintln!("logging not initialized: {e}"),
        }
    });
}
