//! EMAWatch Runner: one stateless monitoring invocation, end to end.
//!
//! This crate builds on `emawatch-core` to provide:
//! - Validated configuration loading (JSON or TOML)
//! - Ticker processor with per-ticker failure capture
//! - Batch runner on a bounded worker pool
//! - Notifier with pluggable sinks (HTTP topic, console)
//! - Invocation handler producing the structured response
//! - Logging setup

pub mod batch;
pub mod config;
pub mod invocation;
pub mod logging;
pub mod notifier;
pub mod processor;

pub use batch::{BatchRunner, BatchSummary};
pub use config::{ConfigError, MonitorConfig, TickerConfig};
pub use invocation::{Invocation, InvocationBody, InvocationResponse};
pub use logging::init_logging;
pub use notifier::{
    ConsoleSink, HttpTopicSink, NotificationSink, Notifier, NotifyMode, PublishError,
};
pub use processor::{ErrorKind, ProcessingOutcome, TickerFailure, TickerProcessor};
