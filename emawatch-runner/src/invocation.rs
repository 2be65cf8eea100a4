//! One monitoring invocation: load config → run batch → structured response.
//!
//! The response is what the scheduler-side tooling parses: status 200 with
//! the batch summary whenever the config was usable (even if every ticker
//! failed), status 500 only when the config could not be loaded.

use crate::batch::{BatchRunner, BatchSummary};
use crate::config::{ConfigError, MonitorConfig};
use crate::notifier::{NotificationSink, Notifier};
use crate::processor::TickerProcessor;
use chrono::NaiveDate;
use emawatch_core::data::PriceProvider;
use emawatch_core::Ema;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvocationBody {
    Completed {
        message: String,
        config_hash: String,
        results: BatchSummary,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: InvocationBody,
}

impl InvocationResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    pub fn summary(&self) -> Option<&BatchSummary> {
        match &self.body {
            InvocationBody::Completed { results, .. } => Some(results),
            InvocationBody::Failed { .. } => None,
        }
    }

    fn completed(config: &MonitorConfig, summary: BatchSummary) -> Self {
        let message = if summary.has_errors() {
            "Stock monitoring completed with errors"
        } else {
            "Stock monitoring completed successfully"
        };
        Self {
            status_code: STATUS_OK,
            body: InvocationBody::Completed {
                message: message.to_string(),
                config_hash: config.fingerprint(),
                results: summary,
            },
        }
    }

    fn failed(err: &ConfigError) -> Self {
        Self {
            status_code: STATUS_ERROR,
            body: InvocationBody::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Collaborators for an invocation, injected by the caller.
pub struct Invocation {
    provider: Arc<dyn PriceProvider>,
    sink: Option<Arc<dyn NotificationSink>>,
    as_of: Option<NaiveDate>,
}

impl Invocation {
    pub fn new(provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            provider,
            sink: None,
            as_of: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Wire a batch runner for `config`.
    pub fn batch_runner(&self, config: &MonitorConfig) -> BatchRunner {
        // Config validation guarantees ema_period >= 1
        let ema = Ema::new(config.ema_period()).unwrap_or_default();
        let mut processor = TickerProcessor::new(self.provider.clone(), ema, config.lookback_days());
        if let Some(as_of) = self.as_of {
            processor = processor.with_as_of(as_of);
        }
        let notifier = Notifier::new(self.sink.clone(), config.notify_mode(), config.ema_period());
        BatchRunner::new(processor, notifier, config.max_workers())
    }

    pub fn run(&self, config: &MonitorConfig) -> InvocationResponse {
        let summary = self.batch_runner(config).run(config.tickers());
        tracing::info!(
            alerts_sent = summary.alerts_sent,
            stocks_processed = summary.stocks_processed,
            errors = summary.errors.len(),
            "monitoring complete"
        );
        InvocationResponse::completed(config, summary)
    }

    /// Load the config at `path` and run; a config failure becomes a 500 response.
    pub fn run_from_path(&self, path: &Path) -> InvocationResponse {
        match MonitorConfig::load(path) {
            Ok(config) => self.run(&config),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load configuration");
                InvocationResponse::failed(&e)
            }
        }
    }
}
