//! Batch runner: processes every configured ticker and aggregates the outcome.
//!
//! Tickers run on a private rayon pool bounded by `max_workers`. Outcomes are
//! collected in input order and aggregated on the calling thread, so the
//! summary never loses an update. One ticker's failure never stops the batch.

use crate::config::TickerConfig;
use crate::notifier::Notifier;
use crate::processor::{ProcessingOutcome, TickerFailure, TickerProcessor};
use emawatch_core::EmaResult;
use rayon::prelude::*;
use serde::Serialize;

/// Summary of one invocation's batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Tickers attempted (successes + failures).
    pub stocks_processed: usize,
    /// Tickers covered by a delivered notification.
    pub alerts_sent: usize,
    /// Per-ticker failures, in input order.
    pub errors: Vec<TickerFailure>,
    /// Near results handed to the notifier.
    pub alerts: Vec<EmaResult>,
    /// Every successful evaluation, in input order.
    pub results: Vec<EmaResult>,
}

impl BatchSummary {
    /// Aggregate outcomes. `alerts_sent` is left at zero for the caller to fill.
    pub fn from_outcomes(outcomes: Vec<ProcessingOutcome>) -> Self {
        let mut summary = BatchSummary {
            stocks_processed: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                ProcessingOutcome::Success(result) => {
                    if result.is_near {
                        summary.alerts.push(result.clone());
                    }
                    summary.results.push(result);
                }
                ProcessingOutcome::Failure(failure) => summary.errors.push(failure),
            }
        }
        summary
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub struct BatchRunner {
    processor: TickerProcessor,
    notifier: Notifier,
    max_workers: usize,
}

impl BatchRunner {
    pub fn new(processor: TickerProcessor, notifier: Notifier, max_workers: usize) -> Self {
        Self {
            processor,
            notifier,
            max_workers: max_workers.max(1),
        }
    }

    pub fn processor(&self) -> &TickerProcessor {
        &self.processor
    }

    pub fn run(&self, tickers: &[TickerConfig]) -> BatchSummary {
        tracing::info!(
            tickers = tickers.len(),
            workers = self.max_workers,
            provider = self.processor.provider_name(),
            "starting batch"
        );

        let outcomes = self.process_all(tickers);
        let mut summary = BatchSummary::from_outcomes(outcomes);
        summary.alerts_sent = self.notifier.notify(&summary.alerts);

        tracing::info!(
            processed = summary.stocks_processed,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            near = summary.alerts.len(),
            alerts_sent = summary.alerts_sent,
            "batch complete"
        );
        summary
    }

    /// One outcome per ticker, in input order.
    pub fn process_all(&self, tickers: &[TickerConfig]) -> Vec<ProcessingOutcome> {
        let workers = self.max_workers.min(tickers.len());
        if workers <= 1 {
            return self.process_sequential(tickers);
        }

        // Private pool, never the global one.
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("emawatch-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| {
                tickers
                    .par_iter()
                    .map(|ticker| self.processor.process(ticker))
                    .collect()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build worker pool, processing sequentially");
                self.process_sequential(tickers)
            }
        }
    }

    fn process_sequential(&self, tickers: &[TickerConfig]) -> Vec<ProcessingOutcome> {
        tickers
            .iter()
            .map(|ticker| self.processor.process(ticker))
            .collect()
    }
}
