//! Alert formatting and dispatch.
//!
//! The [`Notifier`] owns an optional [`NotificationSink`]. With no sink it
//! is a no-op. Publish failures are logged and never abort the batch.

use chrono::{DateTime, Utc};
use emawatch_core::EmaResult;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("sink rejected message with HTTP {status}")]
    Rejected { status: u16 },

    #[error("publish failed: {0}")]
    Other(String),
}

/// Destination for alert messages (a pub/sub topic, a webhook, the console).
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, subject: &str, message: &str) -> Result<(), PublishError>;
}

/// How qualifying tickers are grouped into messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// One message per qualifying ticker.
    #[default]
    PerTicker,
    /// One digest listing every qualifying ticker.
    Batched,
}

pub fn subject(ema_period: usize) -> String {
    format!("Stock {ema_period} EMA Alert")
}

/// One-line alert, e.g. `AAPL: $150.00 (1.23% above 200 EMA: $148.18)`.
pub fn format_alert(result: &EmaResult) -> String {
    format!(
        "{}: ${:.2} ({:.2}% {} {} EMA: ${:.2})",
        result.symbol,
        result.current_price,
        result.abs_distance(),
        result.direction,
        result.ema_period,
        result.ema_value
    )
}

pub fn format_digest(results: &[EmaResult], ema_period: usize, at: DateTime<Utc>) -> String {
    let mut lines = Vec::with_capacity(results.len() + 4);
    lines.push("Stock EMA Alert".to_string());
    lines.push(format!(
        "The following stocks are near their {ema_period}-day EMA:"
    ));
    lines.push(String::new());
    lines.extend(results.iter().map(format_alert));
    lines.push(String::new());
    lines.push(format!("Timestamp: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
    lines.join("\n")
}

pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    mode: NotifyMode,
    ema_period: usize,
}

impl Notifier {
    pub fn new(sink: Option<Arc<dyn NotificationSink>>, mode: NotifyMode, ema_period: usize) -> Self {
        Self {
            sink,
            mode,
            ema_period,
        }
    }

    /// Notifier with no sink; `notify` always returns 0.
    pub fn disabled(ema_period: usize) -> Self {
        Self::new(None, NotifyMode::default(), ema_period)
    }

    pub fn is_configured(&self) -> bool {
        self.sink.is_some()
    }

    /// Dispatch alerts for `qualifying` and return how many tickers were notified.
    pub fn notify(&self, qualifying: &[EmaResult]) -> usize {
        let Some(sink) = self.sink.as_deref() else {
            if !qualifying.is_empty() {
                tracing::info!(
                    qualifying = qualifying.len(),
                    "no notification sink configured, skipping alerts"
                );
            }
            return 0;
        };

        if qualifying.is_empty() {
            return 0;
        }

        let subject = subject(self.ema_period);
        match self.mode {
            NotifyMode::PerTicker => {
                let mut sent = 0;
                for result in qualifying {
                    match sink.publish(&subject, &format_alert(result)) {
                        Ok(()) => {
                            tracing::info!(symbol = %result.symbol, sink = sink.name(), "alert sent");
                            sent += 1;
                        }
                        Err(e) => tracing::warn!(
                            symbol = %result.symbol,
                            sink = sink.name(),
                            error = %e,
                            "failed to publish alert"
                        ),
                    }
                }
                sent
            }
            NotifyMode::Batched => {
                let message = format_digest(qualifying, self.ema_period, Utc::now());
                match sink.publish(&subject, &message) {
                    Ok(()) => {
                        tracing::info!(
                            tickers = qualifying.len(),
                            sink = sink.name(),
                            "alert digest sent"
                        );
                        qualifying.len()
                    }
                    Err(e) => {
                        tracing::warn!(sink = sink.name(), error = %e, "failed to publish alert digest");
                        0
                    }
                }
            }
        }
    }
}

/// Publishes alerts as JSON `{"subject", "message"}` POSTs to a topic URL.
pub struct HttpTopicSink {
    client: reqwest::blocking::Client,
    url: String,
}

#[derive(Serialize)]
struct TopicMessage<'a> {
    subject: &'a str,
    message: &'a str,
}

impl HttpTopicSink {
    pub fn new(url: impl Into<String>) -> Result<Self, PublishError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PublishError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl NotificationSink for HttpTopicSink {
    fn name(&self) -> &str {
        "http_topic"
    }

    fn publish(&self, subject: &str, message: &str) -> Result<(), PublishError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&TopicMessage { subject, message })
            .send()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Writes alerts as `[subject] message` lines; for local runs.
///
/// Defaults to stderr, leaving stdout to the invocation response.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stderr() -> Self {
        Self::with_writer(std::io::stderr())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl NotificationSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn publish(&self, subject: &str, message: &str) -> Result<(), PublishError> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "[{subject}] {message}")
            .and_then(|()| out.flush())
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}
