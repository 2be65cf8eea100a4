//! Yahoo Finance price provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API. One request per ticker,
//! no retries: a failed request is reported and the batch moves on. No
//! failure state is kept between requests, so one symbol's error never
//! affects another's fetch.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{LookbackWindow, PriceProvider, ProviderError};
use crate::domain::DailyClose;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, symbol: &str, window: &LookbackWindow) -> String {
        let start_ts = day_start_ts(window.start);
        let end_ts = day_start_ts(window.end) + 86_399;
        format!(
            "{}/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d&includePrePost=false",
            self.base_url
        )
    }

    /// Parse a chart API body into daily closes, oldest first.
    ///
    /// Days with a `null` close (holidays, halted sessions) are skipped. When
    /// two timestamps land on the same date the later quote wins.
    fn parse_response(symbol: &str, body: &str) -> Result<Vec<DailyClose>, ProviderError> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "failed to parse response for {symbol}: {e}"
            ))
        })?;

        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(ProviderError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )))
            }
            (None, None) => {
                return Err(ProviderError::NoData {
                    symbol: symbol.to_string(),
                })
            }
        };

        let no_data = || ProviderError::NoData {
            symbol: symbol.to_string(),
        };

        let data = result.into_iter().next().ok_or_else(no_data)?;
        let timestamps = data.timestamp.ok_or_else(no_data)?;
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no quote data".into()))?;

        let mut closes: Vec<DailyClose> = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            match closes.last_mut() {
                Some(last) if last.date == date => last.close = close,
                _ => closes.push(DailyClose::new(date, close)),
            }
        }

        if closes.is_empty() {
            return Err(no_data());
        }

        Ok(closes)
    }

    fn fetch_once(&self, symbol: &str, window: &LookbackWindow) -> Result<String, ProviderError> {
        let url = self.chart_url(symbol, window);
        tracing::debug!(symbol = %symbol, url = %url, "requesting chart data");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ProviderError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        match status {
            reqwest::StatusCode::FORBIDDEN => {
                return Err(ProviderError::AccessDenied(format!(
                    "Yahoo Finance refused the request for {symbol}"
                )))
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ProviderError::RateLimited { retry_after_secs });
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                return Err(ProviderError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ))
            }
            // Unknown symbols come back as 404 with a chart error body.
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            _ if !status.is_success() => {
                return Err(ProviderError::Other(format!("HTTP {status} for {symbol}")))
            }
            _ => {}
        }

        resp.text()
            .map_err(|e| ProviderError::NetworkUnreachable(e.to_string()))
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_daily_closes(
        &self,
        symbol: &str,
        window: &LookbackWindow,
    ) -> Result<Vec<DailyClose>, ProviderError> {
        let body = self.fetch_once(symbol, window)?;
        Self::parse_response(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "SPY"},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open": [470.0, 471.0, 469.0],
                        "close": [472.65, null, 467.28],
                        "volume": [100, 200, 300]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_closes_and_skips_nulls() {
        let closes = YahooProvider::parse_response("SPY", BODY).unwrap();
        assert_eq!(closes.len(), 2);
        assert_eq!(closes[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(closes[0].close, 472.65);
        assert_eq!(closes[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn same_day_quotes_keep_latest() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704220000],
            "indicators":{"quote":[{"close":[100.0,101.5]}]}}],"error":null}}"#;
        let closes = YahooProvider::parse_response("SPY", body).unwrap();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].close, 101.5);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = YahooProvider::parse_response("ZZZZ", body).unwrap_err();
        assert!(matches!(err, ProviderError::SymbolNotFound { .. }));
        assert!(err.is_no_data());
    }

    #[test]
    fn missing_timestamps_is_no_data() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let err = YahooProvider::parse_response("SPY", body).unwrap_err();
        assert!(matches!(err, ProviderError::NoData { .. }));
    }

    #[test]
    fn all_null_closes_is_no_data() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800],
            "indicators":{"quote":[{"close":[null]}]}}],"error":null}}"#;
        let err = YahooProvider::parse_response("SPY", body).unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn garbage_body_is_format_change() {
        let err = YahooProvider::parse_response("SPY", "<html>").unwrap_err();
        assert!(matches!(err, ProviderError::ResponseFormatChanged(_)));
    }

    #[test]
    fn chart_url_covers_whole_window() {
        let provider = YahooProvider::new()
            .unwrap()
            .with_base_url("http://localhost:9999/");
        let window = LookbackWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        let url = provider.chart_url("AAPL", &window);
        assert!(url.starts_with("http://localhost:9999/v8/finance/chart/AAPL?"));
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1704239999"));
        assert!(url.contains("interval=1d"));
    }

    // ── Loopback HTTP ────────────────────────────────────────────────

    /// Serve `count` connections, answering each with `respond(path)`.
    fn serve<F>(count: usize, respond: F) -> String
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(count) {
                let mut stream = stream.unwrap();
                let path = read_request_path(&mut stream);
                stream.write_all(respond(&path).as_bytes()).unwrap();
            }
        });
        format!("http://{addr}")
    }

    fn read_request_path(stream: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = String::from_utf8_lossy(&request);
        head.split_whitespace().nth(1).unwrap_or("/").to_string()
    }

    fn http(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{extra_headers}\r\n{body}",
            body.len()
        )
    }

    fn provider_for(base_url: String) -> YahooProvider {
        YahooProvider::new().unwrap().with_base_url(base_url)
    }

    fn window() -> LookbackWindow {
        LookbackWindow::trailing_days(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 365)
    }

    fn fetch_with_status(status: &str, extra_headers: &str) -> ProviderError {
        let (status, extra_headers) = (status.to_string(), extra_headers.to_string());
        let base = serve(1, move |_| http(&status, &extra_headers, "{}"));
        provider_for(base)
            .fetch_daily_closes("SPY", &window())
            .unwrap_err()
    }

    #[test]
    fn ok_response_is_parsed() {
        let base = serve(1, |path| {
            assert!(path.starts_with("/v8/finance/chart/SPY?"));
            http("200 OK", "", BODY)
        });
        let closes = provider_for(base).fetch_daily_closes("SPY", &window()).unwrap();
        assert_eq!(closes.len(), 2);
        assert_eq!(closes[1].close, 467.28);
    }

    #[test]
    fn not_found_status_is_no_data() {
        let err = fetch_with_status("404 Not Found", "");
        assert!(matches!(err, ProviderError::SymbolNotFound { ref symbol } if symbol == "SPY"));
        assert!(err.is_no_data());
    }

    #[test]
    fn rate_limit_reads_retry_after() {
        let err = fetch_with_status("429 Too Many Requests", "Retry-After: 17\r\n");
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 17 }));
        assert!(!err.is_no_data());
    }

    #[test]
    fn rate_limit_without_header_defaults_to_a_minute() {
        let err = fetch_with_status("429 Too Many Requests", "");
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 60 }));
    }

    #[test]
    fn unauthorized_and_forbidden_are_fetch_failures() {
        let err = fetch_with_status("401 Unauthorized", "");
        assert!(matches!(err, ProviderError::AuthenticationRequired(_)));
        let err = fetch_with_status("403 Forbidden", "");
        assert!(matches!(err, ProviderError::AccessDenied(_)));
        assert!(!err.is_no_data());
    }

    #[test]
    fn server_error_is_other() {
        let err = fetch_with_status("503 Service Unavailable", "");
        assert!(matches!(err, ProviderError::Other(ref m) if m.contains("503")));
    }

    #[test]
    fn unreachable_host_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = provider_for(format!("http://{addr}"))
            .fetch_daily_closes("SPY", &window())
            .unwrap_err();
        assert!(matches!(err, ProviderError::NetworkUnreachable(_)));
    }

    #[test]
    fn failing_symbols_do_not_affect_later_requests() {
        let base = serve(5, |path| {
            if path.contains("/chart/BAD") {
                http("500 Internal Server Error", "", "{}")
            } else if path.contains("/chart/BANNED") {
                http("403 Forbidden", "", "{}")
            } else {
                http("200 OK", "", BODY)
            }
        });
        let provider = provider_for(base);
        for symbol in ["BAD1", "BAD2", "BAD3", "BANNED"] {
            assert!(provider.fetch_daily_closes(symbol, &window()).is_err());
        }
        let closes = provider.fetch_daily_closes("GOOD", &window()).unwrap();
        assert_eq!(closes.len(), 2);
    }
}
