//! Tiger Brokers market-data adapter.
//!
//! Fetches daily bars from the Tiger OpenAPI quote gateway. Handles
//! credential loading from the environment, transient-failure retries with
//! exponential backoff, and response parsing. Auth and not-found failures
//! are never retried.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{MarketData, MarketDataError};
use crate::domain::{Bar, BarSeries};

const GATEWAY_URL: &str = "https://openapi.tigerfintech.com/gateway/quote/bars";

/// Retries after the first attempt, applied to transport failures only.
const MAX_RETRIES: u32 = 2;

/// Credentials for the Tiger OpenAPI, loaded from the environment.
#[derive(Debug, Clone)]
pub struct TigerCredentials {
    pub tiger_id: String,
    pub private_key: String,
    pub account: Option<String>,
}

impl TigerCredentials {
    /// Read `TIGER_ID`, `PRIVATE_KEY_PK1` and (optionally) `ACCOUNT`.
    pub fn from_env() -> Result<Self, MarketDataError> {
        let tiger_id = std::env::var("TIGER_ID")
            .map_err(|_| MarketDataError::Auth("TIGER_ID is not set".into()))?;
        let private_key = std::env::var("PRIVATE_KEY_PK1")
            .map_err(|_| MarketDataError::Auth("PRIVATE_KEY_PK1 is not set".into()))?;
        let account = std::env::var("ACCOUNT").ok();
        Ok(Self { tiger_id, private_key, account })
    }
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    code: i64,
    message: Option<String>,
    data: Option<Vec<BarRow>>,
}

#[derive(Debug, Deserialize)]
struct BarRow {
    /// Bar timestamp in epoch milliseconds.
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<u64>,
}

/// Live bar source backed by the Tiger quote gateway.
pub struct TigerProvider {
    client: reqwest::blocking::Client,
    credentials: TigerCredentials,
    base_url: String,
    base_delay: Duration,
}

impl TigerProvider {
    pub fn new(credentials: TigerCredentials) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            credentials,
            base_url: GATEWAY_URL.to_string(),
            base_delay: Duration::from_millis(500),
        }
    }

    /// Construct against the environment-provided credentials.
    pub fn from_env() -> Result<Self, MarketDataError> {
        Ok(Self::new(TigerCredentials::from_env()?))
    }

    fn request(&self, symbol: &str, horizon_days: u32) -> Result<BarsResponse, FetchFailure> {
        let end = Utc::now();
        let begin = end - ChronoDuration::days(i64::from(horizon_days));

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("symbol", symbol),
                ("period", "day"),
                ("begin_time", &begin.timestamp_millis().to_string()),
                ("end_time", &end.timestamp_millis().to_string()),
                ("tiger_id", &self.credentials.tiger_id),
            ])
            .header("tiger-id", &self.credentials.tiger_id)
            .bearer_auth(&self.credentials.private_key)
            .header(
                "tiger-account",
                self.credentials.account.as_deref().unwrap_or(""),
            )
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    FetchFailure::Retryable(MarketDataError::Transport(e.to_string()))
                } else {
                    FetchFailure::Fatal(MarketDataError::Transport(e.to_string()))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchFailure::Fatal(MarketDataError::Auth(format!(
                "gateway rejected credentials (HTTP {status})"
            ))));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchFailure::Fatal(MarketDataError::NotFound {
                symbol: symbol.to_string(),
            }));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchFailure::Retryable(MarketDataError::Transport(format!(
                "HTTP {status} for {symbol}"
            ))));
        }
        if !status.is_success() {
            return Err(FetchFailure::Fatal(MarketDataError::Transport(format!(
                "HTTP {status} for {symbol}"
            ))));
        }

        response
            .json::<BarsResponse>()
            .map_err(|e| FetchFailure::Fatal(MarketDataError::Transport(format!(
                "malformed response for {symbol}: {e}"
            ))))
    }

    fn to_series(symbol: &str, rows: Vec<BarRow>, horizon_days: u32) -> Result<BarSeries, MarketDataError> {
        let mut bars: Vec<Bar> = rows
            .into_iter()
            .filter_map(|row| {
                let date = DateTime::from_timestamp_millis(row.time).map(|dt| dt.date_naive())?;
                let bar = Bar::new(date, row.open, row.high, row.low, row.close, row.volume.unwrap_or(0));
                // Drop rows the gateway occasionally pads with zeros.
                bar.validate().ok().map(|_| bar)
            })
            .collect();

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        // Keep the most recent `horizon_days` bars.
        if bars.len() > horizon_days as usize {
            bars.drain(..bars.len() - horizon_days as usize);
        }

        if bars.is_empty() {
            return Err(MarketDataError::Empty { symbol: symbol.to_string() });
        }

        BarSeries::from_bars(bars).map_err(|e| MarketDataError::Transport(e.to_string()))
    }
}

/// Whether a failed attempt is worth repeating.
enum FetchFailure {
    Retryable(MarketDataError),
    Fatal(MarketDataError),
}

impl MarketData for TigerProvider {
    fn name(&self) -> &str {
        "tiger"
    }

    fn fetch(&self, symbol: &str, horizon_days: u32) -> Result<BarSeries, MarketDataError> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(symbol, attempt, "retrying tiger fetch after {delay:?}");
                std::thread::sleep(delay);
            }

            match self.request(symbol, horizon_days) {
                Ok(response) => {
                    if response.code != 0 {
                        let message = response.message.unwrap_or_else(|| "unknown".into());
                        return Err(MarketDataError::Transport(format!(
                            "gateway error {}: {message}",
                            response.code
                        )));
                    }
                    let rows = response.data.unwrap_or_default();
                    debug!(symbol, rows = rows.len(), "tiger fetch succeeded");
                    return Self::to_series(symbol, rows, horizon_days);
                }
                Err(FetchFailure::Fatal(e)) => return Err(e),
                Err(FetchFailure::Retryable(e)) => last_error = Some(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| MarketDataError::Transport("retries exhausted".into())))
    }
}
