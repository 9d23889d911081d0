//! Market-data source abstraction.
//!
//! The `MarketData` trait abstracts over bar sources (live brokerage, the
//! deterministic mock) so the orchestrator can be wired with either and tests
//! can script their own.

use thiserror::Error;

use crate::domain::BarSeries;

/// A source of daily OHLCV bars.
///
/// `fetch` returns at most `horizon_days` trading-day bars ending on or
/// before today, ascending by date. Fewer bars than requested is normal
/// (holidays, weekends); zero bars is a failure.
pub trait MarketData: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, horizon_days: u32) -> Result<BarSeries, MarketDataError>;
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no bars returned for {symbol}")]
    Empty { symbol: String },
}
