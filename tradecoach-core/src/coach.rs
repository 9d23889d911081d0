//! Coaching orchestrator.
//!
//! Binds a trade request to the market-data source, the analyzers, and the
//! store: validate, fetch, time, persist, compare against history, persist
//! the analyses, return the combined report. Collaborators are injected at
//! construction so tests can wire the mock source and an in-memory store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::{
    analyze_behavior, analyze_timing, AnalysisError, BehavioralReport, TimingReport,
};
use crate::data::{MarketData, MarketDataError};
use crate::domain::{BarSeries, BehavioralProfile, NewTrade};
use crate::store::{AnalysisPayload, StoreError, TradeStore};

/// Sentinel trade id for requests analyzed with `save = false`.
pub const UNSAVED_TRADE_ID: i64 = -1;

/// Which bar source to use for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSource {
    Live,
    Mock,
}

/// A single trade to be analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachRequest {
    pub symbol: String,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub horizon: u32,
    pub behavioral: Option<BehavioralProfile>,
    pub source: MarketSource,
    pub save: bool,
}

impl CoachRequest {
    fn to_new_trade(&self) -> NewTrade {
        NewTrade {
            symbol: self.symbol.clone(),
            entry_price: self.entry_price,
            entry_date: self.entry_date,
            horizon: self.horizon,
            behavioral: self.behavioral.clone(),
        }
    }
}

/// Combined result of one coaching run.
#[derive(Debug, Clone, Serialize)]
pub struct CoachingReport {
    /// Store-assigned id, or `UNSAVED_TRADE_ID` when `save` was false.
    pub trade_id: i64,
    pub trade: NewTrade,
    pub timing: TimingReport,
    pub behavioral: BehavioralReport,
    pub bars: BarSeries,
    /// False when the trade row exists but analysis rows could not be
    /// written (or nothing was persisted at all).
    pub persisted_analysis: bool,
}

/// Cooperative cancellation flag, checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), CoachError> {
        if self.is_cancelled() {
            Err(CoachError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AnalysisError> for CoachError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::InvalidInput(msg) => CoachError::InvalidInput(msg),
        }
    }
}

/// The coaching engine: market data sources plus the store.
pub struct Coach {
    store: TradeStore,
    live: Box<dyn MarketData>,
    mock: Box<dyn MarketData>,
}

impl Coach {
    pub fn new(store: TradeStore, live: Box<dyn MarketData>, mock: Box<dyn MarketData>) -> Self {
        Self { store, live, mock }
    }

    pub fn store(&self) -> &TradeStore {
        &self.store
    }

    /// Run the full coaching pipeline for one trade.
    ///
    /// Writes from a single call are totally ordered: the trade row is
    /// committed before its analysis rows, which are committed before this
    /// returns. The cancellation token is checked before each write stage, so
    /// a cancelled call never leaves partial state behind.
    pub fn analyze(
        &self,
        mut request: CoachRequest,
        cancel: &CancelToken,
    ) -> Result<CoachingReport, CoachError> {
        validate(&mut request)?;
        cancel.check()?;

        let provider = match request.source {
            MarketSource::Live => self.live.as_ref(),
            MarketSource::Mock => self.mock.as_ref(),
        };
        info!(symbol = %request.symbol, source = provider.name(), "fetching bars");
        let bars = provider.fetch(&request.symbol, request.horizon)?;
        cancel.check()?;

        let timing = analyze_timing(request.entry_price, request.entry_date, &bars, request.horizon)?;
        cancel.check()?;

        let trade = request.to_new_trade();
        let trade_id = if request.save {
            self.store.save_trade(&trade)?
        } else {
            UNSAVED_TRADE_ID
        };

        // History is read unconditionally so unsaved requests still get a
        // behavioral verdict against the persisted corpus.
        let history = self.store.get_trades_for_behavioral_history()?;
        cancel.check()?;

        let candidate_id = (trade_id > 0).then_some(trade_id);
        let behavioral = analyze_behavior(trade.behavioral.as_ref(), candidate_id, &history);

        let persisted_analysis = if request.save {
            match self.persist_analyses(trade_id, &timing, &behavioral) {
                Ok(()) => true,
                Err(e) => {
                    // The trade row is already durable; degrade rather than
                    // fail the whole run.
                    warn!(trade_id, error = %e, "analysis persistence failed");
                    false
                }
            }
        } else {
            false
        };

        Ok(CoachingReport {
            trade_id,
            trade,
            timing,
            behavioral,
            bars,
            persisted_analysis,
        })
    }

    fn persist_analyses(
        &self,
        trade_id: i64,
        timing: &TimingReport,
        behavioral: &BehavioralReport,
    ) -> Result<(), StoreError> {
        self.store
            .save_analysis(trade_id, &AnalysisPayload::Timing(timing.clone()))?;
        self.store
            .save_analysis(trade_id, &AnalysisPayload::Behavioral(behavioral.clone()))?;
        Ok(())
    }
}

/// Validate a request, rejecting on the first invalid field. The symbol is
/// upper-cased in place.
fn validate(request: &mut CoachRequest) -> Result<(), CoachError> {
    let symbol = request.symbol.trim();
    if symbol.is_empty() || symbol.len() > 10 {
        return Err(CoachError::InvalidInput(format!(
            "symbol must be 1-10 characters, got '{}'",
            request.symbol
        )));
    }
    if !symbol.chars().all(|c| c.is_ascii_graphic()) {
        return Err(CoachError::InvalidInput(format!(
            "symbol contains non-printable characters: '{symbol}'"
        )));
    }
    request.symbol = symbol.to_ascii_uppercase();

    if !request.entry_price.is_finite() || request.entry_price <= 0.0 {
        return Err(CoachError::InvalidInput(format!(
            "entry price must be positive, got {}",
            request.entry_price
        )));
    }

    if request.horizon == 0 {
        return Err(CoachError::InvalidInput("horizon must be at least 1 day".into()));
    }

    if let Some(profile) = &request.behavioral {
        if !profile.position_size.is_finite() || profile.position_size < 0.0 {
            return Err(CoachError::InvalidInput(format!(
                "position size must be non-negative, got {}",
                profile.position_size
            )));
        }
        if !profile.stock_beta.is_finite() || profile.stock_beta < 0.0 {
            return Err(CoachError::InvalidInput(format!(
                "stock beta must be non-negative, got {}",
                profile.stock_beta
            )));
        }
        if profile.sector.trim().is_empty() {
            return Err(CoachError::InvalidInput("sector must not be empty".into()));
        }
    }

    Ok(())
}
