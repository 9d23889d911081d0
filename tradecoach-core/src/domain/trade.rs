use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Risk attributes used by the behavioral analyzer.
///
/// The three fields are all-or-nothing: a trade either carries a full profile
/// or none, which keeps the history-eligibility invariant structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralProfile {
    /// Position size in currency units.
    pub position_size: f64,
    pub stock_beta: f64,
    /// Free-form sector label, case preserved, compared case-insensitively.
    pub sector: String,
}

/// Persisted trade record. Never mutated or deleted once saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Store-assigned positive id.
    pub id: i64,
    pub symbol: String,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    /// Analysis horizon in days.
    pub horizon: u32,
    pub behavioral: Option<BehavioralProfile>,
    /// Wall-clock timestamp assigned by the store.
    pub created_at: DateTime<Utc>,
}

/// Unsaved form of a trade, before the store assigns id and created_at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub symbol: String,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub horizon: u32,
    pub behavioral: Option<BehavioralProfile>,
}

/// Horizons the front-ends recognize for history display.
pub const RECOGNIZED_HORIZONS: [u32; 3] = [7, 30, 90];
