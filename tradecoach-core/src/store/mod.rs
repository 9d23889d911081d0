//! SQLite persistence for trades and their analyses.
//!
//! Append-only: trades are inserted once and never mutated or deleted;
//! analyses accumulate alongside their trade, newest first on read. The
//! connection is mutex-guarded so one store can serve concurrent callers
//! with serialized writes.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::analysis::{BehavioralReport, TimingReport};
use crate::domain::{BehavioralProfile, NewTrade, Trade};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    entry_price REAL NOT NULL,
    entry_date TEXT NOT NULL,
    horizon INTEGER NOT NULL,
    position_size REAL,
    stock_beta REAL,
    sector TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trade_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (trade_id) REFERENCES trades(id)
);

CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol);
CREATE INDEX IF NOT EXISTS idx_trades_entry_date ON trades(entry_date);
CREATE INDEX IF NOT EXISTS idx_trades_created_at ON trades(created_at);
CREATE INDEX IF NOT EXISTS idx_analyses_trade_id ON analyses(trade_id);
"#;

/// Analysis payload persisted against a trade. Self-describing JSON so new
/// kinds can be added without migrating the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisPayload {
    Timing(TimingReport),
    Behavioral(BehavioralReport),
}

impl AnalysisPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisPayload::Timing(_) => "timing",
            AnalysisPayload::Behavioral(_) => "behavioral",
        }
    }
}

/// Stored analysis row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub trade_id: i64,
    pub payload: AnalysisPayload,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts over the stored data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_trades: i64,
    pub total_analyses: i64,
    pub unique_symbols: i64,
    pub unique_sectors: i64,
    pub first_entry_date: Option<NaiveDate>,
    pub last_entry_date: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Durable trade/analysis store over a local SQLite file.
pub struct TradeStore {
    conn: Mutex<Connection>,
}

impl TradeStore {
    /// Open (or create) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create tables and indexes. Safe to call repeatedly.
    pub fn init(&self) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA_SQL)?;
        debug!("store schema initialized");
        Ok(())
    }

    /// Insert a trade, returning its assigned id.
    pub fn save_trade(&self, trade: &NewTrade) -> Result<i64, StoreError> {
        let conn = self.lock();
        let created_at = now_text();
        let (position_size, stock_beta, sector) = match &trade.behavioral {
            Some(p) => (Some(p.position_size), Some(p.stock_beta), Some(p.sector.as_str())),
            None => (None, None, None),
        };

        conn.execute(
            "INSERT INTO trades (symbol, entry_price, entry_date, horizon,
                                 position_size, stock_beta, sector, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trade.symbol,
                trade.entry_price,
                trade.entry_date.to_string(),
                trade.horizon,
                position_size,
                stock_beta,
                sector,
                created_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, symbol = %trade.symbol, "trade saved");
        Ok(id)
    }

    /// Append an analysis row for a trade.
    pub fn save_analysis(&self, trade_id: i64, payload: &AnalysisPayload) -> Result<i64, StoreError> {
        let json = serde_json::to_string(payload)?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO analyses (trade_id, kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![trade_id, payload.kind(), json, now_text()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_trade(&self, id: i64) -> Result<Option<Trade>, StoreError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, symbol, entry_price, entry_date, horizon,
                        position_size, stock_beta, sector, created_at
                 FROM trades WHERE id = ?1",
                params![id],
                raw_trade,
            )
            .optional()?;
        row.map(TradeRow::into_trade).transpose()
    }

    /// Most recent trades, newest first. Ties on `created_at` break by id.
    pub fn get_last_n_trades(&self, n: u32) -> Result<Vec<Trade>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, symbol, entry_price, entry_date, horizon,
                    position_size, stock_beta, sector, created_at
             FROM trades
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![n], raw_trade)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TradeRow::into_trade).collect()
    }

    /// All trades eligible as behavioral history: the three profile columns
    /// are non-null. Order is stable per call.
    pub fn get_trades_for_behavioral_history(&self) -> Result<Vec<Trade>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, symbol, entry_price, entry_date, horizon,
                    position_size, stock_beta, sector, created_at
             FROM trades
             WHERE position_size IS NOT NULL
               AND stock_beta IS NOT NULL
               AND sector IS NOT NULL
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], raw_trade)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TradeRow::into_trade).collect()
    }

    /// All analyses for a trade, newest first.
    pub fn get_analyses(&self, trade_id: i64) -> Result<Vec<AnalysisRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, trade_id, payload, created_at
             FROM analyses
             WHERE trade_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let raw = stmt
            .query_map(params![trade_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, trade_id, payload, created_at)| {
                Ok(AnalysisRecord {
                    id,
                    trade_id,
                    payload: serde_json::from_str(&payload)?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock();
        let total_trades: i64 = conn.query_row("SELECT COUNT(*) FROM trades", [], |r| r.get(0))?;
        let total_analyses: i64 =
            conn.query_row("SELECT COUNT(*) FROM analyses", [], |r| r.get(0))?;
        let unique_symbols: i64 =
            conn.query_row("SELECT COUNT(DISTINCT symbol) FROM trades", [], |r| r.get(0))?;
        let unique_sectors: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT LOWER(sector)) FROM trades WHERE sector IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let (first, last): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(entry_date), MAX(entry_date) FROM trades",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(StoreStats {
            total_trades,
            total_analyses,
            unique_symbols,
            unique_sectors,
            first_entry_date: first.as_deref().map(parse_date).transpose()?,
            last_entry_date: last.as_deref().map(parse_date).transpose()?,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means another caller panicked mid-statement; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Raw column values of one trades row, converted outside the rusqlite
/// callback so parse failures surface as `StoreError::Corrupt`.
struct TradeRow {
    id: i64,
    symbol: String,
    entry_price: f64,
    entry_date: String,
    horizon: u32,
    position_size: Option<f64>,
    stock_beta: Option<f64>,
    sector: Option<String>,
    created_at: String,
}

fn raw_trade(row: &rusqlite::Row<'_>) -> rusqlite::Result<TradeRow> {
    Ok(TradeRow {
        id: row.get(0)?,
        symbol: row.get(1)?,
        entry_price: row.get(2)?,
        entry_date: row.get(3)?,
        horizon: row.get(4)?,
        position_size: row.get(5)?,
        stock_beta: row.get(6)?,
        sector: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl TradeRow {
    fn into_trade(self) -> Result<Trade, StoreError> {
        let behavioral = match (self.position_size, self.stock_beta, self.sector) {
            (Some(position_size), Some(stock_beta), Some(sector)) => {
                Some(BehavioralProfile { position_size, stock_beta, sector })
            }
            _ => None,
        };

        Ok(Trade {
            id: self.id,
            symbol: self.symbol,
            entry_price: self.entry_price,
            entry_date: parse_date(&self.entry_date)?,
            horizon: self.horizon,
            behavioral,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, StoreError> {
    text.parse()
        .map_err(|e| StoreError::Corrupt(format!("bad entry_date '{text}': {e}")))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad created_at '{text}': {e}")))
}
