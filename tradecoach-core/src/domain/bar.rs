use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self { date, open, high, low, close, volume }
    }

    /// Validate bar invariants: positive prices, `low <= open,close <= high`.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.high < self.low {
            return Err(BarError::InvalidRange { high: self.high, low: self.low });
        }
        for price in [self.open, self.high, self.low, self.close] {
            if !price.is_finite() || price <= 0.0 {
                return Err(BarError::NonPositivePrice { date: self.date });
            }
        }
        if !(self.low..=self.high).contains(&self.open) {
            return Err(BarError::OpenOutOfRange { date: self.date });
        }
        if !(self.low..=self.high).contains(&self.close) {
            return Err(BarError::CloseOutOfRange { date: self.date });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BarError {
    #[error("invalid bar range: high={high}, low={low}")]
    InvalidRange { high: f64, low: f64 },

    #[error("non-positive or non-finite price on {date}")]
    NonPositivePrice { date: NaiveDate },

    #[error("open price outside high/low range on {date}")]
    OpenOutOfRange { date: NaiveDate },

    #[error("close price outside high/low range on {date}")]
    CloseOutOfRange { date: NaiveDate },
}
