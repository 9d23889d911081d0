//! Domain types — the vocabulary of the coaching engine.
//!
//! Bars, bar series, and trade records; everything else builds on these.

pub mod bar;
pub mod series;
pub mod trade;

pub use bar::{Bar, BarError};
pub use series::{BarSeries, SeriesError};
pub use trade::{BehavioralProfile, NewTrade, Trade, RECOGNIZED_HORIZONS};
