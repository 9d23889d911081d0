//! Trade coaching engine.
//!
//! Given one executed equity trade and a window of post-entry daily bars,
//! computes an entry-timing efficiency report and a behavioral anomaly report
//! against the user's own history, and persists both for future comparisons.

pub mod analysis;
pub mod coach;
pub mod data;
pub mod domain;
pub mod store;

pub use coach::{CancelToken, Coach, CoachError, CoachRequest, CoachingReport, MarketSource};
