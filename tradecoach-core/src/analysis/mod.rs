//! Pure analyzers: entry timing and behavioral anomalies.
//!
//! Both are pure CPU — series and history in, report out. They only fail on
//! invalid input; missing evidence degrades to an inert or UNKNOWN report.

pub mod behavioral;
pub mod timing;

use thiserror::Error;

pub use behavioral::{
    analyze_behavior, Anomaly, AnomalyKind, AttributeStats, BehavioralMetrics, BehavioralReport,
    SectorWarning,
};
pub use timing::{analyze_timing, TimingReport, Verdict};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
