//! Entry-timing efficiency analysis.
//!
//! Derives Maximum Favorable / Adverse Excursion, the ideal entry, and a
//! timing score from the post-entry slice of a bar series. The realised
//! extremes act as a cheap oracle for what was reachable; the analysis is
//! explicitly backward-looking and claims nothing about predictability.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::AnalysisError;
use crate::domain::BarSeries;

/// Qualitative rating of the entry timing score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
    Poor,
    /// No post-entry bars were available to judge against.
    Unknown,
}

impl Verdict {
    /// Bucket a timing score. Boundaries belong to the bucket they open:
    /// 0 is EXCELLENT, -5 is GOOD, -10 is FAIR.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.0 {
            Verdict::Excellent
        } else if score >= -5.0 {
            Verdict::Good
        } else if score >= -10.0 {
            Verdict::Fair
        } else {
            Verdict::Poor
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Verdict::Excellent => "EXCELLENT",
            Verdict::Good => "GOOD",
            Verdict::Fair => "FAIR",
            Verdict::Poor => "POOR",
            Verdict::Unknown => "UNKNOWN",
        };
        f.write_str(tag)
    }
}

/// Result of the timing analysis. Prices are signed distances from entry,
/// percentages are relative to the entry price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    /// Maximum Favorable Excursion: peak high minus entry.
    pub mfe: f64,
    /// Maximum Adverse Excursion: lowest low minus entry (typically <= 0).
    pub mae: f64,
    pub mfe_percent: f64,
    pub mae_percent: f64,
    /// Lowest low in the window — the best price the market re-offered.
    pub ideal_entry: f64,
    /// Signed percent distance of entry above the ideal entry.
    pub entry_timing_score: f64,
    /// Percent gain from the ideal entry to the peak.
    pub missed_profit_potential: f64,
    pub verdict: Verdict,
}

impl TimingReport {
    fn unknown() -> Self {
        Self {
            mfe: 0.0,
            mae: 0.0,
            mfe_percent: 0.0,
            mae_percent: 0.0,
            ideal_entry: 0.0,
            entry_timing_score: 0.0,
            missed_profit_potential: 0.0,
            verdict: Verdict::Unknown,
        }
    }
}

/// Analyze entry timing against the post-entry window.
///
/// The window is every bar strictly after `entry_date`, bounded to the first
/// `horizon` bars. An empty window yields a zeroed report with verdict
/// `UNKNOWN` rather than an error: a trade entered today simply has no
/// post-entry evidence yet.
pub fn analyze_timing(
    entry_price: f64,
    entry_date: NaiveDate,
    series: &BarSeries,
    horizon: u32,
) -> Result<TimingReport, AnalysisError> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "entry price must be positive, got {entry_price}"
        )));
    }

    let window = series.after(entry_date).truncated(horizon as usize);
    if window.is_empty() {
        return Ok(TimingReport::unknown());
    }

    let high = window.max_high().expect("non-empty window has a high");
    let low = window.min_low().expect("non-empty window has a low");

    let mfe = high - entry_price;
    let mae = low - entry_price;
    let mfe_percent = 100.0 * mfe / entry_price;
    let mae_percent = 100.0 * mae / entry_price;
    let ideal_entry = low;
    let entry_timing_score = 100.0 * (ideal_entry - entry_price) / entry_price;
    let missed_profit_potential = (100.0 * (high - ideal_entry) / ideal_entry).max(0.0);

    Ok(TimingReport {
        mfe,
        mae,
        mfe_percent,
        mae_percent,
        ideal_entry,
        entry_timing_score,
        missed_profit_potential,
        verdict: Verdict::from_score(entry_timing_score),
    })
}
