//! Behavioral anomaly detection.
//!
//! Compares a candidate trade's risk attributes against the user's own
//! history with a z-score model, and flags sector exposure the user has not
//! taken before. Only trades carrying a full behavioral profile count as
//! history; the candidate itself is excluded by id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{BehavioralProfile, Trade};

/// Minimum eligible history size for z-scores to be defined.
const MIN_HISTORY: usize = 2;

/// Absolute z-score at which an attribute becomes anomalous.
const Z_THRESHOLD: f64 = 2.0;

/// Numeric attribute tested by the z-score model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    PositionSize,
    StockBeta,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::PositionSize => f.write_str("position_size"),
            AnomalyKind::StockBeta => f.write_str("stock_beta"),
        }
    }
}

/// A z-score breach on a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub message: String,
    pub current_value: f64,
    pub historical_mean: f64,
    pub z_score: f64,
}

/// Sector exposure the history has never seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorWarning {
    pub message: String,
    /// The candidate's sector, original case.
    pub current_sector: String,
    /// Distinct historical sectors, original case, first-seen order.
    pub known_sectors: Vec<String>,
}

/// Sample statistics for one attribute. `z_score` is absent when the
/// historical sample has zero variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeStats {
    pub mean: f64,
    pub std: f64,
    pub z_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralMetrics {
    pub position_size: Option<AttributeStats>,
    pub stock_beta: Option<AttributeStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralReport {
    pub is_anomaly: bool,
    pub anomalies: Vec<Anomaly>,
    pub warnings: Vec<SectorWarning>,
    pub metrics: BehavioralMetrics,
}

impl BehavioralReport {
    /// Report with no findings: candidate ineligible or history too small.
    pub fn inert() -> Self {
        Self::default()
    }
}

/// Analyze a candidate profile against historical trades.
///
/// `candidate_id` is the store id of the candidate when it has already been
/// persisted, so the freshly-saved row excludes itself from its own history.
pub fn analyze_behavior(
    profile: Option<&BehavioralProfile>,
    candidate_id: Option<i64>,
    history: &[Trade],
) -> BehavioralReport {
    let profile = match profile {
        Some(p) => p,
        None => return BehavioralReport::inert(),
    };

    let eligible: Vec<&BehavioralProfile> = history
        .iter()
        .filter(|t| Some(t.id) != candidate_id)
        .filter_map(|t| t.behavioral.as_ref())
        .collect();

    if eligible.len() < MIN_HISTORY {
        return BehavioralReport::inert();
    }

    let mut report = BehavioralReport::default();

    // Anomalies keep the stable order [position_size, stock_beta].
    let position_sizes: Vec<f64> = eligible.iter().map(|p| p.position_size).collect();
    report.metrics.position_size = test_attribute(
        AnomalyKind::PositionSize,
        profile.position_size,
        &position_sizes,
        &mut report.anomalies,
    );

    let betas: Vec<f64> = eligible.iter().map(|p| p.stock_beta).collect();
    report.metrics.stock_beta = test_attribute(
        AnomalyKind::StockBeta,
        profile.stock_beta,
        &betas,
        &mut report.anomalies,
    );

    if let Some(warning) = sector_novelty(&profile.sector, &eligible) {
        report.warnings.push(warning);
    }

    report.is_anomaly = !report.anomalies.is_empty();
    report
}

/// Run the z-score test for one attribute, appending an anomaly on breach.
fn test_attribute(
    kind: AnomalyKind,
    value: f64,
    sample: &[f64],
    anomalies: &mut Vec<Anomaly>,
) -> Option<AttributeStats> {
    let mean = mean(sample);
    let std = sample_std(sample, mean);

    if std == 0.0 {
        return Some(AttributeStats { mean, std, z_score: None });
    }

    let z = (value - mean) / std;
    if z.abs() >= Z_THRESHOLD {
        anomalies.push(Anomaly {
            kind,
            message: anomaly_message(kind, value, mean, z),
            current_value: value,
            historical_mean: mean,
            z_score: z,
        });
    }

    Some(AttributeStats { mean, std, z_score: Some(z) })
}

fn anomaly_message(kind: AnomalyKind, value: f64, mean: f64, z: f64) -> String {
    let multiplier = value / mean;
    match kind {
        AnomalyKind::PositionSize => {
            let direction = if z > 0.0 { "larger" } else { "smaller" };
            format!(
                "Position size is {multiplier:.1}x the historical average ({direction} than usual)"
            )
        }
        AnomalyKind::StockBeta => {
            let direction = if z > 0.0 { "higher" } else { "lower" };
            format!(
                "Stock beta is {multiplier:.1}x the historical average ({direction} than usual)"
            )
        }
    }
}

/// Warn when the candidate's sector never occurs in the eligible history.
/// Comparison is case-insensitive; reported values keep their original case.
fn sector_novelty(current: &str, eligible: &[&BehavioralProfile]) -> Option<SectorWarning> {
    let mut known = Vec::new();
    let mut seen_lower = Vec::new();
    for profile in eligible {
        let lower = profile.sector.to_lowercase();
        if !seen_lower.contains(&lower) {
            seen_lower.push(lower);
            known.push(profile.sector.clone());
        }
    }

    if seen_lower.contains(&current.to_lowercase()) {
        return None;
    }

    Some(SectorWarning {
        message: format!("New sector: '{current}' is not in your trading history"),
        current_sector: current.to_string(),
        known_sectors: known,
    })
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Bessel-corrected sample standard deviation (divisor n - 1).
fn sample_std(xs: &[f64], mean: f64) -> f64 {
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}
