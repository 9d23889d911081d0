//! Property tests for analyzer invariants.
//!
//! Uses proptest to verify:
//! 1. Timing bounds — ideal entry is the window's lowest low and
//!    `mfe_percent >= mae_percent` for any non-empty window
//! 2. Verdict partition — every finite score lands in exactly one bucket
//! 3. Z-score symmetry — reflecting the sample and candidate around the
//!    mean negates every z-score
//! 4. Sample gate — fewer than two eligible trades never flags an anomaly

use chrono::{Duration, NaiveDate, Utc};
use proptest::prelude::*;
use tradecoach_core::analysis::{analyze_behavior, analyze_timing, Verdict};
use tradecoach_core::domain::{Bar, BarSeries, BehavioralProfile, Trade};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// (center, half-range) pairs that expand into valid bars.
fn arb_window() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec(((50.0..200.0_f64), (0.0..10.0_f64)), 1..40)
}

fn window_to_series(window: &[(f64, f64)]) -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars = window
        .iter()
        .enumerate()
        .map(|(i, &(center, half))| {
            Bar::new(
                base + Duration::days(i as i64 + 1),
                center,
                center + half,
                center - half,
                center,
                1_000,
            )
        })
        .collect();
    BarSeries::from_bars(bars).expect("generated bars are valid")
}

fn trade_with(id: i64, position_size: f64, stock_beta: f64, sector: &str) -> Trade {
    Trade {
        id,
        symbol: "SPY".into(),
        entry_price: 100.0,
        entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        horizon: 30,
        behavioral: Some(BehavioralProfile {
            position_size,
            stock_beta,
            sector: sector.into(),
        }),
        created_at: Utc::now(),
    }
}

// ── 1. Timing bounds ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn ideal_entry_is_window_min_low(entry in arb_price(), window in arb_window()) {
        let series = window_to_series(&window);
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let report = analyze_timing(entry, entry_date, &series, 40).unwrap();

        let min_low = series.min_low().unwrap();
        prop_assert!((report.ideal_entry - min_low).abs() < 1e-9);
    }

    #[test]
    fn mfe_percent_dominates_mae_percent(entry in arb_price(), window in arb_window()) {
        let series = window_to_series(&window);
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let report = analyze_timing(entry, entry_date, &series, 40).unwrap();

        prop_assert!(report.mfe_percent >= report.mae_percent);
        prop_assert!(report.missed_profit_potential >= 0.0);
    }
}

// ── 2. Verdict partition ─────────────────────────────────────────────

proptest! {
    #[test]
    fn every_score_lands_in_exactly_one_bucket(score in -1000.0..1000.0_f64) {
        let verdict = Verdict::from_score(score);
        let expected = if score >= 0.0 {
            Verdict::Excellent
        } else if score >= -5.0 {
            Verdict::Good
        } else if score >= -10.0 {
            Verdict::Fair
        } else {
            Verdict::Poor
        };
        prop_assert_eq!(verdict, expected);
        prop_assert_ne!(verdict, Verdict::Unknown);
    }
}

#[test]
fn verdict_boundary_cases() {
    assert_eq!(Verdict::from_score(0.0), Verdict::Excellent);
    assert_eq!(Verdict::from_score(-5.0), Verdict::Good);
    assert_eq!(Verdict::from_score(-10.0), Verdict::Fair);
}

// ── 3. Z-score symmetry ──────────────────────────────────────────────

proptest! {
    /// Reflecting every sample value and the candidate around the sample
    /// mean negates the z-score and preserves its magnitude.
    #[test]
    fn z_scores_negate_under_reflection(
        sizes in prop::collection::vec(1_000.0..50_000.0_f64, 3..20),
        candidate in 1_000.0..100_000.0_f64,
    ) {
        let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;

        let history: Vec<Trade> = sizes
            .iter()
            .enumerate()
            .map(|(i, &s)| trade_with(i as i64 + 1, s, 1.0, "Technology"))
            .collect();
        let reflected: Vec<Trade> = sizes
            .iter()
            .enumerate()
            .map(|(i, &s)| trade_with(i as i64 + 1, 2.0 * mean - s, 1.0, "Technology"))
            .collect();

        let profile = BehavioralProfile {
            position_size: candidate,
            stock_beta: 1.0,
            sector: "Technology".into(),
        };
        let mirrored = BehavioralProfile {
            position_size: 2.0 * mean - candidate,
            ..profile.clone()
        };

        let a = analyze_behavior(Some(&profile), None, &history);
        let b = analyze_behavior(Some(&mirrored), None, &reflected);

        match (
            a.metrics.position_size.and_then(|s| s.z_score),
            b.metrics.position_size.and_then(|s| s.z_score),
        ) {
            (Some(za), Some(zb)) => {
                prop_assert!((za + zb).abs() < 1e-6);
                prop_assert!((za.abs() - zb.abs()).abs() < 1e-6);
            }
            // Zero-variance samples skip the z-test on both sides.
            (None, None) => {}
            _ => prop_assert!(false, "z-score present on only one side"),
        }
        prop_assert_eq!(a.is_anomaly, b.is_anomaly);
    }
}

// ── 4. Sample gate ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn under_two_eligible_trades_never_flags(
        candidate in 0.0..1_000_000.0_f64,
        beta in 0.0..10.0_f64,
    ) {
        let profile = BehavioralProfile {
            position_size: candidate,
            stock_beta: beta,
            sector: "Energy".into(),
        };

        let empty = analyze_behavior(Some(&profile), None, &[]);
        prop_assert!(!empty.is_anomaly);
        prop_assert!(empty.anomalies.is_empty());

        let one = vec![trade_with(1, 10.0, 0.1, "Technology")];
        let gated = analyze_behavior(Some(&profile), None, &one);
        prop_assert!(!gated.is_anomaly);
        prop_assert!(gated.anomalies.is_empty());
    }
}
