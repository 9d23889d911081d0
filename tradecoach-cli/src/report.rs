//! Terminal rendering of a coaching report.
//!
//! One text block with four sections: trade summary, timing efficiency,
//! behavioral patterns, coaching advice. Percentages carry two decimals,
//! currency two decimals with thousands separators.

use tradecoach_core::analysis::{AnomalyKind, BehavioralReport, TimingReport, Verdict};
use tradecoach_core::CoachingReport;

const RULE: &str = "================================================================================";
const THIN: &str = "--------------------------------------------------------------------------------";

pub fn render(report: &CoachingReport) -> String {
    let mut out = Vec::new();

    out.push(RULE.to_string());
    out.push(format!("{:^80}", "TRADING COACH REPORT"));
    out.push(RULE.to_string());

    trade_summary(report, &mut out);
    timing_section(report, &mut out);
    if report.trade.behavioral.is_some() {
        behavioral_section(&report.behavioral, &mut out);
    }
    advice_section(report, &mut out);

    out.push(RULE.to_string());
    out.join("\n")
}

fn trade_summary(report: &CoachingReport, out: &mut Vec<String>) {
    out.push(String::new());
    out.push("TRADE SUMMARY".to_string());
    out.push(THIN.to_string());
    out.push(format!("  Symbol:           {}", report.trade.symbol));
    out.push(format!("  Entry Price:      ${}", currency(report.trade.entry_price)));
    out.push(format!("  Entry Date:       {}", report.trade.entry_date));
    out.push(format!("  Horizon:          {} days", report.trade.horizon));
    if report.trade_id > 0 {
        out.push(format!("  Trade ID:         #{}", report.trade_id));
    }
}

fn timing_section(report: &CoachingReport, out: &mut Vec<String>) {
    let timing = &report.timing;
    out.push(String::new());
    out.push("TIMING EFFICIENCY ANALYSIS".to_string());
    out.push(THIN.to_string());

    if timing.verdict == Verdict::Unknown {
        out.push(format!("  Verdict:          {}", timing.verdict));
        out.push("  No bars after the entry date yet; timing cannot be judged.".to_string());
        return;
    }

    out.push(format!("  Actual Entry:     ${}", currency(report.trade.entry_price)));
    out.push(format!(
        "  Ideal Entry:      ${} (lowest price in period)",
        currency(timing.ideal_entry)
    ));
    out.push(format!("  Timing Score:     {:.2}%", timing.entry_timing_score));
    out.push(format!("  Verdict:          {}", timing.verdict));
    out.push(format!(
        "  Peak Potential:   ${} ({:+.2}%)",
        currency(timing.mfe + report.trade.entry_price),
        timing.mfe_percent
    ));
    out.push(format!(
        "  Maximum Risk:     ${} ({:.2}%)",
        currency(timing.mae + report.trade.entry_price),
        timing.mae_percent
    ));
    out.push(format!("  Missed Profit:    {:.2}%", timing.missed_profit_potential));
}

fn behavioral_section(behavioral: &BehavioralReport, out: &mut Vec<String>) {
    out.push(String::new());
    out.push("BEHAVIORAL PATTERN ANALYSIS".to_string());
    out.push(THIN.to_string());

    if behavioral.is_anomaly {
        out.push("  Status:           ANOMALIES DETECTED".to_string());
        for (i, anomaly) in behavioral.anomalies.iter().enumerate() {
            out.push(format!(
                "  {}. {}",
                i + 1,
                anomaly.kind.to_string().to_uppercase().replace('_', " ")
            ));
            out.push(format!("     Current:       {}", currency(anomaly.current_value)));
            out.push(format!(
                "     Historical:    {} (mean)",
                currency(anomaly.historical_mean)
            ));
            out.push(format!("     Z-Score:       {:.2}", anomaly.z_score));
            out.push(format!("     {}", anomaly.message));
        }
    } else {
        out.push("  Status:           NORMAL".to_string());
    }

    if !behavioral.warnings.is_empty() {
        out.push("  Warnings:".to_string());
        for warning in &behavioral.warnings {
            out.push(format!("    - {}", warning.message));
            out.push(format!(
                "      Known sectors: {}",
                warning.known_sectors.join(", ")
            ));
        }
    }

    let metrics = &behavioral.metrics;
    if metrics.position_size.is_some() || metrics.stock_beta.is_some() {
        out.push("  Your Trading Profile:".to_string());
        if let Some(stats) = &metrics.position_size {
            out.push(format!(
                "    Avg Position Size: ${} (+/- ${})",
                currency(stats.mean),
                currency(stats.std)
            ));
        }
        if let Some(stats) = &metrics.stock_beta {
            out.push(format!(
                "    Avg Stock Beta:    {:.2} (+/- {:.2})",
                stats.mean, stats.std
            ));
        }
    }
}

fn advice_section(report: &CoachingReport, out: &mut Vec<String>) {
    out.push(String::new());
    out.push("COACHING ADVICE".to_string());
    out.push(THIN.to_string());

    for line in advice_lines(&report.timing, &report.behavioral) {
        out.push(format!("  - {line}"));
    }
}

fn advice_lines(timing: &TimingReport, behavioral: &BehavioralReport) -> Vec<String> {
    let mut advice = Vec::new();

    match timing.verdict {
        Verdict::Excellent => {
            advice.push("Entry timing: excellent execution, keep using your current entry strategy.".into());
        }
        Verdict::Good => {
            advice.push("Entry timing: acceptable, can be improved with better technical analysis.".into());
        }
        Verdict::Fair | Verdict::Poor => {
            advice.push("Entry timing: consider limit orders at support levels rather than market orders.".into());
            advice.push("Practice patience and wait for pullbacks before entering positions.".into());
        }
        Verdict::Unknown => {
            advice.push("No post-entry bars yet; re-run once the market has traded past the entry date.".into());
        }
    }

    if timing.verdict != Verdict::Unknown && timing.mae_percent < -10.0 {
        advice.push("Risk management: the position showed significant adverse movement; consider tighter stop losses.".into());
    }

    for anomaly in &behavioral.anomalies {
        match anomaly.kind {
            AnomalyKind::PositionSize if anomaly.z_score > 0.0 => {
                advice.push("Position size: you are risking more than usual, make sure this is intentional.".into());
            }
            AnomalyKind::PositionSize => {
                advice.push("Position size: unusually small position, check whether you are being too cautious.".into());
            }
            AnomalyKind::StockBeta if anomaly.z_score > 0.0 => {
                advice.push("Risk profile: this stock is more volatile than your typical picks; consider reducing size.".into());
            }
            AnomalyKind::StockBeta => {
                advice.push("Risk profile: this stock is much less volatile than your typical picks.".into());
            }
        }
    }

    if advice.len() == 1 && behavioral.anomalies.is_empty() && timing.verdict == Verdict::Excellent {
        advice.push("This trade aligns well with your profile, keep executing with discipline.".into());
    }

    advice
}

/// Format a value with two decimals and thousands separators: 10600 -> "10,600.00".
pub fn currency(value: f64) -> String {
    let negative = value < 0.0;
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').expect("two-decimal format");

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tradecoach_core::analysis::{analyze_behavior, analyze_timing};
    use tradecoach_core::domain::{Bar, BarSeries, BehavioralProfile, NewTrade, Trade};
    use tradecoach_core::CoachingReport;

    fn sample_report(profile: Option<BehavioralProfile>, history: Vec<Trade>) -> CoachingReport {
        let entry_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let bars = BarSeries::from_bars(vec![
            Bar::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), 100.0, 110.0, 95.0, 105.0, 1_000),
        ])
        .unwrap();
        let timing = analyze_timing(100.0, entry_date, &bars, 7).unwrap();
        let behavioral = analyze_behavior(profile.as_ref(), None, &history);

        CoachingReport {
            trade_id: 7,
            trade: NewTrade {
                symbol: "AAPL".into(),
                entry_price: 100.0,
                entry_date,
                horizon: 7,
                behavioral: profile,
            },
            timing,
            behavioral,
            bars,
            persisted_analysis: true,
        }
    }

    fn trade(id: i64, size: f64, beta: f64, sector: &str) -> Trade {
        Trade {
            id,
            symbol: "X".into(),
            entry_price: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            horizon: 30,
            behavioral: Some(BehavioralProfile {
                position_size: size,
                stock_beta: beta,
                sector: sector.into(),
            }),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(currency(0.0), "0.00");
        assert_eq!(currency(950.5), "950.50");
        assert_eq!(currency(10_600.0), "10,600.00");
        assert_eq!(currency(1_234_567.891), "1,234,567.89");
        assert_eq!(currency(-50_000.0), "-50,000.00");
    }

    #[test]
    fn report_contains_all_sections() {
        let history = vec![
            trade(1, 10_000.0, 1.2, "Technology"),
            trade(2, 11_000.0, 1.1, "Technology"),
        ];
        let profile = BehavioralProfile {
            position_size: 10_500.0,
            stock_beta: 1.15,
            sector: "Technology".into(),
        };
        let text = render(&sample_report(Some(profile), history));

        assert!(text.contains("TRADE SUMMARY"));
        assert!(text.contains("TIMING EFFICIENCY ANALYSIS"));
        assert!(text.contains("BEHAVIORAL PATTERN ANALYSIS"));
        assert!(text.contains("COACHING ADVICE"));
        assert!(text.contains("Trade ID:         #7"));
    }

    #[test]
    fn behavioral_section_skipped_without_profile() {
        let text = render(&sample_report(None, Vec::new()));
        assert!(!text.contains("BEHAVIORAL PATTERN ANALYSIS"));
    }

    #[test]
    fn verdict_rendered_verbatim() {
        let text = render(&sample_report(None, Vec::new()));
        // ideal entry 95 vs entry 100 -> score -5 -> GOOD
        assert!(text.contains("Verdict:          GOOD"));
        assert!(text.contains("Timing Score:     -5.00%"));
    }

    #[test]
    fn anomaly_lines_rendered() {
        let history = vec![
            trade(1, 10_000.0, 1.2, "Technology"),
            trade(2, 10_200.0, 1.25, "Technology"),
            trade(3, 9_800.0, 1.15, "Technology"),
        ];
        let profile = BehavioralProfile {
            position_size: 50_000.0,
            stock_beta: 1.2,
            sector: "Technology".into(),
        };
        let text = render(&sample_report(Some(profile), history));

        assert!(text.contains("ANOMALIES DETECTED"));
        assert!(text.contains("POSITION SIZE"));
        assert!(text.contains("50,000.00"));
        assert!(text.contains("risking more than usual"));
    }

    #[test]
    fn new_sector_warning_rendered() {
        let history = vec![
            trade(1, 10_000.0, 1.2, "Technology"),
            trade(2, 10_200.0, 1.25, "Healthcare"),
        ];
        let profile = BehavioralProfile {
            position_size: 10_100.0,
            stock_beta: 1.22,
            sector: "Cryptocurrency".into(),
        };
        let text = render(&sample_report(Some(profile), history));

        assert!(text.contains("Status:           NORMAL"));
        assert!(text.contains("New sector: 'Cryptocurrency'"));
        assert!(text.contains("Known sectors: Technology, Healthcare"));
    }
}
