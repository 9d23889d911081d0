//! Ordered daily bar container.
//!
//! A `BarSeries` is validated once at construction (bar invariants plus strict
//! date monotonicity) and immutable afterwards, so the analyzers can reduce
//! over it without re-checking.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use super::bar::{Bar, BarError};

/// Immutable ordered sequence of daily bars, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series from bars, validating each bar and the date ordering.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::OutOfOrder {
                    prev: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self { bars: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars with dates strictly after `date`. Ordering is preserved, so the
    /// result is a valid series.
    pub fn after(&self, date: NaiveDate) -> BarSeries {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.date > date)
            .cloned()
            .collect();
        Self { bars }
    }

    /// Bars with dates in the inclusive range `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> BarSeries {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect();
        Self { bars }
    }

    /// The first `n` bars of the series.
    pub fn truncated(&self, n: usize) -> BarSeries {
        Self {
            bars: self.bars.iter().take(n).cloned().collect(),
        }
    }

    pub fn max_high(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.high).reduce(f64::max)
    }

    pub fn min_low(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.low).reduce(f64::min)
    }
}

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error(transparent)]
    Bar(#[from] BarError),

    #[error("bars out of order: {next} does not follow {prev}")]
    OutOfOrder { prev: NaiveDate, next: NaiveDate },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(d: u32, high: f64, low: f64) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2025, 1, d).unwrap(),
            (high + low) / 2.0,
            high,
            low,
            (high + low) / 2.0,
            1_000,
        )
    }

    #[test]
    fn construction_accepts_ordered_bars() {
        let series = BarSeries::from_bars(vec![bar(2, 105.0, 95.0), bar(3, 110.0, 100.0)]).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn construction_rejects_duplicate_dates() {
        let result = BarSeries::from_bars(vec![bar(2, 105.0, 95.0), bar(2, 110.0, 100.0)]);
        assert!(matches!(result, Err(SeriesError::OutOfOrder { .. })));
    }

    #[test]
    fn construction_rejects_descending_dates() {
        let result = BarSeries::from_bars(vec![bar(3, 105.0, 95.0), bar(2, 110.0, 100.0)]);
        assert!(matches!(result, Err(SeriesError::OutOfOrder { .. })));
    }

    #[test]
    fn construction_rejects_invalid_bar() {
        let mut bad = bar(2, 105.0, 95.0);
        bad.low = 120.0;
        assert!(BarSeries::from_bars(vec![bad]).is_err());
    }

    #[test]
    fn after_slices_strictly() {
        let series = BarSeries::from_bars(vec![
            bar(2, 105.0, 95.0),
            bar(3, 110.0, 100.0),
            bar(6, 120.0, 104.0),
        ])
        .unwrap();

        let post = series.after(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(post.len(), 1);
        assert_eq!(post.first().unwrap().date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[test]
    fn between_is_inclusive() {
        let series = BarSeries::from_bars(vec![
            bar(2, 105.0, 95.0),
            bar(3, 110.0, 100.0),
            bar(6, 120.0, 104.0),
        ])
        .unwrap();

        let window = series.between(
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        );
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn reductions_over_series() {
        let series = BarSeries::from_bars(vec![
            bar(2, 105.0, 95.0),
            bar(3, 110.0, 100.0),
            bar(6, 108.0, 90.0),
        ])
        .unwrap();

        assert_eq!(series.max_high(), Some(110.0));
        assert_eq!(series.min_low(), Some(90.0));
    }

    #[test]
    fn reductions_on_empty_series_are_none() {
        let series = BarSeries::empty();
        assert_eq!(series.max_high(), None);
        assert_eq!(series.min_low(), None);
    }

    #[test]
    fn truncated_keeps_leading_bars() {
        let series = BarSeries::from_bars(vec![
            bar(2, 105.0, 95.0),
            bar(3, 110.0, 100.0),
            bar(6, 108.0, 90.0),
        ])
        .unwrap();

        let head = series.truncated(2);
        assert_eq!(head.len(), 2);
        assert_eq!(head.last().unwrap().date, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }
}
