//! Deterministic mock market data.
//!
//! Generates a synthetic daily price walk so the pipeline can run without
//! brokerage credentials. The walk is seeded from `(symbol, horizon)` via
//! BLAKE3, so repeated fetches with the same inputs produce identical series
//! regardless of call order.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::provider::{MarketData, MarketDataError};
use crate::domain::{Bar, BarSeries};

/// Mean daily return of the synthetic walk.
const DAILY_DRIFT: f64 = 0.001;
/// Daily volatility applied to uniform noise in [-1, 1].
const DAILY_VOL: f64 = 0.02;
/// Intraday range as a fraction of the day's reference price.
const INTRADAY_RANGE: f64 = 0.015;
const BASE_VOLUME: f64 = 50_000_000.0;

/// Synthetic bar source with a reproducible price walk.
pub struct MockProvider {
    base_price: f64,
}

impl MockProvider {
    pub fn new() -> Self {
        Self { base_price: 150.0 }
    }

    /// Anchor the walk at a specific starting price (the CLI passes the
    /// trade's entry price so generated bars are in a plausible range).
    pub fn with_base_price(base_price: f64) -> Self {
        Self { base_price }
    }

    /// Derive a deterministic seed for `(symbol, horizon)`.
    fn seed(symbol: &str, horizon_days: u32) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&horizon_days.to_le_bytes());
        let hash = hasher.finalize();
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("blake3 output is 32 bytes"))
    }

    fn generate(&self, symbol: &str, horizon_days: u32, today: NaiveDate) -> Vec<Bar> {
        let mut rng = ChaCha8Rng::seed_from_u64(Self::seed(symbol, horizon_days));
        let mut price = self.base_price;
        let mut date = today - Duration::days(i64::from(horizon_days));
        let mut bars = Vec::new();

        for _ in 0..horizon_days {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date += Duration::days(1);
                continue;
            }

            let noise: f64 = rng.gen_range(-1.0..=1.0);
            price *= 1.0 + DAILY_DRIFT + DAILY_VOL * noise;

            let range = price * INTRADAY_RANGE;
            let open = price + range * 0.5 * rng.gen_range(-1.0..=1.0);
            let close = price + range * 0.5 * rng.gen_range(-1.0..=1.0);
            let high = open.max(close) + range * 0.3 * rng.gen_range(0.0..=1.0);
            let low = open.min(close) - range * 0.3 * rng.gen_range(0.0..=1.0);
            let volume = (BASE_VOLUME * rng.gen_range(0.7..=1.3)) as u64;

            bars.push(Bar::new(date, open, high, low, close, volume));
            date += Duration::days(1);
        }

        bars
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketData for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, symbol: &str, horizon_days: u32) -> Result<BarSeries, MarketDataError> {
        let today = Utc::now().date_naive();
        let bars = self.generate(symbol, horizon_days, today);
        if bars.is_empty() {
            return Err(MarketDataError::Empty { symbol: symbol.to_string() });
        }
        BarSeries::from_bars(bars).map_err(|e| MarketDataError::Transport(e.to_string()))
    }
}
