//! Deterministic synthetic minute bars.
//!
//! A seeded random walk over weekday sessions. The seed is the BLAKE3 hash
//! of the symbol, so the same symbol always yields the same path regardless
//! of call order or thread. Clearly fake; for demos, tests and benchmarks.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Candle, Series};

/// Shape of the generated walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticWalk {
    pub start_price: f64,
    /// Maximum absolute per-bar return.
    pub step: f64,
    pub session_open: NaiveTime,
    pub bars_per_session: usize,
}

impl Default for SyntheticWalk {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            step: 0.002,
            session_open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            bars_per_session: 375,
        }
    }
}

/// 32-byte RNG seed derived from the symbol name.
pub fn seed_for(symbol: &str) -> [u8; 32] {
    *blake3::hash(symbol.trim().to_ascii_uppercase().as_bytes()).as_bytes()
}

impl SyntheticWalk {
    /// Minute bars for every weekday session in `[start, end]`.
    pub fn between(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Series {
        let days = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun));
        let times = days.flat_map(|day| self.session_times(day));
        self.walk(symbol, times)
    }

    /// Exactly `count` minute bars starting with the session of `first_day`.
    pub fn bars(&self, symbol: &str, first_day: NaiveDate, count: usize) -> Series {
        let days = first_day
            .iter_days()
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun));
        let times = days.flat_map(|day| self.session_times(day)).take(count);
        self.walk(symbol, times)
    }

    fn session_times(&self, day: NaiveDate) -> impl Iterator<Item = chrono::DateTime<Utc>> {
        let open = Utc.from_utc_datetime(&day.and_time(self.session_open));
        (0..self.bars_per_session as i64).map(move |m| open + Duration::minutes(m))
    }

    fn walk(
        &self,
        symbol: &str,
        times: impl Iterator<Item = chrono::DateTime<Utc>>,
    ) -> Series {
        let mut rng = StdRng::from_seed(seed_for(symbol));
        let mut price = self.start_price;
        let step = self.step.abs();

        let candles = times
            .map(|timestamp| {
                let ret: f64 = if step > 0.0 {
                    rng.gen_range(-step..step)
                } else {
                    0.0
                };
                let open = price;
                let close = (price * (1.0 + ret)).max(0.01);
                let wick = step.max(1e-4) / 2.0;
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..wick));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..wick));
                let volume = rng.gen_range(1_000..50_000u64) as f64;
                price = close;
                Candle::new(timestamp, open, high, low, close, volume)
            })
            .collect();

        Series::new(symbol.trim().to_ascii_uppercase(), candles)
    }
}
