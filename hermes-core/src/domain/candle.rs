//! Candle and Series: the fundamental market data units.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV record for one bar of one symbol.
///
/// Candles are immutable once constructed. Ordering and duplicate handling are
/// the Data Guard's concern, not the engines'.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Unix timestamp in seconds.
    pub fn time(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// True if any price field is NaN or infinite.
    pub fn has_non_finite_price(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// True if any price is zero or negative.
    pub fn has_non_positive_price(&self) -> bool {
        self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0
    }

    /// OHLC consistency: high >= low, high covers the body, low covers the body.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Ordered candles for a single symbol. Immutable input to a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub candles: Vec<Candle>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.candles.first().map(|c| c.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|c| c.timestamp)
    }

    /// Restrict to candles whose calendar date falls within `[start, end]` (inclusive).
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Series {
        let candles = self
            .candles
            .iter()
            .filter(|c| {
                let date = c.timestamp.date_naive();
                start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
            })
            .copied()
            .collect();
        Series::new(self.symbol.clone(), candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    #[test]
    fn candle_is_consistent() {
        assert!(sample_candle().is_consistent());
    }

    #[test]
    fn candle_detects_high_below_low() {
        let mut c = sample_candle();
        c.high = 97.0;
        assert!(!c.is_consistent());
    }

    #[test]
    fn candle_detects_non_finite() {
        let mut c = sample_candle();
        c.close = f64::NAN;
        assert!(c.has_non_finite_price());
        c.close = f64::INFINITY;
        assert!(c.has_non_finite_price());
    }

    #[test]
    fn candle_detects_non_positive() {
        let mut c = sample_candle();
        c.low = 0.0;
        assert!(c.has_non_positive_price());
    }

    #[test]
    fn series_between_is_inclusive() {
        let candles: Vec<Candle> = (0..5)
            .map(|d| {
                let mut c = sample_candle();
                c.timestamp += chrono::Duration::days(d);
                c
            })
            .collect();
        let series = Series::new("TEST", candles);
        let start = NaiveDate::from_ymd_opt(2024, 1, 3);
        let end = NaiveDate::from_ymd_opt(2024, 1, 5);
        let sub = series.between(start, end);
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.candles[0].timestamp.date_naive(), start.unwrap());
    }

    #[test]
    fn series_between_open_ended() {
        let series = Series::new("TEST", vec![sample_candle()]);
        assert_eq!(series.between(None, None).len(), 1);
    }
}
