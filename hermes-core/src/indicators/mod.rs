//! Indicator library.
//!
//! Indicators are pure functions: columns in, numeric series out, same length
//! as the input. Warm-up positions are `f64::NAN`. They are computed once per
//! run over whole columns and shared by both engines.
//!
//! Every indicator has a slice kernel (`sma`, `ema`, `rsi`, ...) that
//! composes freely. Those a strategy publishes also get a named struct
//! implementing [`Indicator`], registered under a stable output name. EMA
//! and ATR stay kernels: they feed MACD and position sizing.
//!
//! Multi-series indicators (MACD, Bollinger) are exposed as separate named
//! instances per line, keeping the single-series trait unchanged.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use std::collections::BTreeMap;

pub use atr::{atr, true_range, wilder_smooth};
pub use bollinger::{bollinger, rolling_std, Bollinger, BollingerBand, Bands};
pub use ema::ema;
pub use macd::{macd, Macd, MacdLine, MacdLines};
pub use rsi::{rsi, Rsi};
pub use sma::{sma, Sma};

use crate::columns::Columns;

/// A named whole-column transform.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on data from bar t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Output name in the result's indicator map (e.g. "sma_fast", "rsi").
    fn name(&self) -> &str;

    fn compute(&self, cols: &Columns) -> Vec<f64>;
}

/// Named indicator columns produced by one strategy evaluation.
///
/// Ordered by name so serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    series: BTreeMap<String, Vec<f64>>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Compute `indicator` over `cols` and store it under its name.
    /// Returns a reference to the stored column.
    pub fn compute(&mut self, indicator: &dyn Indicator, cols: &Columns) -> &[f64] {
        let name = indicator.name().to_string();
        let slot = self.series.entry(name).or_default();
        *slot = indicator.compute(cols);
        slot.as_slice()
    }

    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Re-index every column onto another bar axis. `map[i]` is the source
    /// index for target bar `i`, or `None` where no source value is visible.
    pub fn reindex(&self, map: &[Option<usize>]) -> IndicatorSet {
        let series = self
            .series
            .iter()
            .map(|(name, values)| {
                let col = map
                    .iter()
                    .map(|src| src.and_then(|j| values.get(j).copied()).unwrap_or(f64::NAN))
                    .collect();
                (name.clone(), col)
            })
            .collect();
        IndicatorSet { series }
    }
}

/// Columns from close prices for testing.
///
/// open = prev close (or close for the first bar), high = max(open, close) + 1,
/// low = min(open, close) - 1, volume = 1000, one bar per minute.
#[cfg(test)]
pub fn make_columns(closes: &[f64]) -> Columns {
    use crate::domain::Candle;
    let base = chrono::DateTime::<chrono::Utc>::from_timestamp(1_704_186_900, 0).unwrap();
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                base + chrono::Duration::minutes(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect();
    Columns::from_candles(&candles)
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_compute_stores_under_name() {
        let cols = make_columns(&[1.0, 2.0, 3.0, 4.0]);
        let mut set = IndicatorSet::new();
        set.compute(&Sma::new("sma_fast", 2), &cols);
        assert_eq!(set.len(), 1);
        assert_approx(set.get("sma_fast", 3).unwrap(), 3.5, DEFAULT_EPSILON);
        assert!(set.get("sma_fast", 0).unwrap().is_nan());
        assert!(set.get("missing", 0).is_none());
    }

    #[test]
    fn reindex_maps_and_fills_nan() {
        let mut set = IndicatorSet::new();
        set.insert("x", vec![10.0, 20.0]);
        let out = set.reindex(&[None, Some(0), Some(0), Some(1)]);
        let x = out.get_series("x").unwrap();
        assert!(x[0].is_nan());
        assert_eq!(&x[1..], &[10.0, 10.0, 20.0]);
    }
}
