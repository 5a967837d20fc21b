//! Columnar view of a series: equal-length buffers indexed by bar position.
//!
//! Built once per run. Indicators and strategies operate on whole columns,
//! never on individual candles.

use chrono::{DateTime, Utc};

use crate::domain::{Candle, Series};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    pub timestamps: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Columns {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let n = candles.len();
        let mut cols = Columns {
            timestamps: Vec::with_capacity(n),
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
            volume: Vec::with_capacity(n),
        };
        for c in candles {
            cols.timestamps.push(c.timestamp);
            cols.open.push(c.open);
            cols.high.push(c.high);
            cols.low.push(c.low);
            cols.close.push(c.close);
            cols.volume.push(c.volume);
        }
        cols
    }

    pub fn from_series(series: &Series) -> Self {
        Self::from_candles(&series.candles)
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// Close-to-close simple returns. Bar 0 and any non-finite result are 0.0.
pub fn simple_returns(close: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; close.len()];
    for i in 1..close.len() {
        let r = close[i] / close[i - 1] - 1.0;
        out[i] = if r.is_finite() { r } else { 0.0 };
    }
    out
}

/// Shift a column forward by `k` bars, filling the head with `fill`.
///
/// `shift(&[a, b, c], 1, 0.0)` is `[0.0, a, b]`.
pub fn shift(values: &[f64], k: usize, fill: f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![fill; n];
    if k < n {
        out[k..].copy_from_slice(&values[..n - k]);
    }
    out
}
