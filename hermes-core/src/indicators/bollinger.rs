//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + k * stddev(close, period)
//! - Lower: middle - k * stddev(close, period)
//!
//! Uses sample stddev (divide by N - 1), so period must be >= 2.
//! Lookback: period - 1.

use super::{sma, Indicator};
use crate::columns::Columns;

/// Rolling sample standard deviation. NaN in the window, or a window shorter
/// than two values, yields NaN.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period < 2 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        result[i] = var.sqrt();
    }
    result
}

/// All three bands for one parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct Bands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger(close: &[f64], period: usize, k: f64) -> Bands {
    let middle = sma(close, period);
    let std = rolling_std(close, period);
    let upper = middle.iter().zip(&std).map(|(m, s)| m + k * s).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - k * s).collect();
    Bands {
        upper,
        middle,
        lower,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    k: f64,
    band: BollingerBand,
    name: &'static str,
}

impl Bollinger {
    fn with_band(period: usize, k: f64, band: BollingerBand, name: &'static str) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        Self {
            period,
            k,
            band,
            name,
        }
    }

    pub fn upper(period: usize, k: f64) -> Self {
        Self::with_band(period, k, BollingerBand::Upper, "bb_upper")
    }

    pub fn middle(period: usize, k: f64) -> Self {
        Self::with_band(period, k, BollingerBand::Middle, "bb_mid")
    }

    pub fn lower(period: usize, k: f64) -> Self {
        Self::with_band(period, k, BollingerBand::Lower, "bb_lower")
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        self.name
    }

    fn compute(&self, cols: &Columns) -> Vec<f64> {
        let bands = bollinger(&cols.close, self.period, self.k);
        match self.band {
            BollingerBand::Upper => bands.upper,
            BollingerBand::Middle => bands.middle,
            BollingerBand::Lower => bands.lower,
        }
    }
}
