//! MACD: difference of two EMAs plus its own EMA signal line.
//!
//! line = EMA(close, fast) - EMA(close, slow)
//! signal = EMA(line, signal_period)
//! histogram = line - signal

use super::{ema, Indicator};
use crate::columns::Columns;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(close: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdLines {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal_period);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    MacdLines {
        line,
        signal,
        histogram,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Line,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal_period: usize,
    which: MacdLine,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal_period: usize, which: MacdLine) -> Self {
        assert!(
            fast >= 1 && slow >= 1 && signal_period >= 1,
            "MACD periods must be >= 1"
        );
        Self {
            fast,
            slow,
            signal_period,
            which,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        match self.which {
            MacdLine::Line => "macd_line",
            MacdLine::Signal => "signal_line",
            MacdLine::Histogram => "macd_hist",
        }
    }

    fn compute(&self, cols: &Columns) -> Vec<f64> {
        let lines = macd(&cols.close, self.fast, self.slow, self.signal_period);
        match self.which {
            MacdLine::Line => lines.line,
            MacdLine::Signal => lines.signal,
            MacdLine::Histogram => lines.histogram,
        }
    }
}
