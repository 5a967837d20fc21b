//! Timeframe resampling.
//!
//! Raw bars are grouped into fixed UTC buckets (`timestamp div bucket_secs`)
//! and aggregated as OHLCV: first open, max high, min low, last close, summed
//! volume. The coarse candle is stamped with its bucket start.
//!
//! A coarse bar is only complete once its bucket has ended, so anything
//! derived from coarse bar `b` becomes visible to raw bars from the first
//! raw bar of bucket `b + 1` onwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::columns::Columns;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[default]
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn seconds(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H4 => 4 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == lower)
            .ok_or_else(|| EngineError::validation(format!("unknown timeframe '{s}'")))
    }
}

/// Coarse columns plus, for every raw bar, the index of its coarse bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub columns: Columns,
    pub bucket_of: Vec<usize>,
}

impl Resampled {
    /// True when no two raw bars share a bucket.
    pub fn is_identity(&self) -> bool {
        self.columns.len() == self.bucket_of.len()
    }

    /// For each raw bar, the most recent coarse bar that had already closed.
    pub fn visible_previous(&self) -> Vec<Option<usize>> {
        self.bucket_of
            .iter()
            .map(|&b| b.checked_sub(1))
            .collect()
    }

    /// Index of the first raw bar of each coarse bar.
    pub fn first_raw_bar(&self) -> Vec<usize> {
        let mut firsts = Vec::with_capacity(self.columns.len());
        let mut last = None;
        for (i, &b) in self.bucket_of.iter().enumerate() {
            if last != Some(b) {
                firsts.push(i);
                last = Some(b);
            }
        }
        firsts
    }
}

pub fn resample(cols: &Columns, tf: Timeframe) -> Resampled {
    let secs = tf.seconds();
    let mut out = Columns::default();
    let mut bucket_of = Vec::with_capacity(cols.len());
    let mut current_key: Option<i64> = None;

    for i in 0..cols.len() {
        let key = cols.timestamps[i].timestamp().div_euclid(secs);
        if current_key == Some(key) {
            let last = out.len() - 1;
            out.high[last] = out.high[last].max(cols.high[i]);
            out.low[last] = out.low[last].min(cols.low[i]);
            out.close[last] = cols.close[i];
            out.volume[last] += cols.volume[i];
        } else {
            let start = DateTime::<Utc>::from_timestamp(key * secs, 0)
                .unwrap_or(cols.timestamps[i]);
            out.timestamps.push(start);
            out.open.push(cols.open[i]);
            out.high.push(cols.high[i]);
            out.low.push(cols.low[i]);
            out.close.push(cols.close[i]);
            out.volume.push(cols.volume[i]);
            current_key = Some(key);
        }
        bucket_of.push(out.len() - 1);
    }

    Resampled {
        columns: out,
        bucket_of,
    }
}
