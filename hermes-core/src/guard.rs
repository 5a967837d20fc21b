//! Data Guard: validates an incoming series before any computation.
//!
//! Policy, in order, per row:
//! 1. Non-increasing timestamp (duplicate or out of order) → dropped.
//! 2. Non-finite price → propagated from the previous surviving close
//!    (dropped if there is none). Non-finite volume becomes 0.
//! 3. Any price <= 0 → dropped.
//! 4. OHLC inconsistency (high < low, high below body, low above body) →
//!    flagged, kept unchanged.
//!
//! Missing-candle gaps between surviving rows are flagged, never filled.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Candle, Series};
use crate::error::{EngineError, EngineResult};

/// Guard thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Minimum surviving bars. Callers raise this to the strategy warm-up.
    pub min_bars: usize,
    /// Fail with `DataIntegrity` when more than this fraction of rows is dropped.
    pub max_drop_fraction: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_bars: 2,
            max_drop_fraction: 0.5,
        }
    }
}

impl GuardConfig {
    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = self.min_bars.max(min_bars);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NonIncreasingTimestamp,
    NonFiniteWithoutHistory,
    NonPositivePrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub index: usize,
    pub reason: DropReason,
}

/// A run of missing candles between two surviving rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFlag {
    /// Input index of the candle after the gap.
    pub index: usize,
    pub missing_bars: i64,
}

/// Structured account of everything the guard did. Indices refer to input rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardReport {
    pub input_rows: usize,
    pub dropped: Vec<DroppedRow>,
    /// Rows kept despite OHLC inconsistency.
    pub flagged: Vec<usize>,
    /// Rows whose non-finite prices were replaced with the previous close.
    pub filled: Vec<usize>,
    pub gaps: Vec<GapFlag>,
}

impl GuardReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    pub fn surviving_rows(&self) -> usize {
        self.input_rows - self.dropped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.flagged.is_empty() && self.filled.is_empty()
    }

    /// Human-readable warnings for result payloads.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.dropped.is_empty() {
            out.push(format!(
                "dropped {} of {} rows",
                self.dropped.len(),
                self.input_rows
            ));
        }
        if !self.flagged.is_empty() {
            out.push(format!("{} rows with inconsistent OHLC", self.flagged.len()));
        }
        if !self.filled.is_empty() {
            out.push(format!(
                "{} rows with non-finite prices carried forward",
                self.filled.len()
            ));
        }
        if !self.gaps.is_empty() {
            let missing: i64 = self.gaps.iter().map(|g| g.missing_bars).sum();
            out.push(format!(
                "{} gaps ({missing} missing candles)",
                self.gaps.len()
            ));
        }
        out
    }
}

/// A series that passed the guard, with the report of how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSeries {
    series: Series,
    report: GuardReport,
}

impl CleanSeries {
    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn report(&self) -> &GuardReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn into_parts(self) -> (Series, GuardReport) {
        (self.series, self.report)
    }
}

/// Validate `series` under `config`.
pub fn validate(series: &Series, config: &GuardConfig) -> EngineResult<CleanSeries> {
    let mut report = GuardReport {
        input_rows: series.len(),
        ..GuardReport::default()
    };
    let mut kept: Vec<Candle> = Vec::with_capacity(series.len());
    let mut kept_input_index: Vec<usize> = Vec::with_capacity(series.len());

    for (i, raw) in series.candles.iter().enumerate() {
        let mut candle = *raw;

        if let Some(prev) = kept.last() {
            if candle.timestamp <= prev.timestamp {
                report.dropped.push(DroppedRow {
                    index: i,
                    reason: DropReason::NonIncreasingTimestamp,
                });
                continue;
            }
        }

        if candle.has_non_finite_price() {
            match kept.last() {
                Some(prev) => {
                    let fill = prev.close;
                    for v in [
                        &mut candle.open,
                        &mut candle.high,
                        &mut candle.low,
                        &mut candle.close,
                    ] {
                        if !v.is_finite() {
                            *v = fill;
                        }
                    }
                    report.filled.push(i);
                }
                None => {
                    report.dropped.push(DroppedRow {
                        index: i,
                        reason: DropReason::NonFiniteWithoutHistory,
                    });
                    continue;
                }
            }
        }
        if !candle.volume.is_finite() {
            candle.volume = 0.0;
        }

        if candle.has_non_positive_price() {
            report.dropped.push(DroppedRow {
                index: i,
                reason: DropReason::NonPositivePrice,
            });
            continue;
        }

        if !candle.is_consistent() {
            report.flagged.push(i);
        }

        kept.push(candle);
        kept_input_index.push(i);
    }

    report.gaps = detect_gaps(&kept, &kept_input_index);
    log_report(&series.symbol, &report);

    let total = report.input_rows;
    let dropped = report.dropped_count();
    if total > 0 && dropped as f64 / total as f64 > config.max_drop_fraction {
        return Err(EngineError::DataIntegrity {
            dropped,
            flagged: report.flagged.len(),
            total,
            max_drop_fraction: config.max_drop_fraction,
        });
    }

    if kept.len() < config.min_bars.max(1) {
        return Err(EngineError::InsufficientData {
            required: config.min_bars.max(1),
            available: kept.len(),
        });
    }

    Ok(CleanSeries {
        series: Series::new(series.symbol.clone(), kept),
        report,
    })
}

/// Bar spacing is the smallest positive interval between surviving candles.
/// Intraday spacing only flags gaps within one calendar day, so session
/// boundaries and weekends are not reported.
fn detect_gaps(kept: &[Candle], input_index: &[usize]) -> Vec<GapFlag> {
    let Some(spacing) = kept
        .windows(2)
        .map(|w| w[1].timestamp - w[0].timestamp)
        .filter(|d| *d > Duration::zero())
        .min()
    else {
        return Vec::new();
    };
    let spacing_secs = spacing.num_seconds().max(1);
    let intraday = spacing < Duration::days(1);

    let mut gaps = Vec::new();
    for (k, w) in kept.windows(2).enumerate() {
        let delta = (w[1].timestamp - w[0].timestamp).num_seconds();
        if delta <= spacing_secs {
            continue;
        }
        if intraday && w[0].timestamp.date_naive() != w[1].timestamp.date_naive() {
            continue;
        }
        if !intraday && delta <= 4 * spacing_secs {
            continue;
        }
        gaps.push(GapFlag {
            index: input_index[k + 1],
            missing_bars: delta / spacing_secs - 1,
        });
    }
    gaps
}

fn log_report(symbol: &str, report: &GuardReport) {
    if !report.dropped.is_empty() {
        let indices: Vec<usize> = report.dropped.iter().map(|d| d.index).collect();
        warn!(
            symbol,
            dropped = report.dropped.len(),
            total = report.input_rows,
            ?indices,
            "data guard dropped rows"
        );
    }
    if !report.flagged.is_empty() {
        warn!(
            symbol,
            flagged = report.flagged.len(),
            indices = ?report.flagged,
            "data guard flagged inconsistent OHLC rows"
        );
    }
    if !report.filled.is_empty() {
        warn!(
            symbol,
            filled = report.filled.len(),
            indices = ?report.filled,
            "data guard carried forward non-finite prices"
        );
    }
    if !report.gaps.is_empty() {
        debug!(symbol, gaps = report.gaps.len(), "data guard found candle gaps");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn minute(i: i64) -> DateTime<Utc> {
        // 2024-01-02 09:15 UTC plus i minutes
        DateTime::<Utc>::from_timestamp(1_704_186_900 + i * 60, 0).unwrap()
    }

    fn candle(i: i64, close: f64) -> Candle {
        Candle::new(minute(i), close, close + 1.0, close - 1.0, close, 100.0)
    }

    fn series(candles: Vec<Candle>) -> Series {
        Series::new("TEST", candles)
    }

    #[test]
    fn clean_series_passes_untouched() {
        let s = series((0..10).map(|i| candle(i, 100.0 + i as f64)).collect());
        let clean = validate(&s, &GuardConfig::default()).unwrap();
        assert_eq!(clean.len(), 10);
        assert!(clean.report().is_clean());
        assert!(clean.report().gaps.is_empty());
    }

    #[test]
    fn drops_non_positive_prices() {
        let mut candles: Vec<Candle> = (0..10).map(|i| candle(i, 100.0)).collect();
        candles[3].low = 0.0;
        candles[6].close = -5.0;
        let clean = validate(&series(candles), &GuardConfig::default()).unwrap();
        assert_eq!(clean.len(), 8);
        let idx: Vec<usize> = clean.report().dropped.iter().map(|d| d.index).collect();
        assert_eq!(idx, vec![3, 6]);
        assert!(clean
            .report()
            .dropped
            .iter()
            .all(|d| d.reason == DropReason::NonPositivePrice));
    }

    #[test]
    fn flags_but_keeps_inconsistent_rows() {
        let mut candles: Vec<Candle> = (0..5).map(|i| candle(i, 100.0)).collect();
        candles[2].high = 98.0; // below low (99)
        candles[4].low = 100.5; // above body
        let clean = validate(&series(candles.clone()), &GuardConfig::default()).unwrap();
        assert_eq!(clean.len(), 5);
        assert_eq!(clean.report().flagged, vec![2, 4]);
        // Flagged rows are not silently fixed.
        assert_eq!(clean.series().candles[2].high, 98.0);
    }

    #[test]
    fn propagates_non_finite_from_previous_close() {
        let mut candles: Vec<Candle> = (0..5).map(|i| candle(i, 100.0 + i as f64)).collect();
        candles[3].close = f64::NAN;
        candles[3].high = f64::INFINITY;
        let clean = validate(&series(candles), &GuardConfig::default()).unwrap();
        let c = clean.series().candles[3];
        assert_eq!(c.close, 102.0);
        assert_eq!(c.high, 102.0);
        assert_eq!(clean.report().filled, vec![3]);
        assert!(clean.series().candles.iter().all(|c| !c.has_non_finite_price()));
    }

    #[test]
    fn leading_non_finite_is_dropped() {
        let mut candles: Vec<Candle> = (0..5).map(|i| candle(i, 100.0)).collect();
        candles[0].open = f64::NAN;
        let clean = validate(&series(candles), &GuardConfig::default()).unwrap();
        assert_eq!(clean.len(), 4);
        assert_eq!(
            clean.report().dropped[0].reason,
            DropReason::NonFiniteWithoutHistory
        );
    }

    #[test]
    fn drops_duplicate_timestamps() {
        let mut candles: Vec<Candle> = (0..5).map(|i| candle(i, 100.0)).collect();
        candles.insert(2, candle(1, 101.0));
        let clean = validate(&series(candles), &GuardConfig::default()).unwrap();
        assert_eq!(clean.len(), 5);
        assert_eq!(
            clean.report().dropped[0].reason,
            DropReason::NonIncreasingTimestamp
        );
    }

    #[test]
    fn flags_intraday_gaps() {
        let candles = vec![candle(0, 100.0), candle(1, 100.0), candle(5, 100.0), candle(6, 100.0)];
        let clean = validate(&series(candles), &GuardConfig::default()).unwrap();
        assert_eq!(
            clean.report().gaps,
            vec![GapFlag {
                index: 2,
                missing_bars: 3
            }]
        );
    }

    #[test]
    fn session_boundary_is_not_a_gap() {
        let mut candles = vec![candle(0, 100.0), candle(1, 100.0)];
        // Next day, same session time.
        candles.push(candle(24 * 60, 100.0));
        candles.push(candle(24 * 60 + 1, 100.0));
        let clean = validate(&series(candles), &GuardConfig::default()).unwrap();
        assert!(clean.report().gaps.is_empty());
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let s = series((0..5).map(|i| candle(i, 100.0)).collect());
        let cfg = GuardConfig::default().with_min_bars(20);
        let err = validate(&s, &cfg).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                required: 20,
                available: 5
            }
        );
    }

    #[test]
    fn empty_series_is_insufficient_data() {
        let err = validate(&series(vec![]), &GuardConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { available: 0, .. }));
    }

    #[test]
    fn mostly_bad_series_is_integrity_error() {
        let mut candles: Vec<Candle> = (0..10).map(|i| candle(i, 100.0)).collect();
        for c in candles.iter_mut().skip(2) {
            c.close = 0.0;
        }
        let err = validate(&series(candles), &GuardConfig::default()).unwrap_err();
        match err {
            EngineError::DataIntegrity { dropped, total, .. } => {
                assert_eq!(dropped, 8);
                assert_eq!(total, 10);
            }
            other => panic!("expected DataIntegrity, got {other:?}"),
        }
    }
}
