//! Multi-timeframe trend following.
//!
//! Daily SMA(fast) > SMA(slow) defines a bullish regime. Intraday RSI picks
//! entries inside it: buy on oversold while bullish, sell on overbought
//! regardless of regime. A daily bar's regime is visible only from the next
//! day's first intraday bar.

use super::rsi::{check_bounds, rsi_trigger};
use super::{ParamSchema, ParamSpec, Params, Strategy, StrategyOutput};
use crate::columns::Columns;
use crate::domain::SignalType;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{rsi, sma, IndicatorSet};
use crate::resample::{resample, Timeframe};

#[derive(Debug, Clone, Copy, Default)]
pub struct MtfTrendStrategy;

impl Strategy for MtfTrendStrategy {
    fn name(&self) -> &'static str {
        "mtf_trend"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["MTFTrendFollowingStrategy", "mtf_trend_following"]
    }

    fn description(&self) -> &'static str {
        "Daily SMA trend filter with intraday RSI entries"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("fast_period", 50, 1, 1_000, "Daily fast SMA window"),
            ParamSpec::int("slow_period", 200, 2, 1_000, "Daily slow SMA window"),
            ParamSpec::int("rsi_period", 14, 2, 1_000, "Intraday RSI lookback"),
            ParamSpec::float("oversold", 30.0, 0.0, 100.0, "Intraday buy threshold"),
            ParamSpec::float("overbought", 70.0, 0.0, 100.0, "Intraday sell threshold"),
        ])
    }

    fn check(&self, params: &Params) -> EngineResult<()> {
        let fast = params.usize("fast_period")?;
        let slow = params.usize("slow_period")?;
        if fast >= slow {
            return Err(EngineError::validation(format!(
                "mtf_trend: fast_period ({fast}) must be less than slow_period ({slow})"
            )));
        }
        check_bounds(self.name(), params)
    }

    /// Only the intraday RSI warm-up is known in bars; a short daily history
    /// simply never turns bullish.
    fn warmup(&self, params: &Params) -> EngineResult<usize> {
        params.usize("rsi_period")
    }

    fn compute_signals(&self, cols: &Columns, params: &Params) -> EngineResult<StrategyOutput> {
        let fast = params.usize("fast_period")?;
        let slow = params.usize("slow_period")?;
        let rsi_period = params.usize("rsi_period")?;
        let oversold = params.f64("oversold")?;
        let overbought = params.f64("overbought")?;

        let daily = resample(cols, Timeframe::D1);
        let daily_fast = sma(&daily.columns.close, fast);
        let daily_slow = sma(&daily.columns.close, slow);
        let visible = daily.visible_previous();

        let intraday_rsi = rsi(&cols.close, rsi_period);
        let triggers = intraday_rsi
            .iter()
            .zip(&visible)
            .map(|(&r, day)| {
                let bullish = day
                    .map(|d| daily_fast[d] > daily_slow[d])
                    .unwrap_or(false);
                match rsi_trigger(r, oversold, overbought) {
                    Some(SignalType::Buy) if bullish => Some(SignalType::Buy),
                    Some(SignalType::Buy) => None,
                    other => other,
                }
            })
            .collect();

        // Daily columns are reported on the intraday axis as they were visible.
        let mut daily_set = IndicatorSet::new();
        daily_set.insert("daily_sma_fast", daily_fast);
        daily_set.insert("daily_sma_slow", daily_slow);
        let mut indicators = daily_set.reindex(&visible);
        indicators.insert("rsi", intraday_rsi);

        Ok(StrategyOutput {
            triggers,
            indicators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;

    fn params() -> Params {
        let mut raw = BTreeMap::new();
        raw.insert("fast_period".to_string(), 2.0.into());
        raw.insert("slow_period".to_string(), 3.0.into());
        raw.insert("rsi_period".to_string(), 3.0.into());
        MtfTrendStrategy.schema().validate("mtf_trend", &raw).unwrap()
    }

    /// `days` days of 10 hourly bars each, closes from `close_at(day, bar)`.
    fn hourly(days: i64, close_at: impl Fn(i64, i64) -> f64) -> Columns {
        let base = 1_704_153_600; // 2024-01-02 00:00 UTC
        let mut candles = Vec::new();
        for d in 0..days {
            for h in 0..10 {
                let ts = DateTime::<Utc>::from_timestamp(base + d * 86_400 + h * 3_600, 0).unwrap();
                let c = close_at(d, h);
                candles.push(Candle::new(ts, c, c + 0.5, c - 0.5, c, 1.0));
            }
        }
        Columns::from_candles(&candles)
    }

    #[test]
    fn buys_only_once_daily_trend_is_visible() {
        // Rising day over day; each day dips intraday so RSI goes oversold.
        let cols = hourly(6, |d, h| 100.0 + 10.0 * d as f64 - h as f64);
        let out = MtfTrendStrategy.compute_signals(&cols, &params()).unwrap();

        // Daily SMA(3) exists from day 2, so the regime is first visible on day 3.
        let first_buy = out
            .triggers
            .iter()
            .position(|t| *t == Some(SignalType::Buy))
            .unwrap();
        assert!(first_buy >= 30, "bought at {first_buy} before the regime was visible");

        let visible_fast = out.indicators.get_series("daily_sma_fast").unwrap();
        assert_eq!(visible_fast.len(), cols.len());
        assert!(visible_fast[..10].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn bearish_regime_never_buys() {
        let cols = hourly(6, |d, h| 200.0 - 10.0 * d as f64 - h as f64);
        let out = MtfTrendStrategy.compute_signals(&cols, &params()).unwrap();
        assert!(out.triggers.iter().all(|t| *t != Some(SignalType::Buy)));
    }
}
