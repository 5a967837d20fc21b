//! MACD trend: long while the MACD line is above its signal line.

use super::{ParamSchema, ParamSpec, Params, Strategy, StrategyOutput};
use crate::columns::Columns;
use crate::domain::SignalType;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{macd, IndicatorSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct MacdStrategy;

impl Strategy for MacdStrategy {
    fn name(&self) -> &'static str {
        "macd"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["MACDStrategy"]
    }

    fn description(&self) -> &'static str {
        "Buy when MACD crosses above its signal line, sell when it crosses below"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("fast_period", 12, 1, 1_000, "Fast EMA span"),
            ParamSpec::int("slow_period", 26, 2, 1_000, "Slow EMA span"),
            ParamSpec::int("signal_period", 9, 1, 1_000, "Signal line EMA span"),
        ])
    }

    fn check(&self, params: &Params) -> EngineResult<()> {
        let fast = params.usize("fast_period")?;
        let slow = params.usize("slow_period")?;
        if fast >= slow {
            return Err(EngineError::validation(format!(
                "macd: fast_period ({fast}) must be less than slow_period ({slow})"
            )));
        }
        Ok(())
    }

    /// The EMAs are defined from bar 0 but need the slow span plus the
    /// signal span to settle before the rule is allowed to fire.
    fn warmup(&self, params: &Params) -> EngineResult<usize> {
        Ok(params.usize("slow_period")? + params.usize("signal_period")? - 2)
    }

    fn compute_signals(&self, cols: &Columns, params: &Params) -> EngineResult<StrategyOutput> {
        let fast = params.usize("fast_period")?;
        let slow = params.usize("slow_period")?;
        let signal_period = params.usize("signal_period")?;
        let warmup = self.warmup(params)?;

        let lines = macd(&cols.close, fast, slow, signal_period);
        let triggers = lines
            .line
            .iter()
            .zip(&lines.signal)
            .enumerate()
            .map(|(i, (&l, &s))| {
                if i < warmup || l.is_nan() || s.is_nan() {
                    None
                } else if l > s {
                    Some(SignalType::Buy)
                } else if l < s {
                    Some(SignalType::Sell)
                } else {
                    None
                }
            })
            .collect();

        let mut indicators = IndicatorSet::new();
        indicators.insert("macd_line", lines.line);
        indicators.insert("signal_line", lines.signal);
        indicators.insert("macd_hist", lines.histogram);

        Ok(StrategyOutput {
            triggers,
            indicators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_columns;
    use crate::strategy::latch;
    use std::collections::BTreeMap;

    fn small() -> Params {
        let mut raw = BTreeMap::new();
        raw.insert("fast_period".to_string(), 3.0.into());
        raw.insert("slow_period".to_string(), 6.0.into());
        raw.insert("signal_period".to_string(), 3.0.into());
        MacdStrategy.schema().validate("macd", &raw).unwrap()
    }

    #[test]
    fn long_in_uptrend_flat_in_downtrend() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..30).map(|i| 129.0 - 2.0 * i as f64));
        let out = MacdStrategy
            .compute_signals(&make_columns(&closes), &small())
            .unwrap();
        let target = latch(&out.triggers);
        assert_eq!(target[25], 1.0);
        assert_eq!(target[59], 0.0);
        assert!(out.indicators.get_series("macd_hist").is_some());
    }

    #[test]
    fn warmup_suppresses_early_triggers() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let p = small();
        let out = MacdStrategy
            .compute_signals(&make_columns(&closes), &p)
            .unwrap();
        let warmup = MacdStrategy.warmup(&p).unwrap();
        assert_eq!(warmup, 7);
        assert!(out.triggers[..warmup].iter().all(|t| t.is_none()));
        assert_eq!(out.triggers[warmup], Some(SignalType::Buy));
    }
}
