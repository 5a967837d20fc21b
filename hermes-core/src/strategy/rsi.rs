//! RSI mean reversion: buy oversold, sell overbought, hold in between.

use super::{ParamSchema, ParamSpec, Params, Strategy, StrategyOutput};
use crate::columns::Columns;
use crate::domain::SignalType;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{IndicatorSet, Rsi};

#[derive(Debug, Clone, Copy, Default)]
pub struct RsiStrategy;

/// Shared oversold/overbought rule, also used by the multi-timeframe strategy.
pub(crate) fn rsi_trigger(value: f64, oversold: f64, overbought: f64) -> Option<SignalType> {
    if value.is_nan() {
        None
    } else if value < oversold {
        Some(SignalType::Buy)
    } else if value > overbought {
        Some(SignalType::Sell)
    } else {
        None
    }
}

pub(crate) fn check_bounds(strategy: &str, params: &Params) -> EngineResult<()> {
    let oversold = params.f64("oversold")?;
    let overbought = params.f64("overbought")?;
    if oversold >= overbought {
        return Err(EngineError::validation(format!(
            "{strategy}: oversold ({oversold}) must be less than overbought ({overbought})"
        )));
    }
    Ok(())
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["RSIStrategy"]
    }

    fn description(&self) -> &'static str {
        "Buy when RSI < oversold, sell when RSI > overbought"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("period", 14, 2, 1_000, "RSI lookback"),
            ParamSpec::float("oversold", 30.0, 0.0, 100.0, "Buy threshold"),
            ParamSpec::float("overbought", 70.0, 0.0, 100.0, "Sell threshold"),
        ])
    }

    fn check(&self, params: &Params) -> EngineResult<()> {
        check_bounds(self.name(), params)
    }

    fn warmup(&self, params: &Params) -> EngineResult<usize> {
        params.usize("period")
    }

    fn compute_signals(&self, cols: &Columns, params: &Params) -> EngineResult<StrategyOutput> {
        let period = params.usize("period")?;
        let oversold = params.f64("oversold")?;
        let overbought = params.f64("overbought")?;

        let mut indicators = IndicatorSet::new();
        let rsi = indicators.compute(&Rsi::new("rsi", period), cols);
        let triggers = rsi
            .iter()
            .map(|&v| rsi_trigger(v, oversold, overbought))
            .collect();

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

    fn defaults() -> Params {
        RsiStrategy.schema().validate("rsi", &BTreeMap::new()).unwrap()
    }

    #[test]
    fn selloff_then_rally_round_trip() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        closes.extend((0..25).map(|i| 81.0 + 1.5 * i as f64));
        let out = RsiStrategy
            .compute_signals(&make_columns(&closes), &defaults())
            .unwrap();
        let target = latch(&out.triggers);
        // Long after the sell-off, flat again after the rally.
        assert!(target[..14].iter().all(|&t| t == 0.0));
        assert_eq!(target[19], 1.0);
        assert_eq!(*target.last().unwrap(), 0.0);
    }

    #[test]
    fn neutral_band_holds() {
        assert_eq!(rsi_trigger(50.0, 30.0, 70.0), None);
        assert_eq!(rsi_trigger(29.9, 30.0, 70.0), Some(SignalType::Buy));
        assert_eq!(rsi_trigger(70.1, 30.0, 70.0), Some(SignalType::Sell));
        assert_eq!(rsi_trigger(f64::NAN, 30.0, 70.0), None);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut raw = BTreeMap::new();
        raw.insert("oversold".to_string(), 80.0.into());
        let p = RsiStrategy.schema().validate("rsi", &raw).unwrap();
        assert!(RsiStrategy.check(&p).is_err());
    }
}
