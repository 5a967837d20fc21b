//! SMA crossover: long while the fast average is above the slow one.

use super::{cross_state, ParamSchema, ParamSpec, Params, Strategy, StrategyOutput};
use crate::columns::Columns;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{IndicatorSet, Sma};

#[derive(Debug, Clone, Copy, Default)]
pub struct SmaCrossoverStrategy;

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &'static str {
        "sma_crossover"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["SMACrossover", "sma_cross"]
    }

    fn description(&self) -> &'static str {
        "Buy while SMA(fast) > SMA(slow), sell otherwise"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("fast_period", 50, 1, 10_000, "Fast SMA window"),
            ParamSpec::int("slow_period", 200, 2, 10_000, "Slow SMA window"),
        ])
    }

    fn check(&self, params: &Params) -> EngineResult<()> {
        let fast = params.usize("fast_period")?;
        let slow = params.usize("slow_period")?;
        if fast >= slow {
            return Err(EngineError::validation(format!(
                "sma_crossover: fast_period ({fast}) must be less than slow_period ({slow})"
            )));
        }
        Ok(())
    }

    fn warmup(&self, params: &Params) -> EngineResult<usize> {
        Ok(params.usize("slow_period")? - 1)
    }

    fn compute_signals(&self, cols: &Columns, params: &Params) -> EngineResult<StrategyOutput> {
        let fast = params.usize("fast_period")?;
        let slow = params.usize("slow_period")?;

        let mut indicators = IndicatorSet::new();
        let fast_sma = indicators.compute(&Sma::new("sma_fast", fast), cols).to_vec();
        let slow_sma = indicators.compute(&Sma::new("sma_slow", slow), cols);

        let triggers = fast_sma
            .iter()
            .zip(slow_sma)
            .map(|(&f, &s)| cross_state(f, s))
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
    use crate::domain::SignalType;
    use crate::indicators::make_columns;
    use crate::strategy::{latch, transitions, StrategyConfig};

    fn params(fast: i64, slow: i64) -> Params {
        let cfg = StrategyConfig::new("sma_crossover")
            .with_param("fast_period", fast)
            .with_param("slow_period", slow);
        SmaCrossoverStrategy
            .schema()
            .validate("sma_crossover", &cfg.params)
            .unwrap()
    }

    #[test]
    fn single_crossover_on_v_shape() {
        // Down then up: fast crosses above slow exactly once.
        let mut closes: Vec<f64> = (0..20).map(|i| 120.0 - i as f64).collect();
        closes.extend((0..30).map(|i| 101.0 + 2.0 * i as f64));
        let cols = make_columns(&closes);
        let out = SmaCrossoverStrategy
            .compute_signals(&cols, &params(3, 8))
            .unwrap();
        let buys: Vec<usize> = transitions(&latch(&out.triggers))
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Some(SignalType::Buy))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(buys.len(), 1);
        let b = buys[0];
        let fast = out.indicators.get_series("sma_fast").unwrap();
        let slow = out.indicators.get_series("sma_slow").unwrap();
        assert!(fast[b] > slow[b]);
        assert!(fast[b - 1] <= slow[b - 1]);
    }

    #[test]
    fn no_trigger_during_warmup() {
        let cols = make_columns(&(0..10).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let p = params(2, 5);
        let out = SmaCrossoverStrategy.compute_signals(&cols, &p).unwrap();
        let warmup = SmaCrossoverStrategy.warmup(&p).unwrap();
        assert!(out.triggers[..warmup].iter().all(|t| t.is_none()));
        assert_eq!(out.triggers[warmup], Some(SignalType::Buy));
    }

    #[test]
    fn fast_must_be_below_slow() {
        assert!(SmaCrossoverStrategy.check(&params(50, 50)).is_err());
        assert!(SmaCrossoverStrategy.check(&params(10, 50)).is_ok());
    }
}
