//! Bollinger mean reversion: buy below the lower band, sell above the upper.

use super::{ParamSchema, ParamSpec, Params, Strategy, StrategyOutput};
use crate::columns::Columns;
use crate::domain::SignalType;
use crate::error::EngineResult;
use crate::indicators::{bollinger, IndicatorSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct BollingerStrategy;

impl Strategy for BollingerStrategy {
    fn name(&self) -> &'static str {
        "bollinger"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["BollingerBandsStrategy", "bollinger_bands"]
    }

    fn description(&self) -> &'static str {
        "Buy when close < lower band, sell when close > upper band"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("period", 20, 2, 10_000, "Band window"),
            ParamSpec::float("std_dev", 2.0, 0.0, 10.0, "Band width in standard deviations")
                .exclusive_min(),
        ])
    }

    fn warmup(&self, params: &Params) -> EngineResult<usize> {
        Ok(params.usize("period")? - 1)
    }

    fn compute_signals(&self, cols: &Columns, params: &Params) -> EngineResult<StrategyOutput> {
        let period = params.usize("period")?;
        let k = params.f64("std_dev")?;

        let bands = bollinger(&cols.close, period, k);
        let triggers = cols
            .close
            .iter()
            .zip(bands.lower.iter().zip(&bands.upper))
            .map(|(&c, (&lo, &hi))| {
                if lo.is_nan() || hi.is_nan() {
                    None
                } else if c < lo {
                    Some(SignalType::Buy)
                } else if c > hi {
                    Some(SignalType::Sell)
                } else {
                    None
                }
            })
            .collect();

        let mut indicators = IndicatorSet::new();
        indicators.insert("bb_upper", bands.upper);
        indicators.insert("bb_mid", bands.middle);
        indicators.insert("bb_lower", bands.lower);

        Ok(StrategyOutput {
            triggers,
            indicators,
        })
    }
}
