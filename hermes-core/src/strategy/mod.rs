//! Strategy interface: named rules that turn columns into trigger columns.
//!
//! A strategy looks only at market data and its parameters. It emits one
//! trigger per bar (`Some(Buy)`, `Some(Sell)` or `None` for "hold previous
//! state") plus the indicator columns it used. Both engines latch the
//! triggers into a long/flat target column and trade its transitions.
//!
//! # Architecture invariant
//! The trigger at bar t may only depend on `cols[0..=t]`. Engines, not
//! strategies, are responsible for acting on it no earlier than bar t+1.

pub mod bollinger;
pub mod macd;
pub mod mtf_trend;
pub mod params;
pub mod registry;
pub mod rsi;
pub mod sma_crossover;

use std::sync::Arc;

use crate::columns::Columns;
use crate::domain::SignalType;
use crate::error::{EngineError, EngineResult};
use crate::indicators::IndicatorSet;
use crate::resample::{resample, Timeframe};

pub use bollinger::BollingerStrategy;
pub use macd::MacdStrategy;
pub use mtf_trend::MtfTrendStrategy;
pub use params::{ParamKind, ParamSchema, ParamSpec, ParamValue, Params, StrategyConfig};
pub use registry::StrategyRegistry;
pub use rsi::RsiStrategy;
pub use sma_crossover::SmaCrossoverStrategy;

/// Per-bar strategy output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub triggers: Vec<Option<SignalType>>,
    pub indicators: IndicatorSet,
}

pub trait Strategy: Send + Sync {
    /// Canonical snake_case name (e.g. "sma_crossover").
    fn name(&self) -> &'static str;

    /// Alternative names accepted at lookup.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    fn schema(&self) -> ParamSchema;

    /// Cross-parameter constraints the schema cannot express.
    fn check(&self, _params: &Params) -> EngineResult<()> {
        Ok(())
    }

    /// Number of leading bars on which the rule cannot fire.
    fn warmup(&self, params: &Params) -> EngineResult<usize>;

    fn compute_signals(&self, cols: &Columns, params: &Params) -> EngineResult<StrategyOutput>;
}

/// Latch triggers into a long/flat target: 1.0 after a buy, 0.0 after a
/// sell, previous value otherwise, starting flat.
pub fn latch(triggers: &[Option<SignalType>]) -> Vec<f64> {
    let mut state = 0.0;
    triggers
        .iter()
        .map(|t| {
            match t {
                Some(SignalType::Buy) => state = 1.0,
                Some(SignalType::Sell) => state = 0.0,
                None => {}
            }
            state
        })
        .collect()
}

/// Changes of a latched target column. Bar 0 is compared against flat.
pub fn transitions(target: &[f64]) -> Vec<Option<SignalType>> {
    let mut prev = 0.0;
    target
        .iter()
        .map(|&t| {
            let out = if t > prev {
                Some(SignalType::Buy)
            } else if t < prev {
                Some(SignalType::Sell)
            } else {
                None
            };
            prev = t;
            out
        })
        .collect()
}

/// Trigger for a two-sided comparison; `None` while either side is warming up.
pub(crate) fn cross_state(a: f64, b: f64) -> Option<SignalType> {
    if a.is_nan() || b.is_nan() {
        None
    } else if a > b {
        Some(SignalType::Buy)
    } else {
        Some(SignalType::Sell)
    }
}

/// A strategy bound to validated parameters and an analysis timeframe.
#[derive(Clone)]
pub struct PreparedStrategy {
    strategy: Arc<dyn Strategy>,
    params: Params,
    timeframe: Timeframe,
}

/// Triggers and target on the raw bar axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub triggers: Vec<Option<SignalType>>,
    pub target: Vec<f64>,
    pub indicators: IndicatorSet,
}

impl std::fmt::Debug for PreparedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStrategy")
            .field("strategy", &self.strategy.name())
            .field("params", &self.params)
            .field("timeframe", &self.timeframe)
            .finish()
    }
}

impl PreparedStrategy {
    pub fn new(strategy: Arc<dyn Strategy>, params: Params, timeframe: Timeframe) -> Self {
        Self {
            strategy,
            params,
            timeframe,
        }
    }

    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Warm-up on the analysis timeframe.
    pub fn warmup(&self) -> EngineResult<usize> {
        self.strategy.warmup(&self.params)
    }

    /// Minimum raw bars the data guard should require. For coarse timeframes
    /// the real requirement is checked after resampling.
    pub fn min_raw_bars(&self) -> EngineResult<usize> {
        match self.timeframe {
            Timeframe::M1 => Ok(self.warmup()? + 1),
            _ => Ok(2),
        }
    }

    /// Run the strategy on `cols`, resampling first when the timeframe is
    /// coarser than the data. Coarse triggers surface on the first raw bar of
    /// the following bucket.
    pub fn evaluate(&self, cols: &Columns) -> EngineResult<Evaluation> {
        let resampled = match self.timeframe {
            Timeframe::M1 => None,
            tf => Some(resample(cols, tf)).filter(|r| !r.is_identity()),
        };

        let (triggers, indicators) = match resampled {
            None => {
                let out = self.compute(cols)?;
                (out.triggers, out.indicators)
            }
            Some(r) => {
                let out = self.compute(&r.columns)?;
                let mut triggers = vec![None; cols.len()];
                for (b, first) in r.first_raw_bar().into_iter().enumerate().skip(1) {
                    triggers[first] = out.triggers[b - 1];
                }
                let indicators = out.indicators.reindex(&r.visible_previous());
                (triggers, indicators)
            }
        };

        let target = latch(&triggers);
        Ok(Evaluation {
            triggers,
            target,
            indicators,
        })
    }

    fn compute(&self, cols: &Columns) -> EngineResult<StrategyOutput> {
        let required = self.warmup()? + 1;
        if cols.len() < required {
            return Err(EngineError::InsufficientData {
                required,
                available: cols.len(),
            });
        }
        let out = self.strategy.compute_signals(cols, &self.params)?;
        if out.triggers.len() != cols.len() {
            return Err(EngineError::simulation(format!(
                "{} produced {} triggers for {} bars",
                self.strategy.name(),
                out.triggers.len(),
                cols.len()
            )));
        }
        Ok(out)
    }
}
