//! Single-symbol backtest: guard → strategy → engine → metrics.
//!
//! This is the whole pipeline for one symbol. It is synchronous, owns
//! nothing shared, and returns either a complete [`Backtest`] or an
//! [`EngineError`]; there are no partial results.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::columns::Columns;
use crate::domain::{Candle, EquityPoint, Series, Signal, TradeRecord};
use crate::engine::{run_event, run_vector, CostModel, EngineMode, EventConfig, ExecutionStats};
use crate::error::{EngineError, EngineResult};
use crate::guard::{validate, GuardConfig, GuardReport};
use crate::indicators::IndicatorSet;
use crate::metrics::{Metrics, MINUTE_BARS_PER_YEAR};
use crate::risk::RiskConfig;
use crate::strategy::PreparedStrategy;

/// Everything besides data and strategy that determines an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub mode: EngineMode,
    pub initial_cash: f64,
    pub slippage: f64,
    pub commission: f64,
    pub risk: RiskConfig,
    pub guard: GuardConfig,
    pub bars_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::Vector,
            initial_cash: 100_000.0,
            slippage: 0.0,
            commission: 0.0,
            risk: RiskConfig::default(),
            guard: GuardConfig::default(),
            bars_per_year: MINUTE_BARS_PER_YEAR,
        }
    }
}

impl BacktestConfig {
    pub fn costs(&self) -> CostModel {
        CostModel::new(self.slippage, self.commission)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(EngineError::validation(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if !(self.bars_per_year.is_finite() && self.bars_per_year > 0.0) {
            return Err(EngineError::validation("bars_per_year must be positive"));
        }
        self.costs().validate()?;
        self.risk.validate()
    }
}

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Backtest {
    pub symbol: String,
    pub strategy: String,
    pub mode: EngineMode,
    pub candles: Vec<Candle>,
    pub equity_curve: Vec<EquityPoint>,
    pub signals: Vec<Signal>,
    pub trades: Vec<TradeRecord>,
    pub indicators: IndicatorSet,
    pub metrics: Metrics,
    pub execution_stats: Option<ExecutionStats>,
    pub guard_report: GuardReport,
}

pub fn run_backtest(
    series: &Series,
    strategy: &PreparedStrategy,
    config: &BacktestConfig,
) -> EngineResult<Backtest> {
    config.validate()?;

    let guard = config.guard.with_min_bars(strategy.min_raw_bars()?);
    let (clean, report) = validate(series, &guard)?.into_parts();
    let cols = Columns::from_series(&clean);

    let evaluation = strategy.evaluate(&cols)?;
    let output = match config.mode {
        EngineMode::Vector => run_vector(&cols, &evaluation.target, config.initial_cash)?,
        EngineMode::Event => run_event(
            &cols,
            &evaluation.target,
            &EventConfig {
                initial_cash: config.initial_cash,
                costs: config.costs(),
                risk: config.risk.clone(),
            },
        )?,
    };

    let equity: Vec<f64> = output.equity_curve.iter().map(|p| p.value).collect();
    let metrics = Metrics::compute(
        &equity,
        &output.trades,
        config.initial_cash,
        config.bars_per_year,
    );
    debug!(
        symbol = %clean.symbol,
        strategy = strategy.name(),
        mode = %config.mode,
        bars = cols.len(),
        signals = output.signals.len(),
        trades = output.trades.len(),
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(Backtest {
        symbol: clean.symbol,
        strategy: strategy.name().to_string(),
        mode: config.mode,
        candles: clean.candles,
        equity_curve: output.equity_curve,
        signals: output.signals,
        trades: output.trades,
        indicators: evaluation.indicators,
        metrics,
        execution_stats: output.execution_stats,
        guard_report: report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::Timeframe;
    use crate::strategy::{StrategyConfig, StrategyRegistry};
    use chrono::{DateTime, Utc};

    fn series(closes: &[f64]) -> Series {
        let base = DateTime::<Utc>::from_timestamp(1_704_186_900, 0).unwrap();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(
                    base + chrono::Duration::minutes(i as i64),
                    c,
                    c + 0.5,
                    c - 0.5,
                    c,
                    100.0,
                )
            })
            .collect();
        Series::new("TEST", candles)
    }

    fn sma(fast: i64, slow: i64) -> PreparedStrategy {
        StrategyRegistry::builtin()
            .prepare(
                &StrategyConfig::new("sma_crossover")
                    .with_param("fast_period", fast)
                    .with_param("slow_period", slow),
                Timeframe::M1,
            )
            .unwrap()
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let err = run_backtest(&series(&[100.0; 10]), &sma(5, 20), &BacktestConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                required: 20,
                available: 10
            }
        );
    }

    #[test]
    fn invalid_config_rejected_before_running() {
        let config = BacktestConfig {
            initial_cash: 0.0,
            ..BacktestConfig::default()
        };
        let err = run_backtest(&series(&[100.0; 30]), &sma(2, 5), &config).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn result_lengths_line_up() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        for mode in [EngineMode::Vector, EngineMode::Event] {
            let config = BacktestConfig {
                mode,
                ..BacktestConfig::default()
            };
            let bt = run_backtest(&series(&closes), &sma(3, 8), &config).unwrap();
            assert_eq!(bt.candles.len(), 60);
            assert_eq!(bt.equity_curve.len(), 60);
            assert_eq!(bt.indicators.get_series("sma_fast").unwrap().len(), 60);
            assert_eq!(bt.execution_stats.is_some(), mode == EngineMode::Event);
        }
    }
}
