//! Hermes Core: single-symbol backtesting on OHLCV bars.
//!
//! This crate contains the engine itself:
//! - Domain types (candles, signals, positions, trades)
//! - Data guard that turns raw candles into a clean series or a typed error
//! - Columnar arena and indicator library
//! - Strategy interface, parameter schemas and the built-in registry
//! - Vector engine (full-allocation idealization) and event engine
//!   (sizing, costs, stop-loss and take-profit)
//! - Metrics, run fingerprints and synthetic series
//!
//! Nothing here does I/O or spawns threads; orchestration lives in
//! `hermes-runner`.

pub mod backtest;
pub mod columns;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod guard;
pub mod indicators;
pub mod metrics;
pub mod resample;
pub mod risk;
pub mod strategy;
pub mod synthetic;

pub use backtest::{run_backtest, Backtest, BacktestConfig};
pub use error::{EngineError, EngineResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the scanner moves across worker
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        require_send::<strategy::PreparedStrategy>();
        require_sync::<strategy::PreparedStrategy>();
        require_send::<strategy::StrategyRegistry>();
        require_sync::<strategy::StrategyRegistry>();

        require_send::<BacktestConfig>();
        require_sync::<BacktestConfig>();
        require_send::<Backtest>();
        require_sync::<Backtest>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }

    /// Strategies see columns and parameters only. If `compute_signals`
    /// ever grows an account or position argument this stops compiling.
    #[test]
    fn strategy_trait_has_no_account_parameter() {
        fn _check(
            s: &dyn strategy::Strategy,
            cols: &columns::Columns,
            params: &strategy::Params,
        ) -> EngineResult<strategy::StrategyOutput> {
            s.compute_signals(cols, params)
        }
    }
}
