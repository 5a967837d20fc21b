//! Single-run service: request → data → prepared strategy → backtest.
//!
//! Two entry points:
//! - `run()`: typed result, for callers that handle errors themselves.
//! - `run_result()`: never fails; errors become a `status="error"` payload.

use std::sync::Arc;

use chrono::NaiveDate;
use hermes_core::backtest::{run_backtest, Backtest, BacktestConfig};
use hermes_core::fingerprint::{RunFingerprint, RunKey};
use hermes_core::resample::Timeframe;
use hermes_core::strategy::{PreparedStrategy, StrategyConfig, StrategyRegistry};
use tracing::{info, warn};

use crate::contract::{RunRequest, RunResult};
use crate::error::RunError;
use crate::settings::EngineSettings;
use crate::source::DataSource;

/// Shared, immutable run context. Cheap to clone.
#[derive(Clone)]
pub struct Runner {
    registry: Arc<StrategyRegistry>,
    source: Arc<dyn DataSource>,
    settings: EngineSettings,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(source: Arc<dyn DataSource>, settings: EngineSettings) -> Self {
        Self {
            registry: Arc::new(StrategyRegistry::builtin()),
            source,
            settings,
        }
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Resolve and validate a strategy before touching any data.
    pub fn prepare(
        &self,
        config: &StrategyConfig,
        timeframe: Timeframe,
    ) -> Result<PreparedStrategy, RunError> {
        Ok(self.registry.prepare(config, timeframe)?)
    }

    pub fn run(&self, request: &RunRequest) -> Result<Backtest, RunError> {
        let prepared = self.prepare(&request.strategy_config(), request.timeframe)?;
        let config = request.backtest_config(&self.settings);
        self.run_prepared(
            &request.symbol,
            &prepared,
            request.start_date,
            request.end_date,
            &config,
        )
    }

    /// Run an already-validated strategy. Used by the scanner, which
    /// validates once per batch.
    pub fn run_prepared(
        &self,
        symbol: &str,
        prepared: &PreparedStrategy,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        config: &BacktestConfig,
    ) -> Result<Backtest, RunError> {
        let series = self.source.load(symbol, start, end)?;
        let backtest = run_backtest(&series, prepared, config)?;
        for warning in backtest.guard_report.warnings() {
            warn!(symbol = %backtest.symbol, "{warning}");
        }
        Ok(backtest)
    }

    pub fn run_result(&self, request: &RunRequest) -> RunResult {
        info!(
            symbol = %request.symbol,
            strategy = %request.strategy,
            mode = %request.mode,
            "running backtest"
        );
        match self.run(request) {
            Ok(bt) => RunResult::from_backtest(&bt),
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "backtest failed");
                RunResult::failed(request, e.kind(), e.to_string())
            }
        }
    }

    /// Cache key for `symbol` under an already-validated strategy.
    pub fn fingerprint(
        &self,
        symbol: &str,
        prepared: &PreparedStrategy,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        config: &BacktestConfig,
    ) -> Result<RunFingerprint, RunError> {
        Ok(RunKey::new(symbol, prepared, start, end, config).fingerprint()?)
    }
}
