//! Request and response payloads for single runs and scans.
//!
//! These are the shapes a transport layer (HTTP, CLI, queue) exchanges with
//! the runner. Times are unix seconds; metric maps are keyed by display name.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hermes_core::backtest::{Backtest, BacktestConfig};
use hermes_core::domain::{SignalType, TradeRecord};
use hermes_core::engine::{EngineMode, ExecutionStats};
use hermes_core::metrics::{MetricsMap, TOTAL_RETURN};
use hermes_core::resample::Timeframe;
use hermes_core::risk::RiskConfig;
use hermes_core::strategy::{ParamValue, StrategyConfig};
use serde::{Deserialize, Serialize};

use crate::settings::EngineSettings;

fn default_initial_cash() -> f64 {
    100_000.0
}

/// One backtest of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub symbol: String,
    pub strategy: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default)]
    pub mode: EngineMode,
    /// Fractional, e.g. 0.001 = 0.1%.
    #[serde(default)]
    pub slippage: f64,
    /// Per unit traded.
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub risk_params: RiskConfig,
}

impl RunRequest {
    pub fn new(symbol: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            strategy: strategy.into(),
            params: BTreeMap::new(),
            initial_cash: default_initial_cash(),
            mode: EngineMode::default(),
            slippage: 0.0,
            commission: 0.0,
            start_date: None,
            end_date: None,
            timeframe: Timeframe::default(),
            risk_params: RiskConfig::default(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_mode(mut self, mode: EngineMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            strategy_name: self.strategy.clone(),
            params: self.params.clone(),
        }
    }

    pub fn backtest_config(&self, settings: &EngineSettings) -> BacktestConfig {
        BacktestConfig {
            mode: self.mode,
            initial_cash: self.initial_cash,
            slippage: self.slippage,
            commission: self.commission,
            risk: self.risk_params.clone(),
            guard: settings.guard(),
            bars_per_year: settings.bars_per_year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub time: i64,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

/// Everything a chart or report needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub symbol: String,
    pub strategy: String,
    pub mode: EngineMode,
    pub metrics: MetricsMap,
    pub equity_curve: Vec<ChartPoint>,
    pub signals: Vec<SignalPoint>,
    pub candles: Vec<CandlePoint>,
    /// NaN (warm-up) points are omitted.
    pub indicators: BTreeMap<String, Vec<ChartPoint>>,
    pub trades: Vec<TradeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_stats: Option<ExecutionStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_warnings: Vec<String>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl RunResult {
    pub fn from_backtest(bt: &Backtest) -> Self {
        let equity_curve = bt
            .equity_curve
            .iter()
            .map(|p| ChartPoint {
                time: p.timestamp.timestamp(),
                value: p.value,
            })
            .collect();
        let signals = bt
            .signals
            .iter()
            .map(|s| SignalPoint {
                time: s.timestamp.timestamp(),
                signal_type: s.signal_type,
                price: s.price,
            })
            .collect();
        let candles = bt
            .candles
            .iter()
            .map(|c| CandlePoint {
                time: c.time(),
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            })
            .collect();
        let indicators = bt
            .indicators
            .iter()
            .map(|(name, values)| {
                let points = values
                    .iter()
                    .zip(&bt.candles)
                    .filter(|(v, _)| v.is_finite())
                    .map(|(&value, c)| ChartPoint {
                        time: c.time(),
                        value,
                    })
                    .collect();
                (name.to_string(), points)
            })
            .collect();

        Self {
            symbol: bt.symbol.clone(),
            strategy: bt.strategy.clone(),
            mode: bt.mode,
            metrics: bt.metrics.to_map(),
            equity_curve,
            signals,
            candles,
            indicators,
            trades: bt.trades.clone(),
            execution_stats: bt.execution_stats,
            data_warnings: bt.guard_report.warnings(),
            status: RunStatus::Success,
            error: None,
            error_kind: None,
        }
    }

    /// Failed run: empty payloads and the error message.
    pub fn failed(request: &RunRequest, kind: &str, message: String) -> Self {
        Self {
            symbol: request.symbol.trim().to_ascii_uppercase(),
            strategy: request.strategy.clone(),
            mode: request.mode,
            metrics: MetricsMap::new(),
            equity_curve: Vec::new(),
            signals: Vec::new(),
            candles: Vec::new(),
            indicators: BTreeMap::new(),
            trades: Vec::new(),
            execution_stats: None,
            data_warnings: Vec::new(),
            status: RunStatus::Error,
            error: Some(message),
            error_kind: Some(kind.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// One strategy across many symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub strategy: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    /// `None` scans every symbol the data source lists.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default)]
    pub mode: EngineMode,
    #[serde(default)]
    pub slippage: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub risk_params: RiskConfig,
    /// Worker count; falls back to the settings default.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl ScanRequest {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            params: BTreeMap::new(),
            symbols: None,
            initial_cash: default_initial_cash(),
            mode: EngineMode::default(),
            slippage: 0.0,
            commission: 0.0,
            start_date: None,
            end_date: None,
            timeframe: Timeframe::default(),
            risk_params: RiskConfig::default(),
            max_concurrency: None,
        }
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            strategy_name: self.strategy.clone(),
            params: self.params.clone(),
        }
    }

    pub fn backtest_config(&self, settings: &EngineSettings) -> BacktestConfig {
        BacktestConfig {
            mode: self.mode,
            initial_cash: self.initial_cash,
            slippage: self.slippage,
            commission: self.commission,
            risk: self.risk_params.clone(),
            guard: settings.guard(),
            bars_per_year: settings.bars_per_year,
        }
    }

    /// The single-run request this scan issues for `symbol`.
    pub fn run_request(&self, symbol: &str) -> RunRequest {
        RunRequest {
            symbol: symbol.to_string(),
            strategy: self.strategy.clone(),
            params: self.params.clone(),
            initial_cash: self.initial_cash,
            mode: self.mode,
            slippage: self.slippage,
            commission: self.commission,
            start_date: self.start_date,
            end_date: self.end_date,
            timeframe: self.timeframe,
            risk_params: self.risk_params.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Success,
    Error,
    /// The scan timed out before this symbol was dispatched.
    NotAttempted,
}

/// Per-symbol scan summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    #[serde(default)]
    pub metrics: MetricsMap,
    #[serde(default)]
    pub signal_count: usize,
    #[serde(default)]
    pub last_signal: Option<SignalType>,
    #[serde(default)]
    pub last_signal_time: Option<i64>,
    pub status: ScanStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cached: bool,
}

impl ScanResult {
    pub fn from_backtest(bt: &Backtest) -> Self {
        let last = bt.signals.last();
        Self {
            symbol: bt.symbol.clone(),
            metrics: bt.metrics.to_map(),
            signal_count: bt.signals.len(),
            last_signal: last.map(|s| s.signal_type),
            last_signal_time: last.map(|s| s.timestamp.timestamp()),
            status: ScanStatus::Success,
            error: None,
            cached: false,
        }
    }

    pub fn failed(symbol: &str, message: String) -> Self {
        Self::empty(symbol, ScanStatus::Error, Some(message))
    }

    pub fn not_attempted(symbol: &str) -> Self {
        Self::empty(symbol, ScanStatus::NotAttempted, None)
    }

    fn empty(symbol: &str, status: ScanStatus, error: Option<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            metrics: MetricsMap::new(),
            signal_count: 0,
            last_signal: None,
            last_signal_time: None,
            status,
            error,
            cached: false,
        }
    }

    /// Raw total return, if the run succeeded.
    pub fn total_return(&self) -> Option<f64> {
        match self.status {
            ScanStatus::Success => self.metrics.get(TOTAL_RETURN).map(|m| m.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub strategy: String,
    pub total_symbols: usize,
    pub completed: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub cached_count: usize,
    pub fresh_count: usize,
    /// Sorted by total return, best first; failures last.
    pub results: Vec<ScanResult>,
    pub elapsed_ms: u64,
}
