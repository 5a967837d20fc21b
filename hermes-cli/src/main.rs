//! Hermes CLI: single backtests, batch scans, and strategy listing.
//!
//! Commands:
//! - `run`: backtest one symbol and print the run result as JSON
//! - `scan`: run one strategy across many symbols and print the ranked scan
//! - `strategies`: list registered strategies and their parameter schemas
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`). JSON goes to
//! stdout so it can be piped.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use hermes_core::engine::EngineMode;
use hermes_core::resample::Timeframe;
use hermes_core::risk::{RiskConfig, SizingMethod};
use hermes_core::strategy::{ParamValue, StrategyRegistry};
use hermes_runner::{
    CsvDirSource, DataSource, EngineSettings, JsonFileCache, MemoryCache, RunRequest, Runner,
    ScanRequest, Scanner, SyntheticSource,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Window used by `--synthetic` when no dates are given.
const SYNTHETIC_DAYS: i64 = 30;

#[derive(Parser)]
#[command(name = "hermes", about = "Hermes: intraday strategy backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one symbol and print the run result as JSON.
    Run {
        /// Symbol to backtest.
        #[arg(long)]
        symbol: String,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Scan one strategy across many symbols and print the ranked results.
    Scan {
        /// Comma-separated symbols. Omit to scan everything the data source lists.
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,

        /// Worker threads. Defaults to the settings value.
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Persist scan results as JSON files here. Without it, results are
        /// cached in memory for this invocation only.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        data: DataArgs,
    },
    /// List registered strategies and their parameters.
    Strategies,
}

#[derive(Args)]
struct StrategyArgs {
    /// Strategy name or alias (see `hermes strategies`).
    #[arg(long)]
    strategy: String,

    /// Strategy parameter, repeatable: --param fast_period=20
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, ParamValue)>,

    /// vector or event.
    #[arg(long, default_value = "vector")]
    mode: EngineMode,

    /// Analysis timeframe: 1m, 5m, 15m, 30m, 1h, 4h, 1d.
    #[arg(long, default_value = "1m")]
    timeframe: Timeframe,

    /// First calendar date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last calendar date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long, default_value_t = 100_000.0)]
    initial_cash: f64,

    /// Fractional slippage, e.g. 0.001.
    #[arg(long, default_value_t = 0.0)]
    slippage: f64,

    /// Commission per unit traded.
    #[arg(long, default_value_t = 0.0)]
    commission: f64,

    #[command(flatten)]
    risk: RiskArgs,
}

/// Event-engine risk overrides. Unset flags keep the defaults.
#[derive(Args)]
struct RiskArgs {
    /// fixed, pct_equity, or atr_based.
    #[arg(long, value_parser = parse_sizing)]
    risk_sizing: Option<SizingMethod>,

    #[arg(long)]
    risk_fixed_quantity: Option<f64>,

    #[arg(long)]
    risk_pct_equity: Option<f64>,

    #[arg(long)]
    risk_atr_multiplier: Option<f64>,

    #[arg(long)]
    risk_atr_period: Option<usize>,

    #[arg(long)]
    risk_max_position_pct: Option<f64>,

    #[arg(long)]
    risk_stop_loss_pct: Option<f64>,

    #[arg(long)]
    risk_take_profit_pct: Option<f64>,
}

#[derive(Args)]
struct DataArgs {
    /// Directory of <SYMBOL>.csv minute files. Falls back to `data_dir` in settings.
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Generate deterministic random-walk data instead of reading files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Engine settings TOML.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    let value = value.parse::<ParamValue>().map_err(|e| e.to_string())?;
    Ok((key.to_string(), value))
}

fn parse_sizing(raw: &str) -> Result<SizingMethod, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|_| format!("unknown sizing method '{raw}' (fixed, pct_equity, atr_based)"))
}

impl RiskArgs {
    fn to_config(&self) -> RiskConfig {
        let mut risk = RiskConfig::default();
        if let Some(v) = self.risk_sizing {
            risk.sizing_method = v;
        }
        if let Some(v) = self.risk_fixed_quantity {
            risk.fixed_quantity = v;
        }
        if let Some(v) = self.risk_pct_equity {
            risk.pct_equity = v;
        }
        if let Some(v) = self.risk_atr_multiplier {
            risk.atr_multiplier = v;
        }
        if let Some(v) = self.risk_atr_period {
            risk.atr_period = v;
        }
        if let Some(v) = self.risk_max_position_pct {
            risk.max_position_pct = v;
        }
        if let Some(v) = self.risk_stop_loss_pct {
            risk.stop_loss_pct = v;
        }
        risk.take_profit_pct = self.risk_take_profit_pct;
        risk
    }
}

impl StrategyArgs {
    fn params(&self) -> BTreeMap<String, ParamValue> {
        self.params.iter().cloned().collect()
    }

    fn run_request(&self, symbol: &str) -> RunRequest {
        RunRequest {
            symbol: symbol.to_string(),
            strategy: self.strategy.clone(),
            params: self.params(),
            initial_cash: self.initial_cash,
            mode: self.mode,
            slippage: self.slippage,
            commission: self.commission,
            start_date: self.start,
            end_date: self.end,
            timeframe: self.timeframe,
            risk_params: self.risk.to_config(),
        }
    }

    fn scan_request(&self, symbols: Option<Vec<String>>, max_concurrency: Option<usize>) -> ScanRequest {
        ScanRequest {
            strategy: self.strategy.clone(),
            params: self.params(),
            symbols,
            initial_cash: self.initial_cash,
            mode: self.mode,
            slippage: self.slippage,
            commission: self.commission,
            start_date: self.start,
            end_date: self.end,
            timeframe: self.timeframe,
            risk_params: self.risk.to_config(),
            max_concurrency,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<EngineSettings> {
    let settings = match path {
        Some(path) => EngineSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    settings.validate().context("invalid engine settings")?;
    Ok(settings)
}

/// Picks the data source: `--synthetic`, then `--data-dir`, then the
/// settings `data_dir`.
fn build_source(
    data: &DataArgs,
    settings: &EngineSettings,
    symbols: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Arc<dyn DataSource>> {
    if data.synthetic {
        let end = end.unwrap_or_else(|| Utc::now().date_naive());
        let start = start.unwrap_or(end - Duration::days(SYNTHETIC_DAYS));
        return Ok(Arc::new(SyntheticSource::new(symbols, start, end)));
    }
    let dir = data
        .data_dir
        .clone()
        .or_else(|| settings.data_dir.clone());
    match dir {
        Some(dir) if dir.is_dir() => Ok(Arc::new(CsvDirSource::new(dir))),
        Some(dir) => bail!("data directory {} does not exist", dir.display()),
        None => bail!("no data source: pass --data-dir, set data_dir in settings, or use --synthetic"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}

fn cmd_run(symbol: String, strategy: StrategyArgs, data: DataArgs) -> Result<()> {
    let settings = load_settings(data.config.as_ref())?;
    let source = build_source(
        &data,
        &settings,
        std::slice::from_ref(&symbol),
        strategy.start,
        strategy.end,
    )?;
    let runner = Runner::new(source, settings);
    let result = runner.run_result(&strategy.run_request(&symbol));
    print_json(&result)?;
    if !result.is_success() {
        bail!(
            "backtest failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn cmd_scan(
    symbols: Option<Vec<String>>,
    max_concurrency: Option<usize>,
    cache_dir: Option<PathBuf>,
    strategy: StrategyArgs,
    data: DataArgs,
) -> Result<()> {
    let settings = load_settings(data.config.as_ref())?;
    if data.synthetic && symbols.is_none() {
        bail!("--synthetic scans need --symbols");
    }
    let listed = symbols.clone().unwrap_or_default();
    let source = build_source(&data, &settings, &listed, strategy.start, strategy.end)?;

    let ttl = settings.cache_ttl();
    let scanner = Scanner::new(Runner::new(source, settings));
    let scanner = match cache_dir {
        Some(dir) => {
            let cache = JsonFileCache::new(&dir, ttl)
                .with_context(|| format!("opening cache directory {}", dir.display()))?;
            info!(dir = %dir.display(), "using file cache");
            scanner.with_cache(Arc::new(cache))
        }
        None => scanner.with_cache(Arc::new(MemoryCache::new(ttl))),
    };

    let response = scanner
        .scan(&strategy.scan_request(symbols, max_concurrency))
        .context("scan failed")?;
    print_json(&response)
}

fn cmd_strategies() -> Result<()> {
    print_json(&StrategyRegistry::builtin().describe())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            symbol,
            strategy,
            data,
        } => cmd_run(symbol, strategy, data),
        Commands::Scan {
            symbols,
            max_concurrency,
            cache_dir,
            strategy,
            data,
        } => cmd_scan(symbols, max_concurrency, cache_dir, strategy, data),
        Commands::Strategies => cmd_strategies(),
    }
}
