//! Run fingerprinting: a stable identity for "this exact backtest".
//!
//! A fingerprint covers every input that determines an outcome: symbol,
//! canonical strategy name, the schema-checked parameter set (defaults
//! filled, keys ordered), date range, timeframe and the full
//! [`BacktestConfig`]. Two requests that differ only in how they spelled
//! the strategy or whether they omitted a default parameter hash the same.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtest::BacktestConfig;
use crate::error::{EngineError, EngineResult};
use crate::resample::Timeframe;
use crate::strategy::{Params, PreparedStrategy};

/// BLAKE3 hex digest of a [`RunKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunFingerprint(String);

impl RunFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical inputs of one run. Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunKey<'a> {
    pub symbol: String,
    pub strategy: &'a str,
    pub params: &'a Params,
    pub timeframe: Timeframe,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub config: &'a BacktestConfig,
}

impl<'a> RunKey<'a> {
    pub fn new(
        symbol: &str,
        strategy: &'a PreparedStrategy,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        config: &'a BacktestConfig,
    ) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            strategy: strategy.name(),
            params: strategy.params(),
            timeframe: strategy.timeframe(),
            start,
            end,
            config,
        }
    }

    pub fn fingerprint(&self) -> EngineResult<RunFingerprint> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, self)
            .map_err(|e| EngineError::simulation(format!("run key does not serialize: {e}")))?;
        Ok(RunFingerprint(hasher.finalize().to_hex().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineMode;
    use crate::strategy::{StrategyConfig, StrategyRegistry};

    fn prepared(config: StrategyConfig) -> PreparedStrategy {
        StrategyRegistry::builtin()
            .prepare(&config, Timeframe::M1)
            .unwrap()
    }

    fn fp(symbol: &str, strategy: &PreparedStrategy, config: &BacktestConfig) -> RunFingerprint {
        RunKey::new(symbol, strategy, None, None, config)
            .fingerprint()
            .unwrap()
    }

    #[test]
    fn hex_digest_is_stable() {
        let s = prepared(StrategyConfig::new("rsi"));
        let config = BacktestConfig::default();
        let a = fp("AAPL", &s, &config);
        assert_eq!(a, fp("AAPL", &s, &config));
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn defaults_and_aliases_hash_alike() {
        let config = BacktestConfig::default();
        let implicit = prepared(StrategyConfig::new("RSIStrategy"));
        let explicit = prepared(StrategyConfig::new("rsi").with_param("period", 14_i64));
        assert_eq!(fp("aapl", &implicit, &config), fp("AAPL", &explicit, &config));
    }

    #[test]
    fn every_input_changes_the_digest() {
        let s = prepared(StrategyConfig::new("rsi"));
        let base = BacktestConfig::default();
        let reference = fp("AAPL", &s, &base);

        assert_ne!(reference, fp("MSFT", &s, &base));

        let other_params = prepared(StrategyConfig::new("rsi").with_param("period", 7_i64));
        assert_ne!(reference, fp("AAPL", &other_params, &base));

        let event = BacktestConfig {
            mode: EngineMode::Event,
            ..base.clone()
        };
        assert_ne!(reference, fp("AAPL", &s, &event));

        let costly = BacktestConfig {
            slippage: 0.001,
            ..base.clone()
        };
        assert_ne!(reference, fp("AAPL", &s, &costly));

        let dated = RunKey::new("AAPL", &s, NaiveDate::from_ymd_opt(2024, 1, 2), None, &base)
            .fingerprint()
            .unwrap();
        assert_ne!(reference, dated);
    }
}
