//! Strategy registry: name → strategy lookup and request validation.

use std::sync::Arc;

use serde::Serialize;

use super::{
    BollingerStrategy, MacdStrategy, MtfTrendStrategy, ParamSchema, PreparedStrategy,
    RsiStrategy, SmaCrossoverStrategy, Strategy, StrategyConfig,
};
use crate::error::{EngineError, EngineResult};
use crate::resample::Timeframe;

/// Serializable description of a registered strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub params: ParamSchema,
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in strategy.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(Arc::new(SmaCrossoverStrategy));
        reg.register(Arc::new(RsiStrategy));
        reg.register(Arc::new(MacdStrategy));
        reg.register(Arc::new(BollingerStrategy));
        reg.register(Arc::new(MtfTrendStrategy));
        reg
    }

    /// Add a strategy; a later registration with the same name replaces the earlier one.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.retain(|s| s.name() != strategy.name());
        self.strategies.push(strategy);
    }

    /// Case-insensitive lookup by canonical name or alias.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        let wanted = name.trim();
        self.strategies
            .iter()
            .find(|s| {
                s.name().eq_ignore_ascii_case(wanted)
                    || s.aliases().iter().any(|a| a.eq_ignore_ascii_case(wanted))
            })
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn describe(&self) -> Vec<StrategyInfo> {
        self.strategies
            .iter()
            .map(|s| StrategyInfo {
                name: s.name(),
                aliases: s.aliases(),
                description: s.description(),
                params: s.schema(),
            })
            .collect()
    }

    /// Resolve and validate a strategy request. Nothing runs until this succeeds.
    pub fn prepare(
        &self,
        config: &StrategyConfig,
        timeframe: Timeframe,
    ) -> EngineResult<PreparedStrategy> {
        let strategy = self.get(&config.strategy_name).ok_or_else(|| {
            EngineError::validation(format!(
                "unknown strategy '{}' (available: {})",
                config.strategy_name,
                self.names().join(", ")
            ))
        })?;
        let params = strategy.schema().validate(strategy.name(), &config.params)?;
        strategy.check(&params)?;
        Ok(PreparedStrategy::new(strategy, params, timeframe))
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
