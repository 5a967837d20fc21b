//! Engine error taxonomy.

use thiserror::Error;

/// Every way a single backtest can fail.
///
/// None of these are retried inside the engine. The batch scanner converts
/// them into per-symbol error entries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Unknown strategy, unknown parameter, or parameter out of its declared range.
    #[error("validation error: {0}")]
    Validation(String),

    /// Too few bars survive the data guard to seed the strategy.
    #[error("insufficient data: need at least {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// The data guard rejected too much of the series.
    #[error(
        "data integrity error: {dropped} of {total} rows dropped ({flagged} flagged), limit {max_drop_fraction}"
    )]
    DataIntegrity {
        dropped: usize,
        flagged: usize,
        total: usize,
        max_drop_fraction: f64,
    },

    /// Unexpected internal failure mid-run.
    #[error("simulation error: {0}")]
    Simulation(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn simulation(msg: impl Into<String>) -> Self {
        EngineError::Simulation(msg.into())
    }

    /// Short machine-readable kind, used in result payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::InsufficientData { .. } => "insufficient_data",
            EngineError::DataIntegrity { .. } => "data_integrity",
            EngineError::Simulation(_) => "simulation",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
