use hermes_core::EngineError;
use thiserror::Error;

use crate::settings::ConfigError;
use crate::source::DataError;

/// Errors from the runner and scanner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Config(_) => "config",
            RunError::Data(_) => "data",
            RunError::Engine(e) => e.kind(),
            RunError::Pool(_) => "pool",
        }
    }

    /// True for problems with the request itself rather than the data.
    pub fn is_validation(&self) -> bool {
        matches!(self, RunError::Engine(EngineError::Validation(_)))
    }
}
