//! Simulation engines.
//!
//! Both engines take the clean columns and the strategy's latched target
//! column and produce an equity curve, signals and trades. Neither knows
//! anything about strategies beyond that column.
//!
//! - [`vector`]: full-allocation idealization in one columnar pass.
//! - [`event`]: bar-by-bar replay with sizing, costs and protective exits.

pub mod cost;
pub mod event;
pub mod vector;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{EquityPoint, Signal, TradeRecord};
use crate::error::EngineError;

pub use cost::CostModel;
pub use event::{run_event, EventConfig, ExecutionStats};
pub use vector::run_vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    #[default]
    Vector,
    Event,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Vector => "vector",
            EngineMode::Event => "event",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" => Ok(EngineMode::Vector),
            "event" => Ok(EngineMode::Event),
            other => Err(EngineError::validation(format!("unknown engine mode '{other}'"))),
        }
    }
}

/// What a single engine run produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub equity_curve: Vec<EquityPoint>,
    pub signals: Vec<Signal>,
    pub trades: Vec<TradeRecord>,
    /// Event engine only.
    pub execution_stats: Option<ExecutionStats>,
}
