//! Domain types for Hermes

pub mod candle;
pub mod position;
pub mod signal;
pub mod trade;

pub use candle::{Candle, Series};
pub use position::{Position, PositionStatus};
pub use signal::{equity_values, EquityPoint, Signal, SignalType};
pub use trade::{ExitReason, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
