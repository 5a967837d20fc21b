//! TradeRecord: a completed round trip with its exit cause.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Strategy-driven sell signal.
    Signal,
    StopLoss,
    TakeProfit,
    /// Still open at the last bar; closed by the engine, not the strategy.
    EndOfSeries,
}

impl ExitReason {
    pub fn is_forced(&self) -> bool {
        matches!(self, ExitReason::EndOfSeries)
    }
}

/// A complete round trip: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,

    pub quantity: f64,

    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,

    pub exit_reason: ExitReason,
    pub sizing_fallback: bool,
}

impl TradeRecord {
    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional == 0.0 {
            return 0.0;
        }
        self.net_pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    pub fn entry_notional(&self) -> f64 {
        self.entry_price * self.quantity
    }
}
