//! Position: the event engine's per-run holding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trade::{ExitReason, TradeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A long position opened by a buy signal.
///
/// Created only when flat, mutated only by the simulation step that owns it,
/// and closed on a sell signal, a stop/take-profit breach, or end of series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_time: DateTime<Utc>,
    pub entry_bar: usize,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_price: f64,
    pub take_profit_price: Option<f64>,
    pub entry_commission: f64,
    pub sizing_fallback: bool,
    pub status: PositionStatus,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Close at `exit_price` (already slipped) and book the round trip.
    /// Commission on the record covers both legs.
    pub fn close(
        &mut self,
        exit_bar: usize,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_commission: f64,
        reason: ExitReason,
    ) -> TradeRecord {
        self.status = PositionStatus::Closed;
        let gross_pnl = self.quantity * (exit_price - self.entry_price);
        let commission = self.entry_commission + exit_commission;
        TradeRecord {
            entry_bar: self.entry_bar,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_bar,
            exit_time,
            exit_price,
            quantity: self.quantity,
            gross_pnl,
            commission,
            net_pnl: gross_pnl - commission,
            exit_reason: reason,
            sizing_fallback: self.sizing_fallback,
        }
    }
}
