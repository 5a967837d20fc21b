//! Cost model: slippage and commission.
//!
//! Slippage is a fractional adverse price adjustment: buyers pay
//! `price * (1 + slippage)`, sellers receive `price * (1 - slippage)`.
//! Commission is a fixed amount per unit traded, charged on both sides.

use crate::domain::SignalType;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub slippage: f64,
    pub commission_per_unit: f64,
}

impl CostModel {
    pub fn new(slippage: f64, commission_per_unit: f64) -> Self {
        Self {
            slippage,
            commission_per_unit,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.slippage.is_finite() && (0.0..1.0).contains(&self.slippage)) {
            return Err(EngineError::validation(format!(
                "slippage must be in [0, 1), got {}",
                self.slippage
            )));
        }
        if !(self.commission_per_unit.is_finite() && self.commission_per_unit >= 0.0) {
            return Err(EngineError::validation(format!(
                "commission must be non-negative, got {}",
                self.commission_per_unit
            )));
        }
        Ok(())
    }

    pub fn fill_price(&self, raw_price: f64, side: SignalType) -> f64 {
        match side {
            SignalType::Buy => raw_price * (1.0 + self.slippage),
            SignalType::Sell => raw_price * (1.0 - self.slippage),
        }
    }

    pub fn commission(&self, quantity: f64) -> f64 {
        quantity * self.commission_per_unit
    }

    /// Cash needed to buy `quantity` at `fill_price`, commission included.
    pub fn entry_cost(&self, quantity: f64, fill_price: f64) -> f64 {
        quantity * fill_price + self.commission(quantity)
    }

    /// Largest whole quantity whose entry cost fits in `cash`.
    pub fn affordable_quantity(&self, cash: f64, fill_price: f64) -> f64 {
        let unit = fill_price + self.commission_per_unit;
        if unit <= 0.0 || cash <= 0.0 {
            return 0.0;
        }
        (cash / unit).floor()
    }
}
