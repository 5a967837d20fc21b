//! Risk configuration and position sizing.
//!
//! Sizing is a pure function of account state and configuration:
//!
//! ```text
//! fixed:      q = fixed_quantity
//! pct_equity: q = floor(equity * pct_equity / price)
//! atr_based:  q = floor(equity * pct_equity / (atr * atr_multiplier))
//! all:        q = min(q, floor(equity * max_position_pct / price))
//! ```
//!
//! `atr_based` falls back to `fixed` while ATR is undefined. A non-positive
//! result means "no trade", never an error.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    #[default]
    Fixed,
    PctEquity,
    AtrBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub sizing_method: SizingMethod,
    pub fixed_quantity: f64,
    pub pct_equity: f64,
    pub atr_multiplier: f64,
    pub atr_period: usize,
    pub max_position_pct: f64,
    pub stop_loss_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_pct: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            sizing_method: SizingMethod::Fixed,
            fixed_quantity: 10.0,
            pct_equity: 0.02,
            atr_multiplier: 1.5,
            atr_period: 14,
            max_position_pct: 0.25,
            stop_loss_pct: 0.05,
            take_profit_pct: None,
        }
    }
}

fn check_fraction(name: &str, v: f64) -> EngineResult<()> {
    if v.is_finite() && v > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "risk: {name} must be in (0, 1], got {v}"
        )))
    }
}

impl RiskConfig {
    pub fn validate(&self) -> EngineResult<()> {
        check_fraction("pct_equity", self.pct_equity)?;
        check_fraction("max_position_pct", self.max_position_pct)?;
        check_fraction("stop_loss_pct", self.stop_loss_pct)?;
        if !(self.fixed_quantity.is_finite() && self.fixed_quantity > 0.0) {
            return Err(EngineError::validation(format!(
                "risk: fixed_quantity must be positive, got {}",
                self.fixed_quantity
            )));
        }
        if !(self.atr_multiplier.is_finite() && self.atr_multiplier > 0.0) {
            return Err(EngineError::validation(format!(
                "risk: atr_multiplier must be positive, got {}",
                self.atr_multiplier
            )));
        }
        if self.atr_period == 0 {
            return Err(EngineError::validation("risk: atr_period must be >= 1"));
        }
        if let Some(tp) = self.take_profit_pct {
            if !(tp.is_finite() && tp > 0.0) {
                return Err(EngineError::validation(format!(
                    "risk: take_profit_pct must be positive, got {tp}"
                )));
            }
        }
        Ok(())
    }

    /// Stop price for a long entry at `entry_price`.
    pub fn stop_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_pct)
    }

    pub fn take_profit_price(&self, entry_price: f64) -> Option<f64> {
        self.take_profit_pct.map(|tp| entry_price * (1.0 + tp))
    }
}

/// Outcome of one sizing request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingDecision {
    /// Whole units, or 0.0 for "no trade".
    pub quantity: f64,
    /// `atr_based` was requested but ATR was unavailable.
    pub fell_back: bool,
}

pub fn size(equity: f64, price: f64, atr: Option<f64>, risk: &RiskConfig) -> SizingDecision {
    if !(equity > 0.0 && price > 0.0 && equity.is_finite() && price.is_finite()) {
        return SizingDecision {
            quantity: 0.0,
            fell_back: false,
        };
    }

    let usable_atr = atr.filter(|a| a.is_finite() && *a > 0.0);
    let (raw, fell_back) = match risk.sizing_method {
        SizingMethod::Fixed => (risk.fixed_quantity, false),
        SizingMethod::PctEquity => (equity * risk.pct_equity / price, false),
        SizingMethod::AtrBased => match usable_atr {
            Some(a) => (equity * risk.pct_equity / (a * risk.atr_multiplier), false),
            None => (risk.fixed_quantity, true),
        },
    };

    let wanted = raw.floor().max(0.0);
    let cap = (equity * risk.max_position_pct / price).floor().max(0.0);

    SizingDecision {
        quantity: wanted.min(cap),
        fell_back,
    }
}
