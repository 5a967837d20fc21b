//! Performance metrics: pure functions over an equity curve and trade list.
//!
//! Every metric is reported twice: a raw number for programmatic use and a
//! display string for presentation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

pub const TOTAL_RETURN: &str = "Total Return";
pub const MAX_DRAWDOWN: &str = "Max Drawdown";
pub const SHARPE_RATIO: &str = "Sharpe Ratio";
pub const FINAL_EQUITY: &str = "Final Equity";
pub const TOTAL_TRADES: &str = "Total Trades";
pub const WIN_RATE: &str = "Win Rate";
pub const PROFIT_FACTOR: &str = "Profit Factor";
pub const MAX_CAPITAL_AT_RISK: &str = "Max Capital at Risk";

/// Profit factor reported when there are winners and no losers.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

/// 252 sessions of 375 one-minute bars.
pub const MINUTE_BARS_PER_YEAR: f64 = 252.0 * 375.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    pub display: String,
}

impl MetricValue {
    fn new(value: f64, display: String) -> Self {
        Self { value, display }
    }

    fn not_available() -> Self {
        Self::new(0.0, "N/A".to_string())
    }
}

/// Metric name → value, ordered by name.
pub type MetricsMap = BTreeMap<String, MetricValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub final_equity: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    /// `None` when there are no trades.
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub max_capital_at_risk: Option<f64>,
}

impl Metrics {
    pub fn compute(
        equity: &[f64],
        trades: &[TradeRecord],
        initial_cash: f64,
        bars_per_year: f64,
    ) -> Self {
        let final_equity = equity.last().copied().unwrap_or(initial_cash);
        let has_trades = !trades.is_empty();
        Self {
            total_return: total_return(final_equity, initial_cash),
            final_equity,
            sharpe_ratio: sharpe_ratio(equity, bars_per_year),
            max_drawdown: max_drawdown(equity),
            total_trades: trades.len(),
            win_rate: has_trades.then(|| win_rate(trades)),
            profit_factor: has_trades.then(|| profit_factor(trades)),
            max_capital_at_risk: has_trades.then(|| max_capital_at_risk(trades, initial_cash)),
        }
    }

    pub fn to_map(&self) -> MetricsMap {
        let mut m = MetricsMap::new();
        m.insert(
            TOTAL_RETURN.to_string(),
            MetricValue::new(self.total_return, format!("{:+.2}%", self.total_return * 100.0)),
        );
        m.insert(
            MAX_DRAWDOWN.to_string(),
            MetricValue::new(self.max_drawdown, format!("{:.2}%", self.max_drawdown * 100.0)),
        );
        m.insert(
            SHARPE_RATIO.to_string(),
            MetricValue::new(self.sharpe_ratio, format!("{:.2}", self.sharpe_ratio)),
        );
        m.insert(
            FINAL_EQUITY.to_string(),
            MetricValue::new(self.final_equity, format!("{:.2}", self.final_equity)),
        );
        m.insert(
            TOTAL_TRADES.to_string(),
            MetricValue::new(self.total_trades as f64, self.total_trades.to_string()),
        );
        m.insert(
            WIN_RATE.to_string(),
            self.win_rate
                .map(|w| MetricValue::new(w, format!("{:.1}%", w * 100.0)))
                .unwrap_or_else(MetricValue::not_available),
        );
        m.insert(
            PROFIT_FACTOR.to_string(),
            self.profit_factor
                .map(|pf| {
                    let display = if pf >= PROFIT_FACTOR_CAP {
                        "∞".to_string()
                    } else {
                        format!("{pf:.2}")
                    };
                    MetricValue::new(pf, display)
                })
                .unwrap_or_else(MetricValue::not_available),
        );
        m.insert(
            MAX_CAPITAL_AT_RISK.to_string(),
            self.max_capital_at_risk
                .map(|r| MetricValue::new(r, format!("{:.1}%", r * 100.0)))
                .unwrap_or_else(MetricValue::not_available),
        );
        m
    }
}

pub fn total_return(final_equity: f64, initial_cash: f64) -> f64 {
    if initial_cash <= 0.0 {
        return 0.0;
    }
    final_equity / initial_cash - 1.0
}

/// Per-bar simple returns of an equity curve; non-finite steps count as 0.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| {
            let r = w[1] / w[0] - 1.0;
            if r.is_finite() {
                r
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized Sharpe ratio of per-bar returns, zero risk-free rate.
///
/// Sharpe = mean / sample_std * sqrt(bars_per_year).
/// Returns 0.0 if the deviation is zero or there are fewer than two returns.
pub fn sharpe_ratio(equity: &[f64], bars_per_year: f64) -> f64 {
    let returns = bar_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std.is_nan() || std < 1e-15 {
        return 0.0;
    }
    mean / std * bars_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g. -0.15 = 15% drawdown).
///
/// Returns 0.0 for an empty, constant or non-decreasing curve.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min(eq / peak - 1.0);
        }
    }
    max_dd
}

pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit / gross loss, capped at [`PROFIT_FACTOR_CAP`].
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Largest entry notional as a fraction of initial cash.
pub fn max_capital_at_risk(trades: &[TradeRecord], initial_cash: f64) -> f64 {
    if initial_cash <= 0.0 {
        return 0.0;
    }
    trades
        .iter()
        .map(|t| t.entry_notional())
        .fold(0.0, f64::max)
        / initial_cash
}
