//! Vector engine: whole-history evaluation in one pass over columns.
//!
//! ```text
//! position[t] = target[t - 1]            (target[-1] = 0)
//! equity[t]   = cash * Π_{k<=t} (1 + position[k] * return[k])
//! ```
//!
//! Full allocation, no cash constraint, no fractional-share rounding, no
//! costs. Signals are the transitions of the target column priced at that
//! bar's close.

use crate::columns::{shift, simple_returns, Columns};
use crate::domain::{EquityPoint, ExitReason, Signal, SignalType, TradeRecord};
use crate::error::{EngineError, EngineResult};
use crate::strategy::transitions;

use super::EngineOutput;

pub fn run_vector(cols: &Columns, target: &[f64], initial_cash: f64) -> EngineResult<EngineOutput> {
    let n = cols.len();
    if target.len() != n {
        return Err(EngineError::simulation(format!(
            "target has {} bars, series has {n}",
            target.len()
        )));
    }

    let returns = simple_returns(&cols.close);
    let position = shift(target, 1, 0.0);

    let mut equity = Vec::with_capacity(n);
    let mut value = initial_cash;
    for i in 0..n {
        let step = position[i] * returns[i];
        value *= 1.0 + if step.is_finite() { step } else { 0.0 };
        if !value.is_finite() {
            return Err(EngineError::simulation(format!(
                "non-finite equity at bar {i}"
            )));
        }
        equity.push(EquityPoint {
            timestamp: cols.timestamps[i],
            value,
        });
    }

    let signals: Vec<Signal> = transitions(target)
        .into_iter()
        .enumerate()
        .filter_map(|(i, t)| {
            t.map(|signal_type| Signal {
                timestamp: cols.timestamps[i],
                bar_index: i,
                signal_type,
                price: cols.close[i],
            })
        })
        .collect();

    let trades = round_trips(cols, &signals, &equity);

    Ok(EngineOutput {
        equity_curve: equity,
        signals,
        trades,
        execution_stats: None,
    })
}

/// Pair buy/sell transitions into trades. Each entry commits the whole
/// equity at that bar's close; a position still open at the end is closed
/// at the final close. A buy on the final bar never holds a bar and is skipped.
fn round_trips(cols: &Columns, signals: &[Signal], equity: &[EquityPoint]) -> Vec<TradeRecord> {
    let n = cols.len();
    let mut trades = Vec::new();
    let mut open: Option<(usize, f64)> = None;

    let close_trade = |entry_bar: usize, quantity: f64, exit_bar: usize, reason: ExitReason| {
        let entry_price = cols.close[entry_bar];
        let exit_price = cols.close[exit_bar];
        let pnl = quantity * (exit_price - entry_price);
        TradeRecord {
            entry_bar,
            entry_time: cols.timestamps[entry_bar],
            entry_price,
            exit_bar,
            exit_time: cols.timestamps[exit_bar],
            exit_price,
            quantity,
            gross_pnl: pnl,
            commission: 0.0,
            net_pnl: pnl,
            exit_reason: reason,
            sizing_fallback: false,
        }
    };

    for s in signals {
        match (s.signal_type, open) {
            (SignalType::Buy, None) if s.bar_index + 1 < n => {
                let quantity = equity[s.bar_index].value / cols.close[s.bar_index];
                open = Some((s.bar_index, quantity));
            }
            (SignalType::Sell, Some((entry_bar, quantity))) => {
                trades.push(close_trade(entry_bar, quantity, s.bar_index, ExitReason::Signal));
                open = None;
            }
            _ => {}
        }
    }
    if let Some((entry_bar, quantity)) = open {
        trades.push(close_trade(entry_bar, quantity, n - 1, ExitReason::EndOfSeries));
    }
    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equity_values;
    use crate::indicators::make_columns;

    #[test]
    fn flat_target_keeps_cash() {
        let cols = make_columns(&[100.0, 110.0, 90.0, 120.0]);
        let out = run_vector(&cols, &[0.0; 4], 1_000.0).unwrap();
        assert!(equity_values(&out.equity_curve).iter().all(|&v| v == 1_000.0));
        assert!(out.signals.is_empty());
        assert!(out.trades.is_empty());
    }

    #[test]
    fn position_lags_target_by_one_bar() {
        let cols = make_columns(&[100.0, 100.0, 150.0, 150.0]);
        // Target goes long on bar 2, the bar of the jump.
        let out = run_vector(&cols, &[0.0, 0.0, 1.0, 1.0], 1_000.0).unwrap();
        assert_eq!(equity_values(&out.equity_curve), vec![1_000.0; 4]);

        // Long from bar 1 captures the jump on bar 2.
        let out = run_vector(&cols, &[0.0, 1.0, 1.0, 1.0], 1_000.0).unwrap();
        assert!((out.equity_curve[2].value - 1_500.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_matches_equity() {
        let cols = make_columns(&[100.0, 100.0, 110.0, 121.0, 100.0]);
        let out = run_vector(&cols, &[0.0, 1.0, 1.0, 0.0, 0.0], 1_000.0).unwrap();
        assert_eq!(out.signals.len(), 2);
        assert_eq!(out.signals[0].signal_type, SignalType::Buy);
        assert_eq!(out.signals[0].price, 100.0);
        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!((t.entry_bar, t.exit_bar), (1, 3));
        assert!((t.net_pnl - 210.0).abs() < 1e-9);
        assert!((out.equity_curve[4].value - 1_210.0).abs() < 1e-9);
    }

    #[test]
    fn open_position_closed_at_end() {
        let cols = make_columns(&[100.0, 100.0, 120.0]);
        let out = run_vector(&cols, &[0.0, 1.0, 1.0], 1_000.0).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].exit_reason, ExitReason::EndOfSeries);
    }
}
