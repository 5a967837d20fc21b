//! Event engine: bar-by-bar replay with an explicit position state machine.
//!
//! `Flat → (buy) → Long → (sell | stop | take-profit | end of series) → Flat`
//!
//! Each bar, in order:
//! 1. Long: stop-loss on the bar's low, then take-profit on its high. A stop
//!    fills at `min(stop, open)` and a target at `max(target, open)`, both
//!    less slippage. When both are breached the stop wins.
//! 2. Flat and a buy transition: size, then buy at close plus slippage.
//! 3. Long (opened before this bar) and a sell transition: sell at close.
//! 4. Last bar and still long: forced close at the final close.
//! 5. Mark equity at close.
//!
//! State is a value folded over the bars; no step mutates anything else.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::columns::Columns;
use crate::domain::{
    EquityPoint, ExitReason, Position, PositionStatus, Signal, SignalType, TradeRecord,
};
use crate::error::{EngineError, EngineResult};
use crate::indicators::atr;
use crate::risk::{size, RiskConfig, SizingMethod};
use crate::strategy::transitions;

use super::cost::CostModel;
use super::EngineOutput;

#[derive(Debug, Clone, PartialEq)]
pub struct EventConfig {
    pub initial_cash: f64,
    pub costs: CostModel,
    pub risk: RiskConfig,
}

/// Counters describing what the simulated broker did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Entry and exit requests.
    pub orders: usize,
    pub fills: usize,
    /// Entries that sized to zero or could not be afforded.
    pub rejected: usize,
    pub stop_exits: usize,
    pub take_profit_exits: usize,
    pub forced_exits: usize,
    pub sizing_fallbacks: usize,
}

/// Engine state between bars.
#[derive(Debug, Clone)]
struct EventState {
    cash: f64,
    position: Option<Position>,
    trades: Vec<TradeRecord>,
    fills: Vec<Signal>,
    equity: Vec<EquityPoint>,
    stats: ExecutionStats,
}

/// Per-run inputs shared by every step.
struct Tape<'a> {
    cols: &'a Columns,
    edges: Vec<Option<SignalType>>,
    atr: Option<Vec<f64>>,
    config: &'a EventConfig,
}

impl EventState {
    fn new(cash: f64, n: usize) -> Self {
        Self {
            cash,
            position: None,
            trades: Vec::new(),
            fills: Vec::new(),
            equity: Vec::with_capacity(n),
            stats: ExecutionStats::default(),
        }
    }

    fn step(mut self, tape: &Tape<'_>, i: usize) -> EngineResult<Self> {
        let cols = tape.cols;
        let last = cols.len() - 1;

        // 1. Protective exits
        let protective = self.position.as_ref().and_then(|pos| {
            if cols.low[i] <= pos.stop_price {
                return Some((pos.stop_price.min(cols.open[i]), ExitReason::StopLoss));
            }
            pos.take_profit_price
                .filter(|&tp| cols.high[i] >= tp)
                .map(|tp| (tp.max(cols.open[i]), ExitReason::TakeProfit))
        });
        if let Some((raw, reason)) = protective {
            self = self.exit(tape, i, raw, reason);
        }

        // 2. Entries. Nothing is opened on the final bar.
        let mut opened_now = false;
        if self.position.is_none() && tape.edges[i] == Some(SignalType::Buy) && i < last {
            self = self.enter(tape, i);
            opened_now = self.position.is_some();
        }

        // 3. Strategy exits
        if !opened_now && self.position.is_some() && tape.edges[i] == Some(SignalType::Sell) {
            self = self.exit(tape, i, cols.close[i], ExitReason::Signal);
        }

        // 4. End of series
        if i == last && self.position.is_some() {
            self = self.exit(tape, i, cols.close[i], ExitReason::EndOfSeries);
        }

        // 5. Mark to market
        let value = self.cash
            + self
                .position
                .as_ref()
                .map(|p| p.market_value(cols.close[i]))
                .unwrap_or(0.0);
        if !value.is_finite() {
            return Err(EngineError::simulation(format!(
                "non-finite equity at bar {i}"
            )));
        }
        self.equity.push(EquityPoint {
            timestamp: cols.timestamps[i],
            value,
        });
        Ok(self)
    }

    fn enter(mut self, tape: &Tape<'_>, i: usize) -> Self {
        let cols = tape.cols;
        let risk = &tape.config.risk;
        let costs = &tape.config.costs;
        self.stats.orders += 1;

        // Size against the slipped price so the exposure cap holds on the fill.
        let fill_price = costs.fill_price(cols.close[i], SignalType::Buy);
        let atr_now = tape.atr.as_ref().map(|a| a[i]);
        let decision = size(self.cash, fill_price, atr_now, risk);
        if decision.fell_back {
            self.stats.sizing_fallbacks += 1;
            debug!(bar = i, "ATR unavailable, sized with fixed quantity");
        }

        let mut quantity = decision.quantity;
        if costs.entry_cost(quantity, fill_price) > self.cash {
            quantity = quantity.min(costs.affordable_quantity(self.cash, fill_price));
        }
        if quantity <= 0.0 {
            self.stats.rejected += 1;
            debug!(bar = i, cash = self.cash, "entry rejected");
            return self;
        }

        let commission = costs.commission(quantity);
        self.cash -= quantity * fill_price + commission;
        self.stats.fills += 1;
        self.fills.push(Signal {
            timestamp: cols.timestamps[i],
            bar_index: i,
            signal_type: SignalType::Buy,
            price: fill_price,
        });
        self.position = Some(Position {
            entry_time: cols.timestamps[i],
            entry_bar: i,
            entry_price: fill_price,
            quantity,
            stop_price: risk.stop_price(fill_price),
            take_profit_price: risk.take_profit_price(fill_price),
            entry_commission: commission,
            sizing_fallback: decision.fell_back,
            status: PositionStatus::Open,
        });
        self
    }

    fn exit(mut self, tape: &Tape<'_>, i: usize, raw_price: f64, reason: ExitReason) -> Self {
        let Some(mut pos) = self.position.take() else {
            return self;
        };
        let cols = tape.cols;
        let costs = &tape.config.costs;
        self.stats.orders += 1;
        self.stats.fills += 1;
        match reason {
            ExitReason::StopLoss => self.stats.stop_exits += 1,
            ExitReason::TakeProfit => self.stats.take_profit_exits += 1,
            ExitReason::EndOfSeries => self.stats.forced_exits += 1,
            ExitReason::Signal => {}
        }

        let fill_price = costs.fill_price(raw_price, SignalType::Sell);
        let exit_commission = costs.commission(pos.quantity);
        self.cash += pos.quantity * fill_price - exit_commission;

        let trade = pos.close(i, cols.timestamps[i], fill_price, exit_commission, reason);
        self.trades.push(trade);
        self.fills.push(Signal {
            timestamp: cols.timestamps[i],
            bar_index: i,
            signal_type: SignalType::Sell,
            price: fill_price,
        });
        self
    }
}

pub fn run_event(cols: &Columns, target: &[f64], config: &EventConfig) -> EngineResult<EngineOutput> {
    let n = cols.len();
    if target.len() != n {
        return Err(EngineError::simulation(format!(
            "target has {} bars, series has {n}",
            target.len()
        )));
    }
    if n == 0 {
        return Ok(EngineOutput::default());
    }

    let atr = match config.risk.sizing_method {
        SizingMethod::AtrBased => Some(atr(
            &cols.high,
            &cols.low,
            &cols.close,
            config.risk.atr_period,
        )),
        _ => None,
    };
    let tape = Tape {
        cols,
        edges: transitions(target),
        atr,
        config,
    };

    let state = (0..n).try_fold(EventState::new(config.initial_cash, n), |state, i| {
        state.step(&tape, i)
    })?;

    if state.stats.sizing_fallbacks > 0 {
        warn!(
            fallbacks = state.stats.sizing_fallbacks,
            atr_period = config.risk.atr_period,
            "ATR undefined at entry, used fixed quantity"
        );
    }

    Ok(EngineOutput {
        equity_curve: state.equity,
        signals: state.fills,
        trades: state.trades,
        execution_stats: Some(state.stats),
    })
}
