//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Drawdown is never positive, is zero exactly on non-decreasing equity,
//!    and Sharpe is always finite
//! 2. Vector equity never depends on future bars
//! 3. Running twice gives identical results
//! 4. Sizing never exceeds the exposure cap, including after slippage
//! 5. The event engine never spends cash it does not have

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use hermes_core::columns::Columns;
use hermes_core::domain::{Candle, Series};
use hermes_core::engine::{run_event, run_vector, CostModel, EngineMode, EventConfig};
use hermes_core::metrics::{max_drawdown, sharpe_ratio, MINUTE_BARS_PER_YEAR};
use hermes_core::resample::Timeframe;
use hermes_core::risk::{size, RiskConfig, SizingMethod};
use hermes_core::strategy::{latch, StrategyConfig, StrategyRegistry};
use hermes_core::{run_backtest, BacktestConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of closes from 100 with per-bar moves under 3%.
fn arb_closes(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.03..0.03_f64, len).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|r| {
                price *= 1.0 + r;
                price
            })
            .collect()
    })
}

fn arb_target(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop::option::weighted(0.2, any::<bool>()), len).prop_map(|raw| {
        let triggers: Vec<_> = raw
            .into_iter()
            .map(|t| {
                t.map(|buy| {
                    if buy {
                        hermes_core::domain::SignalType::Buy
                    } else {
                        hermes_core::domain::SignalType::Sell
                    }
                })
            })
            .collect();
        latch(&triggers)
    })
}

fn candles(closes: &[f64]) -> Vec<Candle> {
    let base = DateTime::<Utc>::from_timestamp(1_704_186_900, 0).unwrap();
    let mut prev = closes.first().copied().unwrap_or(100.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = prev;
            prev = c;
            Candle::new(
                base + Duration::minutes(i as i64),
                open,
                open.max(c) * 1.002,
                open.min(c) * 0.998,
                c,
                1_000.0,
            )
        })
        .collect()
}

/// Equity paths from 1_000: either monotone (flat steps included) or free.
fn arb_equity() -> impl Strategy<Value = Vec<f64>> {
    let rising = prop::collection::vec(prop_oneof![Just(0.0), 0.0..0.05_f64], 0..120);
    let free = prop::collection::vec(-0.05..0.05_f64, 0..120);
    prop_oneof![rising, free].prop_map(|steps| {
        let mut v = 1_000.0;
        std::iter::once(v)
            .chain(steps.into_iter().map(|r| {
                v *= 1.0 + r;
                v
            }))
            .collect()
    })
}

fn arb_walk_and_target() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    arb_closes(20..200).prop_flat_map(|closes| {
        let n = closes.len();
        (Just(closes), arb_target(n))
    })
}

// ── 1. Metric bounds ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_non_positive_and_sharpe_finite(closes in arb_closes(0..300)) {
        let dd = max_drawdown(&closes);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd >= -1.0);
        prop_assert!(sharpe_ratio(&closes, MINUTE_BARS_PER_YEAR).is_finite());
    }

    #[test]
    fn drawdown_is_zero_iff_equity_never_falls(equity in arb_equity()) {
        let never_falls = equity.windows(2).all(|w| w[1] >= w[0]);
        prop_assert_eq!(max_drawdown(&equity) == 0.0, never_falls);
    }

    #[test]
    fn vector_equity_stays_positive((closes, target) in arb_walk_and_target()) {
        let cols = Columns::from_candles(&candles(&closes));
        let out = run_vector(&cols, &target, 10_000.0).unwrap();
        prop_assert_eq!(out.equity_curve.len(), closes.len());
        prop_assert!(out.equity_curve.iter().all(|p| p.value > 0.0 && p.value.is_finite()));
    }
}

// ── 2. No look-ahead ─────────────────────────────────────────────────

proptest! {
    /// Changing every bar after `cut` leaves equity up to `cut` untouched.
    #[test]
    fn vector_equity_ignores_the_future(
        (closes, target) in arb_walk_and_target(),
        cut_frac in 0.1..0.9_f64,
        shock in 0.5..2.0_f64,
    ) {
        let n = closes.len();
        let cut = ((n as f64) * cut_frac) as usize;
        let mut future = closes.clone();
        for c in future[cut + 1..].iter_mut() {
            *c *= shock;
        }
        let a = run_vector(&Columns::from_candles(&candles(&closes)), &target, 1_000.0).unwrap();
        let b = run_vector(&Columns::from_candles(&candles(&future)), &target, 1_000.0).unwrap();
        for i in 0..=cut {
            prop_assert_eq!(a.equity_curve[i].value, b.equity_curve[i].value);
        }
    }

    #[test]
    fn strategy_target_ignores_the_future(
        closes in arb_closes(60..200),
        cut_frac in 0.3..0.9_f64,
    ) {
        let prepared = StrategyRegistry::builtin()
            .prepare(
                &StrategyConfig::new("sma_crossover")
                    .with_param("fast_period", 3_i64)
                    .with_param("slow_period", 12_i64),
                Timeframe::M1,
            )
            .unwrap();
        let all = candles(&closes);
        let cut = ((closes.len() as f64) * cut_frac) as usize;
        let full = prepared.evaluate(&Columns::from_candles(&all)).unwrap();
        let part = prepared.evaluate(&Columns::from_candles(&all[..cut])).unwrap();
        prop_assert_eq!(&part.target[..], &full.target[..cut]);
    }
}

// ── 3. Idempotence ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn backtest_is_idempotent(closes in arb_closes(40..150), event in any::<bool>()) {
        let series = Series::new("PROP", candles(&closes));
        let prepared = StrategyRegistry::builtin()
            .prepare(&StrategyConfig::new("rsi").with_param("period", 5_i64), Timeframe::M1)
            .unwrap();
        let config = BacktestConfig {
            mode: if event { EngineMode::Event } else { EngineMode::Vector },
            slippage: 0.0005,
            ..BacktestConfig::default()
        };
        let a = run_backtest(&series, &prepared, &config).unwrap();
        let b = run_backtest(&series, &prepared, &config).unwrap();
        prop_assert_eq!(&a.equity_curve, &b.equity_curve);
        prop_assert_eq!(&a.signals, &b.signals);
        prop_assert_eq!(&a.trades, &b.trades);
        prop_assert_eq!(&a.metrics, &b.metrics);
        prop_assert_eq!(a.execution_stats, b.execution_stats);
    }
}

// ── 4. Sizing cap ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sizing_never_exceeds_exposure_cap(
        equity in 1.0..1_000_000.0_f64,
        price in 0.5..5_000.0_f64,
        atr in prop::option::of(0.01..50.0_f64),
        method in prop_oneof![
            Just(SizingMethod::Fixed),
            Just(SizingMethod::PctEquity),
            Just(SizingMethod::AtrBased),
        ],
        fixed in 1.0..10_000.0_f64,
        max_pct in 0.01..1.0_f64,
    ) {
        let risk = RiskConfig {
            sizing_method: method,
            fixed_quantity: fixed,
            max_position_pct: max_pct,
            ..RiskConfig::default()
        };
        let d = size(equity, price, atr, &risk);
        prop_assert!(d.quantity >= 0.0);
        prop_assert_eq!(d.quantity, d.quantity.floor());
        prop_assert!(d.quantity * price <= equity * max_pct * (1.0 + 1e-12));
    }

    /// Entry notional at the slipped fill price stays within the cap of the
    /// cash held before the entry.
    #[test]
    fn event_entries_respect_cap_after_slippage(
        (closes, target) in arb_walk_and_target(),
        slippage in 0.0..0.02_f64,
        max_pct in 0.05..0.5_f64,
    ) {
        let initial_cash = 100_000.0;
        let cols = Columns::from_candles(&candles(&closes));
        let config = EventConfig {
            initial_cash,
            costs: CostModel::new(slippage, 0.0),
            risk: RiskConfig {
                sizing_method: SizingMethod::PctEquity,
                pct_equity: 1.0,
                max_position_pct: max_pct,
                ..RiskConfig::default()
            },
        };
        let out = run_event(&cols, &target, &config).unwrap();
        let mut cash = initial_cash;
        for t in &out.trades {
            prop_assert!(t.quantity * t.entry_price <= cash * max_pct * (1.0 + 1e-9));
            cash += t.net_pnl;
        }
    }
}

// ── 5. Cash never negative ───────────────────────────────────────────

proptest! {
    #[test]
    fn event_engine_respects_cash(
        (closes, target) in arb_walk_and_target(),
        slippage in 0.0..0.01_f64,
        commission in 0.0..2.0_f64,
        fixed in 1.0..500.0_f64,
    ) {
        let cols = Columns::from_candles(&candles(&closes));
        let config = EventConfig {
            initial_cash: 5_000.0,
            costs: CostModel::new(slippage, commission),
            risk: RiskConfig {
                fixed_quantity: fixed,
                max_position_pct: 1.0,
                ..RiskConfig::default()
            },
        };
        let out = run_event(&cols, &target, &config).unwrap();
        prop_assert!(out.equity_curve.iter().all(|p| p.value > 0.0));
        for t in &out.trades {
            prop_assert!(t.quantity >= 1.0);
            prop_assert!(t.exit_bar > t.entry_bar);
        }
        let stats = out.execution_stats.unwrap();
        prop_assert_eq!(stats.fills, 2 * out.trades.len());
    }
}
