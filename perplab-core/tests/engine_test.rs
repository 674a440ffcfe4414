//! End-to-end tests for the simulation loop.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use perplab_core::cost::CostConfig;
use perplab_core::domain::{
    Bar, BarSequence, Direction, ExitType, OpenPosition, SymbolMeta, TradeProposal, VolClass,
};
use perplab_core::exit::{ExitPolicy, ExitStateMachine};
use perplab_core::risk::{size, RiskConfig, SizingReason};
use perplab_core::{
    run_simulation, ConfigurationError, InputError, SimulationConfig, SimulationError,
};

fn t(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn bar(symbol: &str, hour: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        timestamp: t(hour),
        open,
        high,
        low,
        close,
        volume: 1_000.0,
    }
}

/// Hourly uptrend: close = 100 + i.
fn trending_bars(symbol: &str, n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let c = 100.0 + i as f64;
            bar(symbol, i as i64, c - 0.5, c + 0.3, c - 0.7, c)
        })
        .collect()
}

fn flat_bars(symbol: &str, n: usize, price: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| bar(symbol, i as i64, price, price + 0.5, price - 0.5, price))
        .collect()
}

fn meta(symbol: &str) -> SymbolMeta {
    SymbolMeta {
        symbol: symbol.into(),
        tick_size: 0.01,
        step_size: 0.001,
        min_notional: 5.0,
        max_leverage: 20,
        margin_tiers: Vec::new(),
    }
}

fn metas(symbols: &[&str]) -> HashMap<String, SymbolMeta> {
    symbols.iter().map(|s| (s.to_string(), meta(s))).collect()
}

fn proposal(symbol: &str, hour: i64, direction: Direction, entry: f64, stop: f64) -> TradeProposal {
    TradeProposal {
        symbol: symbol.into(),
        timestamp: t(hour),
        direction,
        entry,
        stop,
        atr: 1.3,
        strength: 1.0,
        take_profit: None,
        vol_class: VolClass::Unclassified,
    }
}

fn no_time_stop() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.exits.time_stop_enabled = false;
    config
}

fn run(
    bars: Vec<Bar>,
    proposals: &[TradeProposal],
    symbols: &[&str],
    config: &SimulationConfig,
) -> Result<perplab_core::SimulationOutcome, SimulationError> {
    let bars = BarSequence::from_bars(bars)?;
    run_simulation(&bars, proposals, &metas(symbols), config, None, None)
}

#[test]
fn no_proposals_leave_equity_untouched() {
    let outcome = run(
        trending_bars("BTCUSDT", 50),
        &[],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.final_equity, outcome.initial_equity);
    assert!(outcome.trades.is_empty());
    assert_eq!(outcome.equity_curve.len(), 50);
    assert_eq!(outcome.bars_processed, 50);
    assert!(outcome
        .equity_curve
        .iter()
        .all(|s| s.equity == 10_000.0 && s.open_positions == 0));
    assert_eq!(outcome.total_fees, 0.0);
    assert_eq!(outcome.total_funding, 0.0);
}

#[test]
fn sized_position_exited_at_entry_has_zero_pnl() {
    let m = meta("BTCUSDT");
    let sizing = size(
        10_000.0,
        100.0,
        95.0,
        Direction::Long,
        2.0,
        VolClass::Core,
        &m,
        &RiskConfig::default(),
    );
    assert!(sizing.is_valid);

    let mut position = OpenPosition::new(
        "BTCUSDT",
        Direction::Long,
        t(0),
        100.0,
        sizing.quantity,
        95.0,
        110.0,
        2.0,
    );
    let mut exits = ExitStateMachine::new(&mut position, ExitPolicy::default(), m.step_size);
    let signal = exits.manual_exit(&position, 100.0, "manual");
    assert_eq!(signal.exit_type, ExitType::Manual);
    assert!(signal.pnl.abs() < 1e-9);
    assert!((signal.quantity - sizing.quantity).abs() < 1e-12);
}

#[test]
fn frictionless_flat_market_round_trip() {
    let mut config = no_time_stop();
    config.costs = CostConfig::frictionless();
    let mut p = proposal("BTCUSDT", 0, Direction::Long, 100.0, 95.0);
    p.atr = 2.0;
    p.take_profit = Some(110.0);

    let outcome = run(flat_bars("BTCUSDT", 30, 100.0), &[p], &["BTCUSDT"], &config).unwrap();

    assert_eq!(outcome.trades.len(), 1);
    let trade = &outcome.trades[0];
    assert_eq!(trade.exit_type, ExitType::Manual);
    assert_eq!(trade.exit_reason, "simulation end");
    assert!(trade.pnl.abs() < 1e-9);
    assert_eq!(trade.fees, 0.0);
    assert_eq!(trade.funding, 0.0);
    assert!((outcome.final_equity - 10_000.0).abs() < 1e-9);
}

#[test]
fn uptrend_long_takes_partial_and_runs_to_end() {
    let mut p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);
    p.take_profit = Some(250.0);

    // The partial target (176) is 74 hourly bars out; the default 48h time
    // stop would close the trade first.
    let outcome = run(trending_bars("BTCUSDT", 100), &[p], &["BTCUSDT"], &no_time_stop()).unwrap();

    assert_eq!(outcome.trades.len(), 1);
    assert!(outcome.rejections.is_empty());
    assert!(outcome.exit_faults.is_empty());
    let trade = &outcome.trades[0];
    assert!(trade.had_partial);
    assert!(matches!(
        trade.exit_type,
        ExitType::Manual | ExitType::TakeProfit
    ));
    assert!(trade.net_pnl > 0.0);
    assert!(trade.fees > 0.0);
    assert!(trade.funding > 0.0);
    // Long entries pay slippage.
    assert!(trade.entry_price > 102.0);

    let reconciled: f64 = outcome.initial_equity
        + outcome
            .trades
            .iter()
            .map(|t| t.pnl - t.fees - t.funding)
            .sum::<f64>();
    assert!((outcome.final_equity - reconciled).abs() < 1e-6);
    assert!((outcome.total_fees - trade.fees).abs() < 1e-9);
    assert_eq!(outcome.equity_curve.len(), 100);
    // Snapshots are taken before the bar's updates.
    assert_eq!(outcome.equity_curve[2].open_positions, 0);
    assert_eq!(outcome.equity_curve[3].open_positions, 1);
}

#[test]
fn uptrend_long_hits_default_time_stop() {
    let mut p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);
    p.take_profit = Some(250.0);

    let outcome = run(
        trending_bars("BTCUSDT", 100),
        &[p],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.trades.len(), 1);
    let trade = &outcome.trades[0];
    assert_eq!(trade.exit_type, ExitType::Time);
    assert_eq!(trade.exit_time, t(50));
    assert!(!trade.had_partial);
    assert!(trade.net_pnl > 0.0);
}

#[test]
fn short_stop_loss_costs_about_one_risk_unit() {
    let mut bars = flat_bars("ETHUSDT", 5, 100.0);
    bars.push(bar("ETHUSDT", 5, 100.0, 110.0, 99.5, 108.0));
    bars.extend((6..10).map(|h| bar("ETHUSDT", h, 108.0, 108.5, 107.5, 108.0)));
    let mut p = proposal("ETHUSDT", 1, Direction::Short, 100.0, 104.0);
    p.atr = 2.0;
    p.take_profit = Some(90.0);

    let outcome = run(bars, &[p], &["ETHUSDT"], &SimulationConfig::default()).unwrap();

    assert_eq!(outcome.trades.len(), 1);
    let trade = &outcome.trades[0];
    assert_eq!(trade.exit_type, ExitType::StopLoss);
    assert_eq!(trade.exit_time, t(5));
    assert!(!trade.had_partial);
    // Stop filled at the level, then slipped upward.
    assert!(trade.exit_price > 104.0);
    assert!(trade.net_pnl < -100.0 && trade.net_pnl > -110.0);

    // Funding covers the full four hours held, including the exit bar.
    let expected_funding = trade.entry_price * trade.quantity * 0.0001 * 4.0 / 8.0;
    assert!((trade.funding - expected_funding).abs() < 1e-9);
}

#[test]
fn same_seed_same_outcome() {
    let mut p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);
    p.take_profit = Some(250.0);
    let config = no_time_stop();

    let a = run(trending_bars("BTCUSDT", 80), &[p.clone()], &["BTCUSDT"], &config).unwrap();
    let b = run(trending_bars("BTCUSDT", 80), &[p.clone()], &["BTCUSDT"], &config).unwrap();
    assert_eq!(a, b);

    let reseeded = SimulationConfig { seed: 7, ..config };
    let c = run(trending_bars("BTCUSDT", 80), &[p], &["BTCUSDT"], &reseeded).unwrap();
    assert_ne!(a.final_equity, c.final_equity);
}

#[test]
fn cancellation_returns_partial_outcome() {
    let bars = BarSequence::from_bars(trending_bars("BTCUSDT", 100)).unwrap();
    let p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);
    let cancel = AtomicBool::new(false);
    let seen = Cell::new(0usize);
    let progress = |_: &perplab_core::domain::EquitySnapshot| {
        seen.set(seen.get() + 1);
        if seen.get() == 10 {
            cancel.store(true, Ordering::Relaxed);
        }
    };

    let outcome = run_simulation(
        &bars,
        &[p],
        &metas(&["BTCUSDT"]),
        &no_time_stop(),
        Some(&progress),
        Some(&cancel),
    )
    .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.bars_processed, 10);
    assert_eq!(outcome.equity_curve.len(), 10);
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].exit_reason, "simulation cancelled");
    assert_eq!(outcome.trades[0].exit_time, t(9));
}

#[test]
fn missing_symbol_meta_fails_before_first_bar() {
    let p = proposal("ETHUSDT", 2, Direction::Long, 102.0, 99.4);
    let err = run(
        trending_bars("ETHUSDT", 10),
        &[p],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        SimulationError::Configuration(ConfigurationError::MissingSymbolMeta("ETHUSDT".into()))
    );
}

#[test]
fn duplicate_and_unmatched_proposals_are_input_errors() {
    let p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);
    let err = run(
        trending_bars("BTCUSDT", 10),
        &[p.clone(), p],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Input(InputError::DuplicateProposal { .. })
    ));

    let late = proposal("BTCUSDT", 50, Direction::Long, 102.0, 99.4);
    let err = run(
        trending_bars("BTCUSDT", 10),
        &[late],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Input(InputError::UnmatchedProposal { .. })
    ));
}

#[test]
fn stop_on_wrong_side_is_malformed() {
    let p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 104.0);
    let err = run(
        trending_bars("BTCUSDT", 10),
        &[p],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Input(InputError::MalformedProposal { .. })
    ));
}

#[test]
fn invalid_meta_and_config_are_configuration_errors() {
    let bars = BarSequence::from_bars(trending_bars("BTCUSDT", 10)).unwrap();
    let mut bad_meta = metas(&["BTCUSDT"]);
    if let Some(m) = bad_meta.get_mut("BTCUSDT") {
        m.step_size = 0.0;
    }
    let err = run_simulation(&bars, &[], &bad_meta, &SimulationConfig::default(), None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Configuration(ConfigurationError::InvalidSymbolMeta { .. })
    ));

    let mut config = SimulationConfig::default();
    config.risk.risk_per_trade = 0.0;
    let err = run_simulation(&bars, &[], &metas(&["BTCUSDT"]), &config, None, None).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Configuration(ConfigurationError::InvalidParameter {
            field: "risk_per_trade",
            ..
        })
    ));
}

#[test]
fn missing_price_skips_one_exit_check() {
    let mut bars = trending_bars("BTCUSDT", 10);
    bars[5].close = f64::NAN;
    let mut p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);
    p.take_profit = Some(250.0);

    let outcome = run(bars, &[p], &["BTCUSDT"], &no_time_stop()).unwrap();

    assert_eq!(outcome.bars_processed, 10);
    assert_eq!(outcome.exit_faults.len(), 1);
    assert_eq!(outcome.exit_faults[0].symbol, "BTCUSDT");
    assert_eq!(outcome.exit_faults[0].timestamp, t(5));
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].exit_reason, "simulation end");
    assert_eq!(outcome.trades[0].exit_time, t(9));
    assert!(outcome.trades[0].exit_price.is_finite());
}

#[test]
fn insane_bar_rejects_entry() {
    let mut bars = trending_bars("BTCUSDT", 10);
    bars[2].high = bars[2].low - 1.0;
    let p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);

    let outcome = run(bars, &[p], &["BTCUSDT"], &no_time_stop()).unwrap();

    assert!(outcome.trades.is_empty());
    assert!(outcome.exit_faults.is_empty());
    assert_eq!(outcome.rejections.len(), 1);
    assert_eq!(
        outcome.rejections[0].reasons,
        vec![SizingReason::InvalidMarketPrice]
    );
    assert_eq!(outcome.final_equity, outcome.initial_equity);
}

#[test]
fn close_through_stop_rejects_entry() {
    let mut bars = trending_bars("BTCUSDT", 10);
    bars[2] = bar("BTCUSDT", 2, 101.5, 102.3, 98.5, 99.0);
    let p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4);

    let outcome = run(bars, &[p], &["BTCUSDT"], &no_time_stop()).unwrap();

    assert!(outcome.trades.is_empty());
    assert_eq!(outcome.rejections.len(), 1);
    assert_eq!(
        outcome.rejections[0].reasons,
        vec![SizingReason::StopBreachedAtEntry]
    );
    assert_eq!(outcome.final_equity, outcome.initial_equity);
}

#[test]
fn zero_stop_distance_is_recorded_as_rejection() {
    let p = proposal("BTCUSDT", 2, Direction::Long, 102.0, 102.0);
    let outcome = run(
        trending_bars("BTCUSDT", 10),
        &[p],
        &["BTCUSDT"],
        &SimulationConfig::default(),
    )
    .unwrap();

    assert!(outcome.trades.is_empty());
    assert_eq!(outcome.rejections.len(), 1);
    assert_eq!(
        outcome.rejections[0].reasons,
        vec![SizingReason::InvalidStopDistance]
    );
    assert_eq!(outcome.rejections[0].timestamp, t(2));
    assert_eq!(outcome.final_equity, outcome.initial_equity);
}

#[test]
fn concurrency_cap_rejects_second_symbol() {
    let mut config = no_time_stop();
    config.risk.max_concurrent_positions = 1;
    let mut bars = trending_bars("BTCUSDT", 20);
    bars.extend(trending_bars("ETHUSDT", 20));
    let proposals = [
        proposal("BTCUSDT", 2, Direction::Long, 102.0, 99.4),
        proposal("ETHUSDT", 2, Direction::Long, 102.0, 99.4),
    ];

    let outcome = run(bars, &proposals, &["BTCUSDT", "ETHUSDT"], &config).unwrap();

    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].symbol, "BTCUSDT");
    assert_eq!(outcome.rejections.len(), 1);
    assert_eq!(outcome.rejections[0].symbol, "ETHUSDT");
    assert_eq!(
        outcome.rejections[0].reasons,
        vec![SizingReason::MaxConcurrentPositions]
    );
}

#[test]
fn time_stop_closes_stale_position() {
    let mut config = SimulationConfig::default();
    config.exits.max_holding_hours = 6.0;
    config.exits.trailing_enabled = false;
    let mut p = proposal("BTCUSDT", 1, Direction::Long, 100.0, 95.0);
    p.atr = 2.0;
    p.take_profit = Some(110.0);

    let outcome = run(
        flat_bars("BTCUSDT", 20, 100.0),
        &[p],
        &["BTCUSDT"],
        &config,
    )
    .unwrap();

    assert_eq!(outcome.trades.len(), 1);
    let trade = &outcome.trades[0];
    assert_eq!(trade.exit_type, ExitType::Time);
    assert_eq!(trade.exit_time, t(7));
}
