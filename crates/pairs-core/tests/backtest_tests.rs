use chrono::{Duration, NaiveDate};
use pairs_core::backtest::{self, ExitReason, Position};
use pairs_core::config::{BacktestConfig, TerminalPolicy};
use pairs_core::price_table::PriceTable;
use pairs_core::spread::ZScore;
use pairs_core::PairsError;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

fn table(a: Vec<Decimal>, b: Vec<Decimal>) -> PriceTable {
    PriceTable::from_columns("AAA", "BBB", &dates(a.len()), &a, &b).unwrap()
}

/// B is a random walk in cents, A = 1.5 * B + bounded noise.
fn cointegrated_pair(seed: u64, n: usize) -> PriceTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = Vec::with_capacity(n);
    let mut level = dec!(300);
    for _ in 0..n {
        level += Decimal::from(rng.gen_range(-100..=100)) / dec!(100);
        b.push(level);
    }
    let a = b
        .iter()
        .map(|p| *p * dec!(1.5) + Decimal::from(rng.gen_range(-300..=300)) / dec!(100))
        .collect();
    table(a, b)
}

/// 30 warm-up steps followed by the given (z, spread) pairs.
fn scripted(steps: &[(Decimal, Decimal)]) -> (Vec<Decimal>, Vec<ZScore>) {
    let mut spread = vec![Decimal::ZERO; 30];
    let mut z = vec![ZScore::Warmup; 30];
    for (zv, s) in steps {
        spread.push(*s);
        z.push(ZScore::Defined(*zv));
    }
    (spread, z)
}

// ===========================================================================
// Scripted scenarios
// ===========================================================================

#[test]
fn test_three_mean_reversion_cycles() {
    let mut steps = Vec::new();
    for _ in 0..3 {
        steps.extend(std::iter::repeat((dec!(2.5), dec!(10))).take(5));
        steps.extend(std::iter::repeat((dec!(0.3), dec!(8))).take(5));
    }
    let (spread, z) = scripted(&steps);
    let report = backtest::run_backtest(&spread, &z, &BacktestConfig::default()).unwrap();

    assert_eq!(report.trades, 3);
    assert_eq!(report.closed_trades.len(), 3);
    for trade in &report.closed_trades {
        assert_eq!(trade.position, Position::ShortSpread);
        assert_eq!(trade.exit_reason, ExitReason::MeanReversion);
        assert_eq!(trade.holding_days, 5);
        // short: 10 - 8 = 2, cost 10 * 0.0014
        assert_eq!(trade.trade_pnl, dec!(1.986));
    }
    assert_eq!(report.closed_trades[0].entry_index, 30);
    assert_eq!(report.closed_trades[0].exit_index, 35);
    assert_eq!(report.closed_trades[1].entry_index, 40);
    assert_eq!(report.pnl, dec!(5.958));
    assert_eq!(report.equity_curve, vec![dec!(1.986), dec!(3.972), dec!(5.958)]);
    assert_eq!(report.max_drawdown, Decimal::ZERO);
    assert_eq!(report.win_rate, Decimal::ONE);
    assert!(report.open_position.is_none());
}

#[test]
fn test_time_stop_after_twenty_steps() {
    let mut steps = vec![(dec!(-2.5), dec!(5))];
    steps.extend(std::iter::repeat((dec!(-1), dec!(4))).take(25));
    let (spread, z) = scripted(&steps);
    let report = backtest::run_backtest(&spread, &z, &BacktestConfig::default()).unwrap();

    assert_eq!(report.trades, 1);
    let trade = &report.closed_trades[0];
    assert_eq!(trade.position, Position::LongSpread);
    assert_eq!(trade.exit_reason, ExitReason::TimeStop);
    assert_eq!(trade.holding_days, 20);
    assert_eq!(trade.exit_index, 50);
    // long: 4 - 5 = -1, cost 5 * 0.0014
    assert_eq!(report.pnl, dec!(-1.007));
    // a single equity point is its own peak
    assert_eq!(report.max_drawdown, Decimal::ZERO);
    assert_eq!(report.win_rate, Decimal::ZERO);
}

#[test]
fn test_entry_threshold_boundary() {
    let (spread, z) = scripted(&[(dec!(-2.0), dec!(1))]);
    let report = backtest::run_backtest(&spread, &z, &BacktestConfig::default()).unwrap();
    assert_eq!(report.trades, 0);

    let (spread, z) = scripted(&[(dec!(-2.0000001), dec!(1))]);
    let report = backtest::run_backtest(&spread, &z, &BacktestConfig::default()).unwrap();
    assert_eq!(report.trades, 1);
}

#[test]
fn test_losing_then_winning_drawdown() {
    let steps = vec![
        (dec!(3), dec!(10)),
        (dec!(0.1), dec!(13)), // short loses 3
        (dec!(-3), dec!(-10)),
        (dec!(0.1), dec!(-4)), // long wins 6
    ];
    let cfg = BacktestConfig {
        transaction_cost: Decimal::ZERO,
        slippage: Decimal::ZERO,
        ..Default::default()
    };
    let (spread, z) = scripted(&steps);
    let report = backtest::run_backtest(&spread, &z, &cfg).unwrap();
    assert_eq!(report.equity_curve, vec![dec!(-3), dec!(3)]);
    assert_eq!(report.pnl, dec!(3));
    assert_eq!(report.max_drawdown, Decimal::ZERO);
    assert_eq!(report.win_rate, dec!(0.5));
}

// ===========================================================================
// Price-table backtests
// ===========================================================================

#[test]
fn test_constant_spread_never_trades() {
    // beta is exactly 2, so a - 2b = 7 at every index
    let b: Vec<Decimal> = (0..60).map(|i| dec!(100) + Decimal::from(i % 5)).collect();
    let a: Vec<Decimal> = b.iter().map(|p| *p * dec!(2) + dec!(7)).collect();
    let out = backtest::backtest_pair(&table(a, b), &BacktestConfig::default()).unwrap();

    assert_eq!(out.result.hedge_ratio.beta, dec!(2));
    assert_eq!(out.result.report.trades, 0);
    assert_eq!(out.result.report.pnl, Decimal::ZERO);
    assert_eq!(out.result.report.max_drawdown, Decimal::ZERO);
    assert_eq!(out.result.report.undefined_steps, 30);
    assert!(out.warnings.iter().any(|w| w.contains("undefined z-score")));
}

#[test]
fn test_table_shorter_than_window_rejected() {
    let b: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
    let a = b.clone();
    let err = backtest::backtest_pair(&table(a, b), &BacktestConfig::default()).unwrap_err();
    assert!(matches!(err, PairsError::InsufficientData(_)));
}

#[test]
fn test_backtest_is_deterministic() {
    let prices = cointegrated_pair(7, 250);
    let first = backtest::backtest_pair(&prices, &BacktestConfig::default()).unwrap();
    let second = backtest::backtest_pair(&prices, &BacktestConfig::default()).unwrap();
    assert_eq!(
        serde_json::to_value(&first.result).unwrap(),
        serde_json::to_value(&second.result).unwrap()
    );
}

#[test]
fn test_trades_match_entries() {
    let prices = cointegrated_pair(21, 250);
    let out = backtest::backtest_pair(&prices, &BacktestConfig::default()).unwrap();
    let report = &out.result.report;
    assert!(report.trades > 0);
    let open = usize::from(report.open_position.is_some());
    assert_eq!(report.trades, report.closed_trades.len() + open);
    for pair in report.closed_trades.windows(2) {
        assert!(pair[1].entry_index > pair[0].exit_index);
    }
}

#[test]
fn test_costs_only_reduce_pnl() {
    let prices = cointegrated_pair(3, 250);
    let cheap = BacktestConfig {
        transaction_cost: Decimal::ZERO,
        slippage: Decimal::ZERO,
        ..Default::default()
    };
    let dear = BacktestConfig {
        transaction_cost: dec!(0.002),
        slippage: dec!(0.001),
        ..Default::default()
    };
    let cheap = backtest::backtest_pair(&prices, &cheap).unwrap().result.report;
    let default = backtest::backtest_pair(&prices, &BacktestConfig::default())
        .unwrap()
        .result
        .report;
    let dear = backtest::backtest_pair(&prices, &dear).unwrap().result.report;

    assert_eq!(cheap.trades, default.trades);
    assert_eq!(default.trades, dear.trades);
    assert!(default.pnl <= cheap.pnl);
    assert!(dear.pnl <= default.pnl);
}

#[test]
fn test_drawdown_never_positive() {
    for seed in [1, 2, 3, 4, 5] {
        let prices = cointegrated_pair(seed, 200);
        let report = backtest::backtest_pair(&prices, &BacktestConfig::default())
            .unwrap()
            .result
            .report;
        assert!(report.max_drawdown <= Decimal::ZERO, "seed {seed}");
        if report.closed_trades.is_empty() {
            assert_eq!(report.max_drawdown, Decimal::ZERO);
        }
    }
}

#[test]
fn test_mark_to_market_closes_everything() {
    let prices = cointegrated_pair(9, 250);
    let cfg = BacktestConfig {
        terminal_policy: TerminalPolicy::MarkToMarket,
        ..Default::default()
    };
    let report = backtest::backtest_pair(&prices, &cfg).unwrap().result.report;
    assert!(report.open_position.is_none());
    assert_eq!(report.trades, report.closed_trades.len());
}
