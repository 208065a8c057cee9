pub mod ledger;
pub mod state_machine;

use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{BacktestConfig, TerminalPolicy};
use crate::hedge_ratio::{estimate_hedge_ratio, HedgeRatio};
use crate::price_table::PriceTable;
use crate::spread::{build_spread_series, ZScore};
use crate::types::{with_metadata, ComputationOutput, SpreadUnits};
use crate::{PairsError, PairsResult};

pub use ledger::{max_drawdown, trade_cost, ClosedTrade, TradeLedger};
pub use state_machine::{
    ExitReason, OpenTrade, Position, PositionExit, PositionStateMachine, Transition,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position still open when the series ended (not part of pnl).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPositionSnapshot {
    pub position: Position,
    pub entry_index: usize,
    pub entry_spread: SpreadUnits,
    pub holding_days: u32,
    pub last_spread: SpreadUnits,
    /// Raw P&L at the last spread less the round-trip cost
    pub unrealized_pnl: SpreadUnits,
}

/// Result of running the state machine over a spread series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Sum of net P&L over closed trades
    pub pnl: SpreadUnits,
    /// Number of entries
    pub trades: usize,
    /// Peak-to-trough decline of closed-trade equity (<= 0)
    pub max_drawdown: SpreadUnits,
    pub win_rate: Decimal,
    /// Steps evaluated (index window..n)
    pub steps: usize,
    /// Steps skipped because the z-score was undefined
    pub undefined_steps: usize,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<SpreadUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_position: Option<OpenPositionSnapshot>,
}

/// Output of a full price-table backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub asset_a: String,
    pub asset_b: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub hedge_ratio: HedgeRatio,
    #[serde(flatten)]
    pub report: BacktestReport,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Step the position state machine from index `config.window` to the end
/// of the series and account for every closed trade.
///
/// Indices before the window are skipped. Undefined z-scores never abort the
/// run; they only suppress transitions for their step.
pub fn run_backtest(
    spread: &[SpreadUnits],
    z_scores: &[ZScore],
    config: &BacktestConfig,
) -> PairsResult<BacktestReport> {
    config.validate()?;
    if spread.len() != z_scores.len() {
        return Err(PairsError::InvalidInput {
            field: "z_scores".into(),
            reason: format!(
                "{} z-scores for {} spread values — must be equal",
                z_scores.len(),
                spread.len()
            ),
        });
    }

    let n = spread.len();
    let mut machine = PositionStateMachine::new(config);
    let mut ledger = TradeLedger::new(config.round_trip_rate());
    let mut undefined_steps = 0usize;

    for t in config.window.min(n)..n {
        if !z_scores[t].is_defined() {
            undefined_steps += 1;
        }
        match machine.step(t, z_scores[t], spread[t]) {
            Some(Transition::Entered(_)) => ledger.record_entry(),
            Some(Transition::Exited(exit)) => {
                ledger.record_exit(&exit);
            }
            None => {}
        }
    }

    let mut open_position = None;
    if n > 0 {
        let last = n - 1;
        match config.terminal_policy {
            TerminalPolicy::MarkToMarket => {
                if let Some(exit) = machine.force_close(last, spread[last], z_scores[last]) {
                    ledger.record_exit(&exit);
                }
            }
            TerminalPolicy::LeaveOpen => {
                if let Some(open) = machine.open_trade() {
                    let raw = open.position.raw_pnl(open.entry_spread, spread[last]);
                    open_position = Some(OpenPositionSnapshot {
                        position: open.position,
                        entry_index: open.entry_index,
                        entry_spread: open.entry_spread,
                        holding_days: open.holding_days,
                        last_spread: spread[last],
                        unrealized_pnl: raw - trade_cost(open.entry_spread, config.round_trip_rate()),
                    });
                }
            }
        }
    }

    let pnl = ledger.pnl();
    let trades = ledger.trades();
    let max_drawdown = ledger.max_drawdown();
    let win_rate = ledger.win_rate();
    let (closed_trades, equity_curve) = ledger.into_parts();

    info!(
        "backtest: {trades} trades, {} closed, pnl {pnl}, max drawdown {max_drawdown}",
        closed_trades.len()
    );

    Ok(BacktestReport {
        pnl,
        trades,
        max_drawdown,
        win_rate,
        steps: n.saturating_sub(config.window),
        undefined_steps,
        closed_trades,
        equity_curve,
        open_position,
    })
}

/// Estimate beta, build the hedged spread and its rolling z-scores, and
/// backtest the pair.
pub fn backtest_pair(
    table: &PriceTable,
    config: &BacktestConfig,
) -> PairsResult<ComputationOutput<BacktestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    table.validate(config.window)?;

    let a = table.prices_a();
    let b = table.prices_b();
    let hedge_ratio = estimate_hedge_ratio(&a, &b)?;
    let series = build_spread_series(&a, &b, hedge_ratio.beta, config.window)?;
    let report = run_backtest(&series.spread, &series.z_scores, config)?;

    if table.len() == config.window {
        warnings.push(format!(
            "Only {} observations: no step after the {}-day warm-up was evaluated",
            table.len(),
            config.window
        ));
    }
    if report.undefined_steps > 0 {
        warnings.push(format!(
            "{} steps had an undefined z-score (zero-variance window) and were held",
            report.undefined_steps
        ));
    }
    if let Some(open) = &report.open_position {
        warn!(
            "{}/{}: {:?} still open after {} days; excluded from pnl",
            table.asset_a, table.asset_b, open.position, open.holding_days
        );
        warnings.push(format!(
            "{:?} position opened at index {} is still open and excluded from pnl \
             (unrealized {})",
            open.position,
            open.entry_index,
            open.unrealized_pnl.round_dp(4)
        ));
    }
    if report.trades == 0 {
        warnings.push("No z-score crossed the entry threshold; no trades".into());
    }

    let output = BacktestOutput {
        asset_a: table.asset_a.clone(),
        asset_b: table.asset_b.clone(),
        start_date: table.first_date(),
        end_date: table.last_date(),
        hedge_ratio,
        report,
    };

    Ok(with_metadata(
        "Rolling z-score mean-reversion backtest on OLS-hedged spread",
        config,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
