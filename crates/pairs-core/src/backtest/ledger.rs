use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state_machine::{ExitReason, Position, PositionExit};
use crate::types::{Rate, SpreadUnits};

/// A completed round trip, net of costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position: Position,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_spread: SpreadUnits,
    pub exit_spread: SpreadUnits,
    pub entry_z: Decimal,
    pub exit_z: Option<Decimal>,
    pub holding_days: u32,
    pub exit_reason: ExitReason,
    pub raw_pnl: SpreadUnits,
    pub cost: SpreadUnits,
    /// raw_pnl - cost
    pub trade_pnl: SpreadUnits,
    /// Cumulative realized equity after this trade
    pub equity: SpreadUnits,
}

/// Round-trip cost charged on the entry spread magnitude.
///
/// cost = |entry_spread| * round_trip_rate
pub fn trade_cost(entry_spread: SpreadUnits, round_trip_rate: Rate) -> SpreadUnits {
    entry_spread.abs() * round_trip_rate
}

/// Deepest decline of the equity curve below its running peak (<= 0).
///
/// The peak starts at the first closed-trade equity point; there is no
/// implicit zero baseline. An empty curve has no drawdown.
pub fn max_drawdown(equity_curve: &[SpreadUnits]) -> SpreadUnits {
    let mut peak: Option<SpreadUnits> = None;
    let mut worst = Decimal::ZERO;
    for equity in equity_curve {
        let running_max = match peak {
            Some(p) if p >= *equity => p,
            _ => *equity,
        };
        peak = Some(running_max);
        let drawdown = *equity - running_max;
        if drawdown < worst {
            worst = drawdown;
        }
    }
    worst
}

/// Realized P&L and trade accounting for one backtest run.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    round_trip_rate: Rate,
    pnl: SpreadUnits,
    trades: usize,
    closed: Vec<ClosedTrade>,
    equity_curve: Vec<SpreadUnits>,
}

impl TradeLedger {
    pub fn new(round_trip_rate: Rate) -> Self {
        Self {
            round_trip_rate,
            ..Default::default()
        }
    }

    /// Count a new entry. Exits never change the trade count.
    pub fn record_entry(&mut self) {
        self.trades += 1;
    }

    pub fn record_exit(&mut self, exit: &PositionExit) -> &ClosedTrade {
        let entry_spread = exit.trade.entry_spread;
        let raw_pnl = exit.trade.position.raw_pnl(entry_spread, exit.exit_spread);
        let cost = trade_cost(entry_spread, self.round_trip_rate);
        let trade_pnl = raw_pnl - cost;

        self.pnl += trade_pnl;
        self.equity_curve.push(self.pnl);
        self.closed.push(ClosedTrade {
            position: exit.trade.position,
            entry_index: exit.trade.entry_index,
            exit_index: exit.exit_index,
            entry_spread,
            exit_spread: exit.exit_spread,
            entry_z: exit.trade.entry_z,
            exit_z: exit.exit_z,
            holding_days: exit.trade.holding_days,
            exit_reason: exit.reason,
            raw_pnl,
            cost,
            trade_pnl,
            equity: self.pnl,
        });
        &self.closed[self.closed.len() - 1]
    }

    pub fn pnl(&self) -> SpreadUnits {
        self.pnl
    }

    pub fn trades(&self) -> usize {
        self.trades
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn equity_curve(&self) -> &[SpreadUnits] {
        &self.equity_curve
    }

    pub fn max_drawdown(&self) -> SpreadUnits {
        max_drawdown(&self.equity_curve)
    }

    /// Fraction of closed trades with positive net P&L.
    pub fn win_rate(&self) -> Decimal {
        if self.closed.is_empty() {
            return Decimal::ZERO;
        }
        let wins = self
            .closed
            .iter()
            .filter(|t| t.trade_pnl > Decimal::ZERO)
            .count();
        Decimal::from(wins as i64) / Decimal::from(self.closed.len() as i64)
    }

    pub fn into_parts(self) -> (Vec<ClosedTrade>, Vec<SpreadUnits>) {
        (self.closed, self.equity_curve)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
