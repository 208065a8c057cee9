use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::spread::ZScore;
use crate::types::SpreadUnits;

/// Exposure to the spread. At most one position is open at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Flat,
    /// Long A, short beta units of B: profits when the spread rises
    LongSpread,
    /// Short A, long beta units of B: profits when the spread falls
    ShortSpread,
}

impl Position {
    /// Raw P&L of moving from `entry` to `exit` while holding this position.
    pub fn raw_pnl(&self, entry: SpreadUnits, exit: SpreadUnits) -> SpreadUnits {
        match self {
            Position::LongSpread => exit - entry,
            Position::ShortSpread => entry - exit,
            Position::Flat => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Held for the maximum number of steps
    TimeStop,
    /// |z| fell below the exit threshold
    MeanReversion,
    /// Forced close on the last observation
    EndOfSeries,
}

/// Bookkeeping of the currently open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub position: Position,
    pub entry_index: usize,
    pub entry_spread: SpreadUnits,
    pub entry_z: Decimal,
    pub holding_days: u32,
}

/// A position taken off, before costs are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionExit {
    pub trade: OpenTrade,
    pub exit_index: usize,
    pub exit_spread: SpreadUnits,
    pub exit_z: Option<Decimal>,
    pub reason: ExitReason,
}

/// Result of one step of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entered(OpenTrade),
    Exited(PositionExit),
}

/// FLAT / LONG_SPREAD / SHORT_SPREAD driven by one z-score per step.
///
/// Rules, first match wins:
/// 1. while open, `holding_days += 1`
/// 2. flat and z < -entry_z: enter long spread
/// 3. flat and z > entry_z: enter short spread
/// 4. open and holding_days >= max_holding_days: time-stop
/// 5. open and |z| < exit_z: mean-reversion exit
///
/// Rule 1 applies on every step; rules 2-5 are skipped when the z-score is
/// undefined.
#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    entry_z: Decimal,
    exit_z: Decimal,
    max_holding_days: u32,
    open: Option<OpenTrade>,
}

impl PositionStateMachine {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            entry_z: config.entry_z,
            exit_z: config.exit_z,
            max_holding_days: config.max_holding_days,
            open: None,
        }
    }

    pub fn position(&self) -> Position {
        self.open.map(|t| t.position).unwrap_or_default()
    }

    pub fn open_trade(&self) -> Option<&OpenTrade> {
        self.open.as_ref()
    }

    pub fn step(&mut self, index: usize, z: ZScore, spread: SpreadUnits) -> Option<Transition> {
        if let Some(open) = self.open.as_mut() {
            open.holding_days += 1;
        }

        let Some(z) = z.value() else {
            debug!("step {index}: z-score undefined ({z:?}), no transition");
            return None;
        };

        match self.open {
            None => {
                let position = if z < -self.entry_z {
                    Position::LongSpread
                } else if z > self.entry_z {
                    Position::ShortSpread
                } else {
                    return None;
                };
                let trade = OpenTrade {
                    position,
                    entry_index: index,
                    entry_spread: spread,
                    entry_z: z,
                    holding_days: 0,
                };
                debug!("step {index}: enter {position:?} at spread {spread} (z {z})");
                self.open = Some(trade);
                Some(Transition::Entered(trade))
            }
            Some(trade) => {
                let reason = if trade.holding_days >= self.max_holding_days {
                    ExitReason::TimeStop
                } else if z.abs() < self.exit_z {
                    ExitReason::MeanReversion
                } else {
                    return None;
                };
                self.open = None;
                Some(Transition::Exited(close(trade, index, spread, Some(z), reason)))
            }
        }
    }

    /// Close whatever is open at `index`, e.g. on the last observation.
    pub fn force_close(&mut self, index: usize, spread: SpreadUnits, z: ZScore) -> Option<PositionExit> {
        let trade = self.open.take()?;
        Some(close(trade, index, spread, z.value(), ExitReason::EndOfSeries))
    }
}

fn close(
    trade: OpenTrade,
    index: usize,
    spread: SpreadUnits,
    z: Option<Decimal>,
    reason: ExitReason,
) -> PositionExit {
    debug!(
        "step {index}: exit {:?} at spread {spread} after {} days ({reason:?})",
        trade.position, trade.holding_days
    );
    PositionExit {
        trade,
        exit_index: index,
        exit_spread: spread,
        exit_z: z,
        reason,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn machine() -> PositionStateMachine {
        PositionStateMachine::new(&BacktestConfig::default())
    }

    fn z(v: Decimal) -> ZScore {
        ZScore::Defined(v)
    }

    #[test]
    fn test_starts_flat() {
        assert_eq!(machine().position(), Position::Flat);
    }

    #[test]
    fn test_entry_boundary_is_strict() {
        let mut m = machine();
        assert_eq!(m.step(30, z(dec!(-2.0)), dec!(1)), None);
        assert_eq!(m.step(31, z(dec!(2.0)), dec!(1)), None);
        assert!(matches!(
            m.step(32, z(dec!(-2.0000001)), dec!(1)),
            Some(Transition::Entered(OpenTrade {
                position: Position::LongSpread,
                ..
            }))
        ));
    }

    #[test]
    fn test_short_entry_above_threshold() {
        let mut m = machine();
        m.step(30, z(dec!(2.5)), dec!(10));
        assert_eq!(m.position(), Position::ShortSpread);
        let open = m.open_trade().unwrap();
        assert_eq!(open.entry_spread, dec!(10));
        assert_eq!(open.holding_days, 0);
    }

    #[test]
    fn test_no_reentry_while_open() {
        let mut m = machine();
        m.step(30, z(dec!(-3)), dec!(1));
        assert_eq!(m.step(31, z(dec!(3)), dec!(2)), None);
        assert_eq!(m.position(), Position::LongSpread);
        assert_eq!(m.open_trade().unwrap().holding_days, 1);
    }

    #[test]
    fn test_exit_boundary_is_strict() {
        let mut m = machine();
        m.step(30, z(dec!(-3)), dec!(1));
        assert_eq!(m.step(31, z(dec!(0.5)), dec!(1)), None);
        assert_eq!(m.step(32, z(dec!(-0.5)), dec!(1)), None);
        let t = m.step(33, z(dec!(0.4999)), dec!(2));
        match t {
            Some(Transition::Exited(exit)) => {
                assert_eq!(exit.reason, ExitReason::MeanReversion);
                assert_eq!(exit.trade.holding_days, 3);
            }
            other => panic!("expected exit, got {other:?}"),
        }
        assert_eq!(m.position(), Position::Flat);
    }

    #[test]
    fn test_time_stop_after_max_holding() {
        let mut m = machine();
        m.step(30, z(dec!(2.5)), dec!(5));
        for i in 31..50 {
            assert_eq!(m.step(i, z(dec!(1.0)), dec!(5)), None, "closed early at {i}");
        }
        match m.step(50, z(dec!(1.0)), dec!(4)) {
            Some(Transition::Exited(exit)) => {
                assert_eq!(exit.reason, ExitReason::TimeStop);
                assert_eq!(exit.trade.holding_days, 20);
                assert_eq!(exit.exit_index, 50);
            }
            other => panic!("expected time-stop, got {other:?}"),
        }
    }

    #[test]
    fn test_time_stop_wins_over_mean_reversion() {
        let cfg = BacktestConfig {
            max_holding_days: 1,
            ..Default::default()
        };
        let mut m = PositionStateMachine::new(&cfg);
        m.step(30, z(dec!(-2.5)), dec!(1));
        match m.step(31, z(dec!(0.1)), dec!(1)) {
            Some(Transition::Exited(exit)) => assert_eq!(exit.reason, ExitReason::TimeStop),
            other => panic!("expected time-stop, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_z_holds_but_counts_days() {
        let mut m = machine();
        m.step(30, z(dec!(-2.5)), dec!(1));
        assert_eq!(m.step(31, ZScore::ZeroVariance, dec!(1)), None);
        assert_eq!(m.step(32, ZScore::Warmup, dec!(1)), None);
        assert_eq!(m.open_trade().unwrap().holding_days, 2);
    }

    #[test]
    fn test_time_stop_waits_for_defined_z() {
        let mut m = machine();
        m.step(30, z(dec!(2.5)), dec!(5));
        for i in 31..50 {
            assert_eq!(m.step(i, z(dec!(1.0)), dec!(5)), None);
        }
        // holding_days reaches 20 and 21 with no usable z
        assert_eq!(m.step(50, ZScore::ZeroVariance, dec!(5)), None);
        assert_eq!(m.step(51, ZScore::ZeroVariance, dec!(5)), None);
        assert_eq!(m.open_trade().unwrap().holding_days, 21);

        match m.step(52, z(dec!(1.0)), dec!(4)) {
            Some(Transition::Exited(exit)) => {
                assert_eq!(exit.reason, ExitReason::TimeStop);
                assert_eq!(exit.trade.holding_days, 22);
                assert_eq!(exit.exit_index, 52);
            }
            other => panic!("expected time-stop, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_z_never_enters() {
        let mut m = machine();
        assert_eq!(m.step(30, ZScore::ZeroVariance, dec!(100)), None);
        assert_eq!(m.position(), Position::Flat);
    }

    #[test]
    fn test_no_entry_and_exit_in_same_step() {
        let mut m = machine();
        m.step(30, z(dec!(3)), dec!(1));
        // exit step: z is also an entry signal in the other direction
        let t = m.step(31, z(dec!(-3)), dec!(1));
        assert_eq!(t, None);
        let cfg = BacktestConfig {
            max_holding_days: 1,
            ..Default::default()
        };
        let mut m = PositionStateMachine::new(&cfg);
        m.step(30, z(dec!(3)), dec!(1));
        assert!(matches!(m.step(31, z(dec!(-3)), dec!(1)), Some(Transition::Exited(_))));
        assert_eq!(m.position(), Position::Flat);
    }

    #[test]
    fn test_force_close() {
        let mut m = machine();
        assert_eq!(m.force_close(40, dec!(1), ZScore::Warmup), None);
        m.step(30, z(dec!(-2.5)), dec!(1));
        let exit = m.force_close(40, dec!(3), z(dec!(-1))).unwrap();
        assert_eq!(exit.reason, ExitReason::EndOfSeries);
        assert_eq!(exit.exit_z, Some(dec!(-1)));
        assert_eq!(m.position(), Position::Flat);
    }

    #[test]
    fn test_raw_pnl_direction() {
        assert_eq!(Position::LongSpread.raw_pnl(dec!(1), dec!(3)), dec!(2));
        assert_eq!(Position::ShortSpread.raw_pnl(dec!(1), dec!(3)), dec!(-2));
        assert_eq!(Position::Flat.raw_pnl(dec!(1), dec!(3)), Decimal::ZERO);
    }
}
