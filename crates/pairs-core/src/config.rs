use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;
use crate::{PairsError, PairsResult};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_WINDOW: usize = 30;
pub const DEFAULT_ENTRY_Z: Decimal = dec!(2.0);
pub const DEFAULT_EXIT_Z: Decimal = dec!(0.5);
pub const DEFAULT_MAX_HOLDING_DAYS: u32 = 20;
pub const DEFAULT_TRANSACTION_COST: Rate = dec!(0.0005);
pub const DEFAULT_SLIPPAGE: Rate = dec!(0.0002);

// ---------------------------------------------------------------------------
// Backtest
// ---------------------------------------------------------------------------

/// What to do with a position that is still open on the last observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPolicy {
    /// Leave it open; it is excluded from pnl, equity and drawdown and
    /// reported as an open-position snapshot instead.
    #[default]
    LeaveOpen,
    /// Close it at the final spread, charging the usual round-trip cost.
    MarkToMarket,
}

/// Parameters of the spread backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Rolling z-score window (observations)
    pub window: usize,
    /// Enter when |z| exceeds this (strict)
    pub entry_z: Decimal,
    /// Exit when |z| falls below this (strict)
    pub exit_z: Decimal,
    /// Time-stop: close once a position has been held this many steps
    pub max_holding_days: u32,
    /// Per-side transaction cost as a fraction of |entry spread|
    pub transaction_cost: Rate,
    /// Per-side slippage as a fraction of |entry spread|
    pub slippage: Rate,
    /// Treatment of a position still open at the end of the series
    pub terminal_policy: TerminalPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            entry_z: DEFAULT_ENTRY_Z,
            exit_z: DEFAULT_EXIT_Z,
            max_holding_days: DEFAULT_MAX_HOLDING_DAYS,
            transaction_cost: DEFAULT_TRANSACTION_COST,
            slippage: DEFAULT_SLIPPAGE,
            terminal_policy: TerminalPolicy::default(),
        }
    }
}

impl BacktestConfig {
    /// Round-trip cost rate: (transaction cost + slippage) on entry and exit.
    pub fn round_trip_rate(&self) -> Rate {
        (self.transaction_cost + self.slippage) * dec!(2)
    }

    pub fn validate(&self) -> PairsResult<()> {
        if self.window < 2 {
            return Err(invalid(
                "window",
                "Window must be at least 2 for a sample standard deviation",
            ));
        }
        if self.entry_z <= Decimal::ZERO {
            return Err(invalid("entry_z", "Entry z-score must be positive"));
        }
        if self.exit_z < Decimal::ZERO {
            return Err(invalid("exit_z", "Exit z-score must be non-negative"));
        }
        if self.exit_z >= self.entry_z {
            return Err(invalid(
                "exit_z",
                "Exit z-score must be below the entry z-score",
            ));
        }
        if self.max_holding_days == 0 {
            return Err(invalid("max_holding_days", "Max holding days must be > 0"));
        }
        if self.transaction_cost < Decimal::ZERO {
            return Err(invalid(
                "transaction_cost",
                "Transaction cost must be non-negative",
            ));
        }
        if self.slippage < Decimal::ZERO {
            return Err(invalid("slippage", "Slippage must be non-negative"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Display signal
// ---------------------------------------------------------------------------

/// Thresholds of the display signal (whole-series z-score).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub entry_z: Decimal,
    pub exit_z: Decimal,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            entry_z: DEFAULT_ENTRY_Z,
            exit_z: DEFAULT_EXIT_Z,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> PairsResult<()> {
        if self.entry_z <= Decimal::ZERO {
            return Err(invalid("signal.entry_z", "Entry z-score must be positive"));
        }
        if self.exit_z < Decimal::ZERO || self.exit_z >= self.entry_z {
            return Err(invalid(
                "signal.exit_z",
                "Exit z-score must be in [0, entry_z)",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pre-screen
// ---------------------------------------------------------------------------

/// Pair-validity pre-screen parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescreenConfig {
    /// Minimum spread observations before the ADF test is attempted
    pub min_observations: usize,
    /// ADF p-value below which the spread is treated as stationary
    pub significance: f64,
    /// Correlation above which the pair counts as correlated
    pub min_correlation: Decimal,
}

impl Default for PrescreenConfig {
    fn default() -> Self {
        Self {
            min_observations: 50,
            significance: 0.05,
            min_correlation: dec!(0.7),
        }
    }
}

impl PrescreenConfig {
    pub fn validate(&self) -> PairsResult<()> {
        if self.min_observations < 3 {
            return Err(invalid(
                "prescreen.min_observations",
                "At least 3 observations are needed for an ADF regression",
            ));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(invalid(
                "prescreen.significance",
                "Significance must be in (0, 1)",
            ));
        }
        if self.min_correlation < dec!(-1) || self.min_correlation > Decimal::ONE {
            return Err(invalid(
                "prescreen.min_correlation",
                "Correlation threshold must be in [-1, 1]",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decision summary
// ---------------------------------------------------------------------------

/// Weights and cut-offs of the confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub correlation_points: u32,
    pub cointegration_points: u32,
    pub deviation_points: u32,
    /// |signal z| above which the deviation points are awarded
    pub deviation_z: Decimal,
    /// Minimum confidence (percent) for an actionable trade
    pub min_confidence: u32,
    /// Cap on |z| in the estimated P&L range
    pub max_z_multiplier: Decimal,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            correlation_points: 40,
            cointegration_points: 40,
            deviation_points: 20,
            deviation_z: dec!(1.5),
            min_confidence: 70,
            max_z_multiplier: dec!(2),
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> PairsResult<()> {
        if self.min_confidence > 100 {
            return Err(invalid(
                "decision.min_confidence",
                "Minimum confidence is a percentage (0-100)",
            ));
        }
        if self.deviation_z < Decimal::ZERO || self.max_z_multiplier < Decimal::ZERO {
            return Err(invalid(
                "decision",
                "Deviation thresholds must be non-negative",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// All tunables of the engine, loadable from a JSON or YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backtest: BacktestConfig,
    pub signal: SignalConfig,
    pub prescreen: PrescreenConfig,
    pub decision: DecisionConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> PairsResult<()> {
        self.backtest.validate()?;
        self.signal.validate()?;
        self.prescreen.validate()?;
        self.decision.validate()
    }
}

fn invalid(field: &str, reason: &str) -> PairsError {
    PairsError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = BacktestConfig::default();
        assert_eq!(cfg.window, 30);
        assert_eq!(cfg.entry_z, dec!(2.0));
        assert_eq!(cfg.exit_z, dec!(0.5));
        assert_eq!(cfg.max_holding_days, 20);
        assert_eq!(cfg.transaction_cost, dec!(0.0005));
        assert_eq!(cfg.slippage, dec!(0.0002));
        assert_eq!(cfg.terminal_policy, TerminalPolicy::LeaveOpen);
    }

    #[test]
    fn test_round_trip_rate() {
        assert_eq!(BacktestConfig::default().round_trip_rate(), dec!(0.0014));
    }

    #[test]
    fn test_default_engine_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_window_too_small() {
        let cfg = BacktestConfig {
            window: 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_exit_above_entry_rejected() {
        let cfg = BacktestConfig {
            exit_z: dec!(2.5),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_cost_rejected() {
        let cfg = BacktestConfig {
            slippage: dec!(-0.0001),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"backtest": {"window": 20, "terminal_policy": "mark_to_market"}}"#)
                .unwrap();
        assert_eq!(cfg.backtest.window, 20);
        assert_eq!(cfg.backtest.entry_z, dec!(2.0));
        assert_eq!(cfg.backtest.terminal_policy, TerminalPolicy::MarkToMarket);
        assert_eq!(cfg.prescreen.min_observations, 50);
    }
}
