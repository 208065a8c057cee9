use clap::Args;
use log::info;
use rust_decimal::Decimal;
use serde_json::Value;

use pairs_core::backtest;
use pairs_core::config::{BacktestConfig, TerminalPolicy};
use pairs_core::spread;
use pairs_core::EngineConfig;

use crate::input;

/// Backtest parameters that override the config file
#[derive(Args, Default)]
pub struct BacktestFlags {
    /// Rolling z-score window (observations)
    #[arg(long)]
    pub window: Option<usize>,

    /// Enter when |z| exceeds this
    #[arg(long)]
    pub entry_z: Option<Decimal>,

    /// Exit when |z| falls below this
    #[arg(long)]
    pub exit_z: Option<Decimal>,

    /// Time-stop in steps
    #[arg(long)]
    pub max_holding_days: Option<u32>,

    /// Per-side transaction cost (e.g. 0.0005 for 5 bps)
    #[arg(long)]
    pub transaction_cost: Option<Decimal>,

    /// Per-side slippage (e.g. 0.0002 for 2 bps)
    #[arg(long)]
    pub slippage: Option<Decimal>,

    /// Close a position still open at the end at the final spread
    #[arg(long)]
    pub mark_to_market: bool,
}

impl BacktestFlags {
    pub fn apply(&self, cfg: &mut BacktestConfig) {
        if let Some(v) = self.window {
            cfg.window = v;
        }
        if let Some(v) = self.entry_z {
            cfg.entry_z = v;
        }
        if let Some(v) = self.exit_z {
            cfg.exit_z = v;
        }
        if let Some(v) = self.max_holding_days {
            cfg.max_holding_days = v;
        }
        if let Some(v) = self.transaction_cost {
            cfg.transaction_cost = v;
        }
        if let Some(v) = self.slippage {
            cfg.slippage = v;
        }
        if self.mark_to_market {
            cfg.terminal_policy = TerminalPolicy::MarkToMarket;
        }
    }
}

/// Arguments for the hedged spread
#[derive(Args)]
pub struct SpreadArgs {
    /// Price file: CSV `date,<A>,<B>` or JSON price table (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Rolling z-score window (observations)
    #[arg(long)]
    pub window: Option<usize>,
}

/// Arguments for the spread backtest
#[derive(Args)]
pub struct BacktestArgs {
    /// Price file: CSV `date,<A>,<B>` or JSON price table (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub flags: BacktestFlags,
}

pub fn run_spread(args: SpreadArgs, config: EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut cfg = config.backtest;
    if let Some(v) = args.window {
        cfg.window = v;
    }
    let table = input::load_price_table(args.input.as_deref())?;
    let result = spread::calculate_spread(&table, &cfg)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_backtest(args: BacktestArgs, config: EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut cfg = config.backtest;
    args.flags.apply(&mut cfg);

    let table = input::load_price_table(args.input.as_deref())?;
    info!(
        "backtesting {}/{} over {} rows, window {}",
        table.asset_a,
        table.asset_b,
        table.len(),
        cfg.window
    );
    let result = backtest::backtest_pair(&table, &cfg)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal_macros::dec;

    #[derive(Parser)]
    struct FlagsOnly {
        #[command(flatten)]
        flags: BacktestFlags,
    }

    #[test]
    fn test_flags_override_only_what_is_set() {
        let flags = BacktestFlags {
            window: Some(20),
            slippage: Some(dec!(0.001)),
            mark_to_market: true,
            ..Default::default()
        };
        let mut cfg = BacktestConfig::default();
        flags.apply(&mut cfg);
        assert_eq!(cfg.window, 20);
        assert_eq!(cfg.slippage, dec!(0.001));
        assert_eq!(cfg.entry_z, dec!(2.0));
        assert_eq!(cfg.terminal_policy, TerminalPolicy::MarkToMarket);
    }

    #[test]
    fn test_missing_flag_value_is_rejected() {
        // --mark-to-market must not be swallowed as the value of --entry-z
        assert!(FlagsOnly::try_parse_from(["pairs", "--entry-z", "--mark-to-market"]).is_err());

        let parsed = FlagsOnly::try_parse_from(["pairs", "--entry-z", "2.5", "--mark-to-market"]).unwrap();
        assert_eq!(parsed.flags.entry_z, Some(dec!(2.5)));
        assert!(parsed.flags.mark_to_market);
    }
}
