use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use pairs_core::signal;
use pairs_core::EngineConfig;

use crate::input;

/// Arguments for the current trade signal
#[derive(Args)]
pub struct SignalArgs {
    /// Price file: CSV `date,<A>,<B>` or JSON price table (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// |z| above which BUY/SELL is signalled
    #[arg(long)]
    pub entry_z: Option<Decimal>,

    /// |z| below which EXIT is signalled
    #[arg(long)]
    pub exit_z: Option<Decimal>,
}

pub fn run_signal(args: SignalArgs, config: EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut cfg = config.signal;
    if let Some(v) = args.entry_z {
        cfg.entry_z = v;
    }
    if let Some(v) = args.exit_z {
        cfg.exit_z = v;
    }

    let table = input::load_price_table(args.input.as_deref())?;
    let result = signal::calculate_signal(&table, &cfg)?;
    Ok(serde_json::to_value(result)?)
}
