use clap::Args;
use serde_json::Value;

use pairs_core::hedge_ratio;

use crate::input;

/// Arguments for hedge ratio estimation
#[derive(Args)]
pub struct HedgeRatioArgs {
    /// Price file: CSV `date,<A>,<B>` or JSON price table (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_hedge_ratio(args: HedgeRatioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = input::load_price_table(args.input.as_deref())?;
    let result = hedge_ratio::calculate_hedge_ratio(&table)?;
    Ok(serde_json::to_value(result)?)
}
