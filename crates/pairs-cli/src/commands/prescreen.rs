use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use pairs_core::prescreen;
use pairs_core::EngineConfig;

use crate::input;

/// Arguments for the correlation / ADF pre-screen
#[derive(Args)]
pub struct PrescreenArgs {
    /// Price file: CSV `date,<A>,<B>` or JSON price table (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Minimum spread length before the ADF test is run
    #[arg(long)]
    pub min_observations: Option<usize>,

    /// ADF p-value below which the spread counts as stationary
    #[arg(long)]
    pub significance: Option<f64>,

    /// Correlation above which the pair counts as correlated
    #[arg(long, allow_hyphen_values = true)]
    pub min_correlation: Option<Decimal>,
}

pub fn run_prescreen(args: PrescreenArgs, config: EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut cfg = config.prescreen;
    if let Some(v) = args.min_observations {
        cfg.min_observations = v;
    }
    if let Some(v) = args.significance {
        cfg.significance = v;
    }
    if let Some(v) = args.min_correlation {
        cfg.min_correlation = v;
    }

    let table = input::load_price_table(args.input.as_deref())?;
    let result = prescreen::calculate_prescreen(&table, &cfg)?;
    Ok(serde_json::to_value(result)?)
}
