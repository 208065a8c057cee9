use clap::Args;
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use pairs_core::analysis::{self, PairAnalysisInput};
use pairs_core::EngineConfig;

use super::backtest::BacktestFlags;
use crate::input;

const DEFAULT_CAPITAL: Decimal = dec!(50000);

/// Arguments for the full pair analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Price file: CSV `date,<A>,<B>` or JSON price table; a JSON file
    /// holding a full analysis input (`prices`, `capital`, ...) also works
    #[arg(long)]
    pub input: Option<String>,

    /// Amount to split between the two legs [default: 50000]; overrides
    /// the capital of a full analysis input
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Report weak setups as exploratory instead of avoid
    #[arg(long)]
    pub advanced: bool,

    #[command(flatten)]
    pub flags: BacktestFlags,
}

pub fn run_analyze(
    args: AnalyzeArgs,
    config: EngineConfig,
    config_path: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis_input = match read_analysis_input(args.input.as_deref())? {
        Some(full) => {
            if let Some(path) = config_path {
                warn!("--config {path} ignored: the analysis input carries its own config section");
            }
            apply_args(full, &args)
        }
        None => apply_args(
            PairAnalysisInput {
                prices: input::load_price_table(args.input.as_deref())?,
                capital: DEFAULT_CAPITAL,
                advanced_mode: false,
                config,
            },
            &args,
        ),
    };

    if analysis_input.capital < dec!(10000) {
        warn!(
            "capital {} is below the usual 10000 minimum; allocations will be small",
            analysis_input.capital
        );
    }

    let result = analysis::analyze_pair(&analysis_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Command-line flags win over whatever the input already holds.
fn apply_args(mut analysis_input: PairAnalysisInput, args: &AnalyzeArgs) -> PairAnalysisInput {
    if let Some(capital) = args.capital {
        analysis_input.capital = capital;
    }
    if args.advanced {
        analysis_input.advanced_mode = true;
    }
    args.flags.apply(&mut analysis_input.config.backtest);
    analysis_input
}

/// A JSON file with a `prices` key is a complete analysis input.
fn read_analysis_input(path: Option<&str>) -> Result<Option<PairAnalysisInput>, Box<dyn std::error::Error>> {
    let Some(path) = path.filter(|p| !input::file::is_csv(p)) else {
        return Ok(None);
    };
    let value: Value = input::file::read_json(path)?;
    if value.get("prices").is_none() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}
