mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;
use std::process;

use commands::analysis::AnalyzeArgs;
use commands::backtest::{BacktestArgs, SpreadArgs};
use commands::hedge::HedgeRatioArgs;
use commands::prescreen::PrescreenArgs;
use commands::signal::SignalArgs;

/// Statistical-arbitrage pairs backtesting
#[derive(Parser)]
#[command(
    name = "pairs",
    version,
    about = "Statistical-arbitrage pairs analysis and backtesting",
    long_about = "A CLI for pairs-trading research with decimal precision. Estimates \
                  OLS hedge ratios, builds rolling z-score spreads, backtests a \
                  mean-reversion entry/exit rule with time-stops and costs, reports \
                  the current trade signal and screens pairs with correlation and an \
                  augmented Dickey-Fuller test."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON or YAML); flags override it
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG is used otherwise
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the OLS hedge ratio of A on B
    HedgeRatio(HedgeRatioArgs),
    /// Build the hedged spread and its rolling z-scores
    Spread(SpreadArgs),
    /// Backtest the z-score entry/exit rule on the hedged spread
    Backtest(BacktestArgs),
    /// Current trade signal from the whole-series z-score of a - b
    Signal(SignalArgs),
    /// Correlation and ADF stationarity pre-screen
    Prescreen(PrescreenArgs),
    /// Full pair analysis: confidence, decision and capital allocation
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let mut builder = Builder::from_default_env();
    match verbose {
        0 if env::var("RUST_LOG").is_ok() => {}
        0 => {
            builder.filter_level(LevelFilter::Warn);
        }
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        _ => {
            builder.filter_level(LevelFilter::Debug);
        }
    }
    builder
        .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match input::config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::HedgeRatio(args) => commands::hedge::run_hedge_ratio(args),
        Commands::Spread(args) => commands::backtest::run_spread(args, config),
        Commands::Backtest(args) => commands::backtest::run_backtest(args, config),
        Commands::Signal(args) => commands::signal::run_signal(args, config),
        Commands::Prescreen(args) => commands::prescreen::run_prescreen(args, config),
        Commands::Analyze(args) => {
            commands::analysis::run_analyze(args, config, cli.config.as_deref())
        }
        Commands::Version => {
            println!("pairs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
