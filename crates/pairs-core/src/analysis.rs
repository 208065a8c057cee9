use log::info;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::backtest::backtest_pair;
use crate::config::{DecisionConfig, EngineConfig};
use crate::hedge_ratio::HedgeRatio;
use crate::prescreen::{prescreen_pair, PrescreenOutput};
use crate::price_table::PriceTable;
use crate::signal::{generate_signal, SignalReport};
use crate::statistics::{pct_change, sample_std};
use crate::types::{with_metadata, ComputationOutput, SpreadUnits};
use crate::{PairsError, PairsResult};

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairAnalysisInput {
    pub prices: PriceTable,
    /// Amount to split between the two legs
    pub capital: Decimal,
    /// Report weak setups as exploratory instead of avoid
    #[serde(default)]
    pub advanced_mode: bool,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Statistical edge detected and the signal asks for a position
    Actionable,
    /// Weak edge, shown only in advanced mode
    Exploratory,
    Avoid,
}

/// Split of capital between the legs so that B is held in proportion |beta|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalAllocation {
    pub asset_a: Decimal,
    pub asset_b: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub pnl: SpreadUnits,
    pub trades: usize,
    pub max_drawdown: SpreadUnits,
    pub win_rate: Decimal,
    pub position_open_at_end: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairAnalysisOutput {
    pub asset_a: String,
    pub asset_b: String,
    pub prescreen: PrescreenOutput,
    /// Whole-series signal; None when the raw spread a - b has zero variance
    pub signal: Option<SignalReport>,
    pub hedge_ratio: HedgeRatio,
    pub backtest: BacktestSummary,
    pub confidence_pct: u32,
    pub decision: Decision,
    pub allocation: CapitalAllocation,
    /// Daily return volatility of A (sample std)
    pub volatility_a: Decimal,
    /// Symmetric short-term P&L range: +/- this amount
    pub estimated_pnl_range: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run pre-screen, signal, hedge ratio and backtest on one pair and turn
/// them into a confidence score, a decision and a capital split.
pub fn analyze_pair(input: &PairAnalysisInput) -> PairsResult<ComputationOutput<PairAnalysisOutput>> {
    let start = Instant::now();
    let cfg = &input.config;

    cfg.validate()?;
    if input.capital <= Decimal::ZERO {
        return Err(PairsError::InvalidInput {
            field: "capital".into(),
            reason: "Capital must be positive".into(),
        });
    }
    let table = &input.prices;
    table.validate(cfg.backtest.window)?;

    let a = table.prices_a();
    let b = table.prices_b();

    let prescreen = prescreen_pair(&a, &b, &cfg.prescreen)?;
    let (signal, signal_unavailable) = match generate_signal(&a, &b, &cfg.signal) {
        Ok(report) => (Some(report), None),
        Err(PairsError::DegenerateSeries { context }) => (None, Some(context)),
        Err(e) => return Err(e),
    };
    let backtest = backtest_pair(table, &cfg.backtest)?;
    let mut warnings = backtest.warnings;
    let bt = backtest.result;

    let confidence_pct = confidence_score(&prescreen, signal.as_ref(), cfg);
    let decision = decide(confidence_pct, signal.as_ref(), input.advanced_mode, &cfg.decision);
    let allocation = allocate_capital(input.capital, bt.hedge_ratio.beta);

    let volatility_a = sample_std(&pct_change(&a));
    let z_multiplier = signal
        .as_ref()
        .map(|s| s.z_score.abs().min(cfg.decision.max_z_multiplier))
        .unwrap_or(Decimal::ZERO);
    let estimated_pnl_range = input.capital * volatility_a * z_multiplier;

    if let Some(reason) = &prescreen.adf_unavailable_reason {
        warnings.push(format!("ADF test not run ({reason}); no cointegration points"));
    }
    if let Some(context) = &signal_unavailable {
        warnings.push(format!(
            "No trade signal ({context}); no deviation points, P&L range is zero"
        ));
    }
    if decision == Decision::Exploratory {
        warnings.push("Weak edge: exploratory only".into());
    }

    info!(
        "{}/{}: confidence {confidence_pct}%, signal {:?}, decision {decision:?}",
        table.asset_a,
        table.asset_b,
        signal.as_ref().map(|s| s.signal)
    );

    let output = PairAnalysisOutput {
        asset_a: table.asset_a.clone(),
        asset_b: table.asset_b.clone(),
        prescreen,
        signal,
        hedge_ratio: bt.hedge_ratio,
        backtest: BacktestSummary {
            pnl: bt.report.pnl,
            trades: bt.report.trades,
            max_drawdown: bt.report.max_drawdown,
            win_rate: bt.report.win_rate,
            position_open_at_end: bt.report.open_position.is_some(),
        },
        confidence_pct,
        decision,
        allocation,
        volatility_a,
        estimated_pnl_range,
    };

    let assumptions = serde_json::json!({
        "capital": input.capital.to_string(),
        "advanced_mode": input.advanced_mode,
        "config": cfg,
    });

    Ok(with_metadata(
        "Correlation + ADF pre-screen, whole-series signal, OLS hedge ratio and rolling z-score backtest",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

/// Additive points for correlation, cointegration and deviation, capped at 100.
/// A missing signal earns no deviation points.
pub fn confidence_score(
    prescreen: &PrescreenOutput,
    signal: Option<&SignalReport>,
    cfg: &EngineConfig,
) -> u32 {
    let d = &cfg.decision;
    let mut score = 0u32;
    if prescreen.correlation.is_some_and(|c| c > cfg.prescreen.min_correlation) {
        score += d.correlation_points;
    }
    if prescreen
        .adf_p_value()
        .is_some_and(|p| p < cfg.prescreen.significance)
    {
        score += d.cointegration_points;
    }
    if signal.is_some_and(|s| s.z_score.abs() > d.deviation_z) {
        score += d.deviation_points;
    }
    score.min(100)
}

pub fn decide(
    confidence_pct: u32,
    signal: Option<&SignalReport>,
    advanced_mode: bool,
    cfg: &DecisionConfig,
) -> Decision {
    let wants_position = signal.is_some_and(|s| s.signal.is_entry());
    if confidence_pct >= cfg.min_confidence && wants_position {
        Decision::Actionable
    } else if advanced_mode {
        Decision::Exploratory
    } else {
        Decision::Avoid
    }
}

/// alloc_a = capital / (1 + |beta|), alloc_b = alloc_a * |beta|
pub fn allocate_capital(capital: Decimal, beta: Decimal) -> CapitalAllocation {
    let beta = beta.abs();
    let asset_a = capital / (dec!(1) + beta);
    CapitalAllocation {
        asset_a,
        asset_b: asset_a * beta,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescreen::{critical_values, AdfResult};
    use crate::signal::Signal;

    fn prescreen(correlation: Option<Decimal>, p_value: Option<f64>) -> PrescreenOutput {
        PrescreenOutput {
            correlation,
            is_correlated: false,
            adf: p_value.map(|p| AdfResult {
                statistic: -3.0,
                p_value: p,
                used_lag: 0,
                n_obs: 100,
                critical_values: critical_values(100),
                aic: 0.0,
            }),
            adf_unavailable_reason: None,
            is_cointegrated: false,
            observations: 100,
        }
    }

    fn signal(z: Decimal, signal: Signal) -> SignalReport {
        SignalReport { z_score: z, signal }
    }

    #[test]
    fn test_confidence_full_marks() {
        let cfg = EngineConfig::default();
        let score = confidence_score(
            &prescreen(Some(dec!(0.9)), Some(0.01)),
            Some(&signal(dec!(2.3), Signal::Sell)),
            &cfg,
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_confidence_thresholds_are_strict() {
        let cfg = EngineConfig::default();
        let score = confidence_score(
            &prescreen(Some(dec!(0.7)), Some(0.05)),
            Some(&signal(dec!(1.5), Signal::Hold)),
            &cfg,
        );
        assert_eq!(score, 0);
    }

    #[test]
    fn test_missing_adf_earns_no_points() {
        let cfg = EngineConfig::default();
        let score = confidence_score(
            &prescreen(Some(dec!(0.95)), None),
            Some(&signal(dec!(-1.8), Signal::Hold)),
            &cfg,
        );
        assert_eq!(score, 60);
    }

    #[test]
    fn test_confidence_capped_at_100() {
        let mut cfg = EngineConfig::default();
        cfg.decision.deviation_points = 50;
        let score = confidence_score(
            &prescreen(Some(dec!(0.9)), Some(0.01)),
            Some(&signal(dec!(3), Signal::Sell)),
            &cfg,
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_decision_rules() {
        let cfg = DecisionConfig::default();
        let buy = signal(dec!(-2.5), Signal::Buy);
        let hold = signal(dec!(1), Signal::Hold);
        assert_eq!(decide(80, Some(&buy), false, &cfg), Decision::Actionable);
        assert_eq!(decide(70, Some(&buy), false, &cfg), Decision::Actionable);
        assert_eq!(decide(60, Some(&buy), false, &cfg), Decision::Avoid);
        assert_eq!(decide(100, Some(&hold), false, &cfg), Decision::Avoid);
        assert_eq!(decide(100, Some(&hold), true, &cfg), Decision::Exploratory);
    }

    #[test]
    fn test_missing_signal_never_actionable() {
        let cfg = EngineConfig::default();
        let score = confidence_score(&prescreen(Some(dec!(0.9)), Some(0.01)), None, &cfg);
        assert_eq!(score, 80);
        assert_eq!(decide(score, None, false, &cfg.decision), Decision::Avoid);
        assert_eq!(decide(score, None, true, &cfg.decision), Decision::Exploratory);
    }

    #[test]
    fn test_allocation_follows_beta() {
        let alloc = allocate_capital(dec!(30000), dec!(2));
        assert_eq!(alloc.asset_a, dec!(10000));
        assert_eq!(alloc.asset_b, dec!(20000));

        let negative = allocate_capital(dec!(30000), dec!(-2));
        assert_eq!(negative, alloc);
    }

    #[test]
    fn test_decision_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Decision::Actionable).unwrap(),
            "\"actionable\""
        );
    }
}
