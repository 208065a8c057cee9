use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::BacktestConfig;
use crate::hedge_ratio::{estimate_hedge_ratio, HedgeRatio};
use crate::price_table::PriceTable;
use crate::statistics::{mean, sample_variance, sqrt_decimal};
use crate::types::{with_metadata, ComputationOutput, Price, SpreadUnits};
use crate::{PairsError, PairsResult};

/// Rolling z-score at one index.
///
/// An undefined statistic is a value of its own so it can never be read
/// as zero by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ZScore {
    Defined(Decimal),
    /// Fewer than `window` observations so far
    Warmup,
    /// Trailing window has zero standard deviation
    ZeroVariance,
}

impl ZScore {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            ZScore::Defined(z) => Some(*z),
            ZScore::Warmup | ZScore::ZeroVariance => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, ZScore::Defined(_))
    }
}

/// Hedge-adjusted spread with its rolling z-scores, index-aligned with the
/// input prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSeries {
    pub beta: Decimal,
    pub window: usize,
    pub spread: Vec<SpreadUnits>,
    pub z_scores: Vec<ZScore>,
}

impl SpreadSeries {
    pub fn len(&self) -> usize {
        self.spread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spread.is_empty()
    }

    pub fn latest_z(&self) -> Option<ZScore> {
        self.z_scores.last().copied()
    }
}

/// spread[t] = price_a[t] - beta * price_b[t]
pub fn hedged_spread(price_a: &[Price], price_b: &[Price], beta: Decimal) -> PairsResult<Vec<SpreadUnits>> {
    if price_a.len() != price_b.len() {
        return Err(PairsError::InvalidInput {
            field: "price_b".into(),
            reason: format!(
                "Asset B has {} prices but asset A has {} — must be equal",
                price_b.len(),
                price_a.len()
            ),
        });
    }
    Ok(price_a
        .iter()
        .zip(price_b)
        .map(|(a, b)| *a - beta * *b)
        .collect())
}

/// Rolling z-score over the trailing `window` values (inclusive of t).
///
/// Uses the sample standard deviation (divisor window - 1), so the first
/// defined value sits at index `window - 1`.
pub fn rolling_z_scores(spread: &[SpreadUnits], window: usize) -> PairsResult<Vec<ZScore>> {
    if window < 2 {
        return Err(PairsError::InvalidInput {
            field: "window".into(),
            reason: "Rolling window must be at least 2".into(),
        });
    }
    let z_scores = (0..spread.len())
        .map(|t| {
            if t + 1 < window {
                return ZScore::Warmup;
            }
            let trailing = &spread[t + 1 - window..=t];
            let std = sqrt_decimal(sample_variance(trailing));
            if std == Decimal::ZERO {
                ZScore::ZeroVariance
            } else {
                ZScore::Defined((spread[t] - mean(trailing)) / std)
            }
        })
        .collect();
    Ok(z_scores)
}

pub fn build_spread_series(
    price_a: &[Price],
    price_b: &[Price],
    beta: Decimal,
    window: usize,
) -> PairsResult<SpreadSeries> {
    let spread = hedged_spread(price_a, price_b, beta)?;
    let z_scores = rolling_z_scores(&spread, window)?;
    Ok(SpreadSeries {
        beta,
        window,
        spread,
        z_scores,
    })
}

/// Output of [`calculate_spread`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadOutput {
    pub hedge_ratio: HedgeRatio,
    pub spread_mean: Decimal,
    pub latest_spread: Decimal,
    pub latest_z_score: ZScore,
    pub defined_z_scores: usize,
    pub series: SpreadSeries,
}

/// Estimate beta on the whole table and build the hedged spread and its
/// rolling z-scores.
pub fn calculate_spread(
    table: &PriceTable,
    config: &BacktestConfig,
) -> PairsResult<ComputationOutput<SpreadOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    table.validate(config.window)?;

    let a = table.prices_a();
    let b = table.prices_b();
    let hedge_ratio = estimate_hedge_ratio(&a, &b)?;
    let series = build_spread_series(&a, &b, hedge_ratio.beta, config.window)?;

    let zero_variance = series
        .z_scores
        .iter()
        .filter(|z| matches!(z, ZScore::ZeroVariance))
        .count();
    if zero_variance > 0 {
        warnings.push(format!(
            "{zero_variance} rolling windows have zero variance; z-score undefined there"
        ));
    }

    let output = SpreadOutput {
        hedge_ratio,
        spread_mean: mean(&series.spread),
        latest_spread: series.spread.last().copied().unwrap_or_default(),
        latest_z_score: series.latest_z().unwrap_or(ZScore::Warmup),
        defined_z_scores: series.z_scores.iter().filter(|z| z.is_defined()).count(),
        series,
    };

    Ok(with_metadata(
        "Hedged spread a - beta*b with rolling sample z-score",
        config,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
