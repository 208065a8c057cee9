use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::config::SignalConfig;
use crate::price_table::PriceTable;
use crate::statistics::{mean, population_std};
use crate::types::{with_metadata, ComputationOutput, Price, SpreadUnits};
use crate::{PairsError, PairsResult};

/// Display signal derived from the latest whole-series z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    /// Spread far below its mean: buy A, sell B
    Buy,
    /// Spread far above its mean: sell A, buy B
    Sell,
    Hold,
    /// Spread back near its mean
    Exit,
}

impl Signal {
    /// Whether the signal asks for a new position.
    pub fn is_entry(&self) -> bool {
        matches!(self, Signal::Buy | Signal::Sell)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
            Signal::Exit => "EXIT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReport {
    pub z_score: Decimal,
    pub signal: Signal,
}

/// Unweighted spread a - b. Deliberately ignores the hedge ratio; the
/// backtest uses [`crate::spread::hedged_spread`] instead.
pub fn raw_spread(price_a: &[Price], price_b: &[Price]) -> PairsResult<Vec<SpreadUnits>> {
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
    Ok(price_a.iter().zip(price_b).map(|(a, b)| *a - *b).collect())
}

/// Z-score of every value against the mean and population standard
/// deviation of the entire series (not rolling).
pub fn whole_series_z_scores(spread: &[SpreadUnits]) -> PairsResult<Vec<Decimal>> {
    if spread.is_empty() {
        return Err(PairsError::InsufficientData(
            "Signal z-score needs at least one spread value".into(),
        ));
    }
    let m = mean(spread);
    let std = population_std(spread);
    if std == Decimal::ZERO {
        return Err(PairsError::DegenerateSeries {
            context: "signal z-score — spread has zero variance".into(),
        });
    }
    Ok(spread.iter().map(|s| (*s - m) / std).collect())
}

/// z > entry: SELL, z < -entry: BUY, |z| < exit: EXIT, otherwise HOLD.
pub fn classify(z: Decimal, config: &SignalConfig) -> Signal {
    if z > config.entry_z {
        Signal::Sell
    } else if z < -config.entry_z {
        Signal::Buy
    } else if z.abs() < config.exit_z {
        Signal::Exit
    } else {
        Signal::Hold
    }
}

/// Latest whole-series z-score of the raw spread and its signal.
pub fn generate_signal(
    price_a: &[Price],
    price_b: &[Price],
    config: &SignalConfig,
) -> PairsResult<SignalReport> {
    let spread = raw_spread(price_a, price_b)?;
    let z_scores = whole_series_z_scores(&spread)?;
    let z_score = z_scores.last().copied().unwrap_or_default();
    Ok(SignalReport {
        z_score,
        signal: classify(z_score, config),
    })
}

/// [`generate_signal`] on a price table, wrapped in the output envelope.
pub fn calculate_signal(
    table: &PriceTable,
    config: &SignalConfig,
) -> PairsResult<ComputationOutput<SignalReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    table.validate(2)?;
    let report = generate_signal(&table.prices_a(), &table.prices_b(), config)?;

    warnings.push(
        "Display signal uses the unhedged spread and a whole-series z-score; \
         it is independent of the backtest position"
            .into(),
    );

    Ok(with_metadata(
        "Whole-series z-score of raw spread a - b",
        config,
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
