pub mod adf;

use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::PrescreenConfig;
use crate::price_table::PriceTable;
use crate::signal::raw_spread;
use crate::statistics::pearson_correlation;
use crate::types::{with_metadata_f64, ComputationOutput, Price};
use crate::{PairsError, PairsResult};

pub use adf::{adf_test, critical_values, default_max_lag, mackinnon_p_value, AdfResult, CriticalValues};

/// Correlation and stationarity checks run before trusting a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescreenOutput {
    /// Pearson correlation of the two price series; None if either is constant
    pub correlation: Option<Decimal>,
    pub is_correlated: bool,
    /// ADF test of the raw spread a - b; None when it could not be run
    pub adf: Option<AdfResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adf_unavailable_reason: Option<String>,
    /// ADF p-value below the significance level
    pub is_cointegrated: bool,
    pub observations: usize,
}

impl PrescreenOutput {
    pub fn adf_p_value(&self) -> Option<f64> {
        self.adf.map(|r| r.p_value)
    }
}

/// Correlation of the prices and ADF test of the unhedged spread.
///
/// A short or constant spread yields `adf: None` rather than an error, so
/// the pair can still be reported on.
pub fn prescreen_pair(
    price_a: &[Price],
    price_b: &[Price],
    config: &PrescreenConfig,
) -> PairsResult<PrescreenOutput> {
    let spread = raw_spread(price_a, price_b)?;

    let correlation = match pearson_correlation(price_a, price_b) {
        Ok(c) => Some(c),
        Err(PairsError::DegenerateSeries { .. }) | Err(PairsError::InsufficientData(_)) => None,
        Err(e) => return Err(e),
    };
    let is_correlated = correlation.is_some_and(|c| c > config.min_correlation);

    let (adf, adf_unavailable_reason) = if spread.len() < config.min_observations {
        (
            None,
            Some(format!(
                "{} observations, at least {} required",
                spread.len(),
                config.min_observations
            )),
        )
    } else {
        let series = spread_to_f64(&spread)?;
        match adf_test(&series) {
            Ok(result) => (Some(result), None),
            Err(PairsError::DegenerateSeries { context }) => (None, Some(context)),
            Err(PairsError::InsufficientData(msg)) => (None, Some(msg)),
            Err(e) => return Err(e),
        }
    };
    let is_cointegrated = adf.is_some_and(|r| r.p_value < config.significance);

    debug!(
        "prescreen: correlation {correlation:?}, adf p {:?}, cointegrated {is_cointegrated}",
        adf.map(|r| r.p_value)
    );

    Ok(PrescreenOutput {
        correlation,
        is_correlated,
        adf,
        adf_unavailable_reason,
        is_cointegrated,
        observations: spread.len(),
    })
}

/// Every spread value as f64; the ADF lags depend on no row being dropped.
fn spread_to_f64(spread: &[Decimal]) -> PairsResult<Vec<f64>> {
    spread
        .iter()
        .map(|s| s.to_f64())
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| PairsError::InvalidInput {
            field: "spread".into(),
            reason: "spread value not representable as f64".into(),
        })
}

/// [`prescreen_pair`] on a price table, wrapped in the output envelope.
pub fn calculate_prescreen(
    table: &PriceTable,
    config: &PrescreenConfig,
) -> PairsResult<ComputationOutput<PrescreenOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    table.validate(2)?;
    let output = prescreen_pair(&table.prices_a(), &table.prices_b(), config)?;

    if output.correlation.is_none() {
        warnings.push("A price series is constant; correlation undefined".into());
    } else if !output.is_correlated {
        warnings.push(format!(
            "Correlation at or below {}: weak pair",
            config.min_correlation
        ));
    }
    if let Some(reason) = &output.adf_unavailable_reason {
        warnings.push(format!("ADF test not run: {reason}"));
    } else if !output.is_cointegrated {
        warnings.push("Spread not stationary at the chosen significance".into());
    }

    Ok(with_metadata_f64(
        "Pearson correlation and augmented Dickey-Fuller test (constant, AIC lag) on spread a - b",
        config,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
