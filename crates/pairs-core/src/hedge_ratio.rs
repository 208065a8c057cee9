use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::price_table::PriceTable;
use crate::statistics::{mean, sum_co_dev, sum_sq_dev};
use crate::types::{with_metadata, ComputationOutput};
use crate::{PairsError, PairsResult};

/// OLS fit of price A on price B with an intercept term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatio {
    /// Slope: units of B per unit of A in the hedged spread
    pub beta: Decimal,
    pub intercept: Decimal,
    /// Share of A's variance explained by B (0 when A is constant)
    pub r_squared: Decimal,
    pub observations: usize,
}

/// Estimate the hedge ratio by regressing `price_a` on `price_b`.
///
/// beta = sum((b - mean_b)(a - mean_a)) / sum((b - mean_b)^2)
/// intercept = mean_a - beta * mean_b
pub fn estimate_hedge_ratio(price_a: &[Decimal], price_b: &[Decimal]) -> PairsResult<HedgeRatio> {
    let n = price_a.len();
    if price_b.len() != n {
        return Err(PairsError::InvalidInput {
            field: "price_b".into(),
            reason: format!(
                "Asset B has {} prices but asset A has {} — must be equal",
                price_b.len(),
                n
            ),
        });
    }
    if n < 2 {
        return Err(PairsError::InsufficientData(format!(
            "OLS hedge ratio needs at least 2 observations, got {n}"
        )));
    }

    let sxx = sum_sq_dev(price_b);
    if sxx == Decimal::ZERO {
        return Err(PairsError::DegenerateRegressor {
            context: "OLS hedge ratio — asset B prices are constant".into(),
        });
    }
    let sxy = sum_co_dev(price_b, price_a);
    let syy = sum_sq_dev(price_a);

    let beta = sxy / sxx;
    let intercept = mean(price_a) - beta * mean(price_b);
    let r_squared = if syy == Decimal::ZERO {
        Decimal::ZERO
    } else {
        (sxy / sxx) * (sxy / syy)
    };

    Ok(HedgeRatio {
        beta,
        intercept,
        r_squared,
        observations: n,
    })
}

/// Hedge ratio of a full price table, wrapped in the output envelope.
pub fn calculate_hedge_ratio(table: &PriceTable) -> PairsResult<ComputationOutput<HedgeRatio>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    table.validate(2)?;
    let fit = estimate_hedge_ratio(&table.prices_a(), &table.prices_b())?;

    if fit.beta < Decimal::ZERO {
        warnings.push(format!(
            "Negative hedge ratio ({}): {} and {} move in opposite directions",
            fit.beta.round_dp(4),
            table.asset_a,
            table.asset_b
        ));
    }
    if fit.r_squared < dec!(0.5) {
        warnings.push(format!(
            "Low R-squared ({}): {} explains little of {}",
            fit.r_squared.round_dp(4),
            table.asset_b,
            table.asset_a
        ));
    }

    let assumptions = serde_json::json!({
        "asset_a": table.asset_a,
        "asset_b": table.asset_b,
        "dependent": "price_a",
        "regressor": "price_b",
        "intercept": true,
    });

    Ok(with_metadata(
        "OLS hedge ratio: price_a ~ const + beta * price_b",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        fit,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
