use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::{PairsError, PairsResult};

// ---------------------------------------------------------------------------
// Decimal statistics shared by the estimator, the z-score generators and the
// pre-screen. Empty input yields zero; callers guard lengths themselves.
// ---------------------------------------------------------------------------

pub fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len() as i64)
}

/// Sum of squared deviations from the mean.
pub fn sum_sq_dev(values: &[Decimal]) -> Decimal {
    let m = mean(values);
    values
        .iter()
        .map(|v| {
            let d = *v - m;
            d * d
        })
        .sum()
}

/// Sample variance, divisor n - 1.
pub fn sample_variance(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    sum_sq_dev(values) / Decimal::from((values.len() - 1) as i64)
}

pub fn sample_std(values: &[Decimal]) -> Decimal {
    sqrt_decimal(sample_variance(values))
}

/// Population standard deviation, divisor n.
pub fn population_std(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    sqrt_decimal(sum_sq_dev(values) / Decimal::from(values.len() as i64))
}

/// Co-moment sum(dx * dy); divide by n - 1 for the sample covariance.
pub fn sum_co_dev(x: &[Decimal], y: &[Decimal]) -> Decimal {
    let mx = mean(x);
    let my = mean(y);
    x.iter().zip(y).map(|(a, b)| (*a - mx) * (*b - my)).sum()
}

/// Pearson correlation coefficient between two series.
pub fn pearson_correlation(x: &[Decimal], y: &[Decimal]) -> PairsResult<Decimal> {
    if x.len() != y.len() {
        return Err(PairsError::InvalidInput {
            field: "series".into(),
            reason: format!("Series lengths differ: {} vs {}", x.len(), y.len()),
        });
    }
    if x.len() < 2 {
        return Err(PairsError::InsufficientData(
            "Correlation needs at least 2 observations".into(),
        ));
    }
    let denom = sqrt_decimal(sum_sq_dev(x)) * sqrt_decimal(sum_sq_dev(y));
    if denom == Decimal::ZERO {
        return Err(PairsError::DegenerateSeries {
            context: "Pearson correlation — zero variance".into(),
        });
    }
    Ok(sum_co_dev(x, y) / denom)
}

/// Simple returns p[t] / p[t-1] - 1; the first observation has none.
pub fn pct_change(prices: &[Decimal]) -> Vec<Decimal> {
    prices
        .windows(2)
        .filter(|w| w[0] != Decimal::ZERO)
        .map(|w| w[1] / w[0] - Decimal::ONE)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
