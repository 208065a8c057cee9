use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::{PairsError, PairsResult};

// ---------------------------------------------------------------------------
// MacKinnon (1994) response surface, constant-only regression, one series.
// Critical values use the 2010 update.
// ---------------------------------------------------------------------------

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

const CRIT_1PCT: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5PCT: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10PCT: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Finite-sample critical values of the ADF statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Augmented Dickey-Fuller test with constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-value of the lagged level; more negative = more mean-reverting
    pub statistic: f64,
    pub p_value: f64,
    /// Lagged differences selected by AIC
    pub used_lag: usize,
    /// Observations in the final regression
    pub n_obs: usize,
    pub critical_values: CriticalValues,
    /// AIC of the selected lag order
    pub aic: f64,
}

/// Upper bound on the lag order: ceil(12 * (n/100)^(1/4)), capped at n/2 - 2.
pub fn default_max_lag(n: usize) -> PairsResult<usize> {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as i64;
    let cap = (n / 2) as i64 - 2;
    let max_lag = schwert.min(cap);
    if max_lag < 0 {
        return Err(PairsError::InsufficientData(format!(
            "ADF sample of {n} observations is too short"
        )));
    }
    Ok(max_lag as usize)
}

/// Run the ADF test on `series`, choosing the lag order by minimum AIC.
pub fn adf_test(series: &[f64]) -> PairsResult<AdfResult> {
    let n = series.len();
    if n < 3 {
        return Err(PairsError::InsufficientData(
            "Need at least 3 observations for ADF test".into(),
        ));
    }
    let first = series[0];
    if series.iter().all(|v| *v == first) {
        return Err(PairsError::DegenerateSeries {
            context: "ADF test — series is constant".into(),
        });
    }
    let max_lag = default_max_lag(n)?;
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag search on the common sample that the longest model allows.
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lag {
        let Some(fit) = adf_regression(series, &diffs, max_lag, lags) else {
            continue;
        };
        if best.map_or(true, |(aic, _)| fit.aic < aic) {
            best = Some((fit.aic, lags));
        }
    }
    let (_, used_lag) = best.ok_or_else(|| PairsError::DegenerateSeries {
        context: "ADF test — regression is singular for every lag order".into(),
    })?;

    let fit = adf_regression(series, &diffs, used_lag, used_lag).ok_or_else(|| {
        PairsError::DegenerateSeries {
            context: "ADF test — final regression is singular".into(),
        }
    })?;

    Ok(AdfResult {
        statistic: fit.t_level,
        p_value: mackinnon_p_value(fit.t_level)?,
        used_lag,
        n_obs: fit.n_obs,
        critical_values: critical_values(fit.n_obs),
        aic: fit.aic,
    })
}

/// Approximate p-value of an ADF statistic.
pub fn mackinnon_p_value(statistic: f64) -> PairsResult<f64> {
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }
    let x = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    let normal = Normal::new(0.0, 1.0).map_err(|e| PairsError::InvalidInput {
        field: "normal".into(),
        reason: e.to_string(),
    })?;
    Ok(normal.cdf(x))
}

pub fn critical_values(n_obs: usize) -> CriticalValues {
    let at = |c: &[f64; 4]| {
        let inv = 1.0 / n_obs as f64;
        c[0] + c[1] * inv + c[2] * inv * inv + c[3] * inv * inv * inv
    };
    CriticalValues {
        one_pct: at(&CRIT_1PCT),
        five_pct: at(&CRIT_5PCT),
        ten_pct: at(&CRIT_10PCT),
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// c[0] + c[1] x + c[2] x^2 + ...
fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

struct AdfFit {
    t_level: f64,
    aic: f64,
    n_obs: usize,
}

/// dx[t] = c + gamma * x[t] + sum_{j=1..lags} phi_j dx[t-j] + e
///
/// Rows start at t = `sample_lag` so that models with different `lags`
/// share one sample.
fn adf_regression(series: &[f64], diffs: &[f64], sample_lag: usize, lags: usize) -> Option<AdfFit> {
    let m = diffs.len();
    if sample_lag >= m {
        return None;
    }
    let k = 2 + lags;
    let n_obs = m - sample_lag;
    if n_obs <= k {
        return None;
    }

    let rows: Vec<Vec<f64>> = (sample_lag..m)
        .map(|t| {
            let mut row = Vec::with_capacity(k);
            row.push(series[t]);
            row.extend((1..=lags).map(|j| diffs[t - j]));
            row.push(1.0);
            row
        })
        .collect();
    let y = &diffs[sample_lag..];

    let fit = ols(&rows, y)?;
    let nf = n_obs as f64;
    let sigma2 = fit.ssr / (nf - k as f64);
    let se = (sigma2 * fit.xtx_inv_diag[0]).sqrt();
    if se.is_nan() || se <= 0.0 || fit.ssr <= 0.0 {
        return None;
    }
    let aic = nf * ((2.0 * std::f64::consts::PI).ln() + (fit.ssr / nf).ln() + 1.0) + 2.0 * k as f64;

    Some(AdfFit {
        t_level: fit.coefs[0] / se,
        aic,
        n_obs,
    })
}

struct OlsFit {
    coefs: Vec<f64>,
    ssr: f64,
    xtx_inv_diag: Vec<f64>,
}

/// Least squares through the normal equations; None when X'X is singular.
fn ols(rows: &[Vec<f64>], y: &[f64]) -> Option<OlsFit> {
    let k = rows.first()?.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, yi) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    let inv = invert(xtx)?;
    let coefs: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();
    let ssr = rows
        .iter()
        .zip(y)
        .map(|(row, yi)| {
            let fitted: f64 = row.iter().zip(&coefs).map(|(x, b)| x * b).sum();
            (yi - fitted).powi(2)
        })
        .sum();
    let xtx_inv_diag = (0..k).map(|i| inv[i][i]).collect();
    Some(OlsFit {
        coefs,
        ssr,
        xtx_inv_diag,
    })
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let k = a.len();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    let scale = a
        .iter()
        .flat_map(|r| r.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    for col in 0..k {
        let pivot = (col..k).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= scale * 1e-13 {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);
        let p = a[col][col];
        for j in 0..k {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        for r in 0..k {
            if r != col {
                let f = a[r][col];
                if f != 0.0 {
                    let (pivot_row, pivot_inv) = (a[col].clone(), inv[col].clone());
                    for j in 0..k {
                        a[r][j] -= f * pivot_row[j];
                        inv[r][j] -= f * pivot_inv[j];
                    }
                }
            }
        }
    }
    Some(inv)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
