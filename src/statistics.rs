use crate::error::{AnalyticsError, Result};
use crate::returns::ReturnMatrix;
use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;

/// Trading days per year used for all annualization.
pub const TRADING_DAYS: f64 = 252.0;
/// Informational weights must sum to 100 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 10.0;

/// Annualized mean return vector and covariance matrix, in column order of
/// the return matrix. Mean is daily mean x 252; covariance is the sample
/// covariance (n-1 denominator) x 252.
pub fn annualized_moments(matrix: &ReturnMatrix) -> (Array1<f64>, Array2<f64>) {
    let n_assets = matrix.n_assets();
    let n_rows = matrix.n_rows() as f64;

    let mut means = Array1::zeros(n_assets);
    for j in 0..n_assets {
        means[j] = matrix.values.column(j).sum() / n_rows;
    }

    let mut cov = Array2::zeros((n_assets, n_assets));
    for i in 0..n_assets {
        for j in i..n_assets {
            let col_i = matrix.values.column(i);
            let col_j = matrix.values.column(j);
            let c: f64 = col_i
                .iter()
                .zip(col_j.iter())
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum::<f64>()
                / (n_rows - 1.0);
            cov[[i, j]] = c * TRADING_DAYS;
            cov[[j, i]] = cov[[i, j]];
        }
    }

    (means.mapv(|m| m * TRADING_DAYS), cov)
}

/// Correlation matrix derived from a covariance matrix. Zero-variance
/// assets get zero off-diagonal correlation and unit self-correlation.
pub fn correlation_matrix(cov: &Array2<f64>) -> Array2<f64> {
    let n = cov.nrows();
    let mut corr = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                corr[[i, j]] = 1.0;
            } else {
                let denom = (cov[[i, i]] * cov[[j, j]]).sqrt();
                corr[[i, j]] = if denom > 0.0 { cov[[i, j]] / denom } else { 0.0 };
            }
        }
    }
    corr
}

/// Annualized Sharpe ratio of a daily return series. Zero volatility
/// yields zero rather than a division error.
pub fn sharpe_ratio(daily_returns: &[f64], risk_free_rate: f64) -> f64 {
    if daily_returns.is_empty() {
        return 0.0;
    }
    let annual_return = daily_returns.mean() * TRADING_DAYS;
    let annual_vol = daily_returns.std_dev() * TRADING_DAYS.sqrt();
    if annual_vol > 0.0 {
        (annual_return - risk_free_rate) / annual_vol
    } else {
        0.0
    }
}

/// Annualized Sortino ratio using downside deviation below zero.
pub fn sortino_ratio(daily_returns: &[f64], risk_free_rate: f64) -> f64 {
    if daily_returns.is_empty() {
        return 0.0;
    }
    let annual_return = daily_returns.mean() * TRADING_DAYS;
    let downside_sq: f64 = daily_returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|&r| r * r)
        .sum::<f64>()
        / daily_returns.len() as f64;
    let downside_dev = downside_sq.sqrt() * TRADING_DAYS.sqrt();
    if downside_dev > 0.0 {
        (annual_return - risk_free_rate) / downside_dev
    } else {
        0.0
    }
}

/// Maximum drawdown of the cumulative growth path of a daily return
/// series. Always <= 0; 0 for a series that never declines.
pub fn max_drawdown(daily_returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut peak = 1.0;
    let mut max_dd = 0.0_f64;
    for &r in daily_returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = cumulative / peak - 1.0;
        if dd < max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Historical VaR at the 95% level: the 5th percentile of daily returns,
/// linearly interpolated between order statistics.
pub fn value_at_risk(daily_returns: &[f64]) -> f64 {
    percentile(daily_returns, 0.05)
}

/// Expected shortfall at the 95% level: mean of the returns at or below
/// the VaR threshold.
pub fn conditional_value_at_risk(daily_returns: &[f64]) -> f64 {
    let var = value_at_risk(daily_returns);
    let tail: Vec<f64> = daily_returns.iter().copied().filter(|&r| r <= var).collect();
    if tail.is_empty() { var } else { tail.mean() }
}

fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

/// Risk profile of a portfolio at its stated (informational) weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetricsReport {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub value_at_risk_95: f64,
    pub conditional_value_at_risk_95: f64,
    pub max_drawdown: f64,
    pub diversification_ratio: f64,
    pub asset_volatilities: HashMap<String, f64>,
    pub beta: Option<f64>,
    pub r_squared: Option<f64>,
}

/// Compute the full risk profile for the given percentage weights.
///
/// Weights are the caller's stated allocations in percent; they must sum
/// to 100 within `WEIGHT_SUM_TOLERANCE` and are normalized to fractions
/// before use. Symbols absent from the map get zero weight. A benchmark
/// series of mismatched length is treated the same as no benchmark.
pub fn risk_metrics(
    matrix: &ReturnMatrix,
    weights_pct: &HashMap<String, f64>,
    benchmark: Option<&[f64]>,
) -> Result<RiskMetricsReport> {
    let sum: f64 = weights_pct.values().sum();
    if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(AnalyticsError::WeightSum {
            sum,
            tolerance: WEIGHT_SUM_TOLERANCE,
        });
    }

    let fractions: Vec<f64> = matrix
        .symbols
        .iter()
        .map(|s| weights_pct.get(s).copied().unwrap_or(0.0) / sum)
        .collect();

    // Daily portfolio return: weighted sum across asset columns.
    let portfolio: Vec<f64> = (0..matrix.n_rows())
        .map(|row| {
            fractions
                .iter()
                .enumerate()
                .map(|(col, &w)| w * matrix.values[[row, col]])
                .sum()
        })
        .collect();

    let annualized_return = portfolio.as_slice().mean() * TRADING_DAYS;
    let annualized_volatility = portfolio.as_slice().std_dev() * TRADING_DAYS.sqrt();

    let mut asset_volatilities = HashMap::new();
    let mut weighted_asset_vol = 0.0;
    for (col, symbol) in matrix.symbols.iter().enumerate() {
        let vol = matrix.values.column(col).to_vec().std_dev() * TRADING_DAYS.sqrt();
        weighted_asset_vol += fractions[col] * vol;
        asset_volatilities.insert(symbol.clone(), vol);
    }

    let diversification_ratio = if annualized_volatility > 0.0 {
        weighted_asset_vol / annualized_volatility
    } else {
        1.0
    };

    let (beta, r_squared) = match benchmark {
        Some(bench) if bench.len() == portfolio.len() && bench.len() >= 2 => {
            beta_and_r_squared(&portfolio, bench)
        }
        Some(bench) => {
            debug!(
                "Benchmark length {} does not match portfolio length {}; skipping beta",
                bench.len(),
                portfolio.len()
            );
            (None, None)
        }
        None => (None, None),
    };

    // Raw return-to-volatility ratio; the risk-free adjustment belongs to
    // the optimizer's max-Sharpe objective, not this report.
    let report_sharpe = if annualized_volatility > 0.0 {
        annualized_return / annualized_volatility
    } else {
        0.0
    };

    Ok(RiskMetricsReport {
        annualized_return,
        annualized_volatility,
        sharpe_ratio: report_sharpe,
        sortino_ratio: sortino_ratio(&portfolio, 0.0),
        value_at_risk_95: value_at_risk(&portfolio),
        conditional_value_at_risk_95: conditional_value_at_risk(&portfolio),
        max_drawdown: max_drawdown(&portfolio),
        diversification_ratio,
        asset_volatilities,
        beta,
        r_squared,
    })
}

fn beta_and_r_squared(portfolio: &[f64], benchmark: &[f64]) -> (Option<f64>, Option<f64>) {
    let n = portfolio.len() as f64;
    let mean_p = portfolio.mean();
    let mean_b = benchmark.mean();

    let mut cov = 0.0;
    let mut var_b = 0.0;
    let mut var_p = 0.0;
    for (p, b) in portfolio.iter().zip(benchmark.iter()) {
        cov += (p - mean_p) * (b - mean_b);
        var_b += (b - mean_b) * (b - mean_b);
        var_p += (p - mean_p) * (p - mean_p);
    }
    cov /= n - 1.0;
    var_b /= n - 1.0;
    var_p /= n - 1.0;

    if var_b <= 0.0 {
        return (None, None);
    }
    let beta = cov / var_b;
    let r_squared = if var_p > 0.0 {
        (cov * cov) / (var_b * var_p)
    } else {
        0.0
    };
    (Some(beta), Some(r_squared))
}
