use crate::error::{AnalyticsError, Result};
use crate::optimizer::{
    Moments, Objective, OptimizationMethod, OptimizationResult, OptimizerSettings,
    portfolio_metrics, solver, weights_map,
};
use ndarray::Array1;

/// Penalty weight tying the portfolio return to the requested target.
const TARGET_PENALTY_WEIGHT: f64 = 1000.0;
/// Accepted deviation from the target return after the solve.
const TARGET_TOLERANCE: f64 = 0.005;

/// Mean-variance optimization under one of four objectives.
pub fn solve(moments: &Moments, settings: &OptimizerSettings) -> Result<OptimizationResult> {
    let n = moments.n_assets();
    let mean = moments.mean.clone();
    let covariance = moments.covariance.clone();
    let risk_free_rate = settings.risk_free_rate;

    let mut reported_target = None;

    let objective: Box<dyn Fn(&Array1<f64>) -> f64> = match settings.objective {
        Objective::MaxSharpe => Box::new(move |w: &Array1<f64>| {
            let ret = w.dot(&mean);
            let variance = w.dot(&covariance.dot(w));
            if variance <= 0.0 {
                return 0.0;
            }
            -(ret - risk_free_rate) / variance.sqrt()
        }),
        Objective::MinVolatility => {
            Box::new(move |w: &Array1<f64>| w.dot(&covariance.dot(w)).max(0.0).sqrt())
        }
        Objective::TargetReturn => {
            let target = settings.target_return.ok_or_else(|| {
                AnalyticsError::InvalidRequest(
                    "target_return objective requires a target_return value".to_string(),
                )
            })?;
            check_target_feasible(moments, settings, target)?;
            reported_target = Some(target);
            Box::new(move |w: &Array1<f64>| {
                let vol = w.dot(&covariance.dot(w)).max(0.0).sqrt();
                vol + TARGET_PENALTY_WEIGHT * (w.dot(&mean) - target).powi(2)
            })
        }
        Objective::MaxDiversification => {
            let asset_vols = moments.asset_volatilities();
            Box::new(move |w: &Array1<f64>| {
                let vol = w.dot(&covariance.dot(w)).max(0.0).sqrt();
                if vol <= 0.0 {
                    return 0.0;
                }
                -w.dot(&asset_vols) / vol
            })
        }
    };

    let weights = solver::solve_weights(
        "markowitz",
        objective,
        n,
        &settings.constraints,
        settings.max_iterations,
    )?;

    let (expected_return, volatility, sharpe_ratio) =
        portfolio_metrics(&weights, moments, settings.risk_free_rate);

    if let Some(target) = reported_target {
        if (expected_return - target).abs() > TARGET_TOLERANCE {
            return Err(AnalyticsError::Convergence {
                method: "markowitz".to_string(),
                reason: format!(
                    "solution return {:.4} missed target {:.4}",
                    expected_return, target
                ),
            });
        }
    }

    Ok(OptimizationResult {
        method: OptimizationMethod::Markowitz,
        weights: weights_map(&moments.symbols, &weights),
        expected_return,
        volatility,
        sharpe_ratio,
        target_return: reported_target,
        confidence: None,
    })
}

/// Reject targets outside the mean-return range achievable under the box
/// bounds, so infeasibility fails fast with a diagnostic instead of a
/// generic numerical failure.
fn check_target_feasible(
    moments: &Moments,
    settings: &OptimizerSettings,
    target: f64,
) -> Result<()> {
    let (lo, hi) = achievable_return_range(
        &moments.mean,
        settings.constraints.min_weight,
        settings.constraints.max_weight,
    );
    if target < lo || target > hi {
        return Err(AnalyticsError::Convergence {
            method: "markowitz".to_string(),
            reason: format!(
                "target return {:.4} outside achievable range [{:.4}, {:.4}]",
                target, lo, hi
            ),
        });
    }
    Ok(())
}

/// Extremes of w'mu over the simplex slice { sum w = 1, l <= w <= u }:
/// give every asset the floor, then pour the remaining mass into assets
/// by mean return (ascending for the minimum, descending for the
/// maximum), capping each at the ceiling.
fn achievable_return_range(mean: &Array1<f64>, min_weight: f64, max_weight: f64) -> (f64, f64) {
    let n = mean.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        mean[a]
            .partial_cmp(&mean[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let extreme = |indices: &[usize]| {
        let mut remaining = 1.0 - n as f64 * min_weight;
        let mut total = min_weight * mean.sum();
        for &i in indices {
            let add = remaining.min(max_weight - min_weight);
            total += add * mean[i];
            remaining -= add;
            if remaining <= 0.0 {
                break;
            }
        }
        total
    };

    let lo = extreme(&order);
    let reversed: Vec<usize> = order.iter().rev().copied().collect();
    let hi = extreme(&reversed);
    (lo, hi)
}
