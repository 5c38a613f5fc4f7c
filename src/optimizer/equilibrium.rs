use crate::error::Result;
use crate::optimizer::{
    Moments, OptimizationMethod, OptimizationResult, OptimizerSettings, portfolio_metrics, solver,
    weights_map,
};
use ndarray::Array1;

/// View-free Black-Litterman style allocation.
///
/// The prior is the equal-weight market; implied returns are
/// risk_aversion * Sigma * prior. With no investor views the posterior
/// return vector equals the implied one, and the posterior covariance is
/// Sigma scaled by (1 + tau) for estimation uncertainty. The solve
/// maximizes the quadratic utility under that posterior; reported metrics
/// are recomputed against the original moments so the result compares
/// directly with the other methods.
pub fn solve(moments: &Moments, settings: &OptimizerSettings) -> Result<OptimizationResult> {
    let n = moments.n_assets();
    let prior = Array1::from_elem(n, 1.0 / n as f64);

    let delta = settings.risk_aversion;
    let implied_returns = moments.covariance.dot(&prior) * delta;
    let posterior_covariance = &moments.covariance * (1.0 + settings.tau);

    let objective = move |w: &Array1<f64>| {
        w.dot(&posterior_covariance.dot(w)) - delta * w.dot(&implied_returns)
    };

    let weights = solver::solve_weights(
        "black_litterman",
        objective,
        n,
        &settings.constraints,
        settings.max_iterations,
    )?;

    let (expected_return, volatility, sharpe_ratio) =
        portfolio_metrics(&weights, moments, settings.risk_free_rate);

    Ok(OptimizationResult {
        method: OptimizationMethod::Equilibrium,
        weights: weights_map(&moments.symbols, &weights),
        expected_return,
        volatility,
        sharpe_ratio,
        target_return: None,
        // Fixed in the view-free case, not derived from data.
        confidence: Some(settings.equilibrium_confidence),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizationConfig;
    use ndarray::{arr1, arr2};

    fn settings() -> OptimizerSettings {
        OptimizerSettings::from_config(&OptimizationConfig::default())
    }

    #[test]
    fn test_reports_fixed_confidence() {
        let moments = Moments {
            symbols: vec!["A".to_string(), "B".to_string()],
            mean: arr1(&[0.08, 0.12]),
            covariance: arr2(&[[0.04, 0.01], [0.01, 0.09]]),
        };
        let result = solve(&moments, &settings()).unwrap();
        assert_eq!(result.confidence, Some(0.75));
        let sum: f64 = result.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric_market_stays_near_equal_weights() {
        // Identical variances and symmetric correlation: the implied
        // returns are identical, so the equal-weight prior is optimal.
        let moments = Moments {
            symbols: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            mean: arr1(&[0.07, 0.07, 0.07]),
            covariance: arr2(&[
                [0.05, 0.02, 0.02],
                [0.02, 0.05, 0.02],
                [0.02, 0.02, 0.05],
            ]),
        };
        let result = solve(&moments, &settings()).unwrap();
        for &w in result.weights.values() {
            assert!((w - 1.0 / 3.0).abs() < 0.02);
        }
    }

    #[test]
    fn test_metrics_use_original_moments() {
        let moments = Moments {
            symbols: vec!["A".to_string(), "B".to_string()],
            mean: arr1(&[0.08, 0.12]),
            covariance: arr2(&[[0.04, 0.01], [0.01, 0.09]]),
        };
        let result = solve(&moments, &settings()).unwrap();
        let w = arr1(&[result.weights["A"], result.weights["B"]]);
        let expected = w.dot(&moments.mean);
        assert!((result.expected_return - expected).abs() < 1e-9);
    }
}
