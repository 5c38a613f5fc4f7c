use crate::error::Result;
use crate::optimizer::{
    Moments, OptimizationMethod, OptimizationResult, OptimizerSettings, portfolio_metrics, solver,
    weights_map,
};
use ndarray::Array1;

/// Equal risk contribution: minimize the squared dispersion of each
/// asset's fractional share of portfolio variance around 1/n.
pub fn solve(moments: &Moments, settings: &OptimizerSettings) -> Result<OptimizationResult> {
    let n = moments.n_assets();
    let target_contribution = 1.0 / n as f64;
    let covariance = moments.covariance.clone();

    let objective = move |w: &Array1<f64>| {
        let sigma_w = covariance.dot(w);
        let total_variance = w.dot(&sigma_w);
        if total_variance <= 0.0 {
            return 0.0;
        }
        w.iter()
            .zip(sigma_w.iter())
            .map(|(&wi, &swi)| {
                let contribution = wi * swi / total_variance;
                (contribution - target_contribution).powi(2)
            })
            .sum()
    };

    let weights = solver::solve_weights(
        "risk_parity",
        objective,
        n,
        &settings.constraints,
        settings.max_iterations,
    )?;

    let (expected_return, volatility, sharpe_ratio) =
        portfolio_metrics(&weights, moments, settings.risk_free_rate);

    Ok(OptimizationResult {
        method: OptimizationMethod::RiskParity,
        weights: weights_map(&moments.symbols, &weights),
        expected_return,
        volatility,
        sharpe_ratio,
        target_return: None,
        confidence: None,
    })
}

/// Fractional risk contributions of a weight vector, in symbol order.
/// Exposed for verifying how close a solution is to parity.
pub fn risk_contributions(weights: &Array1<f64>, moments: &Moments) -> Array1<f64> {
    let sigma_w = moments.covariance.dot(weights);
    let total_variance = weights.dot(&sigma_w);
    if total_variance <= 0.0 {
        return Array1::zeros(weights.len());
    }
    Array1::from_iter(
        weights
            .iter()
            .zip(sigma_w.iter())
            .map(|(&wi, &swi)| wi * swi / total_variance),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizationConfig;
    use ndarray::{arr1, arr2};

    fn moments_two_assets() -> Moments {
        // ~15% vs ~40% annual volatility, uncorrelated.
        Moments {
            symbols: vec!["CALM".to_string(), "WILD".to_string()],
            mean: arr1(&[0.06, 0.10]),
            covariance: arr2(&[[0.0225, 0.0], [0.0, 0.16]]),
        }
    }

    fn settings() -> OptimizerSettings {
        OptimizerSettings::from_config(&OptimizationConfig::default())
    }

    #[test]
    fn test_underweights_volatile_asset() {
        let moments = moments_two_assets();
        let result = solve(&moments, &settings()).unwrap();
        assert!(result.weights["CALM"] > result.weights["WILD"]);
        let sum: f64 = result.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_contributions_near_equal() {
        let moments = moments_two_assets();
        let result = solve(&moments, &settings()).unwrap();
        let w = arr1(&[result.weights["CALM"], result.weights["WILD"]]);
        let contributions = risk_contributions(&w, &moments);
        let max = contributions.iter().cloned().fold(f64::MIN, f64::max);
        let min = contributions.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max - min < 0.02, "contributions spread {}", max - min);
    }

    #[test]
    fn test_identical_assets_get_equal_weights() {
        let moments = Moments {
            symbols: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            mean: arr1(&[0.07, 0.07, 0.07]),
            covariance: arr2(&[
                [0.04, 0.01, 0.01],
                [0.01, 0.04, 0.01],
                [0.01, 0.01, 0.04],
            ]),
        };
        let result = solve(&moments, &settings()).unwrap();
        for &w in result.weights.values() {
            assert!((w - 1.0 / 3.0).abs() < 0.02);
        }
    }
}
