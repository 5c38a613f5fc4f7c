use crate::error::{AnalyticsError, Result};
use crate::optimizer::{
    Moments, OptimizationMethod, OptimizationResult, OptimizerSettings, portfolio_metrics,
    weights_map,
};
use ndarray::Array1;

/// Blend of the risk-parity and Markowitz solutions: the arithmetic mean
/// of their weights over the symbols they share, renormalized to sum to
/// one. No solve of its own; it inherits feasibility from its inputs.
pub fn blend(
    risk_parity: Option<&OptimizationResult>,
    markowitz: Option<&OptimizationResult>,
    moments: &Moments,
    settings: &OptimizerSettings,
) -> Result<OptimizationResult> {
    let rp = risk_parity.ok_or_else(|| AnalyticsError::HybridUnavailable {
        reason: "risk_parity result missing".to_string(),
    })?;
    let mv = markowitz.ok_or_else(|| AnalyticsError::HybridUnavailable {
        reason: "markowitz result missing".to_string(),
    })?;

    let mut blended = Array1::zeros(moments.n_assets());
    let mut any_common = false;
    for (i, symbol) in moments.symbols.iter().enumerate() {
        if let (Some(&a), Some(&b)) = (rp.weights.get(symbol), mv.weights.get(symbol)) {
            blended[i] = (a + b) / 2.0;
            any_common = true;
        }
    }
    if !any_common {
        return Err(AnalyticsError::HybridUnavailable {
            reason: "no common assets between risk_parity and markowitz solutions".to_string(),
        });
    }

    let sum = blended.sum();
    if sum <= 0.0 {
        return Err(AnalyticsError::HybridUnavailable {
            reason: "blended weights sum to zero".to_string(),
        });
    }
    blended.mapv_inplace(|w| w / sum);

    let (expected_return, volatility, sharpe_ratio) =
        portfolio_metrics(&blended, moments, settings.risk_free_rate);

    Ok(OptimizationResult {
        method: OptimizationMethod::Hybrid,
        weights: weights_map(&moments.symbols, &blended),
        expected_return,
        volatility,
        sharpe_ratio,
        target_return: None,
        confidence: None,
    })
}
