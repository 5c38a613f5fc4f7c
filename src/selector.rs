use crate::error::{AnalyticsError, Result};
use crate::optimizer::{MethodReport, OptimizationMethod, OptimizationResult};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodScore {
    pub method: OptimizationMethod,
    pub score: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodComparison {
    pub best_method: OptimizationMethod,
    pub ranking: Vec<MethodScore>,
}

/// Composite quality score for a converged result: Sharpe and expected
/// return reward, a volatility penalty floored at zero, and a fixed
/// per-method bonus reflecting diversification/sophistication priors.
pub fn composite_score(result: &OptimizationResult) -> f64 {
    let sharpe_component = 25.0 * result.sharpe_ratio;
    let return_component = 100.0 * result.expected_return;
    let volatility_component = (25.0 - 100.0 * result.volatility).max(0.0);
    sharpe_component + return_component + volatility_component + method_bonus(result.method)
}

fn method_bonus(method: OptimizationMethod) -> f64 {
    match method {
        OptimizationMethod::RiskParity => 5.0,
        OptimizationMethod::Markowitz => 8.0,
        OptimizationMethod::Hybrid => 10.0,
        OptimizationMethod::Equilibrium => 7.0,
    }
}

/// Rank the converged methods by composite score, best first. Fails with
/// `NoValidOptimization` when nothing converged.
pub fn select(reports: &[MethodReport]) -> Result<MethodComparison> {
    let mut ranking: Vec<MethodScore> = reports
        .iter()
        .filter_map(|report| report.result.as_ref())
        .map(|result| MethodScore {
            method: result.method,
            score: composite_score(result),
            expected_return: result.expected_return,
            volatility: result.volatility,
            sharpe_ratio: result.sharpe_ratio,
        })
        .collect();

    if ranking.is_empty() {
        return Err(AnalyticsError::NoValidOptimization);
    }

    ranking.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best_method = ranking[0].method;
    info!(
        "Selected {} (score {:.2}) out of {} converged methods",
        best_method,
        ranking[0].score,
        ranking.len()
    );

    Ok(MethodComparison {
        best_method,
        ranking,
    })
}
