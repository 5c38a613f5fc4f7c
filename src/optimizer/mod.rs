pub mod equilibrium;
pub mod hybrid;
pub mod markowitz;
pub mod risk_parity;
pub mod solver;

use crate::config::OptimizationConfig;
use log::{info, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Weight-sum tolerance for a converged solution.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    RiskParity,
    Markowitz,
    Hybrid,
    #[serde(rename = "black_litterman")]
    Equilibrium,
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizationMethod::RiskParity => "risk_parity",
            OptimizationMethod::Markowitz => "markowitz",
            OptimizationMethod::Hybrid => "hybrid",
            OptimizationMethod::Equilibrium => "black_litterman",
        };
        write!(f, "{}", name)
    }
}

impl OptimizationMethod {
    pub fn all() -> Vec<OptimizationMethod> {
        vec![
            OptimizationMethod::RiskParity,
            OptimizationMethod::Markowitz,
            OptimizationMethod::Hybrid,
            OptimizationMethod::Equilibrium,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    MaxSharpe,
    MinVolatility,
    TargetReturn,
    MaxDiversification,
}

/// Box bounds applied to every optimized weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Constraints {
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            min_weight: 0.01,
            max_weight: 0.80,
        }
    }
}

/// Annualized moment estimates in a fixed symbol order, shared read-only
/// by every optimizer run.
#[derive(Debug, Clone)]
pub struct Moments {
    pub symbols: Vec<String>,
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl Moments {
    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Per-asset annualized volatilities (covariance diagonal).
    pub fn asset_volatilities(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n_assets()).map(|i| self.covariance[[i, i]].max(0.0).sqrt()))
    }
}

/// Per-run parameters assembled from config plus the caller's request.
#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    pub objective: Objective,
    pub target_return: Option<f64>,
    pub risk_free_rate: f64,
    pub constraints: Constraints,
    pub risk_aversion: f64,
    pub tau: f64,
    pub equilibrium_confidence: f64,
    pub max_iterations: u64,
}

impl OptimizerSettings {
    pub fn from_config(config: &OptimizationConfig) -> Self {
        Self {
            objective: Objective::MaxSharpe,
            target_return: None,
            risk_free_rate: config.risk_free_rate,
            constraints: Constraints {
                min_weight: config.min_weight,
                max_weight: config.max_weight,
            },
            risk_aversion: config.risk_aversion,
            tau: config.tau,
            equilibrium_confidence: config.equilibrium_confidence,
            max_iterations: config.max_iterations,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub method: OptimizationMethod,
    pub weights: HashMap<String, f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Outcome of one requested method. A convergence failure lands in
/// `error` while the other methods keep their results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodReport {
    pub method: OptimizationMethod,
    pub result: Option<OptimizationResult>,
    pub error: Option<String>,
}

/// Annualized portfolio metrics for a weight vector against the given
/// moments. Zero volatility neutralizes the Sharpe ratio instead of
/// propagating a division fault.
pub fn portfolio_metrics(
    weights: &Array1<f64>,
    moments: &Moments,
    risk_free_rate: f64,
) -> (f64, f64, f64) {
    let expected_return = weights.dot(&moments.mean);
    let variance = weights.dot(&moments.covariance.dot(weights));
    let volatility = variance.max(0.0).sqrt();
    let sharpe = if volatility > 0.0 {
        (expected_return - risk_free_rate) / volatility
    } else {
        0.0
    };
    (expected_return, volatility, sharpe)
}

pub(crate) fn weights_map(symbols: &[String], weights: &Array1<f64>) -> HashMap<String, f64> {
    symbols
        .iter()
        .cloned()
        .zip(weights.iter().copied())
        .collect()
}

/// Run every requested method independently and synthesize the hybrid
/// blend from the risk-parity and Markowitz outcomes. A method that fails
/// reports its own error; it never aborts the rest.
pub fn run_methods(
    moments: &Moments,
    methods: &[OptimizationMethod],
    settings: &OptimizerSettings,
) -> Vec<MethodReport> {
    let mut risk_parity_result: Option<OptimizationResult> = None;
    let mut markowitz_result: Option<OptimizationResult> = None;
    let mut reports = Vec::with_capacity(methods.len());

    // Hybrid depends on the other two, so they run first regardless of
    // their position in the request.
    for method in methods {
        match method {
            OptimizationMethod::RiskParity => {
                let report = to_report(*method, risk_parity::solve(moments, settings));
                risk_parity_result = report.result.clone();
                reports.push(report);
            }
            OptimizationMethod::Markowitz => {
                let report = to_report(*method, markowitz::solve(moments, settings));
                markowitz_result = report.result.clone();
                reports.push(report);
            }
            _ => {}
        }
    }

    for method in methods {
        match method {
            OptimizationMethod::Hybrid => {
                let outcome = hybrid::blend(
                    risk_parity_result.as_ref(),
                    markowitz_result.as_ref(),
                    moments,
                    settings,
                );
                reports.push(to_report(*method, outcome));
            }
            OptimizationMethod::Equilibrium => {
                reports.push(to_report(*method, equilibrium::solve(moments, settings)));
            }
            _ => {}
        }
    }

    let converged = reports.iter().filter(|r| r.result.is_some()).count();
    info!(
        "Optimization finished: {}/{} methods converged",
        converged,
        reports.len()
    );

    reports
}

fn to_report(
    method: OptimizationMethod,
    outcome: crate::error::Result<OptimizationResult>,
) -> MethodReport {
    match outcome {
        Ok(result) => MethodReport {
            method,
            result: Some(result),
            error: None,
        },
        Err(e) => {
            warn!("{} failed: {}", method, e);
            MethodReport {
                method,
                result: None,
                error: Some(e.to_string()),
            }
        }
    }
}
