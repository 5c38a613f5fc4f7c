use crate::advisor::{self, Advice};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::market_data::{self, PriceProvider};
use crate::optimizer::{
    self, MethodReport, Moments, Objective, OptimizationMethod, OptimizerSettings,
};
use crate::outliers::{self, OutlierReport};
use crate::returns::ReturnMatrix;
use crate::selector::{self, MethodComparison};
use crate::statistics::{self, RiskMetricsReport};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum assets accepted per request.
pub const MAX_ASSETS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    /// Stated allocation in percent. Informational for optimization; a
    /// real allocation on the risk-metrics path.
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    RiskMetrics,
    Outliers,
    Correlation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub assets: Vec<Asset>,
    #[serde(default = "default_period")]
    pub period: String,
    /// Empty means every analysis.
    #[serde(default)]
    pub analysis_types: Vec<AnalysisType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub assets: Vec<Asset>,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default)]
    pub objective: Objective,
    #[serde(default)]
    pub target_return: Option<f64>,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    /// Empty means all four methods.
    #[serde(default)]
    pub methods: Vec<OptimizationMethod>,
}

fn default_period() -> String {
    "1y".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbols: Vec<String>,
    pub risk_metrics: Option<RiskMetricsReport>,
    pub outliers: Option<OutlierReport>,
    pub correlation: Option<Vec<Vec<f64>>>,
    pub failed_symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub symbols: Vec<String>,
    pub reports: Vec<MethodReport>,
    pub comparison: MethodComparison,
    pub advice: Advice,
    pub failed_symbols: Vec<String>,
}

/// Stateless facade over the whole pipeline. Every request builds its
/// data fresh; nothing is cached across calls.
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        provider: &dyn PriceProvider,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisReport> {
        let assets = validate_assets(&request.assets)?;
        let symbols: Vec<String> = assets.iter().map(|a| a.symbol.clone()).collect();
        info!("Analyzing {} assets over {}", symbols.len(), request.period);

        let outcome = market_data::fetch_all(provider, &symbols, &request.period);
        let matrix = ReturnMatrix::from_histories(&outcome.histories)?;

        let requested = |t: AnalysisType| {
            request.analysis_types.is_empty() || request.analysis_types.contains(&t)
        };

        let risk_metrics = if requested(AnalysisType::RiskMetrics) {
            let weights: HashMap<String, f64> =
                assets.iter().map(|a| (a.symbol.clone(), a.weight)).collect();
            let benchmark = self.benchmark_returns(provider, &request.period, matrix.n_rows());
            Some(statistics::risk_metrics(
                &matrix,
                &weights,
                benchmark.as_deref(),
            )?)
        } else {
            None
        };

        let outliers = if requested(AnalysisType::Outliers) {
            Some(outliers::detect_outliers(&matrix))
        } else {
            None
        };

        let correlation = if requested(AnalysisType::Correlation) {
            let (_, covariance) = statistics::annualized_moments(&matrix);
            let corr = statistics::correlation_matrix(&covariance);
            Some(corr.rows().into_iter().map(|row| row.to_vec()).collect())
        } else {
            None
        };

        Ok(AnalysisReport {
            symbols: matrix.symbols.clone(),
            risk_metrics,
            outliers,
            correlation,
            failed_symbols: outcome.failed_symbols,
        })
    }

    pub fn optimize(
        &self,
        provider: &dyn PriceProvider,
        request: &OptimizeRequest,
    ) -> Result<OptimizationReport> {
        let assets = validate_assets(&request.assets)?;
        let symbols: Vec<String> = assets.iter().map(|a| a.symbol.clone()).collect();

        let methods = if request.methods.is_empty() {
            OptimizationMethod::all()
        } else {
            request.methods.clone()
        };
        info!(
            "Optimizing {} assets with methods {:?}",
            symbols.len(),
            methods
        );

        let outcome = market_data::fetch_all(provider, &symbols, &request.period);
        let matrix = ReturnMatrix::from_histories(&outcome.histories)?;

        let (mean, covariance) = statistics::annualized_moments(&matrix);
        let moments = Moments {
            symbols: matrix.symbols.clone(),
            mean,
            covariance,
        };

        let mut settings = OptimizerSettings::from_config(&self.config.optimization);
        settings.objective = request.objective;
        settings.target_return = request.target_return;
        if let Some(rf) = request.risk_free_rate {
            settings.risk_free_rate = rf;
        }

        let reports = optimizer::run_methods(&moments, &methods, &settings);

        let comparison = match selector::select(&reports) {
            Ok(comparison) => comparison,
            Err(AnalyticsError::NoValidOptimization)
                if !reports.is_empty()
                    && reports.iter().all(|r| r.method == OptimizationMethod::Hybrid) =>
            {
                // A hybrid-only request cannot have its prerequisites.
                return Err(AnalyticsError::HybridUnavailable {
                    reason: "risk_parity and markowitz must also be requested".to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let advice = advisor::advise(&reports, matrix.n_assets());

        Ok(OptimizationReport {
            symbols: matrix.symbols.clone(),
            reports,
            comparison,
            advice,
            failed_symbols: outcome.failed_symbols,
        })
    }

    /// Daily benchmark returns aligned to the portfolio window, if the
    /// configured benchmark has enough history. Any shortfall just turns
    /// the beta fields off.
    fn benchmark_returns(
        &self,
        provider: &dyn PriceProvider,
        period: &str,
        n_rows: usize,
    ) -> Option<Vec<f64>> {
        let symbol = self.config.portfolio.benchmark.as_ref()?;
        let observations = match provider.fetch_history(symbol, period) {
            Ok(obs) => obs,
            Err(e) => {
                debug!("Benchmark {} unavailable: {}", symbol, e);
                return None;
            }
        };

        let returns: Vec<f64> = observations
            .windows(2)
            .filter(|pair| pair[0].close != 0.0)
            .map(|pair| pair[1].close / pair[0].close - 1.0)
            .filter(|r| r.is_finite())
            .collect();

        if returns.len() < n_rows {
            debug!(
                "Benchmark {} has {} returns, need {}; skipping beta",
                symbol,
                returns.len(),
                n_rows
            );
            return None;
        }
        Some(returns[returns.len() - n_rows..].to_vec())
    }
}

/// Deduplicate symbols (first occurrence wins) and enforce the 2-20
/// asset range before any computation happens.
fn validate_assets(assets: &[Asset]) -> Result<Vec<Asset>> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for asset in assets {
        if asset.symbol.trim().is_empty() {
            return Err(AnalyticsError::InvalidRequest(
                "asset symbol must not be empty".to_string(),
            ));
        }
        if seen.insert(asset.symbol.clone()) {
            deduped.push(asset.clone());
        }
    }

    if deduped.len() < 2 {
        return Err(AnalyticsError::InsufficientAssets {
            required: 2,
            actual: deduped.len(),
        });
    }
    if deduped.len() > MAX_ASSETS {
        return Err(AnalyticsError::InvalidRequest(format!(
            "at most {} assets per request, got {}",
            MAX_ASSETS,
            deduped.len()
        )));
    }
    Ok(deduped)
}
