use crate::optimizer::MethodReport;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Positive,
    Info,
    Caution,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub risk_level: RiskLevel,
    pub average_volatility: f64,
    pub suggestions: Vec<Suggestion>,
}

/// Deterministic rule set over the converged results: volatility bands,
/// best-Sharpe bands, and asset-count bands, each emitting at most one
/// tagged suggestion. The risk label follows the average volatility.
pub fn advise(reports: &[MethodReport], asset_count: usize) -> Advice {
    let volatilities: Vec<f64> = reports
        .iter()
        .filter_map(|r| r.result.as_ref())
        .map(|r| r.volatility)
        .collect();
    let best_sharpe = reports
        .iter()
        .filter_map(|r| r.result.as_ref())
        .map(|r| r.sharpe_ratio)
        .fold(f64::MIN, f64::max);

    let average_volatility = if volatilities.is_empty() {
        0.0
    } else {
        volatilities.as_slice().mean()
    };

    let mut suggestions = Vec::new();

    if average_volatility > 0.25 {
        suggestions.push(Suggestion {
            category: "risk".to_string(),
            severity: Severity::Warning,
            message: format!(
                "Average portfolio volatility is high ({:.1}%); consider adding defensive assets",
                average_volatility * 100.0
            ),
        });
    } else if average_volatility < 0.10 && !volatilities.is_empty() {
        suggestions.push(Suggestion {
            category: "risk".to_string(),
            severity: Severity::Positive,
            message: format!(
                "Portfolio volatility is low ({:.1}%) across methods",
                average_volatility * 100.0
            ),
        });
    }

    if !volatilities.is_empty() {
        if best_sharpe > 1.5 {
            suggestions.push(Suggestion {
                category: "performance".to_string(),
                severity: Severity::Positive,
                message: format!(
                    "Best risk-adjusted return is strong (Sharpe {:.2})",
                    best_sharpe
                ),
            });
        } else if best_sharpe < 0.5 {
            suggestions.push(Suggestion {
                category: "performance".to_string(),
                severity: Severity::Caution,
                message: format!(
                    "Risk-adjusted returns are weak (best Sharpe {:.2}); review asset selection",
                    best_sharpe
                ),
            });
        }
    }

    if asset_count < 5 {
        suggestions.push(Suggestion {
            category: "diversification".to_string(),
            severity: Severity::Info,
            message: format!(
                "Only {} assets; adding more could improve diversification",
                asset_count
            ),
        });
    } else if asset_count > 15 {
        suggestions.push(Suggestion {
            category: "complexity".to_string(),
            severity: Severity::Info,
            message: format!(
                "{} assets may be hard to monitor; consider consolidating",
                asset_count
            ),
        });
    }

    Advice {
        risk_level: risk_level(average_volatility),
        average_volatility,
        suggestions,
    }
}

fn risk_level(average_volatility: f64) -> RiskLevel {
    if average_volatility < 0.10 {
        RiskLevel::Low
    } else if average_volatility <= 0.25 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}
