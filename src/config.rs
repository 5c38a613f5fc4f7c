use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub portfolio: PortfolioConfig,
    pub optimization: OptimizationConfig,
}

/// Assets and data window used by the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub symbols: Vec<String>,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub benchmark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: f64,
    #[serde(default = "default_tau")]
    pub tau: f64,
    #[serde(default = "default_equilibrium_confidence")]
    pub equilibrium_confidence: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
}

fn default_period() -> String {
    "1y".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_min_weight() -> f64 {
    0.01 // 1% floor keeps every requested asset represented
}

fn default_max_weight() -> f64 {
    0.80 // 80% cap prevents single-asset concentration
}

fn default_risk_free_rate() -> f64 {
    0.02 // 2% annual
}

fn default_risk_aversion() -> f64 {
    3.0 // delta for implied equilibrium returns
}

fn default_tau() -> f64 {
    0.025 // prior uncertainty scaling
}

fn default_equilibrium_confidence() -> f64 {
    0.75 // reported verbatim, never derived from data
}

fn default_max_iterations() -> u64 {
    500
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            risk_free_rate: default_risk_free_rate(),
            risk_aversion: default_risk_aversion(),
            tau: default_tau(),
            equilibrium_confidence: default_equilibrium_confidence(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            portfolio: PortfolioConfig {
                symbols: vec![
                    "AAPL".to_string(),
                    "MSFT".to_string(),
                    "GOOGL".to_string(),
                    "JNJ".to_string(),
                    "XOM".to_string(),
                ],
                period: default_period(),
                data_dir: default_data_dir(),
                benchmark: Some("SPY".to_string()),
            },
            optimization: OptimizationConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_file("config.json")
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not read {}: {}. Using default configuration.", path, e);
                return Ok(Self::default());
            }
        };

        let config: AnalyticsConfig = serde_json::from_str(&config_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.optimization.min_weight, 0.01);
        assert_eq!(config.optimization.max_weight, 0.80);
        assert!(config.optimization.min_weight < config.optimization.max_weight);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AnalyticsConfig::load_from_file("does_not_exist.json").unwrap();
        assert_eq!(config.portfolio.symbols.len(), 5);
    }

    #[test]
    fn test_partial_config_uses_field_defaults() {
        let json = r#"{
            "portfolio": { "symbols": ["AAPL", "MSFT"] },
            "optimization": { "risk_free_rate": 0.03 }
        }"#;
        let config: AnalyticsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.optimization.risk_free_rate, 0.03);
        assert_eq!(config.optimization.max_weight, 0.80);
        assert_eq!(config.portfolio.period, "1y");
    }
}
