use chrono::NaiveDate;
use portfolio_analytics::config::AnalyticsConfig;
use portfolio_analytics::engine::{AnalyticsEngine, AnalyzeRequest, Asset};
use portfolio_analytics::error::{AnalyticsError, Result};
use portfolio_analytics::market_data::{PriceObservation, PriceProvider};
use portfolio_analytics::statistics;
use proptest::prelude::*;
use std::collections::HashMap;

struct SyntheticProvider {
    series: HashMap<String, Vec<PriceObservation>>,
}

impl SyntheticProvider {
    fn new() -> Self {
        Self {
            series: HashMap::new(),
        }
    }

    fn with_returns(mut self, symbol: &str, returns: &[f64]) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut price = 100.0;
        let mut observations = vec![PriceObservation {
            date: start,
            close: price,
            volume: 1_000_000.0,
        }];
        for (i, &r) in returns.iter().enumerate() {
            price *= 1.0 + r;
            observations.push(PriceObservation {
                date: start + chrono::Duration::days(i as i64 + 1),
                close: price,
                volume: 1_000_000.0,
            });
        }
        self.series.insert(symbol.to_string(), observations);
        self
    }
}

impl PriceProvider for SyntheticProvider {
    fn fetch_history(&self, symbol: &str, _period: &str) -> Result<Vec<PriceObservation>> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| AnalyticsError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no synthetic series".to_string(),
            })
    }
}

fn noisy_returns(n: usize, scale: f64, seed: u64) -> Vec<f64> {
    // Small deterministic LCG, mapped to roughly zero-mean noise.
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            (unit - 0.5) * 2.0 * scale
        })
        .collect()
}

fn assets(entries: &[(&str, f64)]) -> Vec<Asset> {
    entries
        .iter()
        .map(|(symbol, weight)| Asset {
            symbol: symbol.to_string(),
            weight: *weight,
        })
        .collect()
}

fn analyze_request(entries: &[(&str, f64)]) -> AnalyzeRequest {
    AnalyzeRequest {
        assets: assets(entries),
        period: "1y".to_string(),
        analysis_types: Vec::new(),
    }
}

fn provider_two_assets() -> SyntheticProvider {
    SyntheticProvider::new()
        .with_returns("AAA", &noisy_returns(120, 0.01, 7))
        .with_returns("BBB", &noisy_returns(120, 0.02, 99))
}

#[test]
fn analyze_produces_all_sections_by_default() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let report = engine
        .analyze(&provider_two_assets(), &analyze_request(&[("AAA", 50.0), ("BBB", 50.0)]))
        .unwrap();

    assert_eq!(report.symbols.len(), 2);
    assert!(report.failed_symbols.is_empty());
    let metrics = report.risk_metrics.expect("risk metrics requested");
    assert!(metrics.annualized_volatility > 0.0);
    assert!(metrics.max_drawdown <= 0.0);
    assert!(metrics.value_at_risk_95 <= 0.0);
    assert!(metrics.conditional_value_at_risk_95 <= metrics.value_at_risk_95);
    // Benchmark symbol has no data in this provider.
    assert!(metrics.beta.is_none());

    let outliers = report.outliers.expect("outliers requested");
    assert_eq!(outliers.per_asset.len(), 2);

    let correlation = report.correlation.expect("correlation requested");
    assert_eq!(correlation.len(), 2);
    assert!((correlation[0][0] - 1.0).abs() < 1e-12);
    assert!(correlation[0][1].abs() <= 1.0);
}

#[test]
fn analyze_is_deterministic_across_calls() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let provider = provider_two_assets();
    let request = analyze_request(&[("AAA", 60.0), ("BBB", 40.0)]);

    let first = engine.analyze(&provider, &request).unwrap().risk_metrics.unwrap();
    let second = engine.analyze(&provider, &request).unwrap().risk_metrics.unwrap();

    assert_eq!(first.annualized_volatility, second.annualized_volatility);
    assert_eq!(first.value_at_risk_95, second.value_at_risk_95);
    assert_eq!(first.conditional_value_at_risk_95, second.conditional_value_at_risk_95);
    assert_eq!(first.max_drawdown, second.max_drawdown);
}

#[test]
fn analyze_tolerates_missing_symbol_when_two_remain() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let report = engine
        .analyze(
            &provider_two_assets(),
            &analyze_request(&[("AAA", 34.0), ("BBB", 33.0), ("GONE", 33.0)]),
        )
        .unwrap();

    assert_eq!(report.failed_symbols, vec!["GONE".to_string()]);
    assert_eq!(report.symbols.len(), 2);
}

#[test]
fn analyze_fails_when_only_one_symbol_has_data() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let err = engine
        .analyze(
            &provider_two_assets(),
            &analyze_request(&[("AAA", 50.0), ("GONE", 50.0)]),
        )
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InsufficientAssets { .. }));
}

#[test]
fn single_asset_request_is_insufficient() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let err = engine
        .analyze(&provider_two_assets(), &analyze_request(&[("AAA", 100.0)]))
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InsufficientAssets { actual: 1, .. }));
}

#[test]
fn twenty_one_assets_rejected_before_any_fetch() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let entries: Vec<(String, f64)> = (0..21).map(|i| (format!("S{}", i), 100.0 / 21.0)).collect();
    let request = AnalyzeRequest {
        assets: entries
            .iter()
            .map(|(s, w)| Asset {
                symbol: s.clone(),
                weight: *w,
            })
            .collect(),
        period: "1y".to_string(),
        analysis_types: Vec::new(),
    };
    // Provider has no data at all; validation must fire first.
    let err = engine
        .analyze(&SyntheticProvider::new(), &request)
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidRequest(_)));
}

#[test]
fn weights_far_from_hundred_are_rejected() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let err = engine
        .analyze(&provider_two_assets(), &analyze_request(&[("AAA", 30.0), ("BBB", 30.0)]))
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::WeightSum { .. }));
}

#[test]
fn injected_spike_shows_up_in_outlier_report() {
    let mut returns = noisy_returns(80, 0.005, 42);
    returns[40] = 0.30;
    let provider = SyntheticProvider::new()
        .with_returns("SPIKY", &returns)
        .with_returns("PLAIN", &noisy_returns(80, 0.005, 43));

    let engine = AnalyticsEngine::new(AnalyticsConfig::default());
    let report = engine
        .analyze(&provider, &analyze_request(&[("SPIKY", 50.0), ("PLAIN", 50.0)]))
        .unwrap();

    let outliers = report.outliers.unwrap();
    let spiky = outliers
        .per_asset
        .iter()
        .find(|a| a.symbol == "SPIKY")
        .unwrap();
    assert!(spiky.outliers.iter().any(|p| (p.value - 0.30).abs() < 1e-9));
    assert!(outliers.outlier_percentage > 0.0);
}

proptest! {
    #[test]
    fn max_drawdown_never_positive(returns in prop::collection::vec(-0.5f64..0.5, 1..200)) {
        prop_assert!(statistics::max_drawdown(&returns) <= 0.0);
    }

    #[test]
    fn cvar_never_exceeds_var(returns in prop::collection::vec(-0.2f64..0.2, 5..150)) {
        let var = statistics::value_at_risk(&returns);
        let cvar = statistics::conditional_value_at_risk(&returns);
        prop_assert!(cvar <= var + 1e-12);
    }
}
