use anyhow::Result;
use log::{error, info};
use portfolio_analytics::config::AnalyticsConfig;
use portfolio_analytics::engine::{AnalyticsEngine, AnalyzeRequest, Asset, OptimizeRequest};
use portfolio_analytics::market_data::FilePriceProvider;
use std::env;

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG not set
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();
    info!("Starting portfolio analytics engine");

    // Get config file from command line argument or use default
    let args: Vec<String> = env::args().collect();
    let config_file = if args.len() > 1 {
        &args[1]
    } else {
        "config.json"
    };

    info!("Loading configuration from: {}", config_file);
    let config = AnalyticsConfig::load_from_file(config_file)?;

    let provider = FilePriceProvider::new(&config.portfolio.data_dir);
    let symbols = config.portfolio.symbols.clone();
    let period = config.portfolio.period.clone();

    // Equal informational weights for the risk-metrics path.
    let equal_weight = 100.0 / symbols.len() as f64;
    let assets: Vec<Asset> = symbols
        .iter()
        .map(|symbol| Asset {
            symbol: symbol.clone(),
            weight: equal_weight,
        })
        .collect();

    let engine = AnalyticsEngine::new(config);

    let analyze_request = AnalyzeRequest {
        assets: assets.clone(),
        period: period.clone(),
        analysis_types: Vec::new(),
    };
    match engine.analyze(&provider, &analyze_request) {
        Ok(report) => {
            if let Some(metrics) = &report.risk_metrics {
                info!(
                    "Portfolio risk: return {:.2}%, volatility {:.2}%, Sharpe {:.2}, max drawdown {:.2}%",
                    metrics.annualized_return * 100.0,
                    metrics.annualized_volatility * 100.0,
                    metrics.sharpe_ratio,
                    metrics.max_drawdown * 100.0
                );
            }
            if let Some(outliers) = &report.outliers {
                info!("Outliers: {:.2}% of return observations", outliers.outlier_percentage);
            }
            if !report.failed_symbols.is_empty() {
                info!("Symbols without data: {:?}", report.failed_symbols);
            }
        }
        Err(e) => error!("Analysis failed: {}", e),
    }

    let optimize_request = OptimizeRequest {
        assets,
        period,
        objective: Default::default(),
        target_return: None,
        risk_free_rate: None,
        methods: Vec::new(),
    };
    match engine.optimize(&provider, &optimize_request) {
        Ok(report) => {
            for score in &report.comparison.ranking {
                info!(
                    "{}: score {:.2}, return {:.2}%, volatility {:.2}%, Sharpe {:.2}",
                    score.method,
                    score.score,
                    score.expected_return * 100.0,
                    score.volatility * 100.0,
                    score.sharpe_ratio
                );
            }
            info!("Recommended method: {}", report.comparison.best_method);
            for suggestion in &report.advice.suggestions {
                info!("[{}] {}", suggestion.category, suggestion.message);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Err(e) => error!("Optimization failed: {}", e),
    }

    Ok(())
}
