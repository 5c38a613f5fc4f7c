use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

/// One daily bar for a symbol. Close prices drive the whole pipeline;
/// volume is carried through for context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// Boundary to whatever supplies historical prices. Implementations are
/// expected to return observations in ascending date order.
#[cfg_attr(test, automock)]
pub trait PriceProvider {
    fn fetch_history(&self, symbol: &str, period: &str) -> Result<Vec<PriceObservation>>;
}

/// Fetched histories plus the symbols that could not be fetched. A partial
/// failure is tolerated here; the return-matrix builder enforces the
/// minimum asset count on what remains.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub histories: HashMap<String, Vec<PriceObservation>>,
    pub failed_symbols: Vec<String>,
}

pub fn fetch_all(provider: &dyn PriceProvider, symbols: &[String], period: &str) -> FetchOutcome {
    let mut histories = HashMap::new();
    let mut failed_symbols = Vec::new();

    for symbol in symbols {
        match provider.fetch_history(symbol, period) {
            Ok(observations) => {
                debug!("Fetched {} observations for {}", observations.len(), symbol);
                histories.insert(symbol.clone(), observations);
            }
            Err(e) => {
                warn!("Skipping {}: {}", symbol, e);
                failed_symbols.push(symbol.clone());
            }
        }
    }

    info!(
        "Fetched price history for {}/{} symbols",
        histories.len(),
        symbols.len()
    );

    FetchOutcome {
        histories,
        failed_symbols,
    }
}

/// Reads per-symbol JSON fixtures (`<data_dir>/<SYMBOL>.json`, an array of
/// observations) for the demo binary and tests.
#[derive(Debug, Clone)]
pub struct FilePriceProvider {
    data_dir: PathBuf,
}

impl FilePriceProvider {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl PriceProvider for FilePriceProvider {
    fn fetch_history(&self, symbol: &str, _period: &str) -> Result<Vec<PriceObservation>> {
        let path = self.data_dir.join(format!("{}.json", symbol));
        let contents = fs::read_to_string(&path).map_err(|e| AnalyticsError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

        let observations: Vec<PriceObservation> =
            serde_json::from_str(&contents).map_err(|e| AnalyticsError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("malformed fixture: {}", e),
            })?;

        Ok(observations)
    }
}
