use crate::error::{AnalyticsError, Result};
use crate::market_data::PriceObservation;
use chrono::NaiveDate;
use log::{debug, warn};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Minimum usable assets for any portfolio computation.
pub const MIN_ASSETS: usize = 2;
/// Minimum daily return observations after alignment.
pub const MIN_RETURN_ROWS: usize = 10;

/// Aligned daily simple returns: one column per asset, one row per trading
/// date. Columns follow `symbols` order, rows follow `dates` order
/// (ascending). Built once per request and shared by every downstream stage.
#[derive(Debug, Clone)]
pub struct ReturnMatrix {
    pub symbols: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub values: Array2<f64>,
}

impl ReturnMatrix {
    /// Align price histories of uneven length and convert to returns.
    ///
    /// Series are truncated to the shortest common length keeping the most
    /// recent observations, percentage-changed, and the first (undefined)
    /// return row dropped. Rows containing a non-finite return are dropped
    /// as well. Dates are taken from the shortest surviving series.
    pub fn from_histories(histories: &HashMap<String, Vec<PriceObservation>>) -> Result<Self> {
        let mut usable: Vec<(&String, &Vec<PriceObservation>)> = histories
            .iter()
            .filter(|(symbol, obs)| {
                if obs.len() < 2 {
                    warn!(
                        "Dropping {}: only {} price observations",
                        symbol,
                        obs.len()
                    );
                    false
                } else {
                    true
                }
            })
            .collect();
        // Deterministic column order regardless of HashMap iteration.
        usable.sort_by(|a, b| a.0.cmp(b.0));

        if usable.len() < MIN_ASSETS {
            return Err(AnalyticsError::InsufficientAssets {
                required: MIN_ASSETS,
                actual: usable.len(),
            });
        }

        let min_len = usable
            .iter()
            .map(|(_, obs)| obs.len())
            .min()
            .unwrap_or(0);

        let symbols: Vec<String> = usable.iter().map(|(s, _)| (*s).clone()).collect();
        debug!(
            "Aligning {} symbols to {} observations each",
            symbols.len(),
            min_len
        );

        // Right-aligned close matrix: the last min_len observations of each
        // series, so all assets share the most recent window.
        let n_assets = symbols.len();
        let mut closes = Array2::zeros((min_len, n_assets));
        for (col, (_, obs)) in usable.iter().enumerate() {
            let tail = &obs[obs.len() - min_len..];
            for (row, o) in tail.iter().enumerate() {
                closes[[row, col]] = o.close;
            }
        }

        // Dates come from the shortest series, which defines the window.
        let shortest = usable
            .iter()
            .min_by_key(|(_, obs)| obs.len())
            .map(|(_, obs)| *obs)
            .unwrap_or(usable[0].1);
        let aligned_dates: Vec<NaiveDate> = shortest[shortest.len() - min_len..]
            .iter()
            .map(|o| o.date)
            .collect();

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(min_len.saturating_sub(1));
        let mut dates: Vec<NaiveDate> = Vec::with_capacity(min_len.saturating_sub(1));
        for row in 1..min_len {
            let mut returns = Vec::with_capacity(n_assets);
            let mut finite = true;
            for col in 0..n_assets {
                let prev = closes[[row - 1, col]];
                let curr = closes[[row, col]];
                let r = if prev != 0.0 {
                    curr / prev - 1.0
                } else {
                    f64::NAN
                };
                if !r.is_finite() {
                    finite = false;
                }
                returns.push(r);
            }
            if finite {
                rows.push(returns);
                dates.push(aligned_dates[row]);
            }
        }

        if rows.len() < MIN_RETURN_ROWS {
            return Err(AnalyticsError::InsufficientHistory {
                required: MIN_RETURN_ROWS,
                actual: rows.len(),
            });
        }

        let mut values = Array2::zeros((rows.len(), n_assets));
        for (i, row) in rows.iter().enumerate() {
            for (j, &r) in row.iter().enumerate() {
                values[[i, j]] = r;
            }
        }

        Ok(Self {
            symbols,
            dates,
            values,
        })
    }

    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, symbol: &str) -> Option<Array1<f64>> {
        let idx = self.symbols.iter().position(|s| s == symbol)?;
        Some(self.values.column(idx).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(closes: &[f64]) -> Vec<PriceObservation> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceObservation {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_aligns_to_shortest_series_keeping_recent() {
        let mut histories = HashMap::new();
        // 15 observations vs 12: alignment keeps the last 12 of the longer.
        let long: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let short: Vec<f64> = (0..12).map(|i| 50.0 + i as f64).collect();
        histories.insert("LONG".to_string(), history(&long));
        histories.insert("SHORT".to_string(), history(&short));

        let matrix = ReturnMatrix::from_histories(&histories).unwrap();
        assert_eq!(matrix.n_assets(), 2);
        // 12 aligned closes -> 11 returns
        assert_eq!(matrix.n_rows(), 11);

        // First aligned return of LONG uses closes 103 -> 104.
        let col = matrix.column("LONG").unwrap();
        assert!((col[0] - (104.0 / 103.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_single_asset_rejected() {
        let mut histories = HashMap::new();
        histories.insert("ONLY".to_string(), history(&[100.0, 101.0, 102.0]));
        let err = ReturnMatrix::from_histories(&histories).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientAssets { actual: 1, .. }));
    }

    #[test]
    fn test_too_little_history_rejected() {
        let mut histories = HashMap::new();
        histories.insert("A".to_string(), history(&[100.0, 101.0, 102.0, 103.0]));
        histories.insert("B".to_string(), history(&[50.0, 51.0, 52.0, 53.0]));
        let err = ReturnMatrix::from_histories(&histories).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientHistory { .. }));
    }

    #[test]
    fn test_short_series_dropped_before_count_check() {
        let mut histories = HashMap::new();
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        histories.insert("A".to_string(), history(&closes));
        histories.insert("B".to_string(), history(&closes));
        histories.insert("STUB".to_string(), history(&[100.0]));

        let matrix = ReturnMatrix::from_histories(&histories).unwrap();
        assert_eq!(matrix.symbols, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_columns_sorted_by_symbol() {
        let mut histories = HashMap::new();
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        histories.insert("ZED".to_string(), history(&closes));
        histories.insert("ABC".to_string(), history(&closes));
        let matrix = ReturnMatrix::from_histories(&histories).unwrap();
        assert_eq!(matrix.symbols, vec!["ABC".to_string(), "ZED".to_string()]);
    }
}
