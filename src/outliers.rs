use crate::returns::ReturnMatrix;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Z-score threshold for the first detection criterion.
const Z_SCORE_THRESHOLD: f64 = 3.0;
/// IQR multiplier for the second detection criterion.
const IQR_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetOutliers {
    pub symbol: String,
    pub outliers: Vec<ReturnPoint>,
    pub normals: Vec<ReturnPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub per_asset: Vec<AssetOutliers>,
    pub outlier_percentage: f64,
}

/// Flag anomalous daily returns per asset using the union of two
/// criteria: |z| > 3 against the column's own mean/sigma, and points
/// outside [Q1 - 1.5 IQR, Q3 + 1.5 IQR]. A zero-variance column yields
/// no outliers from either method.
pub fn detect_outliers(matrix: &ReturnMatrix) -> OutlierReport {
    let mut per_asset = Vec::with_capacity(matrix.n_assets());
    let mut total_outliers = 0usize;
    let mut total_points = 0usize;

    for (col, symbol) in matrix.symbols.iter().enumerate() {
        let returns: Vec<f64> = matrix.values.column(col).to_vec();
        let mean = returns.as_slice().mean();
        let std_dev = returns.as_slice().std_dev();
        let (q1, q3) = quartiles(&returns);
        let iqr = q3 - q1;
        let low_fence = q1 - IQR_MULTIPLIER * iqr;
        let high_fence = q3 + IQR_MULTIPLIER * iqr;

        let mut outliers = Vec::new();
        let mut normals = Vec::new();
        for (row, &value) in returns.iter().enumerate() {
            let z_flag = std_dev > 0.0 && ((value - mean) / std_dev).abs() > Z_SCORE_THRESHOLD;
            let iqr_flag = iqr > 0.0 && (value < low_fence || value > high_fence);
            let point = ReturnPoint {
                date: matrix.dates[row],
                value,
            };
            if z_flag || iqr_flag {
                outliers.push(point);
            } else {
                normals.push(point);
            }
        }

        debug!("{}: {} outliers of {} returns", symbol, outliers.len(), returns.len());
        total_outliers += outliers.len();
        total_points += returns.len();
        per_asset.push(AssetOutliers {
            symbol: symbol.clone(),
            outliers,
            normals,
        });
    }

    let outlier_percentage = if total_points > 0 {
        total_outliers as f64 / total_points as f64 * 100.0
    } else {
        0.0
    };

    OutlierReport {
        per_asset,
        outlier_percentage,
    }
}

/// First and third quartile with linear interpolation between order
/// statistics.
fn quartiles(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (interpolated(&sorted, 0.25), interpolated(&sorted, 0.75))
}

fn interpolated(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}
