use thiserror::Error;

/// Errors surfaced by the analytics pipeline.
///
/// `Convergence` is non-fatal at the request level: a single optimization
/// method failing to converge is recorded in its method report while the
/// remaining methods still run. Only `NoValidOptimization` aborts an
/// optimize request.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("insufficient assets: need at least {required}, got {actual}")]
    InsufficientAssets { required: usize, actual: usize },

    #[error("insufficient history: need at least {required} return observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("portfolio weights sum to {sum:.2}, expected 100 within a tolerance of {tolerance}")]
    WeightSum { sum: f64, tolerance: f64 },

    #[error("{method} optimization failed to converge: {reason}")]
    Convergence { method: String, reason: String },

    #[error("no optimization method produced a valid result")]
    NoValidOptimization,

    #[error("hybrid optimization unavailable: {reason}")]
    HybridUnavailable { reason: String },

    #[error("price data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
