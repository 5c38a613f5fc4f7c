pub mod advisor;
pub mod config;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod optimizer;
pub mod outliers;
pub mod returns;
pub mod selector;
pub mod statistics;
