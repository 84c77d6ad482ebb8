//! Siglab analysis — metrics, validation, and run orchestration.
//!
//! This crate builds on `siglab-core` to provide:
//! - Performance metrics over trade ledgers and equity curves
//! - Walk-forward analysis over rolling train/test windows
//! - Monte Carlo resampling of trade outcomes
//! - Cross-strategy correlation and combination recommendations
//! - TOML run configuration with a strategy factory
//! - CSV/synthetic bar loading and artifact export

pub mod analyzer;
pub mod config;
pub mod data;
pub mod export;
pub mod metrics;
pub mod monte_carlo;
pub mod walk_forward;

pub use analyzer::{CombinationRecommendation, CorrelationMatrix, StrategyTracker, ALL_STRATEGIES};
pub use config::{build_strategy, ConfigError, RunConfig, STRATEGY_NAMES};
pub use data::{
    dataset_hash, generate_synthetic_bars, load_bars_csv, load_trades_csv, LoadError,
};
pub use export::{
    load_artifacts, save_artifacts, save_portfolio_artifacts, PortfolioArtifact, RunArtifact,
    SCHEMA_VERSION,
};
pub use metrics::PerformanceMetrics;
pub use monte_carlo::{run_monte_carlo, McError, MonteCarloConfig, MonteCarloResult};
pub use walk_forward::{
    run_walk_forward, WalkForwardConfig, WalkForwardPeriod, WalkForwardResult, WalkForwardSummary,
};
