//! Run configuration — TOML-described backtest runs.
//!
//! A run file has a `[backtest]` section (symbols, dates, capital,
//! frictions), a `[strategy]` section (name plus a parameter table), and
//! optional `[portfolio]`, `[walk_forward]` and `[monte_carlo]` sections.
//! Unknown parameter keys pass through to the strategy, which ignores
//! what it does not recognize.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use siglab_core::backtest::BacktestConfig;
use siglab_core::domain::StrategyParams;
use siglab_core::strategies::{
    BuffettValueStrategy, FourWeekRule, GarpStrategy, MaCrossoverStrategy, MeanReversionStrategy,
    MomentumStrategy, Strategy, SupportResistanceStrategy, TurtleStrategy,
};

use crate::monte_carlo::MonteCarloConfig;
use crate::walk_forward::WalkForwardConfig;

/// Every buildable strategy name, in listing order.
pub const STRATEGY_NAMES: [&str; 8] = [
    "momentum",
    "mean_reversion",
    "turtle",
    "four_week_rule",
    "support_resistance",
    "ma_crossover",
    "garp",
    "buffett_value",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub portfolio: Option<PortfolioSection>,
    #[serde(default)]
    pub walk_forward: Option<WalkForwardConfig>,
    #[serde(default)]
    pub monte_carlo: Option<MonteCarloConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_commission")]
    pub commission_rate: f64,
    #[serde(default = "default_slippage")]
    pub slippage_rate: f64,
    #[serde(default)]
    pub max_holding_days: Option<usize>,
    #[serde(default = "default_true")]
    pub allow_short: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySection {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSection {
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
    /// Symbol to capital-share mapping; empty means equal weights over
    /// the backtest symbols.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

fn default_capital() -> f64 {
    100_000.0
}
fn default_commission() -> f64 {
    0.001
}
fn default_slippage() -> f64 {
    0.0005
}
fn default_true() -> bool {
    true
}
fn default_max_positions() -> usize {
    5
}

// ─── Loading ─────────────────────────────────────────────────────────

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.symbols.is_empty() {
            return Err(ConfigError::Invalid("backtest.symbols is empty".into()));
        }
        if !STRATEGY_NAMES.contains(&self.strategy.name.as_str()) {
            return Err(ConfigError::UnknownStrategy(self.strategy.name.clone()));
        }
        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start >= end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {start} is not before end_date {end}"
                )));
            }
        }
        if let Some(portfolio) = &self.portfolio {
            if portfolio.max_positions == 0 {
                return Err(ConfigError::Invalid("portfolio.max_positions is 0".into()));
            }
            for symbol in portfolio.weights.keys() {
                if !self.backtest.symbols.contains(symbol) {
                    return Err(ConfigError::Invalid(format!(
                        "portfolio weight for {symbol} has no matching backtest symbol"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the configured strategy with its parameter overrides.
    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        build_strategy(&self.strategy.name, &self.strategy.params)
    }

    /// Weight for one symbol under the portfolio section (equal split
    /// when no explicit table is given).
    pub fn weight_for(&self, symbol: &str) -> f64 {
        match &self.portfolio {
            Some(p) if !p.weights.is_empty() => p.weights.get(symbol).copied().unwrap_or(0.0),
            _ => 1.0 / self.backtest.symbols.len() as f64,
        }
    }
}

impl BacktestSection {
    /// Engine-side view of this section.
    pub fn engine_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.initial_capital,
            commission_rate: self.commission_rate,
            slippage_rate: self.slippage_rate,
            max_holding_days: self.max_holding_days,
            allow_short: self.allow_short,
        }
    }
}

/// Construct a strategy by name and apply parameter overrides.
pub fn build_strategy(
    name: &str,
    overrides: &BTreeMap<String, f64>,
) -> Result<Box<dyn Strategy>, ConfigError> {
    let mut strategy: Box<dyn Strategy> = match name {
        "momentum" => Box::new(MomentumStrategy::new()),
        "mean_reversion" => Box::new(MeanReversionStrategy::new()),
        "turtle" => Box::new(TurtleStrategy::new()),
        "four_week_rule" => Box::new(FourWeekRule::new()),
        "support_resistance" => Box::new(SupportResistanceStrategy::new()),
        "ma_crossover" => Box::new(MaCrossoverStrategy::new()),
        "garp" => Box::new(GarpStrategy::new()),
        "buffett_value" => Box::new(BuffettValueStrategy::new()),
        other => return Err(ConfigError::UnknownStrategy(other.to_string())),
    };

    if !overrides.is_empty() {
        let mut params = StrategyParams::new();
        for (key, value) in overrides {
            params.set(key, *value);
        }
        strategy.set_params(&params);
    }
    Ok(strategy)
}
