//! Artifact export — JSON and CSV generation for completed runs.
//!
//! A run produces a directory of three artifacts:
//! - `result.json` — the full [`RunArtifact`] with schema versioning
//! - `trades.csv` — the closed-trade ledger (round-trips through
//!   `data::load_trades_csv`)
//! - `equity.csv` — bar-by-bar equity curve
//!
//! Persisted JSON includes a `schema_version` field. Versions newer than
//! this build understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use siglab_core::backtest::{BacktestResult, PortfolioResult};
use siglab_core::domain::{StrategyParams, Trade};

use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete record of a single run: the engine result flattened to the
/// top level, its computed metrics, and data provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(flatten)]
    pub result: BacktestResult,
    pub metrics: PerformanceMetrics,
    /// Resolved strategy parameters, for reproducing the run.
    pub params: StrategyParams,
    pub dataset_hash: String,
    pub synthetic_data: bool,
}

/// Default schema version for deserializing older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunArtifact {
    /// Bundle an engine result with freshly computed metrics.
    pub fn new(
        result: BacktestResult,
        params: StrategyParams,
        dataset_hash: String,
        synthetic_data: bool,
    ) -> Self {
        let metrics = PerformanceMetrics::compute(
            &result.trades,
            &result.equity_curve,
            result.initial_capital,
        );
        Self {
            schema_version: SCHEMA_VERSION,
            result,
            metrics,
            params,
            dataset_hash,
            synthetic_data,
        }
    }
}

/// Artifact for a portfolio run, with the same envelope as [`RunArtifact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioArtifact {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(flatten)]
    pub result: PortfolioResult,
    pub metrics: PerformanceMetrics,
    pub params: StrategyParams,
    pub dataset_hash: String,
    pub synthetic_data: bool,
}

impl PortfolioArtifact {
    pub fn new(
        result: PortfolioResult,
        params: StrategyParams,
        dataset_hash: String,
        synthetic_data: bool,
    ) -> Self {
        let metrics = PerformanceMetrics::compute(
            &result.trades,
            &result.equity_curve,
            result.initial_capital,
        );
        Self {
            schema_version: SCHEMA_VERSION,
            result,
            metrics,
            params,
            dataset_hash,
            synthetic_data,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a [`RunArtifact`] to pretty JSON.
pub fn export_json(artifact: &RunArtifact) -> Result<String> {
    serde_json::to_string_pretty(artifact).context("failed to serialize RunArtifact to JSON")
}

/// Deserialize a [`RunArtifact`] from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunArtifact> {
    let artifact: RunArtifact =
        serde_json::from_str(json).context("failed to deserialize RunArtifact from JSON")?;
    if artifact.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            artifact.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(artifact)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade ledger as CSV.
///
/// Column names match the `Trade` field names and enum values use their
/// snake_case tokens, so `data::load_trades_csv` reads this back.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "strategy",
        "direction",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "exit_reason",
        "shares",
        "commission_paid",
        "slippage_paid",
        "profit_loss",
        "return_pct",
        "holding_days",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.symbol,
            &t.strategy,
            t.direction.as_str(),
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            t.exit_reason.as_str(),
            &format!("{:.6}", t.shares),
            &format!("{:.2}", t.commission_paid),
            &format!("{:.2}", t.slippage_paid),
            &format!("{:.2}", t.profit_loss),
            &format!("{:.6}", t.return_pct),
            &t.holding_days.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with bar_index and equity columns.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates a directory named `{symbol}_{timestamp}/` under `output_dir`
/// containing `result.json`, `trades.csv` and `equity.csv`. Returns the
/// path to the created directory.
pub fn save_artifacts(artifact: &RunArtifact, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        artifact.result.symbol,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(artifact)?;
    std::fs::write(run_dir.join("result.json"), &json)?;

    let trades_csv = export_trades_csv(&artifact.result.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&artifact.result.equity_curve)?;
    std::fs::write(run_dir.join("equity.csv"), &equity_csv)?;

    Ok(run_dir)
}

/// Load a [`RunArtifact`] back from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<RunArtifact> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Save the artifact set for a portfolio run under `portfolio_{timestamp}/`.
pub fn save_portfolio_artifacts(
    artifact: &PortfolioArtifact,
    output_dir: &Path,
) -> Result<PathBuf> {
    let dirname = format!("portfolio_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = serde_json::to_string_pretty(artifact)
        .context("failed to serialize PortfolioArtifact to JSON")?;
    std::fs::write(run_dir.join("result.json"), &json)?;

    let trades_csv = export_trades_csv(&artifact.result.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&artifact.result.equity_curve)?;
    std::fs::write(run_dir.join("equity.csv"), &equity_csv)?;

    Ok(run_dir)
}
