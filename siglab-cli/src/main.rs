//! Siglab CLI — backtest, walk-forward, Monte Carlo, and ledger analysis.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file or strategy flags
//! - `walk-forward` — rolling train/test evaluation of one strategy
//! - `monte-carlo` — resample a trade ledger into outcome percentiles
//! - `analyze` — per-strategy stats, correlations, and a combination pick
//! - `strategies` — list buildable strategies with default parameters

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use siglab_analysis::analyzer::{StrategyTracker, ALL_STRATEGIES};
use siglab_analysis::config::{build_strategy, RunConfig, STRATEGY_NAMES};
use siglab_analysis::data::{
    dataset_hash, generate_synthetic_bars, load_bars_csv, load_trades_csv,
};
use siglab_analysis::export::{
    save_artifacts, save_portfolio_artifacts, PortfolioArtifact, RunArtifact,
};
use siglab_analysis::monte_carlo::{run_monte_carlo, MonteCarloConfig, MonteCarloResult};
use siglab_analysis::walk_forward::{run_walk_forward, WalkForwardConfig, WalkForwardResult};
use siglab_core::backtest::{
    run_backtest, run_portfolio_backtest, PortfolioConfig, PortfolioEntry,
};
use siglab_core::domain::PriceBar;

#[derive(Parser)]
#[command(
    name = "siglab",
    about = "Siglab — strategy signal and backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or strategy flags.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy name (alternative to --config). See `siglab strategies`.
        #[arg(long)]
        strategy: Option<String>,

        /// Symbol (used with --strategy). Defaults to SPY.
        #[arg(long)]
        symbol: Option<String>,

        /// Load bars from a CSV file (single-symbol runs only).
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Generate deterministic synthetic bars instead of loading data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Start date (YYYY-MM-DD). Defaults to 5 years ago for synthetic data.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today for synthetic data.
        #[arg(long)]
        end: Option<String>,

        /// Seed for synthetic data generation.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Evaluate a strategy over rolling train/test windows.
    WalkForward {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy name (alternative to --config).
        #[arg(long)]
        strategy: Option<String>,

        /// Symbol (used with --strategy). Defaults to SPY.
        #[arg(long)]
        symbol: Option<String>,

        /// Load bars from a CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Generate deterministic synthetic bars instead of loading data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Start date (YYYY-MM-DD). Defaults to 5 years ago for synthetic data.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today for synthetic data.
        #[arg(long)]
        end: Option<String>,

        /// Seed for synthetic data generation.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Training window in bars (overridden by the config file's section).
        #[arg(long, default_value_t = 252)]
        train_bars: usize,

        /// Test window in bars (overridden by the config file's section).
        #[arg(long, default_value_t = 63)]
        test_bars: usize,

        /// Stride between periods. Defaults to the test window.
        #[arg(long)]
        step: Option<usize>,
    },
    /// Resample a trade ledger into outcome percentiles.
    MonteCarlo {
        /// Path to a trades.csv written by `run`.
        #[arg(long)]
        trades: PathBuf,

        /// Number of resampled equity paths.
        #[arg(long, default_value_t = 1000)]
        simulations: usize,

        /// Trades drawn per simulation. Defaults to the ledger size.
        #[arg(long)]
        sample_size: Option<usize>,

        /// Master RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Per-strategy stats, correlation matrix, and a combination pick.
    Analyze {
        /// Path to a trades.csv (may span several strategies).
        #[arg(long)]
        trades: PathBuf,

        /// Number of strategies in the recommended combination.
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
    /// List buildable strategies with their default parameters.
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            strategy,
            symbol,
            csv,
            synthetic,
            start,
            end,
            seed,
            output_dir,
        } => run_cmd(
            config, strategy, symbol, csv, synthetic, start, end, seed, output_dir,
        ),
        Commands::WalkForward {
            config,
            strategy,
            symbol,
            csv,
            synthetic,
            start,
            end,
            seed,
            train_bars,
            test_bars,
            step,
        } => walk_forward_cmd(
            config, strategy, symbol, csv, synthetic, start, end, seed, train_bars, test_bars,
            step,
        ),
        Commands::MonteCarlo {
            trades,
            simulations,
            sample_size,
            seed,
        } => monte_carlo_cmd(&trades, simulations, sample_size, seed),
        Commands::Analyze { trades, top_k } => analyze_cmd(&trades, top_k),
        Commands::Strategies => strategies_cmd(),
    }
}

// ─── Run ────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    config_path: Option<PathBuf>,
    strategy_name: Option<String>,
    symbol: Option<String>,
    csv: Option<PathBuf>,
    synthetic: bool,
    start: Option<String>,
    end: Option<String>,
    seed: u64,
    output_dir: PathBuf,
) -> Result<()> {
    let run_config = resolve_run_config(config_path, strategy_name, symbol)?;
    let (start_date, end_date) = resolve_dates(&run_config, start.as_deref(), end.as_deref())?;

    let series = load_all_series(
        &run_config.backtest.symbols,
        csv.as_deref(),
        synthetic,
        start_date,
        end_date,
        seed,
    )?;
    let hash = dataset_hash(&series);
    let engine = run_config.backtest.engine_config();

    if series.len() == 1 && run_config.portfolio.is_none() {
        let strategy = run_config.build_strategy()?;
        let (sym, bars) = &series[0];
        let result = run_backtest(strategy.as_ref(), sym, bars, &engine)?;
        let artifact = RunArtifact::new(result, strategy.params().clone(), hash, synthetic);

        print_summary(&artifact);
        let run_dir = save_artifacts(&artifact, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    } else {
        let max_positions = run_config.portfolio.as_ref().map_or(5, |p| p.max_positions);
        let portfolio_config = PortfolioConfig {
            base: engine,
            max_positions,
        };

        // Probe instance just for the resolved parameter set.
        let params = run_config.build_strategy()?.params().clone();
        let entries = series
            .iter()
            .map(|(sym, bars)| {
                Ok(PortfolioEntry {
                    strategy: run_config.build_strategy()?,
                    symbol: sym.clone(),
                    weight: run_config.weight_for(sym),
                    bars: bars.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let result = run_portfolio_backtest(&entries, &portfolio_config)?;
        let artifact = PortfolioArtifact::new(result, params, hash, synthetic);

        print_portfolio_summary(&artifact);
        let run_dir = save_portfolio_artifacts(&artifact, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

// ─── Walk-forward ───────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn walk_forward_cmd(
    config_path: Option<PathBuf>,
    strategy_name: Option<String>,
    symbol: Option<String>,
    csv: Option<PathBuf>,
    synthetic: bool,
    start: Option<String>,
    end: Option<String>,
    seed: u64,
    train_bars: usize,
    test_bars: usize,
    step: Option<usize>,
) -> Result<()> {
    let run_config = resolve_run_config(config_path, strategy_name, symbol)?;
    if run_config.backtest.symbols.len() > 1 {
        bail!("walk-forward evaluates one symbol at a time");
    }
    let sym = &run_config.backtest.symbols[0];

    let (start_date, end_date) = resolve_dates(&run_config, start.as_deref(), end.as_deref())?;
    let bars = load_series(sym, csv.as_deref(), synthetic, start_date, end_date, seed)?;

    let wf_config = run_config
        .walk_forward
        .clone()
        .unwrap_or(WalkForwardConfig {
            train_bars,
            test_bars,
            step,
        });

    let strategy = run_config.build_strategy()?;
    let engine = run_config.backtest.engine_config();
    let result = run_walk_forward(strategy.as_ref(), sym, &bars, &wf_config, &engine)?;

    print_walk_forward(sym, &wf_config, &result);
    Ok(())
}

// ─── Monte Carlo ────────────────────────────────────────────────────

fn monte_carlo_cmd(
    trades_path: &Path,
    simulations: usize,
    sample_size: Option<usize>,
    seed: u64,
) -> Result<()> {
    let trades = load_trades_csv(trades_path)
        .with_context(|| format!("loading {}", trades_path.display()))?;
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();

    let config = MonteCarloConfig {
        simulations,
        sample_size,
        seed,
    };
    let result = run_monte_carlo(&returns, &config)?;
    print_monte_carlo(&result);
    Ok(())
}

// ─── Analyze ────────────────────────────────────────────────────────

fn analyze_cmd(trades_path: &Path, top_k: usize) -> Result<()> {
    let trades = load_trades_csv(trades_path)
        .with_context(|| format!("loading {}", trades_path.display()))?;
    if trades.is_empty() {
        bail!("{} has no trades", trades_path.display());
    }

    let mut tracker = StrategyTracker::new();
    tracker.load_trades(trades);
    let names = tracker.strategy_names();

    println!();
    println!("=== Per-Strategy Performance ===");
    println!(
        "{:<20} {:>7} {:>9} {:>11} {:>8} {:>8}",
        "Strategy", "Trades", "Win Rate", "Avg Return", "Sharpe", "Max DD"
    );
    println!("{}", "-".repeat(68));
    for name in &names {
        print_strategy_row(name, &tracker);
    }
    if names.len() > 1 {
        print_strategy_row(ALL_STRATEGIES, &tracker);
    }

    if names.len() > 1 {
        let matrix = tracker.correlation_matrix();
        println!();
        println!("=== Daily Return Correlation ===");
        for (i, name) in matrix.names.iter().enumerate() {
            println!("  [{i}] {name}");
        }
        print!("{:>7}", "");
        for i in 0..matrix.names.len() {
            print!("{:>7}", format!("[{i}]"));
        }
        println!();
        for (i, row) in matrix.values.iter().enumerate() {
            print!("{:>7}", format!("[{i}]"));
            for value in row {
                print!("{value:>7.2}");
            }
            println!();
        }
    }

    println!();
    match tracker.find_optimal_combination(top_k) {
        Some(rec) => {
            println!("=== Recommended Combination (top {top_k}) ===");
            for (name, weight) in rec.strategies.iter().zip(&rec.weights) {
                println!("  {:<20} weight {:>5.1}%", name, weight * 100.0);
            }
            println!("Expected Sharpe: {:.2}", rec.expected_sharpe);
        }
        None => println!("No combination available."),
    }
    println!();

    Ok(())
}

fn print_strategy_row(name: &str, tracker: &StrategyTracker) {
    let stats = tracker.stats_for(name);
    let label = if name == ALL_STRATEGIES { "(all)" } else { name };
    println!(
        "{:<20} {:>7} {:>8.1}% {:>10.3}% {:>8.2} {:>7.1}%",
        label,
        stats.trade_count,
        stats.win_rate * 100.0,
        stats.average_return * 100.0,
        stats.sharpe,
        stats.max_drawdown * 100.0
    );
}

// ─── Strategies ─────────────────────────────────────────────────────

fn strategies_cmd() -> Result<()> {
    println!();
    for name in STRATEGY_NAMES {
        let strategy = build_strategy(name, &BTreeMap::new())?;
        println!(
            "{name} (warmup {} days)",
            strategy.required_history_days()
        );
        for (key, value) in strategy.params().iter() {
            println!("    {key} = {value}");
        }
        println!();
    }
    Ok(())
}

// ─── Config and data resolution ─────────────────────────────────────

fn resolve_run_config(
    config_path: Option<PathBuf>,
    strategy_name: Option<String>,
    symbol: Option<String>,
) -> Result<RunConfig> {
    if config_path.is_some() && strategy_name.is_some() {
        bail!("--config and --strategy are mutually exclusive");
    }
    if config_path.is_none() && strategy_name.is_none() {
        bail!("one of --config or --strategy is required");
    }

    if let Some(path) = config_path {
        return Ok(RunConfig::from_file(&path)?);
    }

    let name = strategy_name.unwrap();
    let sym = symbol.as_deref().unwrap_or("SPY");

    // Build a TOML string and parse it so flag-driven runs go through the
    // same validation path as config files.
    let toml_str = format!(
        r#"[backtest]
symbols = ["{sym}"]

[strategy]
name = "{name}"
"#
    );
    Ok(RunConfig::from_toml(&toml_str)?)
}

/// Flags override config dates; both may stay unset for CSV data.
fn resolve_dates(
    config: &RunConfig,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let start_date = match start {
        Some(s) => Some(parse_date(s)?),
        None => config.backtest.start_date,
    };
    let end_date = match end {
        Some(s) => Some(parse_date(s)?),
        None => config.backtest.end_date,
    };
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s >= e {
            bail!("start date {s} is not before end date {e}");
        }
    }
    Ok((start_date, end_date))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{value}' (expected YYYY-MM-DD)"))
}

fn load_all_series(
    symbols: &[String],
    csv: Option<&Path>,
    synthetic: bool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    seed: u64,
) -> Result<Vec<(String, Vec<PriceBar>)>> {
    if symbols.len() > 1 && csv.is_some() {
        bail!("--csv loads a single symbol; use --synthetic for multi-symbol runs");
    }
    symbols
        .iter()
        .map(|sym| Ok((sym.clone(), load_series(sym, csv, synthetic, start, end, seed)?)))
        .collect()
}

fn load_series(
    symbol: &str,
    csv: Option<&Path>,
    synthetic: bool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    seed: u64,
) -> Result<Vec<PriceBar>> {
    match (csv, synthetic) {
        (Some(_), true) => bail!("--csv and --synthetic are mutually exclusive"),
        (None, false) => bail!("one of --csv or --synthetic is required"),
        (Some(path), false) => {
            let mut bars =
                load_bars_csv(path).with_context(|| format!("loading {}", path.display()))?;
            if let Some(s) = start {
                bars.retain(|b| b.date >= s);
            }
            if let Some(e) = end {
                bars.retain(|b| b.date <= e);
            }
            if bars.is_empty() {
                bail!("no bars within the requested date range");
            }
            Ok(bars)
        }
        (None, true) => {
            let today = chrono::Local::now().date_naive();
            let s = start.unwrap_or_else(|| today - chrono::Duration::days(365 * 5));
            let e = end.unwrap_or(today);
            Ok(generate_synthetic_bars(symbol, s, e, seed))
        }
    }
}

// ─── Output blocks ──────────────────────────────────────────────────

fn print_summary(artifact: &RunArtifact) {
    let r = &artifact.result;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", r.strategy);
    println!("Symbol:         {}", r.symbol);
    println!("Period:         {} to {}", r.start_date, r.end_date);
    println!("Bars:           {}", r.bar_count);
    println!("Final Capital:  ${:.2}", r.final_capital);
    println!("Commission:     ${:.2}", r.total_commission);
    println!("Slippage:       ${:.2}", r.total_slippage);
    print_metrics_block(&artifact.metrics);
    if artifact.synthetic_data {
        println!();
        println!("WARNING: results based on SYNTHETIC data");
    }
    println!();
}

fn print_portfolio_summary(artifact: &PortfolioArtifact) {
    let r = &artifact.result;
    println!();
    println!("=== Portfolio Result ===");
    if let (Some(first), Some(last)) = (r.dates.first(), r.dates.last()) {
        println!("Period:         {first} to {last}");
    }
    println!("Final Capital:  ${:.2}", r.final_capital);
    print_metrics_block(&artifact.metrics);
    println!();
    println!("--- Per Symbol ---");
    println!("{:<8} {:>7} {:>12} {:>9}", "Symbol", "Trades", "Net Profit", "Win Rate");
    println!("{}", "-".repeat(40));
    for (symbol, summary) in &r.per_symbol {
        println!(
            "{:<8} {:>7} {:>12.2} {:>8.1}%",
            symbol,
            summary.trades,
            summary.net_profit,
            summary.win_rate * 100.0
        );
    }
    if artifact.synthetic_data {
        println!();
        println!("WARNING: results based on SYNTHETIC data");
    }
    println!();
}

fn print_metrics_block(m: &siglab_analysis::PerformanceMetrics) {
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Expectancy:     {:.4}", m.expectancy);
    println!("Trades:         {}", m.trade_count);
    println!("Avg Hold Days:  {:.1}", m.average_holding_days);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    println!("Max Consec Win: {}", m.max_consecutive_wins);
    println!("Max Consec Loss:{}", m.max_consecutive_losses);
}

fn print_walk_forward(symbol: &str, config: &WalkForwardConfig, result: &WalkForwardResult) {
    println!();
    println!("=== Walk-Forward: {symbol} ===");
    println!(
        "Windows:        train {} / test {} bars",
        config.train_bars, config.test_bars
    );

    if result.periods.is_empty() {
        println!();
        println!("Not enough history for a single walk-forward period.");
        println!();
        return;
    }

    println!();
    println!(
        "{:<7} {:<26} {:>9} {:>8} {:>7}",
        "Period", "Test Span", "Return", "Sharpe", "Trades"
    );
    println!("{}", "-".repeat(62));
    for period in &result.periods {
        println!(
            "{:<7} {:<26} {:>8.2}% {:>8.2} {:>7}",
            period.period_index,
            format!("{} to {}", period.test_start, period.test_end),
            period.test_return * 100.0,
            period.test_metrics.sharpe,
            period.test_metrics.trade_count
        );
    }

    let s = &result.summary;
    println!();
    println!("Mean Return:    {:.2}%", s.mean_period_return * 100.0);
    println!("Median Return:  {:.2}%", s.median_period_return * 100.0);
    println!("Mean Sharpe:    {:.2}", s.mean_sharpe);
    println!(
        "Profitable:     {:.0}% of {} periods",
        s.profitable_periods * 100.0,
        s.periods
    );
    println!();
}

fn print_monte_carlo(result: &MonteCarloResult) {
    println!();
    println!("=== Monte Carlo ({} simulations) ===", result.simulations);
    if let Some(error) = &result.error {
        println!("WARNING: {error}");
        println!();
        return;
    }
    println!("Mean Return:    {:.2}%", result.mean_return * 100.0);
    println!("Median Return:  {:.2}%", result.median_return * 100.0);
    println!("5th Pctile:     {:.2}%", result.percentile_5 * 100.0);
    println!("25th Pctile:    {:.2}%", result.percentile_25 * 100.0);
    println!("75th Pctile:    {:.2}%", result.percentile_75 * 100.0);
    println!("95th Pctile:    {:.2}%", result.percentile_95 * 100.0);
    println!("Best Case:      {:.2}%", result.best_case * 100.0);
    println!("Worst Case:     {:.2}%", result.worst_case * 100.0);
    println!(
        "P(profit):      {:.1}%",
        result.probability_of_profit * 100.0
    );
    println!();
}
