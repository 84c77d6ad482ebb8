//! Walk-forward analysis — rolling out-of-sample evaluation windows.
//!
//! Splits history into consecutive train/test spans and backtests each
//! test span in isolation. Strategy parameters stay fixed across periods
//! (no per-window re-optimization), so the sequence of test-span metrics
//! is the strategy's out-of-sample record.
//!
//! Default geometry: 252 training bars (one year), 63 test bars (one
//! quarter), stepping by one test window so test spans tile the history
//! without gaps or overlap.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use siglab_core::backtest::{run_backtest, BacktestConfig, BacktestError};
use siglab_core::domain::{PriceBar, Trade};
use siglab_core::strategies::Strategy;

use crate::metrics::{mean_f64, PerformanceMetrics};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Training window length in bars (default 252 = 1 year).
    pub train_bars: usize,
    /// Test window length in bars (default 63 = 1 quarter).
    pub test_bars: usize,
    /// Stride between period starts; `None` means one test window, which
    /// makes consecutive test spans contiguous and non-overlapping.
    pub step: Option<usize>,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_bars: 252,
            test_bars: 63,
            step: None,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Bar-index layout of one period (end-exclusive ranges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpec {
    pub period_index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// One out-of-sample evaluation window with its realized metrics.
///
/// Boundary dates are inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardPeriod {
    pub period_index: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    /// Return of the test-span backtest.
    pub test_return: f64,
    pub test_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub periods: usize,
    pub mean_period_return: f64,
    pub median_period_return: f64,
    pub mean_sharpe: f64,
    /// Fraction of periods with a positive test-span return.
    pub profitable_periods: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub periods: Vec<WalkForwardPeriod>,
    /// Trades pooled across every test span, in period order.
    pub all_trades: Vec<Trade>,
    pub summary: WalkForwardSummary,
}

// ─── Period layout ───────────────────────────────────────────────────

/// Lay out rolling train/test periods over `total_bars`.
///
/// Returns an empty vector when the history is shorter than one full
/// train+test span. That is a valid outcome, not an error.
pub fn create_periods(total_bars: usize, config: &WalkForwardConfig) -> Vec<PeriodSpec> {
    let step = config.step.unwrap_or(config.test_bars).max(1);
    let mut specs = Vec::new();
    let mut start = 0;
    let mut index = 0;

    loop {
        let train_end = start + config.train_bars;
        let test_end = train_end + config.test_bars;
        if test_end > total_bars {
            break;
        }
        specs.push(PeriodSpec {
            period_index: index,
            train_start: start,
            train_end,
            test_start: train_end,
            test_end,
        });
        index += 1;
        start += step;
    }
    specs
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Run walk-forward analysis over one symbol's history.
///
/// Each test span is backtested strictly on its own slice; the strategy
/// warms up inside the span with whatever history the slice provides.
/// Spans share no state, so they are evaluated in parallel and the
/// results assembled in period order.
pub fn run_walk_forward(
    strategy: &dyn Strategy,
    symbol: &str,
    bars: &[PriceBar],
    config: &WalkForwardConfig,
    backtest: &BacktestConfig,
) -> Result<WalkForwardResult, BacktestError> {
    if config.train_bars == 0 || config.test_bars == 0 {
        return Err(BacktestError::InvalidArgument(
            "walk-forward windows must be at least one bar".into(),
        ));
    }

    let specs = create_periods(bars.len(), config);
    let results = specs
        .par_iter()
        .map(|spec| {
            let test_slice = &bars[spec.test_start..spec.test_end];
            run_backtest(strategy, symbol, test_slice, backtest)
        })
        .collect::<Result<Vec<_>, BacktestError>>()?;

    let mut periods = Vec::with_capacity(specs.len());
    let mut all_trades = Vec::new();

    for (spec, result) in specs.iter().zip(results) {
        let test_metrics = PerformanceMetrics::compute(
            &result.trades,
            &result.equity_curve,
            backtest.initial_capital,
        );
        all_trades.extend(result.trades);

        periods.push(WalkForwardPeriod {
            period_index: spec.period_index,
            train_start: bars[spec.train_start].date,
            train_end: bars[spec.train_end - 1].date,
            test_start: bars[spec.test_start].date,
            test_end: bars[spec.test_end - 1].date,
            test_return: result.total_return,
            test_metrics,
        });
    }

    let summary = summarize(&periods);
    Ok(WalkForwardResult {
        periods,
        all_trades,
        summary,
    })
}

fn summarize(periods: &[WalkForwardPeriod]) -> WalkForwardSummary {
    if periods.is_empty() {
        return WalkForwardSummary::default();
    }
    let mut returns: Vec<f64> = periods.iter().map(|p| p.test_return).collect();
    let sharpes: Vec<f64> = periods.iter().map(|p| p.test_metrics.sharpe).collect();
    let profitable = returns.iter().filter(|&&r| r > 0.0).count();

    WalkForwardSummary {
        periods: periods.len(),
        mean_period_return: mean_f64(&returns),
        median_period_return: median(&mut returns),
        mean_sharpe: mean_f64(&sharpes),
        profitable_periods: profitable as f64 / periods.len() as f64,
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
