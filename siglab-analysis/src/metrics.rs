//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: trade ledger and/or equity curve in,
//! scalar out. No dependencies on the engine internals.
//!
//! Sharpe convention: the ratio is computed over per-trade returns and
//! annualized with sqrt(252), treating each closed trade as one sample on
//! a daily grid. With sparse trading this overstates the annual figure,
//! but it ranks strategies consistently and works for the analyzer, which
//! sees only ledgers. Curve-based statistics (CAGR, volatility, Sortino)
//! use daily samples instead.

use serde::{Deserialize, Serialize};
use siglab_core::domain::Trade;

/// Sentinel for a ledger with gross profits and no gross losses.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single run or a trade ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // ── Trade-ledger statistics ──
    pub trade_count: usize,
    pub win_rate: f64,
    /// Mean per-trade return.
    pub average_return: f64,
    /// Mean return of winning trades; 0.0 when there are none.
    pub average_win: f64,
    /// Mean loss magnitude of losing trades (positive); 0.0 when none.
    pub average_loss: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub average_holding_days: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub sharpe: f64,
    /// Fraction of the traded span spent in a position, clamped to 1.0.
    pub exposure: f64,

    // ── Curve statistics ──
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_volatility: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Peak-to-trough decline as a positive fraction. Computed from the
    /// equity curve when one is supplied, otherwise from the curve built
    /// by compounding per-trade returns in ledger order.
    pub max_drawdown: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a trade ledger and an equity curve.
    ///
    /// The curve's leading sample is the starting capital, so its bar
    /// count is `len - 1`.
    pub fn compute(trades: &[Trade], equity_curve: &[f64], initial_capital: f64) -> Self {
        let has_curve = equity_curve.len() >= 2;
        let dd = if has_curve {
            max_drawdown(equity_curve)
        } else {
            max_drawdown(&compound_trade_curve(trades))
        };
        let growth = if has_curve { cagr(equity_curve) } else { 0.0 };

        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            average_return: average_return(trades),
            average_win: average_win(trades),
            average_loss: average_loss(trades),
            profit_factor: profit_factor(trades),
            expectancy: expectancy(trades),
            best_trade: best_trade(trades),
            worst_trade: worst_trade(trades),
            average_holding_days: average_holding_days(trades),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            sharpe: trade_sharpe(trades),
            exposure: exposure(trades),
            total_return: if has_curve {
                total_return(equity_curve, initial_capital)
            } else {
                compounded_return(trades)
            },
            cagr: growth,
            annualized_volatility: annualized_volatility(equity_curve),
            sortino: sortino_ratio(equity_curve),
            calmar: if dd > 0.0 && growth > 0.0 { growth / dd } else { 0.0 },
            max_drawdown: dd,
        }
    }

    /// Ledger-only view: curve statistics fall back to the compounded
    /// per-trade curve. Used by the analyzer, which never sees equity.
    pub fn from_trades(trades: &[Trade]) -> Self {
        Self::compute(trades, &[], 0.0)
    }
}

// ─── Trade-ledger metrics ───────────────────────────────────────────

/// Fraction of trades with positive net P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean per-trade return.
pub fn average_return(trades: &[Trade]) -> f64 {
    mean_f64(&returns_of(trades))
}

/// Mean return of winning trades only; 0.0 with no winners.
pub fn average_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.return_pct)
        .collect();
    mean_f64(&wins)
}

/// Mean loss magnitude of losing trades only; 0.0 with no losers.
pub fn average_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.return_pct.abs())
        .collect();
    mean_f64(&losses)
}

/// Profit factor: gross dollar profits / gross dollar losses.
///
/// Capped at [`PROFIT_FACTOR_CAP`] when there are no losses.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.profit_loss > 0.0)
        .map(|t| t.profit_loss)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.profit_loss < 0.0)
        .map(|t| t.profit_loss.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Expectancy per trade: win_rate * average_win - (1 - win_rate) * average_loss.
pub fn expectancy(trades: &[Trade]) -> f64 {
    let wr = win_rate(trades);
    wr * average_win(trades) - (1.0 - wr) * average_loss(trades)
}

/// Best single-trade return; 0.0 on an empty ledger.
pub fn best_trade(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades
        .iter()
        .map(|t| t.return_pct)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Worst single-trade return; 0.0 on an empty ledger.
pub fn worst_trade(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades
        .iter()
        .map(|t| t.return_pct)
        .fold(f64::INFINITY, f64::min)
}

/// Mean calendar days held per trade.
pub fn average_holding_days(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let total: i64 = trades.iter().map(|t| t.holding_days.max(0)).sum();
    total as f64 / trades.len() as f64
}

/// Maximum consecutive winning trades.
pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_consecutive(trades, true)
}

/// Maximum consecutive losing trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_consecutive(trades, false)
}

/// Annualized Sharpe over per-trade returns (see module doc).
///
/// Returns 0.0 with fewer than 2 trades or zero variance.
pub fn trade_sharpe(trades: &[Trade]) -> f64 {
    let returns = returns_of(trades);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Fraction of the span between first entry and last exit spent holding.
///
/// Overlapping positions can push the raw sum above the span, so the
/// value clamps to 1.0. A span of zero calendar days reports 0.0.
pub fn exposure(trades: &[Trade]) -> f64 {
    let first_entry = match trades.iter().map(|t| t.entry_date).min() {
        Some(date) => date,
        None => return 0.0,
    };
    let last_exit = match trades.iter().map(|t| t.exit_date).max() {
        Some(date) => date,
        None => return 0.0,
    };
    let span = (last_exit - first_entry).num_days();
    if span <= 0 {
        return 0.0;
    }
    let held: i64 = trades.iter().map(|t| t.holding_days.max(0)).sum();
    (held as f64 / span as f64).min(1.0)
}

// ─── Curve metrics ──────────────────────────────────────────────────

/// Total return as a fraction of starting capital.
pub fn total_return(equity_curve: &[f64], initial_capital: f64) -> f64 {
    if equity_curve.len() < 2 || initial_capital <= 0.0 {
        return 0.0;
    }
    let final_eq = *equity_curve.last().unwrap();
    (final_eq - initial_capital) / initial_capital
}

/// Compound Annual Growth Rate.
///
/// Assumes 252 trading days per year; the curve's leading sample is the
/// starting capital, so bar count is `len - 1`. Returns 0.0 for a
/// single-sample or non-positive curve.
pub fn cagr(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = *equity_curve.last().unwrap();
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = (equity_curve.len() - 1) as f64 / TRADING_DAYS_PER_YEAR;
    if years <= 0.0 {
        return 0.0;
    }
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized volatility: std of daily returns * sqrt(252).
pub fn annualized_volatility(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    std_dev(&returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than 2 bars.
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);

    // Downside deviation: only negative returns, over the full count.
    let downside_sq: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    if downside_sq.is_empty() {
        return 0.0;
    }
    let downside_std = (downside_sq.iter().sum::<f64>() / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean / downside_std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Maximum drawdown as a positive fraction (0.28 = 28% peak-to-trough).
///
/// Returns 0.0 if the curve is constant or monotonically increasing.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    if curve.len() < 2 {
        return 0.0;
    }
    let mut peak = curve[0];
    let mut max_dd = 0.0_f64;

    for &value in curve {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Cumulative multipliers from compounding per-trade returns in order.
///
/// Starts at 1.0 so a leading loss still registers as a drawdown.
pub fn compound_trade_curve(trades: &[Trade]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    let mut acc = 1.0;
    curve.push(acc);
    for trade in trades {
        acc *= 1.0 + trade.return_pct;
        curve.push(acc);
    }
    curve
}

fn compounded_return(trades: &[Trade]) -> f64 {
    match compound_trade_curve(trades).last() {
        Some(&acc) => acc - 1.0,
        None => 0.0,
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Compute daily returns from an equity curve.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn returns_of(trades: &[Trade]) -> Vec<f64> {
    trades.iter().map(|t| t.return_pct).collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            if current > max_streak {
                max_streak = current;
            }
        } else {
            current = 0;
        }
    }
    max_streak
}
