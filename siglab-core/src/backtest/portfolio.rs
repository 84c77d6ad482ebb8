//! Shared-pool backtest across several (strategy, symbol, weight)
//! entries.
//!
//! Bars are processed in strict timestamp order over the union of every
//! entry's dates, never per-symbol batches, so the `max_positions`
//! ceiling and the cash balance always reflect the true simultaneous
//! state. A signal that arrives while the ceiling is hit is dropped,
//! not queued. Positions are keyed by entry index, so two strategies
//! may trade the same symbol independently.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    finalize_trade, protective_exit, settle_cash, try_open, BacktestConfig, BacktestError,
    OpenPosition,
};
use crate::domain::{ExitReason, PriceBar, Signal, SignalAction, Trade, TradeDirection};
use crate::strategies::{MarketSnapshot, Strategy};

/// One strategy/symbol lane inside the portfolio.
pub struct PortfolioEntry {
    pub strategy: Box<dyn Strategy>,
    pub symbol: String,
    /// Share of total equity this lane may deploy.
    pub weight: f64,
    pub bars: Vec<PriceBar>,
}

#[derive(Debug, Clone)]
pub struct PortfolioConfig {
    pub base: BacktestConfig,
    /// Ceiling on simultaneously open positions across all lanes.
    pub max_positions: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            base: BacktestConfig::default(),
            max_positions: 5,
        }
    }
}

/// Per-symbol slice of the portfolio ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub trades: usize,
    pub net_profit: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub trades: Vec<Trade>,
    /// `[0]` is the starting capital, then one sample per timeline date.
    pub equity_curve: Vec<f64>,
    pub dates: Vec<NaiveDate>,
    pub per_symbol: BTreeMap<String, SymbolSummary>,
}

fn validate_entries(entries: &[PortfolioEntry]) -> Result<(), BacktestError> {
    if entries.is_empty() {
        return Err(BacktestError::InvalidArgument(
            "portfolio needs at least one entry".into(),
        ));
    }
    let mut weight_sum = 0.0;
    for entry in entries {
        if entry.symbol.trim().is_empty() {
            return Err(BacktestError::InvalidArgument("symbol must not be empty".into()));
        }
        if entry.bars.is_empty() {
            return Err(BacktestError::NoData(entry.symbol.clone()));
        }
        for pair in entry.bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(BacktestError::InvalidArgument(format!(
                    "bars for {} must be strictly date-ascending",
                    entry.symbol
                )));
            }
        }
        if !(entry.weight.is_finite() && entry.weight > 0.0) {
            return Err(BacktestError::InvalidArgument(format!(
                "weight for {} must be positive, got {}",
                entry.symbol, entry.weight
            )));
        }
        weight_sum += entry.weight;
    }
    if weight_sum > 1.0 + 1e-9 {
        return Err(BacktestError::InvalidArgument(format!(
            "entry weights sum to {weight_sum:.4}, above 1.0"
        )));
    }
    Ok(())
}

fn marked_equity(
    cash: f64,
    positions: &BTreeMap<usize, OpenPosition>,
    last_close: &[Option<f64>],
) -> f64 {
    cash + positions
        .iter()
        .map(|(&k, open)| open.market_value(last_close[k].unwrap_or(open.entry_price)))
        .sum::<f64>()
}

/// Replay every lane against one shared capital pool.
pub fn run_portfolio_backtest(
    entries: &[PortfolioEntry],
    config: &PortfolioConfig,
) -> Result<PortfolioResult, BacktestError> {
    config.base.validate()?;
    if config.max_positions == 0 {
        return Err(BacktestError::InvalidArgument(
            "max_positions must be at least 1".into(),
        ));
    }
    validate_entries(entries)?;

    // Union timeline across all lanes, strictly ascending.
    let dates: Vec<NaiveDate> = entries
        .iter()
        .flat_map(|entry| entry.bars.iter().map(|bar| bar.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cash = config.base.initial_capital;
    let mut positions: BTreeMap<usize, OpenPosition> = BTreeMap::new();
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve = Vec::with_capacity(dates.len() + 1);
    equity_curve.push(config.base.initial_capital);

    // Per-lane walk state.
    let mut cursors = vec![0usize; entries.len()];
    let mut last_close: Vec<Option<f64>> = vec![None; entries.len()];
    let warmups: Vec<usize> = entries
        .iter()
        .map(|entry| entry.strategy.required_history_days())
        .collect();

    for &date in &dates {
        // Which lanes trade today, and on which bar of their own series.
        let mut today: Vec<Option<usize>> = vec![None; entries.len()];
        for (k, entry) in entries.iter().enumerate() {
            if cursors[k] < entry.bars.len() && entry.bars[cursors[k]].date == date {
                today[k] = Some(cursors[k]);
                cursors[k] += 1;
            }
        }

        // One signal per trading lane per date.
        let mut signals: Vec<Option<Signal>> = vec![None; entries.len()];
        for (k, entry) in entries.iter().enumerate() {
            if let Some(bar_index) = today[k] {
                if bar_index + 1 >= warmups[k] {
                    let prefix = &entry.bars[..=bar_index];
                    let snapshot = MarketSnapshot::new(&entry.symbol, prefix);
                    signals[k] = Some(entry.strategy.analyze(&snapshot)?);
                }
            }
        }

        // ─── Phase 1: exits, in lane order ───
        let mut closed_today = vec![false; entries.len()];
        let open_lanes: Vec<usize> = positions.keys().copied().collect();
        for k in open_lanes {
            let bar_index = match today[k] {
                Some(bar_index) => bar_index,
                None => continue,
            };
            let bar = &entries[k].bars[bar_index];
            let exit = positions.get(&k).and_then(|open| {
                protective_exit(open, bar)
                    .or_else(|| {
                        config.base.max_holding_days.and_then(|cap| {
                            let held = (bar.date - open.entry_date).num_days();
                            (held >= cap as i64).then_some((bar.close, ExitReason::MaxHoldingDays))
                        })
                    })
                    .or_else(|| {
                        signals[k].as_ref().and_then(|s| {
                            opposing(open.direction, s.action)
                                .then_some((bar.close, ExitReason::Signal))
                        })
                    })
            });
            if let Some((raw_exit, reason)) = exit {
                if let Some(open) = positions.remove(&k) {
                    let direction = open.direction;
                    let shares = open.shares;
                    let (trade, exit_commission) = finalize_trade(
                        open,
                        &entries[k].symbol,
                        entries[k].strategy.name(),
                        bar.date,
                        raw_exit,
                        reason,
                        config.base.commission_rate,
                        config.base.slippage_rate,
                    );
                    cash += settle_cash(direction, trade.exit_price, shares, exit_commission);
                    trades.push(trade);
                }
                closed_today[k] = true;
            }
        }

        // ─── Phase 2: entries, in lane order, bounded by the ceiling ───
        for (k, entry) in entries.iter().enumerate() {
            let bar_index = match today[k] {
                Some(bar_index) => bar_index,
                None => continue,
            };
            if positions.contains_key(&k) || closed_today[k] {
                continue;
            }
            if positions.len() >= config.max_positions {
                continue; // dropped, not queued
            }
            let signal = match signals[k].as_ref() {
                Some(signal) if signal.action.is_entry() => signal,
                _ => continue,
            };
            let bar = &entry.bars[bar_index];
            let equity = marked_equity(cash, &positions, &last_close);
            if let Some((open, cash_delta, _, _)) =
                try_open(signal, bar, cash, entry.weight * equity, &config.base)
            {
                cash += cash_delta;
                positions.insert(k, open);
            }
        }

        // ─── Phase 3: mark-to-market over the whole pool ───
        for (k, entry) in entries.iter().enumerate() {
            if let Some(bar_index) = today[k] {
                last_close[k] = Some(entry.bars[bar_index].close);
            }
        }
        equity_curve.push(marked_equity(cash, &positions, &last_close));
    }

    // Force-close stragglers at their own last close.
    let open_lanes: Vec<usize> = positions.keys().copied().collect();
    for k in open_lanes {
        if let Some(open) = positions.remove(&k) {
            let last = &entries[k].bars[entries[k].bars.len() - 1];
            let direction = open.direction;
            let shares = open.shares;
            let (trade, exit_commission) = finalize_trade(
                open,
                &entries[k].symbol,
                entries[k].strategy.name(),
                last.date,
                last.close,
                ExitReason::EndOfData,
                config.base.commission_rate,
                config.base.slippage_rate,
            );
            cash += settle_cash(direction, trade.exit_price, shares, exit_commission);
            trades.push(trade);
        }
    }
    if let Some(sample) = equity_curve.last_mut() {
        *sample = cash;
    }

    // Per-symbol breakdown.
    let mut per_symbol: BTreeMap<String, SymbolSummary> = BTreeMap::new();
    for trade in &trades {
        let summary = per_symbol.entry(trade.symbol.clone()).or_default();
        summary.trades += 1;
        summary.net_profit += trade.profit_loss;
        if trade.is_winner() {
            summary.win_rate += 1.0;
        }
    }
    for summary in per_symbol.values_mut() {
        if summary.trades > 0 {
            summary.win_rate /= summary.trades as f64;
        }
    }

    let final_capital = cash;
    Ok(PortfolioResult {
        initial_capital: config.base.initial_capital,
        final_capital,
        total_return: (final_capital - config.base.initial_capital)
            / config.base.initial_capital,
        trades,
        equity_curve,
        dates,
        per_symbol,
    })
}

fn opposing(direction: TradeDirection, action: SignalAction) -> bool {
    match direction {
        TradeDirection::Long => matches!(action, SignalAction::Sell | SignalAction::Short),
        TradeDirection::Short => matches!(action, SignalAction::Cover | SignalAction::Buy),
    }
}
