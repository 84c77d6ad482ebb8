//! Single-symbol bar loop.
//!
//! Three phases per bar:
//! 1. Exit checks on the open position, in priority order: stop-loss,
//!    take-profit, holding-time cap, opposing signal.
//! 2. Entry on a fresh BUY/SHORT signal while flat. A bar that closed a
//!    position never re-opens one; the next signal gets the next bar.
//! 3. Mark-to-market equity sample at the bar close.
//!
//! The strategy sees the history prefix `[..=i]` exactly once per bar,
//! so look-ahead is structurally impossible.

use super::{
    entry_fill, finalize_trade, protective_exit, settle_cash, BacktestConfig, BacktestError,
    BacktestResult, OpenPosition, DEFAULT_POSITION_FRACTION,
};
use crate::domain::{ExitReason, PriceBar, Signal, SignalAction, Trade, TradeDirection};
use crate::strategies::{MarketSnapshot, Strategy};

fn opposes(direction: TradeDirection, action: SignalAction) -> bool {
    match direction {
        TradeDirection::Long => matches!(action, SignalAction::Sell | SignalAction::Short),
        TradeDirection::Short => matches!(action, SignalAction::Cover | SignalAction::Buy),
    }
}

/// Open a position from an entry signal, or None when the allocation
/// rounds below one share or exceeds available cash.
pub(crate) fn try_open(
    signal: &Signal,
    bar: &PriceBar,
    cash: f64,
    allocation_base: f64,
    config: &BacktestConfig,
) -> Option<(OpenPosition, f64, f64, f64)> {
    let direction = match signal.action {
        SignalAction::Buy => TradeDirection::Long,
        SignalAction::Short if config.allow_short => TradeDirection::Short,
        _ => return None,
    };

    let fraction = signal
        .position_size
        .unwrap_or(DEFAULT_POSITION_FRACTION)
        .clamp(0.0, 1.0);
    let allocation = allocation_base * fraction;
    let fill = entry_fill(bar.close, direction, config.slippage_rate);
    if fill <= 0.0 {
        return None;
    }
    let shares = (allocation / fill).floor();
    if shares < 1.0 {
        return None;
    }

    let notional = fill * shares;
    let commission = notional * config.commission_rate;
    let slippage = (fill - bar.close).abs() * shares;

    // Longs pay cash up front; shorts post the notional as collateral,
    // so both are bounded by the same cash check.
    if notional + commission > cash {
        return None;
    }
    let cash_delta = match direction {
        TradeDirection::Long => -(notional + commission),
        TradeDirection::Short => notional - commission,
    };

    let position = OpenPosition {
        direction,
        entry_date: bar.date,
        entry_price: fill,
        shares,
        stop_loss: signal.stop_loss,
        take_profit: signal.take_profit,
        commission,
        slippage,
    };
    Some((position, cash_delta, commission, slippage))
}

/// Replay one symbol through one strategy.
pub fn run_backtest(
    strategy: &dyn Strategy,
    symbol: &str,
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    if symbol.trim().is_empty() {
        return Err(BacktestError::InvalidArgument("symbol must not be empty".into()));
    }
    if bars.is_empty() {
        return Err(BacktestError::NoData(symbol.to_string()));
    }
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(BacktestError::InvalidArgument(format!(
                "bars for {symbol} must be strictly date-ascending"
            )));
        }
    }

    let warmup = strategy.required_history_days();
    let mut cash = config.initial_capital;
    let mut position: Option<OpenPosition> = None;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len() + 1);
    equity_curve.push(config.initial_capital);
    let mut total_commission = 0.0;
    let mut total_slippage = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        // One signal per bar, over the prefix ending at this bar.
        let signal = if i + 1 >= warmup {
            let snapshot = MarketSnapshot::new(symbol, &bars[..=i]);
            Some(strategy.analyze(&snapshot)?)
        } else {
            None
        };

        // ─── Phase 1: exits ───
        let exit = position.as_ref().and_then(|open| {
            protective_exit(open, bar)
                .or_else(|| {
                    config.max_holding_days.and_then(|cap| {
                        let held = (bar.date - open.entry_date).num_days();
                        (held >= cap as i64).then_some((bar.close, ExitReason::MaxHoldingDays))
                    })
                })
                .or_else(|| {
                    signal.as_ref().and_then(|s| {
                        opposes(open.direction, s.action)
                            .then_some((bar.close, ExitReason::Signal))
                    })
                })
        });

        let mut closed_this_bar = false;
        if let Some((raw_exit, reason)) = exit {
            if let Some(open) = position.take() {
                let direction = open.direction;
                let shares = open.shares;
                let (trade, exit_commission) = finalize_trade(
                    open,
                    symbol,
                    strategy.name(),
                    bar.date,
                    raw_exit,
                    reason,
                    config.commission_rate,
                    config.slippage_rate,
                );
                cash += settle_cash(direction, trade.exit_price, shares, exit_commission);
                total_commission += exit_commission;
                total_slippage += (raw_exit - trade.exit_price).abs() * shares;
                trades.push(trade);
            }
            closed_this_bar = true;
        }

        // ─── Phase 2: entries ───
        if position.is_none() && !closed_this_bar {
            if let Some(signal) = signal.as_ref() {
                if signal.action.is_entry() {
                    if let Some((open, cash_delta, commission, slippage)) =
                        try_open(signal, bar, cash, cash, config)
                    {
                        cash += cash_delta;
                        total_commission += commission;
                        total_slippage += slippage;
                        position = Some(open);
                    }
                }
            }
        }

        // ─── Phase 3: mark-to-market ───
        let marked = position
            .as_ref()
            .map_or(0.0, |open| open.market_value(bar.close));
        equity_curve.push(cash + marked);
    }

    // End of data: force-close at the last bar's close. The settlement
    // replaces the last sample so the curve ends at realized cash.
    if let Some(open) = position.take() {
        let last = &bars[bars.len() - 1];
        let direction = open.direction;
        let shares = open.shares;
        let (trade, exit_commission) = finalize_trade(
            open,
            symbol,
            strategy.name(),
            last.date,
            last.close,
            ExitReason::EndOfData,
            config.commission_rate,
            config.slippage_rate,
        );
        cash += settle_cash(direction, trade.exit_price, shares, exit_commission);
        total_commission += exit_commission;
        total_slippage += (last.close - trade.exit_price).abs() * shares;
        trades.push(trade);
        if let Some(sample) = equity_curve.last_mut() {
            *sample = cash;
        }
    }

    let final_capital = cash;
    Ok(BacktestResult {
        strategy: strategy.name().to_string(),
        symbol: symbol.to_string(),
        start_date: bars[0].date,
        end_date: bars[bars.len() - 1].date,
        bar_count: bars.len(),
        initial_capital: config.initial_capital,
        final_capital,
        total_return: (final_capital - config.initial_capital) / config.initial_capital,
        total_commission,
        total_slippage,
        trades,
        equity_curve,
    })
}
