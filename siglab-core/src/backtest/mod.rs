//! Bar-by-bar backtesting engines.
//!
//! Two entry points share one execution model:
//! - [`run_backtest`] replays a single symbol through one strategy.
//! - [`run_portfolio_backtest`] replays several (strategy, symbol,
//!   weight) entries against a shared capital pool.
//!
//! Per bar the engines run the same phases: exit checks on the open
//! position (stop-loss, take-profit, holding-time, opposing signal, in
//! that priority), then entry signals, then mark-to-market equity
//! sampling. Fills land on the signal bar's close adjusted by
//! direction-aware slippage; stops and targets trigger intrabar off the
//! bar's range and fill at the trigger level.

mod portfolio;
mod single;

pub use portfolio::{
    run_portfolio_backtest, PortfolioConfig, PortfolioEntry, PortfolioResult, SymbolSummary,
};
pub use single::run_backtest;

pub(crate) use single::try_open;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ExitReason, PriceBar, Trade, TradeDirection};
use crate::strategies::SignalError;

/// Fraction of capital committed when a signal carries no explicit size.
const DEFAULT_POSITION_FRACTION: f64 = 0.10;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("no price data for {0}")]
    NoData(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("signal generation failed: {0}")]
    Signal(#[from] SignalError),
}

/// Execution frictions and position-keeping rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Commission charged per leg as a fraction of notional.
    pub commission_rate: f64,
    /// Fill-price degradation per leg as a fraction of price.
    pub slippage_rate: f64,
    /// Calendar-day cap on a position's lifetime.
    pub max_holding_days: Option<usize>,
    pub allow_short: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0005,
            max_holding_days: None,
            allow_short: true,
        }
    }
}

impl BacktestConfig {
    pub(crate) fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(BacktestError::InvalidArgument(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.commission_rate < 0.0 || self.slippage_rate < 0.0 {
            return Err(BacktestError::InvalidArgument(
                "commission_rate and slippage_rate must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Completed single-symbol run: ledger plus the sampled equity path.
///
/// `equity_curve[0]` is the starting capital; every bar appends exactly
/// one mark-to-market sample after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub initial_capital: f64,
    pub final_capital: f64,
    /// Fractional return over the whole run.
    pub total_return: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

/// A position while it is open. Slippage is embedded in the fill
/// prices; commissions accumulate separately.
#[derive(Debug, Clone)]
pub(crate) struct OpenPosition {
    pub direction: TradeDirection,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub commission: f64,
    pub slippage: f64,
}

impl OpenPosition {
    /// Signed market value at `close`: longs add to equity, shorts are a
    /// liability to buy back.
    pub fn market_value(&self, close: f64) -> f64 {
        match self.direction {
            TradeDirection::Long => self.shares * close,
            TradeDirection::Short => -self.shares * close,
        }
    }
}

/// Entry fill: slippage moves the price against the trader.
pub(crate) fn entry_fill(close: f64, direction: TradeDirection, slippage_rate: f64) -> f64 {
    match direction {
        TradeDirection::Long => close * (1.0 + slippage_rate),
        TradeDirection::Short => close * (1.0 - slippage_rate),
    }
}

/// Exit fill: slippage again moves against the trader.
pub(crate) fn exit_fill(price: f64, direction: TradeDirection, slippage_rate: f64) -> f64 {
    match direction {
        TradeDirection::Long => price * (1.0 - slippage_rate),
        TradeDirection::Short => price * (1.0 + slippage_rate),
    }
}

/// Intrabar exit check in fixed priority order. Returns the raw trigger
/// price (before exit slippage) and the reason.
pub(crate) fn protective_exit(position: &OpenPosition, bar: &PriceBar) -> Option<(f64, ExitReason)> {
    match position.direction {
        TradeDirection::Long => {
            if let Some(stop) = position.stop_loss {
                if bar.low <= stop {
                    return Some((stop, ExitReason::StopLoss));
                }
            }
            if let Some(target) = position.take_profit {
                if bar.high >= target {
                    return Some((target, ExitReason::TakeProfit));
                }
            }
        }
        TradeDirection::Short => {
            if let Some(stop) = position.stop_loss {
                if bar.high >= stop {
                    return Some((stop, ExitReason::StopLoss));
                }
            }
            if let Some(target) = position.take_profit {
                if bar.low <= target {
                    return Some((target, ExitReason::TakeProfit));
                }
            }
        }
    }
    None
}

/// Close the books on a position and produce the finalized trade.
#[allow(clippy::too_many_arguments)]
pub(crate) fn finalize_trade(
    position: OpenPosition,
    symbol: &str,
    strategy: &str,
    exit_date: NaiveDate,
    raw_exit: f64,
    exit_reason: ExitReason,
    commission_rate: f64,
    slippage_rate: f64,
) -> (Trade, f64) {
    let fill = exit_fill(raw_exit, position.direction, slippage_rate);
    let exit_commission = fill * position.shares * commission_rate;
    let exit_slippage = (raw_exit - fill).abs() * position.shares;

    let gross = match position.direction {
        TradeDirection::Long => (fill - position.entry_price) * position.shares,
        TradeDirection::Short => (position.entry_price - fill) * position.shares,
    };
    let commission_paid = position.commission + exit_commission;
    let profit_loss = gross - commission_paid;
    let return_pct = Trade::compute_return(profit_loss, position.entry_price, position.shares);
    let holding_days = (exit_date - position.entry_date).num_days();

    let trade = Trade {
        symbol: symbol.to_string(),
        strategy: strategy.to_string(),
        direction: position.direction,
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_date,
        exit_price: fill,
        exit_reason,
        shares: position.shares,
        commission_paid,
        slippage_paid: position.slippage + exit_slippage,
        profit_loss,
        return_pct,
        holding_days,
    };
    (trade, exit_commission)
}

/// Cash delta when a closed position settles: longs receive the sale
/// proceeds, shorts pay to buy back.
pub(crate) fn settle_cash(direction: TradeDirection, fill: f64, shares: f64, commission: f64) -> f64 {
    match direction {
        TradeDirection::Long => fill * shares - commission,
        TradeDirection::Short => -(fill * shares) - commission,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn open_long() -> OpenPosition {
        OpenPosition {
            direction: TradeDirection::Long,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            entry_price: 100.0,
            shares: 10.0,
            stop_loss: Some(95.0),
            take_profit: Some(110.0),
            commission: 1.0,
            slippage: 0.5,
        }
    }

    fn bar(low: f64, high: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            open: 100.0,
            high,
            low,
            close: (low + high) / 2.0,
            volume: 1_000,
        }
    }

    #[test]
    fn stop_outranks_take_profit_on_a_wide_bar() {
        let position = open_long();
        // Bar spans both levels; the stop wins.
        let (price, reason) = protective_exit(&position, &bar(94.0, 111.0)).unwrap();
        assert_eq!(price, 95.0);
        assert_eq!(reason, ExitReason::StopLoss);
    }

    #[test]
    fn take_profit_triggers_off_the_high() {
        let position = open_long();
        let (price, reason) = protective_exit(&position, &bar(99.0, 111.0)).unwrap();
        assert_eq!(price, 110.0);
        assert_eq!(reason, ExitReason::TakeProfit);
    }

    #[test]
    fn quiet_bar_triggers_nothing() {
        let position = open_long();
        assert!(protective_exit(&position, &bar(99.0, 103.0)).is_none());
    }

    #[test]
    fn short_stop_triggers_off_the_high() {
        let mut position = open_long();
        position.direction = TradeDirection::Short;
        position.stop_loss = Some(105.0);
        position.take_profit = Some(90.0);
        let (price, reason) = protective_exit(&position, &bar(99.0, 106.0)).unwrap();
        assert_eq!(price, 105.0);
        assert_eq!(reason, ExitReason::StopLoss);
    }

    #[test]
    fn slippage_always_degrades_the_fill() {
        assert!(entry_fill(100.0, TradeDirection::Long, 0.001) > 100.0);
        assert!(entry_fill(100.0, TradeDirection::Short, 0.001) < 100.0);
        assert!(exit_fill(100.0, TradeDirection::Long, 0.001) < 100.0);
        assert!(exit_fill(100.0, TradeDirection::Short, 0.001) > 100.0);
    }

    #[test]
    fn finalize_trade_nets_out_both_legs() {
        let position = open_long();
        let exit_date = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let (trade, exit_commission) =
            finalize_trade(position, "AAPL", "momentum", exit_date, 110.0, ExitReason::TakeProfit, 0.001, 0.0);

        // Gross 100, minus entry commission 1.0 and exit commission 1.1.
        assert!((exit_commission - 1.1).abs() < 1e-9);
        assert!((trade.profit_loss - (100.0 - 2.1)).abs() < 1e-9);
        assert_eq!(trade.holding_days, 10);
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert!(trade.is_winner());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(BacktestConfig::default().validate().is_ok());
        let bad = BacktestConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(BacktestError::InvalidArgument(_))
        ));
    }
}
