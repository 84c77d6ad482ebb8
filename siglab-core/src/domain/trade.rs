//! Trade — a completed round-trip with realized P&L.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    MaxHoldingDays,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::MaxHoldingDays => "max_holding_days",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

/// A finalized round-trip trade: entry → exit.
///
/// Created by the backtester when a position closes; never re-opened.
/// Friction fields cover both legs (entry + exit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub symbol: String,
    pub strategy: String,
    pub direction: TradeDirection,

    // ── Entry ──
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub shares: f64,

    // ── PnL ──
    pub commission_paid: f64,
    pub slippage_paid: f64,
    /// Net of commission and slippage.
    pub profit_loss: f64,
    /// Net return as a fraction of entry cost.
    pub return_pct: f64,

    // ── Duration ──
    pub holding_days: i64,
}

impl Trade {
    /// Net return as a fraction of entry cost, guarded against a degenerate
    /// entry. Stored in `return_pct` at construction; exposed for callers
    /// rebuilding trades from raw fields.
    pub fn compute_return(profit_loss: f64, entry_price: f64, shares: f64) -> f64 {
        let cost = entry_price * shares;
        if cost.abs() < f64::EPSILON {
            return 0.0;
        }
        profit_loss / cost
    }

    pub fn is_winner(&self) -> bool {
        self.profit_loss > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            symbol: "SPY".into(),
            strategy: "momentum".into(),
            direction: TradeDirection::Long,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_price: 100.0,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            exit_price: 110.0,
            exit_reason: ExitReason::TakeProfit,
            shares: 50.0,
            commission_paid: 10.5,
            slippage_paid: 5.25,
            profit_loss: 484.25,
            return_pct: 484.25 / 5_000.0,
            holding_days: 6,
        }
    }

    #[test]
    fn compute_return_guards_zero_cost() {
        assert_eq!(Trade::compute_return(100.0, 0.0, 50.0), 0.0);
        assert_eq!(Trade::compute_return(100.0, 100.0, 0.0), 0.0);
        let r = Trade::compute_return(484.25, 100.0, 50.0);
        assert!((r - 0.09685).abs() < 1e-10);
    }

    #[test]
    fn is_winner() {
        assert!(sample_trade().is_winner());
        let mut loser = sample_trade();
        loser.profit_loss = -12.0;
        assert!(!loser.is_winner());
    }

    #[test]
    fn exit_reason_strings() {
        assert_eq!(ExitReason::StopLoss.as_str(), "stop_loss");
        assert_eq!(ExitReason::MaxHoldingDays.as_str(), "max_holding_days");
        assert_eq!(TradeDirection::Short.as_str(), "short");
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        assert!(json.contains("\"take_profit\""));
        assert!(json.contains("\"long\""));
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade.symbol, deser.symbol);
        assert_eq!(trade.profit_loss, deser.profit_loss);
        assert_eq!(trade.exit_reason, deser.exit_reason);
    }
}
