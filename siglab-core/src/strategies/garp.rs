//! GARP: growth at a reasonable price.
//!
//! Screens fundamentals for the classic Lynch profile (low PEG, real
//! earnings and revenue growth, sane leverage) and grades the entry by
//! whether price trades above its trend average. Without fundamental
//! data the strategy always holds.

use super::{degrade, scale_position_size, validate_snapshot, MarketSnapshot, SignalError, Strategy};
use crate::domain::{Signal, SignalAction, StrategyParams};
use crate::indicators::sma;

/// Everything the screen needs in one place. `None` fields that a
/// criterion depends on fail that criterion.
struct Screen {
    peg: f64,
    pe: f64,
    earnings_ok: bool,
    revenue_ok: bool,
    leverage_ok: bool,
    uptrend: bool,
}

/// Fundamental growth screen with trend confirmation.
#[derive(Debug, Clone)]
pub struct GarpStrategy {
    params: StrategyParams,
}

impl GarpStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("peg_max", 1.0),
                ("peg_good", 1.5),
                ("peg_overvalued", 2.5),
                ("min_earnings_growth", 0.10),
                ("min_revenue_growth", 0.10),
                ("pe_min", 5.0),
                ("pe_max", 40.0),
                ("max_debt_to_equity", 1.0),
                ("trend_period", 50.0),
                ("min_history_days", 252.0),
                ("stop_pct", 0.08),
                ("reward_ratio", 2.5),
                ("max_position_size", 0.15),
            ]),
        }
    }

    fn buy(&self, snapshot: &MarketSnapshot, strength: f64, reason: &str, screen: &Screen) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let stop_pct = self.params.get_or("stop_pct", 0.08);
        let stop = entry_price * (1.0 - stop_pct);
        let target = entry_price * (1.0 + stop_pct * self.params.get_or("reward_ratio", 2.5));
        let size =
            scale_position_size(self.params.get_or("max_position_size", 0.15), strength, None);
        Signal::new(snapshot.symbol, SignalAction::Buy, strength, reason)
            .with_levels(stop, target, size)
            .with_metadata("peg", screen.peg)
            .with_metadata("pe_ratio", screen.pe)
    }
}

impl Default for GarpStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for GarpStrategy {
    fn name(&self) -> &str {
        "garp"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        p.get_period("min_history_days", 252)
            .max(p.get_period("trend_period", 50) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let fundamentals = match snapshot.fundamentals {
            Some(fundamentals) => fundamentals,
            None => return Ok(Signal::hold(snapshot.symbol, "Fundamental data unavailable")),
        };
        let (peg, pe) = match (fundamentals.effective_peg(), fundamentals.pe_ratio) {
            (Some(peg), Some(pe)) => (peg, pe),
            _ => return Ok(Signal::hold(snapshot.symbol, "Incomplete fundamentals")),
        };

        let closes = snapshot.closes();
        let price = closes[closes.len() - 1];
        let p = &self.params;
        let trend = match sma(&closes, p.get_period("trend_period", 50)) {
            Ok(trend) => trend,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        let screen = Screen {
            peg,
            pe,
            earnings_ok: fundamentals.earnings_growth.unwrap_or(0.0)
                >= p.get_or("min_earnings_growth", 0.10),
            revenue_ok: fundamentals.revenue_growth.unwrap_or(0.0)
                >= p.get_or("min_revenue_growth", 0.10),
            leverage_ok: fundamentals
                .debt_to_equity
                .map(|d| d <= p.get_or("max_debt_to_equity", 1.0))
                .unwrap_or(false),
            uptrend: price > trend,
        };

        let pe_ok = pe >= p.get_or("pe_min", 5.0) && pe <= p.get_or("pe_max", 40.0);
        let core = peg <= p.get_or("peg_max", 1.0)
            && screen.earnings_ok
            && screen.revenue_ok
            && pe_ok
            && screen.leverage_ok;

        if core && screen.uptrend {
            return Ok(self.buy(
                snapshot,
                0.85,
                "Growth at a reasonable price in an uptrend",
                &screen,
            ));
        }
        if core {
            return Ok(self.buy(
                snapshot,
                0.6,
                "Growth at a reasonable price without trend support",
                &screen,
            ));
        }
        if peg <= p.get_or("peg_good", 1.5) && screen.earnings_ok && screen.uptrend {
            return Ok(self.buy(
                snapshot,
                0.55,
                "Moderately priced growth in an uptrend",
                &screen,
            ));
        }
        if peg > p.get_or("peg_overvalued", 2.5) || pe > p.get_or("pe_max", 40.0) {
            let signal = Signal::new(
                snapshot.symbol,
                SignalAction::Sell,
                0.6,
                "Valuation stretched beyond the growth rate",
            )
            .with_metadata("peg", peg)
            .with_metadata("pe_ratio", pe);
            return Ok(signal);
        }

        Ok(Signal::hold(snapshot.symbol, "Valuation and growth are unremarkable")
            .with_metadata("peg", peg)
            .with_metadata("pe_ratio", pe))
    }
}
