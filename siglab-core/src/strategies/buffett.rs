//! Buffett-style value strategy: quality gate first, then a discounted
//! owner-earnings valuation.
//!
//! Only businesses that clear the quality score are valued at all. The
//! valuation projects owner earnings forward with a capped growth rate,
//! discounts them, and adds a Gordon terminal value. Entries need a
//! margin of safety below intrinsic value; exits fire when price runs
//! well above it.

use super::{scale_position_size, validate_snapshot, MarketSnapshot, SignalError, Strategy};
use crate::domain::{FundamentalSnapshot, Signal, SignalAction, StrategyParams};

/// Growth assumed when neither earnings nor revenue growth is reported.
const FALLBACK_GROWTH: f64 = 0.05;

/// Composite business-quality score in [0, 100]. Missing fields score
/// zero for their bucket.
pub fn quality_score(fundamentals: &FundamentalSnapshot) -> f64 {
    let mut score = 0.0;
    if let Some(roe) = fundamentals.return_on_equity {
        score += if roe > 0.20 {
            30.0
        } else if roe > 0.15 {
            20.0
        } else if roe > 0.10 {
            10.0
        } else {
            0.0
        };
    }
    if let Some(margin) = fundamentals.profit_margin {
        score += if margin > 0.20 {
            25.0
        } else if margin > 0.10 {
            15.0
        } else if margin > 0.05 {
            5.0
        } else {
            0.0
        };
    }
    if let Some(de) = fundamentals.debt_to_equity {
        score += if de < 0.3 {
            25.0
        } else if de < 1.0 {
            15.0
        } else if de < 2.0 {
            5.0
        } else {
            0.0
        };
    }
    if let Some(current) = fundamentals.current_ratio {
        score += if current > 2.0 {
            20.0
        } else if current > 1.0 {
            10.0
        } else {
            0.0
        };
    }
    score
}

/// Two-stage DCF over owner earnings with a Gordon terminal value.
#[derive(Debug, Clone)]
pub struct BuffettValueStrategy {
    params: StrategyParams,
}

impl BuffettValueStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("discount_rate", 0.09),
                ("terminal_growth", 0.025),
                ("projection_years", 10.0),
                ("growth_cap", 0.15),
                ("margin_of_safety", 0.25),
                ("overvaluation_threshold", 0.25),
                ("min_quality_score", 60.0),
                ("min_history_days", 252.0),
                ("stop_pct", 0.15),
                ("max_position_size", 0.25),
            ]),
        }
    }

    /// Intrinsic value per share, or None when the inputs do not support
    /// a valuation (no positive owner earnings, unknown share count, or
    /// a discount rate at or below terminal growth).
    fn intrinsic_value(&self, fundamentals: &FundamentalSnapshot) -> Option<f64> {
        let owner_earnings = fundamentals.owner_earnings()?;
        if owner_earnings <= 0.0 {
            return None;
        }
        let shares = fundamentals.shares_outstanding?;
        if shares <= 0.0 {
            return None;
        }

        let p = &self.params;
        let discount = p.get_or("discount_rate", 0.09);
        let terminal_growth = p.get_or("terminal_growth", 0.025);
        if discount <= terminal_growth {
            return None;
        }
        let growth = fundamentals
            .earnings_growth
            .or(fundamentals.revenue_growth)
            .unwrap_or(FALLBACK_GROWTH)
            .clamp(0.0, p.get_or("growth_cap", 0.15));
        let years = p.get_period("projection_years", 10);

        let mut present_value = 0.0;
        let mut cash_flow = owner_earnings;
        for year in 1..=years {
            cash_flow *= 1.0 + growth;
            present_value += cash_flow / (1.0 + discount).powi(year as i32);
        }
        let terminal = cash_flow * (1.0 + terminal_growth) / (discount - terminal_growth);
        present_value += terminal / (1.0 + discount).powi(years as i32);

        Some(present_value / shares)
    }
}

impl Default for BuffettValueStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BuffettValueStrategy {
    fn name(&self) -> &str {
        "buffett_value"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        self.params.get_period("min_history_days", 252)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let fundamentals = match snapshot.fundamentals {
            Some(fundamentals) => fundamentals,
            None => return Ok(Signal::hold(snapshot.symbol, "Fundamental data unavailable")),
        };

        let p = &self.params;
        let quality = quality_score(fundamentals);
        if quality < p.get_or("min_quality_score", 60.0) {
            return Ok(
                Signal::hold(snapshot.symbol, "Quality score below the ownership bar")
                    .with_metadata("quality_score", quality),
            );
        }

        let intrinsic = match self.intrinsic_value(fundamentals) {
            Some(intrinsic) => intrinsic,
            None => {
                return Ok(Signal::hold(snapshot.symbol, "Intrinsic value not computable")
                    .with_metadata("quality_score", quality))
            }
        };

        let price = snapshot.bars[snapshot.bars.len() - 1].close;
        let margin = (intrinsic - price) / intrinsic;
        let required_margin = p.get_or("margin_of_safety", 0.25);

        if margin >= required_margin {
            let strength = 0.7 + (margin - required_margin).min(0.25);
            let stop = price * (1.0 - p.get_or("stop_pct", 0.15));
            let size = scale_position_size(
                p.get_or("max_position_size", 0.25),
                strength,
                None,
            );
            // Intrinsic value doubles as the price target.
            let signal = Signal::new(
                snapshot.symbol,
                SignalAction::Buy,
                strength,
                "Price offers a margin of safety below intrinsic value",
            )
            .with_levels(stop, intrinsic, size)
            .with_metadata("intrinsic_value", intrinsic)
            .with_metadata("margin_of_safety", margin)
            .with_metadata("quality_score", quality);
            return Ok(signal);
        }

        if price > intrinsic * (1.0 + p.get_or("overvaluation_threshold", 0.25)) {
            let signal = Signal::new(
                snapshot.symbol,
                SignalAction::Sell,
                0.7,
                "Price well above intrinsic value",
            )
            .with_metadata("intrinsic_value", intrinsic)
            .with_metadata("quality_score", quality);
            return Ok(signal);
        }

        Ok(Signal::hold(snapshot.symbol, "Price near intrinsic value")
            .with_metadata("intrinsic_value", intrinsic)
            .with_metadata("quality_score", quality))
    }
}
