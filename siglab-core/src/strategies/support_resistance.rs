//! Support and resistance from swing pivots.
//!
//! A swing high is a bar whose high tops every bar within `swing_window`
//! on both sides; swing lows mirror that. The nearest pivot below the
//! price is support, the nearest above is resistance, and signals fire
//! when the close comes within `proximity_pct` of either level.

use super::{
    degrade, protective_levels, scale_position_size, validate_snapshot, MarketSnapshot,
    SignalError, Strategy,
};
use crate::domain::{PriceBar, Signal, SignalAction, StrategyParams, TradeDirection};
use crate::indicators::{atr, rsi};

struct Levels {
    support: Option<f64>,
    resistance: Option<f64>,
    rsi: f64,
    atr: f64,
}

/// Pivot-level fade with RSI corroboration.
#[derive(Debug, Clone)]
pub struct SupportResistanceStrategy {
    params: StrategyParams,
}

/// Pivot highs and lows over the trailing window, oldest first. Ties
/// resolve to the earliest bar of a flat extreme.
fn swing_pivots(bars: &[PriceBar], window: usize) -> (Vec<f64>, Vec<f64>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    if bars.len() < 2 * window + 1 {
        return (highs, lows);
    }
    for i in window..bars.len() - window {
        let center = &bars[i];
        let left = &bars[i - window..i];
        let right = &bars[i + 1..=i + window];
        if left.iter().all(|b| b.high < center.high) && right.iter().all(|b| b.high <= center.high)
        {
            highs.push(center.high);
        }
        if left.iter().all(|b| b.low > center.low) && right.iter().all(|b| b.low >= center.low) {
            lows.push(center.low);
        }
    }
    (highs, lows)
}

impl SupportResistanceStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("lookback", 60.0),
                ("swing_window", 5.0),
                ("proximity_pct", 0.02),
                ("rsi_period", 14.0),
                ("rsi_oversold", 35.0),
                ("rsi_overbought", 65.0),
                ("atr_period", 14.0),
                ("stop_atr_multiple", 1.5),
                ("reward_ratio", 2.0),
                ("max_position_size", 0.15),
            ]),
        }
    }

    fn compute(&self, snapshot: &MarketSnapshot) -> Result<Levels, crate::indicators::IndicatorError> {
        let closes = snapshot.closes();
        let price = closes[closes.len() - 1];
        let p = &self.params;
        let window = p.get_period("swing_window", 5);
        let span = p.get_period("lookback", 60) + 2 * window;

        // Pivots come from bars before the latest close.
        let prior = &snapshot.bars[..snapshot.bars.len() - 1];
        let start = prior.len().saturating_sub(span);
        let (pivot_highs, pivot_lows) = swing_pivots(&prior[start..], window);

        let support = pivot_lows
            .iter()
            .copied()
            .filter(|&level| level <= price)
            .fold(None, |best: Option<f64>, level| {
                Some(best.map_or(level, |b| b.max(level)))
            });
        let resistance = pivot_highs
            .iter()
            .copied()
            .filter(|&level| level >= price)
            .fold(None, |best: Option<f64>, level| {
                Some(best.map_or(level, |b| b.min(level)))
            });

        Ok(Levels {
            support,
            resistance,
            rsi: rsi(&closes, p.get_period("rsi_period", 14))?,
            atr: atr(snapshot.bars, p.get_period("atr_period", 14))?,
        })
    }

    fn long_entry(&self, snapshot: &MarketSnapshot, strength: f64, reason: &str, levels: &Levels) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let proximity = self.params.get_or("proximity_pct", 0.02);
        let support = levels.support.unwrap_or(entry_price);
        // Stop just beyond the level; target at the opposite level when
        // one exists.
        let stop = (support * (1.0 - proximity)).max(entry_price * 0.01);
        let (_, fallback_target) = protective_levels(
            entry_price,
            TradeDirection::Long,
            self.params.get_or("stop_atr_multiple", 1.5) * levels.atr,
            self.params.get_or("reward_ratio", 2.0),
        );
        let target = levels
            .resistance
            .filter(|&r| r > entry_price)
            .unwrap_or(fallback_target);
        let size =
            scale_position_size(self.params.get_or("max_position_size", 0.15), strength, None);
        Signal::new(snapshot.symbol, SignalAction::Buy, strength, reason)
            .with_levels(stop, target, size)
            .with_metadata("support", support)
            .with_metadata("rsi", levels.rsi)
    }

    fn short_entry(&self, snapshot: &MarketSnapshot, strength: f64, reason: &str, levels: &Levels) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let proximity = self.params.get_or("proximity_pct", 0.02);
        let resistance = levels.resistance.unwrap_or(entry_price);
        let stop = resistance * (1.0 + proximity);
        let (_, fallback_target) = protective_levels(
            entry_price,
            TradeDirection::Short,
            self.params.get_or("stop_atr_multiple", 1.5) * levels.atr,
            self.params.get_or("reward_ratio", 2.0),
        );
        let target = levels
            .support
            .filter(|&s| s < entry_price)
            .unwrap_or(fallback_target)
            .max(entry_price * 0.01);
        let size =
            scale_position_size(self.params.get_or("max_position_size", 0.15), strength, None);
        Signal::new(snapshot.symbol, SignalAction::Short, strength, reason)
            .with_levels(stop, target, size)
            .with_metadata("resistance", resistance)
            .with_metadata("rsi", levels.rsi)
    }
}

impl Default for SupportResistanceStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SupportResistanceStrategy {
    fn name(&self) -> &str {
        "support_resistance"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        let pivots = p.get_period("lookback", 60) + 2 * p.get_period("swing_window", 5) + 1;
        pivots
            .max(p.get_period("rsi_period", 14) + 1)
            .max(p.get_period("atr_period", 14) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let levels = match self.compute(snapshot) {
            Ok(levels) => levels,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        if levels.support.is_none() && levels.resistance.is_none() {
            return Ok(Signal::hold(snapshot.symbol, "No swing levels in the window"));
        }

        let price = snapshot.bars[snapshot.bars.len() - 1].close;
        let proximity = self.params.get_or("proximity_pct", 0.02);
        let oversold = self.params.get_or("rsi_oversold", 35.0);
        let overbought = self.params.get_or("rsi_overbought", 65.0);

        let near_support = levels
            .support
            .map(|s| (price - s) / s <= proximity)
            .unwrap_or(false);
        let near_resistance = levels
            .resistance
            .map(|r| (r - price) / r <= proximity)
            .unwrap_or(false);

        if near_support && levels.rsi <= oversold {
            return Ok(self.long_entry(
                snapshot,
                0.8,
                "Oversold bounce off support",
                &levels,
            ));
        }
        if near_resistance && levels.rsi >= overbought {
            return Ok(self.short_entry(
                snapshot,
                0.8,
                "Overbought rejection at resistance",
                &levels,
            ));
        }
        if near_support {
            return Ok(self.long_entry(snapshot, 0.55, "Price near support", &levels));
        }
        if near_resistance {
            let signal = Signal::new(
                snapshot.symbol,
                SignalAction::Sell,
                0.55,
                "Price near resistance",
            )
            .with_metadata("resistance", levels.resistance.unwrap_or(price))
            .with_metadata("rsi", levels.rsi);
            return Ok(signal);
        }

        Ok(Signal::hold(snapshot.symbol, "Between support and resistance")
            .with_metadata("rsi", levels.rsi))
    }
}
