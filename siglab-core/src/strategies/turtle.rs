//! Donchian channel breakout in the style of the original turtle rules.
//!
//! Two entry channels (slow and fast) and a shorter exit channel, all
//! computed over the bars BEFORE the latest one so the current close can
//! be compared against levels it did not itself produce. Position size is
//! risk-based: the fraction of capital that loses `risk_pct` when the
//! stop is hit.

use super::{
    degrade, protective_levels, validate_snapshot, MarketSnapshot, SignalError, Strategy,
};
use crate::domain::{Signal, SignalAction, StrategyParams, TradeDirection};
use crate::indicators::{atr, highest, lowest};

struct Channels {
    slow_high: f64,
    slow_low: f64,
    fast_high: f64,
    fast_low: f64,
    exit_high: f64,
    exit_low: f64,
    atr: f64,
}

/// Turtle-style channel breakout with risk-based sizing.
#[derive(Debug, Clone)]
pub struct TurtleStrategy {
    params: StrategyParams,
}

impl TurtleStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("entry_fast", 20.0),
                ("entry_slow", 55.0),
                ("exit_period", 10.0),
                ("atr_period", 20.0),
                ("stop_atr_multiple", 2.0),
                ("reward_ratio", 2.0),
                ("risk_pct", 0.01),
                ("max_position_size", 0.25),
            ]),
        }
    }

    fn compute(&self, snapshot: &MarketSnapshot) -> Result<Channels, crate::indicators::IndicatorError> {
        let highs = snapshot.highs();
        let lows = snapshot.lows();
        let n = highs.len();
        // Channel levels come from bars before the latest close.
        let prior_highs = &highs[..n - 1];
        let prior_lows = &lows[..n - 1];
        let p = &self.params;
        let slow = p.get_period("entry_slow", 55);
        let fast = p.get_period("entry_fast", 20);
        let exit = p.get_period("exit_period", 10);

        Ok(Channels {
            slow_high: highest(prior_highs, slow)?,
            slow_low: lowest(prior_lows, slow)?,
            fast_high: highest(prior_highs, fast)?,
            fast_low: lowest(prior_lows, fast)?,
            exit_high: highest(prior_highs, exit)?,
            exit_low: lowest(prior_lows, exit)?,
            atr: atr(snapshot.bars, p.get_period("atr_period", 20))?,
        })
    }

    /// Fraction of capital sized so a stop-out costs about `risk_pct`.
    fn risk_sized(&self, entry_price: f64, stop_distance: f64) -> f64 {
        let max = self.params.get_or("max_position_size", 0.25);
        if stop_distance <= f64::EPSILON {
            return 0.2 * max;
        }
        let risk = self.params.get_or("risk_pct", 0.01);
        (risk * entry_price / stop_distance).clamp(0.2 * max, max)
    }

    fn entry(
        &self,
        snapshot: &MarketSnapshot,
        direction: TradeDirection,
        strength: f64,
        reason: String,
        channels: &Channels,
    ) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let stop_distance = self.params.get_or("stop_atr_multiple", 2.0) * channels.atr;
        let (stop, target) = protective_levels(
            entry_price,
            direction,
            stop_distance,
            self.params.get_or("reward_ratio", 2.0),
        );
        let action = match direction {
            TradeDirection::Long => SignalAction::Buy,
            TradeDirection::Short => SignalAction::Short,
        };
        Signal::new(snapshot.symbol, action, strength, &reason)
            .with_levels(stop, target, self.risk_sized(entry_price, stop_distance))
            .with_metadata("atr", channels.atr)
    }
}

impl Default for TurtleStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for TurtleStrategy {
    fn name(&self) -> &str {
        "turtle"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        (p.get_period("entry_slow", 55) + 1).max(p.get_period("atr_period", 20) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let channels = match self.compute(snapshot) {
            Ok(channels) => channels,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        let close = snapshot.bars[snapshot.bars.len() - 1].close;
        let p = &self.params;
        let slow = p.get_period("entry_slow", 55);
        let fast = p.get_period("entry_fast", 20);
        let exit = p.get_period("exit_period", 10);

        if close > channels.slow_high {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Long,
                0.9,
                format!("Breakout above the {slow}-day channel"),
                &channels,
            ));
        }
        if close < channels.slow_low {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Short,
                0.9,
                format!("Breakdown below the {slow}-day channel"),
                &channels,
            ));
        }
        if close > channels.fast_high {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Long,
                0.75,
                format!("Breakout above the {fast}-day channel"),
                &channels,
            ));
        }
        if close < channels.fast_low {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Short,
                0.75,
                format!("Breakdown below the {fast}-day channel"),
                &channels,
            ));
        }
        if close < channels.exit_low {
            let reason = format!("Close below the {exit}-day exit channel");
            return Ok(Signal::new(snapshot.symbol, SignalAction::Sell, 0.6, &reason));
        }
        if close > channels.exit_high {
            let reason = format!("Close above the {exit}-day exit channel");
            return Ok(Signal::new(snapshot.symbol, SignalAction::Cover, 0.6, &reason));
        }

        Ok(Signal::hold(snapshot.symbol, "Inside the channel")
            .with_metadata("slow_high", channels.slow_high)
            .with_metadata("slow_low", channels.slow_low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn slow_channel_breakout_buys() {
        let strategy = TurtleStrategy::new();
        let mut closes = vec![100.0; 60];
        *closes.last_mut().unwrap() = 150.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.strength, 0.9);
        assert!(signal.reason.contains("55-day"));
        assert!(signal.stop_loss.unwrap() < 150.0);
        let size = signal.position_size.unwrap();
        assert!(size >= 0.05 && size <= 0.25);
    }

    #[test]
    fn slow_channel_breakdown_shorts() {
        let strategy = TurtleStrategy::new();
        let mut closes = vec![100.0; 60];
        *closes.last_mut().unwrap() = 50.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Short);
        assert_eq!(signal.strength, 0.9);
        assert!(signal.stop_loss.unwrap() > 50.0);
    }

    #[test]
    fn fast_channel_breakout_is_weaker_entry() {
        let strategy = TurtleStrategy::new();
        // Old spike keeps the 55-day top high while the recent 20 days
        // are flat, so a modest push only clears the fast channel.
        let mut closes = vec![100.0; 60];
        for close in closes[..5].iter_mut() {
            *close = 120.0;
        }
        *closes.last_mut().unwrap() = 110.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.strength, 0.75);
        assert!(signal.reason.contains("20-day"));
    }

    #[test]
    fn exit_channel_breach_sells() {
        let strategy = TurtleStrategy::new();
        // A deeper low 16 bars back keeps the entry channels wide; the
        // close only undercuts the 10-day exit low.
        let mut closes = vec![100.0; 60];
        closes[43] = 90.0;
        *closes.last_mut().unwrap() = 95.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Sell);
        assert_eq!(signal.strength, 0.6);
        assert!(signal.reason.contains("10-day"));
        assert!(signal.stop_loss.is_none());
    }

    #[test]
    fn exit_channel_breach_covers() {
        let strategy = TurtleStrategy::new();
        let mut closes = vec![100.0; 60];
        closes[43] = 110.0;
        *closes.last_mut().unwrap() = 105.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Cover);
        assert_eq!(signal.strength, 0.6);
    }

    #[test]
    fn inside_channel_holds() {
        let strategy = TurtleStrategy::new();
        let bars = make_bars(&vec![100.0; 60]);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.reason, "Inside the channel");
    }

    #[test]
    fn needs_a_slow_channel_of_history() {
        let strategy = TurtleStrategy::new();
        assert_eq!(strategy.required_history_days(), 56);
        let bars = make_bars(&vec![100.0; 30]);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();
        assert_eq!(signal.reason, "Insufficient data");
    }
}
