//! Donchian four-week rule: enter on a four-week breakout, exit on a
//! two-week reversal. The classic calendar weeks become 20 and 10
//! trading days.

use super::{
    degrade, protective_levels, scale_position_size, validate_snapshot, MarketSnapshot,
    SignalError, Strategy,
};
use crate::domain::{Signal, SignalAction, StrategyParams, TradeDirection};
use crate::indicators::{atr, highest, lowest};

struct Channel {
    entry_high: f64,
    entry_low: f64,
    exit_high: f64,
    exit_low: f64,
    atr: f64,
}

/// Four-week breakout rule.
#[derive(Debug, Clone)]
pub struct FourWeekRule {
    params: StrategyParams,
}

impl FourWeekRule {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("entry_period", 20.0),
                ("exit_period", 10.0),
                ("atr_period", 14.0),
                ("stop_atr_multiple", 2.0),
                ("reward_ratio", 2.0),
                ("max_position_size", 0.20),
            ]),
        }
    }

    fn compute(&self, snapshot: &MarketSnapshot) -> Result<Channel, crate::indicators::IndicatorError> {
        let highs = snapshot.highs();
        let lows = snapshot.lows();
        let n = highs.len();
        let prior_highs = &highs[..n - 1];
        let prior_lows = &lows[..n - 1];
        let p = &self.params;
        let entry = p.get_period("entry_period", 20);
        let exit = p.get_period("exit_period", 10);

        Ok(Channel {
            entry_high: highest(prior_highs, entry)?,
            entry_low: lowest(prior_lows, entry)?,
            exit_high: highest(prior_highs, exit)?,
            exit_low: lowest(prior_lows, exit)?,
            atr: atr(snapshot.bars, p.get_period("atr_period", 14))?,
        })
    }

    fn entry(
        &self,
        snapshot: &MarketSnapshot,
        direction: TradeDirection,
        reason: String,
        channel: &Channel,
    ) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let stop_distance = self.params.get_or("stop_atr_multiple", 2.0) * channel.atr;
        let (stop, target) = protective_levels(
            entry_price,
            direction,
            stop_distance,
            self.params.get_or("reward_ratio", 2.0),
        );
        let size = scale_position_size(self.params.get_or("max_position_size", 0.20), 0.8, None);
        let action = match direction {
            TradeDirection::Long => SignalAction::Buy,
            TradeDirection::Short => SignalAction::Short,
        };
        Signal::new(snapshot.symbol, action, 0.8, &reason).with_levels(stop, target, size)
    }
}

impl Default for FourWeekRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for FourWeekRule {
    fn name(&self) -> &str {
        "four_week_rule"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        (p.get_period("entry_period", 20) + 1).max(p.get_period("atr_period", 14) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let channel = match self.compute(snapshot) {
            Ok(channel) => channel,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        let close = snapshot.bars[snapshot.bars.len() - 1].close;
        let p = &self.params;
        let entry = p.get_period("entry_period", 20);
        let exit = p.get_period("exit_period", 10);

        if close > channel.entry_high {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Long,
                format!("Close above the {entry}-day high"),
                &channel,
            ));
        }
        if close < channel.entry_low {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Short,
                format!("Close below the {entry}-day low"),
                &channel,
            ));
        }
        if close < channel.exit_low {
            let reason = format!("Close below the {exit}-day low");
            return Ok(Signal::new(snapshot.symbol, SignalAction::Sell, 0.6, &reason));
        }
        if close > channel.exit_high {
            let reason = format!("Close above the {exit}-day high");
            return Ok(Signal::new(snapshot.symbol, SignalAction::Cover, 0.6, &reason));
        }

        Ok(Signal::hold(snapshot.symbol, "No channel breach"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn four_week_breakout_buys() {
        let strategy = FourWeekRule::new();
        let mut closes = vec![100.0; 25];
        *closes.last_mut().unwrap() = 120.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.strength, 0.8);
        assert!(signal.reason.contains("20-day"));
        assert!(signal.stop_loss.unwrap() < 120.0);
        assert!(signal.take_profit.unwrap() > 120.0);
    }

    #[test]
    fn four_week_breakdown_shorts() {
        let strategy = FourWeekRule::new();
        let mut closes = vec![100.0; 25];
        *closes.last_mut().unwrap() = 80.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Short);
        assert!(signal.reason.contains("20-day"));
    }

    #[test]
    fn two_week_reversal_exits() {
        let strategy = FourWeekRule::new();
        // Low 12 bars back widens the entry channel; the close only
        // breaches the 10-day exit low.
        let mut closes = vec![100.0; 25];
        closes[12] = 92.0;
        *closes.last_mut().unwrap() = 96.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Sell);
        assert!(signal.reason.contains("10-day"));
    }

    #[test]
    fn two_week_rally_covers() {
        let strategy = FourWeekRule::new();
        let mut closes = vec![100.0; 25];
        closes[12] = 108.0;
        *closes.last_mut().unwrap() = 104.0;
        let bars = make_bars(&closes);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Cover);
    }

    #[test]
    fn quiet_market_holds() {
        let strategy = FourWeekRule::new();
        let bars = make_bars(&vec![100.0; 25]);
        let snapshot = MarketSnapshot::new("AAPL", &bars);
        let signal = strategy.analyze(&snapshot).unwrap();

        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.reason, "No channel breach");
    }

    #[test]
    fn history_requirement_tracks_entry_period() {
        let mut strategy = FourWeekRule::new();
        assert_eq!(strategy.required_history_days(), 21);
        strategy.set_params(&StrategyParams::from_pairs(&[("entry_period", 40.0)]));
        assert_eq!(strategy.required_history_days(), 41);
    }
}
