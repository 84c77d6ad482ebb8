//! Moving-average crossover with a freshness window.
//!
//! A golden or death cross only signals while it is fresh: the fast
//! average must have been at or below (above) the slow one within the
//! last `freshness_window` bars. An established trend without a recent
//! cross is a hold, which keeps the strategy from re-entering on every
//! bar of a long trend.

use super::{
    degrade, protective_levels, scale_position_size, validate_snapshot, MarketSnapshot,
    SignalError, Strategy,
};
use crate::domain::{Signal, SignalAction, StrategyParams, TradeDirection};
use crate::indicators::{atr, moving_average, MaType};

/// Spread as a fraction of the slow average scales into extra strength.
const SPREAD_STRENGTH_SCALE: f64 = 20.0;

struct Averages {
    fast: f64,
    slow: f64,
    crossed_up: bool,
    crossed_down: bool,
    atr: f64,
}

/// Golden/death cross signal generator.
#[derive(Debug, Clone)]
pub struct MaCrossoverStrategy {
    params: StrategyParams,
}

impl MaCrossoverStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("fast_period", 50.0),
                ("slow_period", 200.0),
                ("freshness_window", 5.0),
                ("ma_type", 0.0),
                ("atr_period", 14.0),
                ("stop_atr_multiple", 2.0),
                ("reward_ratio", 2.0),
                ("max_position_size", 0.20),
            ]),
        }
    }

    fn ma_kind(&self) -> MaType {
        if self.params.get_or("ma_type", 0.0) >= 0.5 {
            MaType::Ema
        } else {
            MaType::Sma
        }
    }

    fn compute(&self, snapshot: &MarketSnapshot) -> Result<Averages, crate::indicators::IndicatorError> {
        let closes = snapshot.closes();
        let p = &self.params;
        let fast_period = p.get_period("fast_period", 50);
        let slow_period = p.get_period("slow_period", 200);
        let freshness = p.get_period("freshness_window", 5);
        let kind = self.ma_kind();

        let fast = moving_average(&closes, fast_period, kind)?;
        let slow = moving_average(&closes, slow_period, kind)?;

        // Walk back through recent prefixes looking for the bar where the
        // relation still pointed the other way.
        let mut crossed_up = false;
        let mut crossed_down = false;
        for offset in 1..=freshness {
            let prefix = &closes[..closes.len() - offset];
            let past_fast = moving_average(prefix, fast_period, kind)?;
            let past_slow = moving_average(prefix, slow_period, kind)?;
            if past_fast <= past_slow {
                crossed_up = true;
            }
            if past_fast >= past_slow {
                crossed_down = true;
            }
        }

        Ok(Averages {
            fast,
            slow,
            crossed_up,
            crossed_down,
            atr: atr(snapshot.bars, p.get_period("atr_period", 14))?,
        })
    }

    fn entry(
        &self,
        snapshot: &MarketSnapshot,
        direction: TradeDirection,
        reason: &str,
        averages: &Averages,
    ) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let spread = if averages.slow.abs() > f64::EPSILON {
            (averages.fast - averages.slow).abs() / averages.slow
        } else {
            0.0
        };
        let strength = 0.6 + (spread * SPREAD_STRENGTH_SCALE).min(0.3);
        let stop_distance = self.params.get_or("stop_atr_multiple", 2.0) * averages.atr;
        let (stop, target) = protective_levels(
            entry_price,
            direction,
            stop_distance,
            self.params.get_or("reward_ratio", 2.0),
        );
        let size =
            scale_position_size(self.params.get_or("max_position_size", 0.20), strength, None);
        let action = match direction {
            TradeDirection::Long => SignalAction::Buy,
            TradeDirection::Short => SignalAction::Short,
        };
        Signal::new(snapshot.symbol, action, strength, reason)
            .with_levels(stop, target, size)
            .with_metadata("fast_ma", averages.fast)
            .with_metadata("slow_ma", averages.slow)
    }
}

impl Default for MaCrossoverStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MaCrossoverStrategy {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        let slow = p.get_period("slow_period", 200);
        let freshness = p.get_period("freshness_window", 5);
        (slow + freshness).max(p.get_period("atr_period", 14) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let averages = match self.compute(snapshot) {
            Ok(averages) => averages,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        if averages.fast > averages.slow {
            if averages.crossed_up {
                return Ok(self.entry(
                    snapshot,
                    TradeDirection::Long,
                    "Golden cross within the freshness window",
                    &averages,
                ));
            }
            return Ok(Signal::hold(snapshot.symbol, "Uptrend already established")
                .with_metadata("fast_ma", averages.fast)
                .with_metadata("slow_ma", averages.slow));
        }
        if averages.fast < averages.slow {
            if averages.crossed_down {
                return Ok(self.entry(
                    snapshot,
                    TradeDirection::Short,
                    "Death cross within the freshness window",
                    &averages,
                ));
            }
            return Ok(Signal::hold(snapshot.symbol, "Downtrend already established")
                .with_metadata("fast_ma", averages.fast)
                .with_metadata("slow_ma", averages.slow));
        }

        Ok(Signal::hold(snapshot.symbol, "Averages are flat"))
    }
}
