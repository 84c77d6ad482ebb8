//! Momentum strategy — breakout corroboration first, then tiered momentum.
//!
//! Decision chain, first match wins:
//! 1. Volume-confirmed breakout with positive 20-day momentum (strongest).
//! 2. Strong extremes: sustained 20-day momentum with short-term
//!    confirmation, or an RSI extreme.
//! 3. Weaker single-indicator momentum.
//! 4. Hold with the observed momentum as the reason.
//!
//! The breakout rule sits above the RSI rules on purpose: a genuine rally
//! is routinely "overbought" by RSI at the exact moment it breaks out.

use super::{
    degrade, protective_levels, scale_position_size, validate_snapshot, MarketSnapshot,
    SignalError, Strategy,
};
use crate::domain::{Signal, SignalAction, StrategyParams, TradeDirection};
use crate::indicators::{annualized_volatility, atr, breakout_detected, momentum, rsi};

/// Annualized volatility below this earns calm-trend entries a strength
/// bonus.
const LOW_VOLATILITY: f64 = 0.20;

/// Everything the decision chain needs, computed once per evaluation.
struct Inputs {
    breakout: bool,
    momentum_short: f64,
    momentum_medium: f64,
    momentum_long: f64,
    rsi: f64,
    volatility: f64,
    atr: f64,
}

/// Momentum signal generator with tiered lookbacks (5/20/60 days).
#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    params: StrategyParams,
}

impl MomentumStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("momentum_short", 5.0),
                ("momentum_medium", 20.0),
                ("momentum_long", 60.0),
                ("strong_momentum_pct", 10.0),
                ("weak_momentum_pct", 5.0),
                ("short_confirm_pct", 2.0),
                ("rsi_period", 14.0),
                ("rsi_oversold", 30.0),
                ("rsi_overbought", 70.0),
                ("breakout_period", 20.0),
                ("volume_multiplier", 1.5),
                ("volatility_lookback", 30.0),
                ("atr_period", 14.0),
                ("stop_atr_multiple", 2.0),
                ("reward_ratio", 2.0),
                ("max_position_size", 0.20),
            ]),
        }
    }

    fn compute(&self, snapshot: &MarketSnapshot) -> Result<Inputs, crate::indicators::IndicatorError> {
        let closes = snapshot.closes();
        let volumes = snapshot.volumes();
        let p = &self.params;

        Ok(Inputs {
            breakout: breakout_detected(
                &closes,
                &volumes,
                p.get_period("breakout_period", 20),
                p.get_or("volume_multiplier", 1.5),
            )?,
            momentum_short: momentum(&closes, p.get_period("momentum_short", 5))?,
            momentum_medium: momentum(&closes, p.get_period("momentum_medium", 20))?,
            momentum_long: momentum(&closes, p.get_period("momentum_long", 60))?,
            rsi: rsi(&closes, p.get_period("rsi_period", 14))?,
            volatility: annualized_volatility(&closes, p.get_period("volatility_lookback", 30))?,
            atr: atr(snapshot.bars, p.get_period("atr_period", 14))?,
        })
    }

    fn entry(
        &self,
        snapshot: &MarketSnapshot,
        direction: TradeDirection,
        strength: f64,
        reason: &str,
        inputs: &Inputs,
    ) -> Signal {
        let entry_price = snapshot.bars[snapshot.bars.len() - 1].close;
        let stop_distance = self.params.get_or("stop_atr_multiple", 2.0) * inputs.atr;
        let (stop, target) = protective_levels(
            entry_price,
            direction,
            stop_distance,
            self.params.get_or("reward_ratio", 2.0),
        );
        let size = scale_position_size(
            self.params.get_or("max_position_size", 0.20),
            strength,
            Some(inputs.volatility),
        );
        let action = match direction {
            TradeDirection::Long => SignalAction::Buy,
            TradeDirection::Short => SignalAction::Short,
        };
        Signal::new(snapshot.symbol, action, strength, reason).with_levels(stop, target, size)
    }

    fn with_diagnostics(signal: Signal, inputs: &Inputs) -> Signal {
        signal
            .with_metadata("momentum_5d", inputs.momentum_short)
            .with_metadata("momentum_20d", inputs.momentum_medium)
            .with_metadata("momentum_60d", inputs.momentum_long)
            .with_metadata("rsi", inputs.rsi)
            .with_metadata("volatility", inputs.volatility)
            .with_metadata("atr", inputs.atr)
    }
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        p.get_period("momentum_long", 60)
            .max(p.get_period("volatility_lookback", 30) + 1)
            .max(p.get_period("breakout_period", 20) + 1)
            .max(p.get_period("rsi_period", 14) + 1)
            .max(p.get_period("atr_period", 14) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let inputs = match self.compute(snapshot) {
            Ok(inputs) => inputs,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        let p = &self.params;
        let strong = p.get_or("strong_momentum_pct", 10.0);
        let weak = p.get_or("weak_momentum_pct", 5.0);
        let confirm = p.get_or("short_confirm_pct", 2.0);
        let oversold = p.get_or("rsi_oversold", 30.0);
        let overbought = p.get_or("rsi_overbought", 70.0);

        // Calm trends get a modest conviction bump on long entries.
        let calm_bonus = if inputs.volatility < LOW_VOLATILITY {
            0.05
        } else {
            0.0
        };

        // 1. Corroborated breakout.
        if inputs.breakout && inputs.momentum_medium > 0.0 {
            let signal = self.entry(
                snapshot,
                TradeDirection::Long,
                0.9 + calm_bonus,
                "Volume-confirmed breakout with positive momentum",
                &inputs,
            );
            return Ok(Self::with_diagnostics(signal, &inputs));
        }

        // 2. Strong extremes. Momentum outranks RSI: a sustained move is
        // usually "overbought" or "oversold" the whole way.
        if inputs.momentum_medium > strong && inputs.momentum_short > confirm {
            let signal = self.entry(
                snapshot,
                TradeDirection::Long,
                0.8 + calm_bonus,
                "Strong 20-day momentum with short-term confirmation",
                &inputs,
            );
            return Ok(Self::with_diagnostics(signal, &inputs));
        }
        if inputs.momentum_medium < -strong && inputs.momentum_short < -confirm {
            let signal = self.entry(
                snapshot,
                TradeDirection::Short,
                0.75,
                "Sustained downside momentum",
                &inputs,
            );
            return Ok(Self::with_diagnostics(signal, &inputs));
        }
        if inputs.rsi <= oversold {
            let signal = self.entry(
                snapshot,
                TradeDirection::Long,
                0.7 + calm_bonus,
                "RSI oversold",
                &inputs,
            );
            return Ok(Self::with_diagnostics(signal, &inputs));
        }
        if inputs.rsi >= overbought {
            let signal = Signal::new(snapshot.symbol, SignalAction::Sell, 0.7, "RSI overbought");
            return Ok(Self::with_diagnostics(signal, &inputs));
        }

        // 3. Weaker momentum-only signals.
        if inputs.momentum_medium > weak {
            let signal = self.entry(
                snapshot,
                TradeDirection::Long,
                0.5 + calm_bonus,
                "Positive medium-term momentum",
                &inputs,
            );
            return Ok(Self::with_diagnostics(signal, &inputs));
        }
        if inputs.momentum_medium < -weak {
            let signal = Signal::new(
                snapshot.symbol,
                SignalAction::Sell,
                0.5,
                "Fading medium-term momentum",
            );
            return Ok(Self::with_diagnostics(signal, &inputs));
        }

        // 4. Nothing dominant.
        let reason = format!(
            "No dominant momentum pattern (20d {:+.1}%)",
            inputs.momentum_medium
        );
        let hold = Signal::hold(snapshot.symbol, &reason);
        Ok(Self::with_diagnostics(hold, &inputs))
    }
}
