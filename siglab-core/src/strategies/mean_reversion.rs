//! Mean-reversion strategy over Bollinger band position and RSI.
//!
//! Band position maps the latest close into [0, 1] across the band width.
//! Entries fire at the band edges, strongest when RSI agrees, and the
//! middle band doubles as the reversion target.

use super::{
    degrade, protective_levels, scale_position_size, validate_snapshot, MarketSnapshot,
    SignalError, Strategy,
};
use crate::domain::{Signal, SignalAction, StrategyParams, TradeDirection};
use crate::indicators::{annualized_volatility, atr, bollinger, rsi, Bands};

struct Inputs {
    bands: Bands,
    /// None when the band has zero width (flat window).
    position: Option<f64>,
    rsi: f64,
    atr: f64,
    volatility: f64,
}

/// Bollinger band fade with RSI corroboration.
#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    params: StrategyParams,
}

impl MeanReversionStrategy {
    pub fn new() -> Self {
        Self {
            params: StrategyParams::from_pairs(&[
                ("bb_period", 20.0),
                ("bb_sigma", 2.0),
                ("lower_threshold", 0.2),
                ("upper_threshold", 0.8),
                ("rsi_period", 14.0),
                ("rsi_oversold", 30.0),
                ("rsi_overbought", 70.0),
                ("atr_period", 14.0),
                ("stop_atr_multiple", 2.0),
                ("volatility_lookback", 20.0),
                ("max_position_size", 0.15),
            ]),
        }
    }

    fn compute(&self, snapshot: &MarketSnapshot) -> Result<Inputs, crate::indicators::IndicatorError> {
        let closes = snapshot.closes();
        let p = &self.params;
        let bands = bollinger(
            &closes,
            p.get_period("bb_period", 20),
            p.get_or("bb_sigma", 2.0),
        )?;
        let latest = closes[closes.len() - 1];

        Ok(Inputs {
            position: bands.position(latest),
            bands,
            rsi: rsi(&closes, p.get_period("rsi_period", 14))?,
            atr: atr(snapshot.bars, p.get_period("atr_period", 14))?,
            volatility: annualized_volatility(&closes, p.get_period("volatility_lookback", 20))?,
        })
    }

    /// Entry with the middle band as target when it sits on the profitable
    /// side of the entry price.
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
        let (stop, mut target) = protective_levels(entry_price, direction, stop_distance, 2.0);
        match direction {
            TradeDirection::Long if inputs.bands.middle > entry_price => {
                target = inputs.bands.middle;
            }
            TradeDirection::Short if inputs.bands.middle < entry_price => {
                target = inputs.bands.middle.max(entry_price * 0.01);
            }
            _ => {}
        }
        let size = scale_position_size(
            self.params.get_or("max_position_size", 0.15),
            strength,
            Some(inputs.volatility),
        );
        let action = match direction {
            TradeDirection::Long => SignalAction::Buy,
            TradeDirection::Short => SignalAction::Short,
        };
        Signal::new(snapshot.symbol, action, strength, reason)
            .with_levels(stop, target, size)
            .with_metadata("bb_position", inputs.position.unwrap_or(0.5))
            .with_metadata("rsi", inputs.rsi)
    }
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn set_params(&mut self, overrides: &StrategyParams) {
        self.params.apply(overrides);
    }

    fn required_history_days(&self) -> usize {
        let p = &self.params;
        p.get_period("bb_period", 20)
            .max(p.get_period("rsi_period", 14) + 1)
            .max(p.get_period("atr_period", 14) + 1)
            .max(p.get_period("volatility_lookback", 20) + 1)
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError> {
        if let Some(hold) = validate_snapshot(snapshot, self.required_history_days())? {
            return Ok(hold);
        }
        let inputs = match self.compute(snapshot) {
            Ok(inputs) => inputs,
            Err(err) => return Ok(degrade(snapshot.symbol, &err)),
        };

        let position = match inputs.position {
            Some(position) => position,
            None => return Ok(Signal::hold(snapshot.symbol, "Flat price window")),
        };

        let p = &self.params;
        let lower = p.get_or("lower_threshold", 0.2);
        let upper = p.get_or("upper_threshold", 0.8);
        let oversold = p.get_or("rsi_oversold", 30.0);
        let overbought = p.get_or("rsi_overbought", 70.0);

        if position <= lower && inputs.rsi <= oversold {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Long,
                0.85,
                "Lower band touch with oversold RSI",
                &inputs,
            ));
        }
        if position >= upper && inputs.rsi >= overbought {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Short,
                0.8,
                "Upper band touch with overbought RSI",
                &inputs,
            ));
        }
        if position <= lower {
            return Ok(self.entry(
                snapshot,
                TradeDirection::Long,
                0.55,
                "Price at the lower band",
                &inputs,
            ));
        }
        if position >= upper {
            let signal = Signal::new(
                snapshot.symbol,
                SignalAction::Sell,
                0.55,
                "Price at the upper band",
            )
            .with_metadata("bb_position", position)
            .with_metadata("rsi", inputs.rsi);
            return Ok(signal);
        }

        let hold = Signal::hold(snapshot.symbol, "Price inside the bands")
            .with_metadata("bb_position", position)
            .with_metadata("rsi", inputs.rsi);
        Ok(hold)
    }
}
