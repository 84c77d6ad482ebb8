//! Strategy signal generators.
//!
//! Every strategy implements the same contract: given a market snapshot
//! (symbol, bar history, optional fundamentals), produce exactly one
//! `Signal`. Concrete strategies compose indicator outputs into a
//! priority-ordered decision chain — an explicit list of rules evaluated
//! top to bottom, first match wins — because individual indicators
//! routinely disagree. The shared ordering discipline:
//!
//! 1. Strongest corroborated signal (multiple indicators agreeing).
//! 2. Single strong extreme (RSI extreme, momentum beyond a high threshold).
//! 3. Weaker single-indicator signals.
//! 4. Hold, with a non-empty diagnostic reason.
//!
//! Validation is uniform: an empty symbol is an `InvalidArgument` error;
//! short history or a degenerate price degrade to Hold, never an error, so
//! batch pipelines survive one illiquid symbol.

pub mod buffett;
pub mod four_week;
pub mod garp;
pub mod ma_crossover;
pub mod mean_reversion;
pub mod momentum;
pub mod support_resistance;
pub mod turtle;

pub use buffett::BuffettValueStrategy;
pub use four_week::FourWeekRule;
pub use garp::GarpStrategy;
pub use ma_crossover::MaCrossoverStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum::MomentumStrategy;
pub use support_resistance::SupportResistanceStrategy;
pub use turtle::TurtleStrategy;

use crate::domain::{FundamentalSnapshot, PriceBar, Signal, StrategyParams, TradeDirection};
use crate::indicators::IndicatorError;
use thiserror::Error;

/// Prices at or below this are treated as degenerate (division guards).
pub const MIN_VALID_PRICE: f64 = 1e-6;

/// Annualized volatility above this halves position sizes.
pub const HIGH_VOLATILITY: f64 = 0.40;

/// Annualized volatility above this trims position sizes by a quarter.
pub const ELEVATED_VOLATILITY: f64 = 0.25;

/// Errors from strategy evaluation. Data-quality problems never land here;
/// they degrade to Hold signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Read-only view of one symbol's market data handed to `analyze`.
///
/// Bars are date-ascending; the last element is the evaluation bar.
/// Fundamentals are optional — only the valuation strategies look at them.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot<'a> {
    pub symbol: &'a str,
    pub bars: &'a [PriceBar],
    pub fundamentals: Option<&'a FundamentalSnapshot>,
}

impl<'a> MarketSnapshot<'a> {
    pub fn new(symbol: &'a str, bars: &'a [PriceBar]) -> Self {
        Self {
            symbol,
            bars,
            fundamentals: None,
        }
    }

    pub fn with_fundamentals(
        symbol: &'a str,
        bars: &'a [PriceBar],
        fundamentals: &'a FundamentalSnapshot,
    ) -> Self {
        Self {
            symbol,
            bars,
            fundamentals: Some(fundamentals),
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

/// The common strategy contract.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &StrategyParams;

    /// Replace-merge parameter overrides; unknown keys are ignored.
    fn set_params(&mut self, overrides: &StrategyParams);

    /// Minimum trailing bars needed for a meaningful signal.
    fn required_history_days(&self) -> usize;

    /// Evaluate the snapshot into exactly one signal.
    fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Signal, SignalError>;

    /// Data-sufficiency probe. Never errors: any validation failure is
    /// `false`.
    fn can_execute(&self, snapshot: &MarketSnapshot) -> bool {
        if snapshot.symbol.trim().is_empty() {
            return false;
        }
        if snapshot.bars.len() < self.required_history_days() {
            return false;
        }
        match snapshot.latest_close() {
            Some(close) => close.is_finite() && close > MIN_VALID_PRICE,
            None => false,
        }
    }
}

/// Shared pre-checks run by every strategy before its decision chain.
///
/// `Err` — contract violation (empty symbol), propagates to the caller.
/// `Ok(Some(hold))` — data-quality degradation, return the Hold as-is.
/// `Ok(None)` — all checks passed, proceed to the rules.
pub(crate) fn validate_snapshot(
    snapshot: &MarketSnapshot,
    required_days: usize,
) -> Result<Option<Signal>, SignalError> {
    if snapshot.symbol.trim().is_empty() {
        return Err(SignalError::InvalidArgument("empty symbol".into()));
    }
    if snapshot.bars.len() < required_days {
        return Ok(Some(Signal::hold(snapshot.symbol, "Insufficient data")));
    }
    match snapshot.latest_close() {
        Some(close) if close.is_finite() && close > MIN_VALID_PRICE => Ok(None),
        _ => Ok(Some(Signal::hold(snapshot.symbol, "Invalid price data"))),
    }
}

/// Degrade an indicator failure to the matching Hold signal. Reached only
/// when a snapshot passes length validation but an indicator still refuses
/// the input (interior zero price, mismatched series).
pub(crate) fn degrade(symbol: &str, err: &IndicatorError) -> Signal {
    match err {
        IndicatorError::InsufficientData { .. } => Signal::hold(symbol, "Insufficient data"),
        IndicatorError::InvalidInput(_) => Signal::hold(symbol, "Invalid price data"),
    }
}

/// Position size for an entry: the strategy cap, scaled down for weaker
/// strength and for elevated volatility. Never exceeds the cap; never
/// drops below a fifth of it so entries stay meaningful.
pub(crate) fn scale_position_size(max_size: f64, strength: f64, volatility: Option<f64>) -> f64 {
    let mut size = max_size * (0.5 + 0.5 * strength.clamp(0.0, 1.0));
    if let Some(vol) = volatility {
        if vol > HIGH_VOLATILITY {
            size *= 0.5;
        } else if vol > ELEVATED_VOLATILITY {
            size *= 0.75;
        }
    }
    size.clamp(max_size * 0.2, max_size)
}

/// Stop-loss and take-profit around an entry price. `stop_distance` is an
/// absolute price distance; the target sits `reward_ratio` times as far on
/// the favorable side. Levels are floored above zero.
pub(crate) fn protective_levels(
    entry: f64,
    direction: TradeDirection,
    stop_distance: f64,
    reward_ratio: f64,
) -> (f64, f64) {
    let floor = entry * 0.01;
    match direction {
        TradeDirection::Long => {
            let stop = (entry - stop_distance).max(floor);
            let target = entry + stop_distance * reward_ratio;
            (stop, target)
        }
        TradeDirection::Short => {
            let stop = entry + stop_distance;
            let target = (entry - stop_distance * reward_ratio).max(floor);
            (stop, target)
        }
    }
}

/// All registered strategy names, in a stable order.
pub fn available_strategies() -> Vec<&'static str> {
    vec![
        "momentum",
        "mean_reversion",
        "turtle",
        "four_week_rule",
        "support_resistance",
        "ma_crossover",
        "garp",
        "buffett_value",
    ]
}

/// Construct a strategy by name with its documented defaults.
pub fn create_strategy(name: &str) -> Option<Box<dyn Strategy>> {
    match name {
        "momentum" => Some(Box::new(MomentumStrategy::new())),
        "mean_reversion" => Some(Box::new(MeanReversionStrategy::new())),
        "turtle" => Some(Box::new(TurtleStrategy::new())),
        "four_week_rule" => Some(Box::new(FourWeekRule::new())),
        "support_resistance" => Some(Box::new(SupportResistanceStrategy::new())),
        "ma_crossover" => Some(Box::new(MaCrossoverStrategy::new())),
        "garp" => Some(Box::new(GarpStrategy::new())),
        "buffett_value" => Some(Box::new(BuffettValueStrategy::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_every_registered_strategy() {
        for name in available_strategies() {
            let strategy = create_strategy(name)
                .unwrap_or_else(|| panic!("factory missing strategy '{name}'"));
            assert_eq!(strategy.name(), name);
            assert!(strategy.required_history_days() > 0);
            assert!(!strategy.params().is_empty());
        }
    }

    #[test]
    fn factory_rejects_unknown_name() {
        assert!(create_strategy("astrology").is_none());
    }

    #[test]
    fn position_size_scales_with_strength() {
        let weak = scale_position_size(0.20, 0.2, None);
        let strong = scale_position_size(0.20, 1.0, None);
        assert!(strong > weak);
        assert!(strong <= 0.20);
        assert!(weak >= 0.04); // floor at a fifth of the cap
    }

    #[test]
    fn position_size_trims_on_volatility() {
        let calm = scale_position_size(0.20, 0.8, Some(0.15));
        let elevated = scale_position_size(0.20, 0.8, Some(0.30));
        let wild = scale_position_size(0.20, 0.8, Some(0.60));
        assert!(calm > elevated);
        assert!(elevated > wild);
    }

    #[test]
    fn protective_levels_long() {
        let (stop, target) = protective_levels(100.0, TradeDirection::Long, 5.0, 2.0);
        assert!((stop - 95.0).abs() < 1e-10);
        assert!((target - 110.0).abs() < 1e-10);
    }

    #[test]
    fn protective_levels_short() {
        let (stop, target) = protective_levels(100.0, TradeDirection::Short, 5.0, 2.0);
        assert!((stop - 105.0).abs() < 1e-10);
        assert!((target - 90.0).abs() < 1e-10);
    }

    #[test]
    fn protective_levels_floor_above_zero() {
        let (stop, target) = protective_levels(10.0, TradeDirection::Long, 50.0, 2.0);
        assert!(stop > 0.0);
        let (_, short_target) = protective_levels(10.0, TradeDirection::Short, 4.0, 5.0);
        assert!(short_target > 0.0);
    }
}
