//! Signal — the output of one strategy evaluation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Action recommended by a strategy for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Short,
    Cover,
    Hold,
}

impl SignalAction {
    /// Entry actions open a new position.
    pub fn is_entry(&self) -> bool {
        matches!(self, SignalAction::Buy | SignalAction::Short)
    }

    /// Exit actions close an existing position.
    pub fn is_exit(&self) -> bool {
        matches!(self, SignalAction::Sell | SignalAction::Cover)
    }
}

/// One strategy evaluation result.
///
/// Produced fresh per `analyze` call; immutable; owns no market data.
/// Entry signals (Buy/Short) always carry `stop_loss`, `take_profit`, and
/// `position_size`. Hold signals always carry a non-empty `reason`.
/// Metadata keys are sorted (BTreeMap) so serialized output is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub action: SignalAction,
    /// Confidence in [0, 1].
    pub strength: f64,
    pub reason: String,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Fraction of available capital to commit, in (0, 1].
    pub position_size: Option<f64>,
    pub metadata: BTreeMap<String, f64>,
}

impl Signal {
    /// Neutral signal with a diagnostic reason.
    pub fn hold(symbol: &str, reason: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            action: SignalAction::Hold,
            strength: 0.0,
            reason: reason.to_string(),
            stop_loss: None,
            take_profit: None,
            position_size: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Signal with the given action, strength clamped to [0, 1].
    pub fn new(symbol: &str, action: SignalAction, strength: f64, reason: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            action,
            strength: strength.clamp(0.0, 1.0),
            reason: reason.to_string(),
            stop_loss: None,
            take_profit: None,
            position_size: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_levels(mut self, stop_loss: f64, take_profit: f64, position_size: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self.take_profit = Some(take_profit);
        self.position_size = Some(position_size);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: f64) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}
