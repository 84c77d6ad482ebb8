//! StrategyParams — named numeric configuration per strategy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named parameter map for a strategy.
///
/// Strategies construct this with their documented defaults. Overrides are a
/// replace-merge: known keys are replaced, unspecified keys keep their
/// defaults, and unknown keys are ignored. There is no partial mutation of
/// shared state; each strategy owns its map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StrategyParams(BTreeMap<String, f64>);

impl StrategyParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Value for `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).copied().unwrap_or(default)
    }

    /// `key` rounded to a usize period. Missing keys and degenerate stored
    /// values (non-finite or <= 0) fall back to `default`, so a bad
    /// override can never push a lookback to zero.
    pub fn get_period(&self, key: &str, default: usize) -> usize {
        match self.0.get(key) {
            Some(v) if v.is_finite() && *v > 0.0 => v.round() as usize,
            _ => default,
        }
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    /// Replace-merge: overrides replace existing keys; keys not present in
    /// the defaults are dropped silently.
    pub fn apply(&mut self, overrides: &StrategyParams) {
        for (key, value) in overrides.iter() {
            if self.0.contains_key(key) {
                self.0.insert(key.clone(), *value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
