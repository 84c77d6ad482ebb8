//! Windowed Shannon probability.
//!
//! P = ((avg / rms) + 1) / 2 over a trailing window of simple returns,
//! where avg is the window mean and rms the root mean square. |avg| <= rms
//! always, so P lands in [0, 1]; values above 0.5 indicate an upward bias.
//! A flat window (rms == 0) carries no directional information and yields
//! the neutral 0.5.
//!
//! The legacy implementation kept this as a process-wide running counter;
//! here it is a value type owned by the caller, so concurrent per-symbol
//! analyses cannot interfere and results are reproducible.

use super::{require_len, IndicatorError};

/// Shannon probability over the trailing `window` returns of the slice
/// (needs `window + 1` prices).
pub fn shannon_probability(prices: &[f64], window: usize) -> Result<f64, IndicatorError> {
    assert!(window >= 1, "Shannon window must be >= 1");
    require_len(prices.len(), window + 1)?;

    let tail = &prices[prices.len() - (window + 1)..];
    let mut sum = 0.0;
    let mut sum_squared = 0.0;
    for pair in tail.windows(2) {
        if pair[0].abs() < 1e-12 {
            return Err(IndicatorError::InvalidInput(
                "Shannon window contains a zero price",
            ));
        }
        let increment = pair[1] / pair[0] - 1.0;
        sum += increment;
        sum_squared += increment * increment;
    }

    let avg = sum / window as f64;
    let rms = (sum_squared / window as f64).max(0.0).sqrt();
    if rms < 1e-15 {
        return Ok(0.5);
    }
    Ok(((avg / rms) + 1.0) / 2.0)
}

/// Caller-owned Shannon probability state: push prices as they arrive,
/// query the probability over the most recent window.
#[derive(Debug, Clone)]
pub struct ShannonWindow {
    window: usize,
    prices: Vec<f64>,
}

impl ShannonWindow {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "Shannon window must be >= 1");
        Self {
            window,
            prices: Vec::with_capacity(window + 1),
        }
    }

    /// Record the next price, discarding history older than the window.
    pub fn push(&mut self, price: f64) {
        self.prices.push(price);
        let cap = self.window + 1;
        if self.prices.len() > cap {
            let excess = self.prices.len() - cap;
            self.prices.drain(..excess);
        }
    }

    /// True once enough prices have been pushed to fill the window.
    pub fn is_ready(&self) -> bool {
        self.prices.len() > self.window
    }

    /// Probability over the current window, or None until ready.
    pub fn probability(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        shannon_probability(&self.prices, self.window).ok()
    }
}
