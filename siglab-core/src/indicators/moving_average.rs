//! Simple and exponential moving averages.
//!
//! SMA: mean of the last `period` values.
//! EMA: alpha = 2/(period+1), seeded with the SMA of the first `period`
//! values, then iterated over the rest of the slice; the final value is
//! returned. Both require at least `period` values.

use super::{require_len, IndicatorError};
use serde::{Deserialize, Serialize};

/// Moving average flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaType {
    Sma,
    Ema,
}

/// Moving average of the given type over the slice.
pub fn moving_average(prices: &[f64], period: usize, kind: MaType) -> Result<f64, IndicatorError> {
    match kind {
        MaType::Sma => sma(prices, period),
        MaType::Ema => ema(prices, period),
    }
}

/// Simple moving average of the last `period` prices.
pub fn sma(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "SMA period must be >= 1");
    require_len(prices.len(), period)?;
    let window = &prices[prices.len() - period..];
    Ok(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average over the whole slice, seeded with the SMA of
/// the first `period` values.
pub fn ema(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "EMA period must be >= 1");
    require_len(prices.len(), period)?;

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = prices[..period].iter().sum::<f64>() / period as f64;

    let mut value = seed;
    for &price in &prices[period..] {
        value = alpha * price + (1.0 - alpha) * value;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_uses_trailing_window() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_approx(sma(&prices, 3).unwrap(), 4.0, DEFAULT_EPSILON);
        assert_approx(sma(&prices, 5).unwrap(), 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_insufficient_data() {
        let err = sma(&[1.0, 2.0], 3).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                required: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn ema_period_1_equals_last_close() {
        let prices = [100.0, 200.0, 300.0];
        assert_approx(ema(&prices, 1).unwrap(), 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_known_values() {
        // alpha = 2/(3+1) = 0.5
        // Seed: SMA(10,11,12) = 11.0
        // step 13: 0.5*13 + 0.5*11.0 = 12.0
        // step 14: 0.5*14 + 0.5*12.0 = 13.0
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert_approx(ema(&prices, 3).unwrap(), 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_seed_equals_sma_of_first_window() {
        let prices = [10.0, 11.0, 12.0];
        assert_approx(
            ema(&prices, 3).unwrap(),
            sma(&prices, 3).unwrap(),
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn moving_average_dispatch() {
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert_approx(
            moving_average(&prices, 3, MaType::Sma).unwrap(),
            13.0,
            DEFAULT_EPSILON,
        );
        assert_approx(
            moving_average(&prices, 3, MaType::Ema).unwrap(),
            ema(&prices, 3).unwrap(),
            DEFAULT_EPSILON,
        );
    }

    #[test]
    #[should_panic(expected = "SMA period must be >= 1")]
    fn sma_rejects_zero_period() {
        let _ = sma(&[1.0], 0);
    }
}
