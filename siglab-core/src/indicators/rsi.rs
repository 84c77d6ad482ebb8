//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and average losses:
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Requires at least `period + 1` prices (one extra for the first change).
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; no movement → 50.

use super::{require_len, IndicatorError};

/// RSI over the slice, returning the value at the final price. Always in
/// [0, 100].
pub fn rsi(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "RSI period must be >= 1");
    require_len(prices.len(), period + 1)?;

    // Seed: average gain and average loss over the first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    // Wilder smoothing for the remaining changes
    let alpha = 1.0 / period as f64;
    for i in (period + 1)..prices.len() {
        let change = prices[i] - prices[i - 1];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
    }

    Ok(compute_rsi(avg_gain, avg_loss))
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn rsi_all_gains() {
        let prices = [100.0, 101.0, 102.0, 103.0];
        assert_approx(rsi(&prices, 3).unwrap(), 100.0, 1e-6);
    }

    #[test]
    fn rsi_all_losses() {
        let prices = [105.0, 104.0, 103.0, 102.0];
        assert_approx(rsi(&prices, 3).unwrap(), 0.0, 1e-6);
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        let prices = [100.0; 5];
        assert_approx(rsi(&prices, 3).unwrap(), 50.0, 1e-6);
    }

    #[test]
    fn rsi_mixed() {
        // Changes: +0.34, -0.25, -0.48
        // avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI = 100 - 100/(1 + 0.34/0.73) ≈ 31.776
        let prices = [44.0, 44.34, 44.09, 43.61];
        let value = rsi(&prices, 3).unwrap();
        assert_approx(value, 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-6);
    }

    #[test]
    fn rsi_bounds() {
        let prices = [100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0];
        for period in 2..6 {
            let value = rsi(&prices, period).unwrap();
            assert!(
                (0.0..=100.0).contains(&value),
                "RSI out of bounds for period {period}: {value}"
            );
        }
    }

    #[test]
    fn rsi_requires_period_plus_one() {
        let prices = [100.0, 101.0, 102.0];
        let err = rsi(&prices, 3).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn rsi_wilder_smoothing_progresses() {
        // Longer history changes the smoothed averages, so RSI over the full
        // slice must differ from RSI over just the seed window.
        let prices = [44.0, 44.34, 44.09, 43.61, 44.33, 44.83, 45.10, 45.42];
        let short = rsi(&prices[..4], 3).unwrap();
        let long = rsi(&prices, 3).unwrap();
        assert!(long > short, "rally should lift RSI: {short} -> {long}");
    }
}
