//! Breakout detection and channel extremes.
//!
//! `breakout_detected` follows the volume-confirmed definition: the latest
//! price clears the prior window's average by a margin AND the latest
//! volume exceeds the prior window's average volume times a multiplier.
//! `highest`/`lowest` are the channel extremes used by the breakout-system
//! strategies; callers exclude the current bar by slicing before it.

use super::{require_len, IndicatorError};

/// Price must clear the trailing average by this fraction to count as a
/// breakout.
pub const BREAKOUT_PRICE_MARGIN: f64 = 0.02;

/// Volume-confirmed breakout over a trailing window. The averages cover the
/// `period` bars before the latest one, so a single spike cannot raise its
/// own baseline. Requires `period + 1` entries in both slices.
pub fn breakout_detected(
    prices: &[f64],
    volumes: &[u64],
    period: usize,
    volume_multiplier: f64,
) -> Result<bool, IndicatorError> {
    assert!(period >= 1, "breakout period must be >= 1");
    if prices.len() != volumes.len() {
        return Err(IndicatorError::InvalidInput(
            "price and volume series lengths differ",
        ));
    }
    require_len(prices.len(), period + 1)?;

    let n = prices.len();
    let price_window = &prices[n - 1 - period..n - 1];
    let volume_window = &volumes[n - 1 - period..n - 1];

    let avg_price = price_window.iter().sum::<f64>() / period as f64;
    let avg_volume = volume_window.iter().sum::<u64>() as f64 / period as f64;

    let price_breakout = prices[n - 1] > avg_price * (1.0 + BREAKOUT_PRICE_MARGIN);
    let volume_surge = volumes[n - 1] as f64 > avg_volume * volume_multiplier;

    Ok(price_breakout && volume_surge)
}

/// Maximum of the trailing `period` values.
pub fn highest(values: &[f64], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "highest period must be >= 1");
    require_len(values.len(), period)?;
    let window = &values[values.len() - period..];
    Ok(window.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)))
}

/// Minimum of the trailing `period` values.
pub fn lowest(values: &[f64], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "lowest period must be >= 1");
    require_len(values.len(), period)?;
    let window = &values[values.len() - period..];
    Ok(window.iter().fold(f64::INFINITY, |acc, &v| acc.min(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn breakout_needs_both_price_and_volume() {
        let flat_prices: Vec<f64> = vec![100.0; 20];
        let flat_volumes: Vec<u64> = vec![1_000; 20];

        // Price pops 5% with triple volume → breakout
        let mut prices = flat_prices.clone();
        let mut volumes = flat_volumes.clone();
        *prices.last_mut().unwrap() = 105.0;
        *volumes.last_mut().unwrap() = 3_000;
        assert!(breakout_detected(&prices, &volumes, 10, 1.5).unwrap());

        // Price pops on flat volume → no breakout
        let mut no_vol = flat_volumes.clone();
        *no_vol.last_mut().unwrap() = 1_000;
        assert!(!breakout_detected(&prices, &no_vol, 10, 1.5).unwrap());

        // Volume spikes without price movement → no breakout
        let mut no_price = flat_prices.clone();
        *no_price.last_mut().unwrap() = 100.5;
        assert!(!breakout_detected(&no_price, &volumes, 10, 1.5).unwrap());
    }

    #[test]
    fn breakout_margin_excludes_marginal_moves() {
        // +1.5% is inside the 2% margin
        let mut prices: Vec<f64> = vec![100.0; 12];
        let mut volumes: Vec<u64> = vec![1_000; 12];
        *prices.last_mut().unwrap() = 101.5;
        *volumes.last_mut().unwrap() = 5_000;
        assert!(!breakout_detected(&prices, &volumes, 10, 1.5).unwrap());
    }

    #[test]
    fn breakout_spike_does_not_raise_own_baseline() {
        // The averages exclude the latest bar, so the spike compares against
        // the quiet prior window.
        let mut prices: Vec<f64> = vec![100.0; 11];
        let mut volumes: Vec<u64> = vec![1_000; 11];
        *prices.last_mut().unwrap() = 110.0;
        *volumes.last_mut().unwrap() = 2_000;
        assert!(breakout_detected(&prices, &volumes, 10, 1.5).unwrap());
    }

    #[test]
    fn breakout_mismatched_series_rejected() {
        let prices = [100.0; 12];
        let volumes = [1_000_u64; 11];
        assert_eq!(
            breakout_detected(&prices, &volumes, 10, 1.5).unwrap_err(),
            IndicatorError::InvalidInput("price and volume series lengths differ")
        );
    }

    #[test]
    fn highest_lowest_trailing_window() {
        let values = [5.0, 9.0, 3.0, 7.0, 6.0];
        assert_approx(highest(&values, 3).unwrap(), 7.0, DEFAULT_EPSILON);
        assert_approx(lowest(&values, 3).unwrap(), 3.0, DEFAULT_EPSILON);
        assert_approx(highest(&values, 5).unwrap(), 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn channel_excluding_current_bar() {
        // Turtle-style usage: channel over the window before the latest bar.
        let highs = [10.0, 12.0, 11.0, 15.0];
        let prior = &highs[..highs.len() - 1];
        assert_approx(highest(prior, 3).unwrap(), 12.0, DEFAULT_EPSILON);
        assert!(highs[3] > highest(prior, 3).unwrap());
    }
}
