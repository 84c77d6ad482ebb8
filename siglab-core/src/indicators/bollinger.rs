//! Bollinger Bands and standard deviation.
//!
//! Bands = SMA(period) ± k_sigma * stddev(period) over the trailing window,
//! using population stddev (divide by N). Zero variance collapses all three
//! bands to the mean — a valid, degenerate result, not an error.

use super::{require_len, IndicatorError};
use serde::{Deserialize, Serialize};

/// Bollinger band values at the latest price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Position of `price` inside the band, 0 at the lower band and 1 at
    /// the upper. Returns None when the band has zero width.
    pub fn position(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        if width.abs() < f64::EPSILON {
            return None;
        }
        Some((price - self.lower) / width)
    }
}

/// Bollinger Bands over the trailing `period` prices.
pub fn bollinger(prices: &[f64], period: usize, k_sigma: f64) -> Result<Bands, IndicatorError> {
    assert!(period >= 1, "Bollinger period must be >= 1");
    require_len(prices.len(), period)?;

    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window
        .iter()
        .map(|p| {
            let diff = p - mean;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    let stddev = variance.sqrt();

    Ok(Bands {
        upper: mean + k_sigma * stddev,
        middle: mean,
        lower: mean - k_sigma * stddev,
    })
}

/// Population standard deviation of the trailing `period` prices.
pub fn std_dev(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "stddev period must be >= 1");
    require_len(prices.len(), period)?;

    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window
        .iter()
        .map(|p| {
            let diff = p - mean;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    Ok(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn middle_band_is_mean() {
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0];
        let bands = bollinger(&prices, 3, 2.0).unwrap();
        assert_approx(bands.middle, 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bands_symmetric_about_middle() {
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0];
        let bands = bollinger(&prices, 5, 2.0).unwrap();
        assert_approx(
            bands.upper - bands.middle,
            bands.middle - bands.lower,
            DEFAULT_EPSILON,
        );
        assert!(bands.upper > bands.middle);
    }

    #[test]
    fn zero_variance_collapses_to_mean() {
        let prices = [100.0; 6];
        let bands = bollinger(&prices, 4, 2.0).unwrap();
        assert_approx(bands.upper, 100.0, DEFAULT_EPSILON);
        assert_approx(bands.middle, 100.0, DEFAULT_EPSILON);
        assert_approx(bands.lower, 100.0, DEFAULT_EPSILON);
        // Degenerate band has no defined position
        assert_eq!(bands.position(100.0), None);
    }

    #[test]
    fn band_position() {
        let bands = Bands {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };
        assert_approx(bands.position(90.0).unwrap(), 0.0, DEFAULT_EPSILON);
        assert_approx(bands.position(110.0).unwrap(), 1.0, DEFAULT_EPSILON);
        assert_approx(bands.position(100.0).unwrap(), 0.5, DEFAULT_EPSILON);
        // Outside the band extrapolates beyond [0, 1]
        assert!(bands.position(115.0).unwrap() > 1.0);
    }

    #[test]
    fn std_dev_known_value() {
        // Population stddev of [2, 4, 4, 4, 5, 5, 7, 9] = 2.0
        let prices = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx(std_dev(&prices, 8).unwrap(), 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn std_dev_trailing_window_only() {
        let prices = [1000.0, 2.0, 2.0, 2.0];
        assert_approx(std_dev(&prices, 3).unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn insufficient_data() {
        let err = bollinger(&[1.0, 2.0], 5, 2.0).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                required: 5,
                actual: 2
            }
        );
    }
}
