//! Indicator library — pure functions over ordered price/volume slices.
//!
//! Every function takes an explicit trailing slice of the input series and
//! returns the indicator's current value (no running state, no ring
//! buffers). Insufficient input is an explicit `IndicatorError`, never a
//! silent NaN; every internal division is guarded.
//!
//! Strategies call these per evaluation; the backtester re-evaluates on the
//! growing history prefix, so correctness of the slice math matters more
//! than incremental-update speed at this workload size.

pub mod atr;
pub mod bollinger;
pub mod breakout;
pub mod momentum;
pub mod moving_average;
pub mod rsi;
pub mod shannon;

pub use atr::{atr, true_range_series};
pub use bollinger::{bollinger, std_dev, Bands};
pub use breakout::{breakout_detected, highest, lowest};
pub use momentum::{annualized_volatility, momentum};
pub use moving_average::{ema, moving_average, sma, MaType};
pub use rsi::rsi;
pub use shannon::{shannon_probability, ShannonWindow};

use thiserror::Error;

/// Errors from indicator computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: need {required} values, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Guard helper: `actual >= required` or `InsufficientData`.
pub(crate) fn require_len(actual: usize, required: usize) -> Result<(), IndicatorError> {
    if actual < required {
        return Err(IndicatorError::InsufficientData { required, actual });
    }
    Ok(())
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::PriceBar> {
    use crate::domain::PriceBar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
