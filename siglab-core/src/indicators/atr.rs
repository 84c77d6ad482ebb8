//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR applies Wilder smoothing (alpha = 1/period) to the TR series,
//! seeded with the mean of the first `period` proper true ranges.
//! Requires `period + 1` bars: TR needs a previous close.

use super::{require_len, IndicatorError};
use crate::domain::PriceBar;

/// True-range series for the slice. The first bar has no previous close, so
/// its entry is plain high - low and is skipped by the ATR seed.
pub fn true_range_series(bars: &[PriceBar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            tr.push(bar.high - bar.low);
        } else {
            tr.push(bar.true_range(bars[i - 1].close));
        }
    }
    tr
}

/// ATR over the slice, returning the value at the final bar.
pub fn atr(bars: &[PriceBar], period: usize) -> Result<f64, IndicatorError> {
    assert!(period >= 1, "ATR period must be >= 1");
    require_len(bars.len(), period + 1)?;

    let tr = true_range_series(bars);

    // Seed from TR[1..=period]; TR[0] is not a proper true range.
    let seed: f64 = tr[1..=period].iter().sum::<f64>() / period as f64;

    let alpha = 1.0 / period as f64;
    let mut value = seed;
    for &range in &tr[period + 1..] {
        value = alpha * range + (1.0 - alpha) * value;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<PriceBar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range_series(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        // Gap up: prev close 100, current bar 115/108
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range_series(&bars);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR[0] skipped by seed
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        // Seed = mean(8, 9, 6) = 23/3; next = (1/3)*6 + (2/3)*(23/3) = 64/9
        assert_approx(atr(&bars[..4], 3).unwrap(), 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(atr(&bars, 3).unwrap(), 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_constant_range_bars() {
        // Each bar spans exactly 4.0 with no gaps: ATR = 4.0
        let bars = make_ohlc_bars(&[
            (100.0, 102.0, 98.0, 100.0),
            (100.0, 102.0, 98.0, 100.0),
            (100.0, 102.0, 98.0, 100.0),
            (100.0, 102.0, 98.0, 100.0),
        ]);
        assert_approx(atr(&bars, 3).unwrap(), 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_insufficient_data() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        let err = atr(&bars, 3).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                required: 4,
                actual: 1
            }
        );
    }
}
