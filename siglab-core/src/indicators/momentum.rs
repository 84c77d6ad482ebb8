//! Momentum and realized volatility.
//!
//! Momentum: percent change from the price `lookback` positions back
//! (counting the latest as position 1) to the latest price.
//! Annualized volatility: stddev of daily simple returns over the trailing
//! window, scaled by sqrt(252). Returned as a fraction (0.20 = 20%).

use super::{require_len, IndicatorError};

/// Percent change over the trailing `lookback` window:
/// `(last - prices[len - lookback]) / prices[len - lookback] * 100`.
pub fn momentum(prices: &[f64], lookback: usize) -> Result<f64, IndicatorError> {
    assert!(lookback >= 1, "momentum lookback must be >= 1");
    require_len(prices.len(), lookback)?;

    let base = prices[prices.len() - lookback];
    let last = prices[prices.len() - 1];
    if base.abs() < 1e-12 {
        return Err(IndicatorError::InvalidInput("momentum base price is zero"));
    }
    Ok((last - base) / base * 100.0)
}

/// Annualized volatility of daily returns over the trailing `lookback`
/// returns (needs `lookback + 1` prices). Sample stddev (n-1), scaled by
/// sqrt(252). A single return yields 0.0.
pub fn annualized_volatility(prices: &[f64], lookback: usize) -> Result<f64, IndicatorError> {
    assert!(lookback >= 1, "volatility lookback must be >= 1");
    require_len(prices.len(), lookback + 1)?;

    let window = &prices[prices.len() - (lookback + 1)..];
    let mut returns = Vec::with_capacity(lookback);
    for pair in window.windows(2) {
        if pair[0].abs() < 1e-12 {
            return Err(IndicatorError::InvalidInput(
                "volatility window contains a zero price",
            ));
        }
        returns.push(pair[1] / pair[0] - 1.0);
    }

    if returns.len() < 2 {
        return Ok(0.0);
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / (returns.len() - 1) as f64;

    Ok(variance.sqrt() * 252_f64.sqrt())
}
