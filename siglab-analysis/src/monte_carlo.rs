//! Monte Carlo resampling of realized trade returns.
//!
//! Each simulation draws `sample_size` returns from the population with
//! replacement and compounds them multiplicatively; the distribution of
//! compounded outcomes estimates the range of results the same edge could
//! have produced in a different order and mix.
//!
//! Sub-seeds are derived per simulation index via BLAKE3 from the master
//! seed, so outcomes are identical regardless of how the simulation batch
//! is scheduled across threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of resampled equity paths (default 1000).
    pub simulations: usize,
    /// Draws per simulation; `None` uses the population size.
    pub sample_size: Option<usize>,
    /// Master RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            simulations: 1000,
            sample_size: None,
            seed: 42,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Distribution of compounded returns across simulations.
///
/// An empty trade population is a reported condition (`error` is set and
/// every statistic is zero), not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub simulations: usize,
    pub mean_return: f64,
    pub median_return: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    pub best_case: f64,
    pub worst_case: f64,
    pub probability_of_profit: f64,
    pub error: Option<String>,
}

impl MonteCarloResult {
    fn empty_population() -> Self {
        Self {
            simulations: 0,
            mean_return: 0.0,
            median_return: 0.0,
            percentile_5: 0.0,
            percentile_25: 0.0,
            percentile_75: 0.0,
            percentile_95: 0.0,
            best_case: 0.0,
            worst_case: 0.0,
            probability_of_profit: 0.0,
            error: Some("no trades".into()),
        }
    }
}

/// Configuration misuse. An empty population is not an error (see
/// [`MonteCarloResult`]).
#[derive(Debug, Error)]
pub enum McError {
    #[error("simulations must be at least 1")]
    NoSimulations,
    #[error("sample size must be at least 1 when specified")]
    EmptySampleSize,
}

// ─── Simulation ──────────────────────────────────────────────────────

/// Resample a population of per-trade returns.
pub fn run_monte_carlo(
    returns: &[f64],
    config: &MonteCarloConfig,
) -> Result<MonteCarloResult, McError> {
    if config.simulations == 0 {
        return Err(McError::NoSimulations);
    }
    if config.sample_size == Some(0) {
        return Err(McError::EmptySampleSize);
    }
    if returns.is_empty() {
        return Ok(MonteCarloResult::empty_population());
    }

    let sample_size = config.sample_size.unwrap_or(returns.len());

    let mut outcomes: Vec<f64> = (0..config.simulations)
        .into_par_iter()
        .map(|index| simulate_one(returns, sample_size, sub_seed(config.seed, index as u64)))
        .collect();

    outcomes.sort_by(|a, b| a.total_cmp(b));
    Ok(summarize(&outcomes))
}

/// One resampled path: draw with replacement, compound multiplicatively.
fn simulate_one(returns: &[f64], sample_size: usize, seed: u64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut acc = 1.0;
    for _ in 0..sample_size {
        let idx = rng.gen_range(0..returns.len());
        acc *= 1.0 + returns[idx];
    }
    acc - 1.0
}

/// Derive a per-simulation seed from the master seed.
///
/// Hash-based, so the derivation is independent of scheduling order.
fn sub_seed(master_seed: u64, index: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&index.to_le_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap())
}

fn summarize(sorted: &[f64]) -> MonteCarloResult {
    let n = sorted.len();
    let profitable = sorted.iter().filter(|&&r| r > 0.0).count();

    MonteCarloResult {
        simulations: n,
        mean_return: sorted.iter().sum::<f64>() / n as f64,
        median_return: percentile_sorted(sorted, 50.0),
        percentile_5: percentile_sorted(sorted, 5.0),
        percentile_25: percentile_sorted(sorted, 25.0),
        percentile_75: percentile_sorted(sorted, 75.0),
        percentile_95: percentile_sorted(sorted, 95.0),
        best_case: sorted[n - 1],
        worst_case: sorted[0],
        probability_of_profit: profitable as f64 / n as f64,
        error: None,
    }
}

/// Percentile of a sorted slice using linear interpolation.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(simulations: usize) -> MonteCarloConfig {
        MonteCarloConfig {
            simulations,
            ..Default::default()
        }
    }

    #[test]
    fn empty_population_is_reported_not_crashed() {
        let result = run_monte_carlo(&[], &config(100)).unwrap();
        assert_eq!(result.error.as_deref(), Some("no trades"));
        assert_eq!(result.simulations, 0);
        assert_eq!(result.mean_return, 0.0);
        assert_eq!(result.probability_of_profit, 0.0);
    }

    #[test]
    fn percentiles_are_ordered() {
        let returns = [0.05, -0.03, 0.08, -0.01, 0.02, 0.04, -0.06];
        let result = run_monte_carlo(&returns, &config(100)).unwrap();
        assert!(result.percentile_5 <= result.percentile_25);
        assert!(result.percentile_25 <= result.median_return);
        assert!(result.median_return <= result.percentile_75);
        assert!(result.percentile_75 <= result.percentile_95);
        assert!(result.worst_case <= result.percentile_5);
        assert!(result.percentile_95 <= result.best_case);
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let returns = [0.05, -0.03, 0.08, -0.01];
        let a = run_monte_carlo(&returns, &config(200)).unwrap();
        let b = run_monte_carlo(&returns, &config(200)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let returns = [0.05, -0.03, 0.08, -0.01];
        let a = run_monte_carlo(&returns, &config(200)).unwrap();
        let shifted = MonteCarloConfig {
            seed: 43,
            ..config(200)
        };
        let b = run_monte_carlo(&returns, &shifted).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn single_value_population_collapses() {
        // Only one return to draw: every path compounds it sample_size times.
        let mc = MonteCarloConfig {
            simulations: 50,
            sample_size: Some(3),
            seed: 42,
        };
        let result = run_monte_carlo(&[0.1], &mc).unwrap();
        let expected = 1.1_f64.powi(3) - 1.0;
        assert!((result.mean_return - expected).abs() < 1e-12);
        assert!((result.best_case - result.worst_case).abs() < 1e-12);
        assert_eq!(result.probability_of_profit, 1.0);
    }

    #[test]
    fn all_losing_population_never_profits() {
        let returns = [-0.02, -0.05, -0.01];
        let result = run_monte_carlo(&returns, &config(100)).unwrap();
        assert_eq!(result.probability_of_profit, 0.0);
        assert!(result.best_case < 0.0);
    }

    #[test]
    fn zero_simulations_is_config_misuse() {
        assert!(matches!(
            run_monte_carlo(&[0.1], &config(0)),
            Err(McError::NoSimulations)
        ));
        let bad = MonteCarloConfig {
            sample_size: Some(0),
            ..config(10)
        };
        assert!(matches!(
            run_monte_carlo(&[0.1], &bad),
            Err(McError::EmptySampleSize)
        ));
    }

    #[test]
    fn sub_seeds_are_stable_and_distinct() {
        assert_eq!(sub_seed(42, 0), sub_seed(42, 0));
        assert_ne!(sub_seed(42, 0), sub_seed(42, 1));
        assert_ne!(sub_seed(42, 0), sub_seed(43, 0));
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&sorted, 50.0), 3.0);
        assert_eq!(percentile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(percentile_sorted(&sorted, 100.0), 5.0);
        // Rank 25% of 4 intervals = index 1.0 exactly
        assert_eq!(percentile_sorted(&sorted, 25.0), 2.0);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
        assert_eq!(percentile_sorted(&[7.0], 99.0), 7.0);
    }
}
