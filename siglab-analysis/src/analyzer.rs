//! Strategy performance analyzer — cross-strategy statistics over a
//! shared trade ledger.
//!
//! The tracker ingests trades one at a time (`record_trade`) or in bulk
//! (`load_trades`) and answers per-strategy questions on demand: metric
//! summaries, a correlation matrix over aligned daily-return series, and
//! a weighted combination recommendation.
//!
//! `find_optimal_combination` is a heuristic, not a global optimizer: it
//! seeds with the best Sharpe, then greedily adds the strategy whose
//! Sharpe net of a correlation penalty is highest. Weights are inverse
//! volatility, normalized to sum 1.0, and the reported expected Sharpe
//! is the weighted average of member Sharpes, ignoring covariance
//! between members. Treat it as a ranking device, not a forecast.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use siglab_core::domain::Trade;

use crate::metrics::{mean_f64, std_dev, PerformanceMetrics};

/// Synthetic strategy name meaning the union of every ledger.
pub const ALL_STRATEGIES: &str = "all";

/// Penalty weight applied to mean correlation with already-selected
/// members during greedy selection.
const CORRELATION_PENALTY: f64 = 0.5;

// ─── Tracker ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StrategyTracker {
    trades: Vec<Trade>,
}

impl StrategyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn load_trades(&mut self, trades: impl IntoIterator<Item = Trade>) {
        self.trades.extend(trades);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Distinct strategy names in the ledger, sorted.
    pub fn strategy_names(&self) -> Vec<String> {
        self.trades
            .iter()
            .map(|t| t.strategy.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Metrics for one strategy, or for [`ALL_STRATEGIES`].
    ///
    /// Trades are ordered by exit date before compounding so drawdown
    /// reflects chronological sequence, not insertion order.
    pub fn stats_for(&self, name: &str) -> PerformanceMetrics {
        let mut selected: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| name == ALL_STRATEGIES || t.strategy == name)
            .cloned()
            .collect();
        selected.sort_by_key(|t| (t.exit_date, t.entry_date));
        PerformanceMetrics::from_trades(&selected)
    }

    /// Pearson correlation over per-strategy daily-return series aligned
    /// on the union of exit dates. Self-correlation is 1.0 by
    /// construction; degenerate series correlate 0.0 with everything.
    pub fn correlation_matrix(&self) -> CorrelationMatrix {
        let names = self.strategy_names();
        let series = self.aligned_daily_returns(&names);

        let n = names.len();
        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let c = pearson(&series[i], &series[j]);
                values[i][j] = c;
                values[j][i] = c;
            }
        }
        CorrelationMatrix { names, values }
    }

    /// Recommend `k` strategies and blend weights (see module doc).
    ///
    /// Returns `None` for an empty ledger or `k == 0`. Fewer than `k`
    /// distinct strategies selects them all.
    pub fn find_optimal_combination(&self, k: usize) -> Option<CombinationRecommendation> {
        let names = self.strategy_names();
        if names.is_empty() || k == 0 {
            return None;
        }

        let sharpes: Vec<f64> = names.iter().map(|n| self.stats_for(n).sharpe).collect();
        let correlation = self.correlation_matrix();

        // Greedy: seed with the best Sharpe, then add by penalized margin.
        let mut selected: Vec<usize> = Vec::with_capacity(k.min(names.len()));
        let mut remaining: Vec<usize> = (0..names.len()).collect();

        let seed = best_index(&remaining, |&i| sharpes[i]);
        selected.push(remaining.remove(seed));

        while selected.len() < k && !remaining.is_empty() {
            let next = best_index(&remaining, |&i| {
                let mean_corr = mean_f64(
                    &selected
                        .iter()
                        .map(|&s| correlation.values[i][s].abs())
                        .collect::<Vec<_>>(),
                );
                sharpes[i] - CORRELATION_PENALTY * mean_corr
            });
            selected.push(remaining.remove(next));
        }

        let weights = inverse_volatility_weights(&self.trades, &names, &selected);
        let expected_sharpe = selected
            .iter()
            .zip(&weights)
            .map(|(&i, w)| sharpes[i] * w)
            .sum();

        Some(CombinationRecommendation {
            strategies: selected.iter().map(|&i| names[i].clone()).collect(),
            weights,
            expected_sharpe,
        })
    }

    /// One return series per name, aligned on the union of exit dates.
    fn aligned_daily_returns(&self, names: &[String]) -> Vec<Vec<f64>> {
        let dates: Vec<NaiveDate> = self
            .trades
            .iter()
            .map(|t| t.exit_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let date_index: BTreeMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();

        let name_index: BTreeMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut series = vec![vec![0.0; dates.len()]; names.len()];
        for trade in &self.trades {
            if let (Some(&row), Some(&col)) = (
                name_index.get(trade.strategy.as_str()),
                date_index.get(&trade.exit_date),
            ) {
                series[row][col] += trade.return_pct;
            }
        }
        series
    }
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// Row-major, indexed like `names`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationRecommendation {
    pub strategies: Vec<String>,
    /// Parallel to `strategies`; sums to 1.0.
    pub weights: Vec<f64>,
    pub expected_sharpe: f64,
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Index into `candidates` of the highest-scoring entry. First wins on
/// ties, which keeps selection deterministic over the sorted name order.
fn best_index<F: Fn(&usize) -> f64>(candidates: &[usize], score: F) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (pos, candidate) in candidates.iter().enumerate() {
        let s = score(candidate);
        if s > best_score {
            best_score = s;
            best = pos;
        }
    }
    best
}

/// Inverse-volatility weights over the selected strategies, normalized
/// to sum 1.0. Volatility is the std of per-trade returns; if any
/// member's volatility is degenerate, all members weight equally.
fn inverse_volatility_weights(
    trades: &[Trade],
    names: &[String],
    selected: &[usize],
) -> Vec<f64> {
    let vols: Vec<f64> = selected
        .iter()
        .map(|&i| {
            let returns: Vec<f64> = trades
                .iter()
                .filter(|t| t.strategy == names[i])
                .map(|t| t.return_pct)
                .collect();
            std_dev(&returns)
        })
        .collect();

    if vols.iter().any(|&v| v < 1e-12) {
        return vec![1.0 / selected.len() as f64; selected.len()];
    }

    let inverse: Vec<f64> = vols.iter().map(|v| 1.0 / v).collect();
    let total: f64 = inverse.iter().sum();
    inverse.into_iter().map(|w| w / total).collect()
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let ma = mean_f64(a);
    let mb = mean_f64(b);
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    if va < 1e-15 || vb < 1e-15 {
        return 0.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use siglab_core::domain::{ExitReason, TradeDirection};

    fn make_trade(strategy: &str, day: u32, return_pct: f64) -> Trade {
        let entry = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let cost = 5_000.0;
        Trade {
            symbol: "SPY".into(),
            strategy: strategy.into(),
            direction: TradeDirection::Long,
            entry_date: entry,
            entry_price: 100.0,
            exit_date: entry + chrono::Duration::days(2),
            exit_price: 100.0 * (1.0 + return_pct),
            exit_reason: ExitReason::Signal,
            shares: 50.0,
            commission_paid: 0.0,
            slippage_paid: 0.0,
            profit_loss: cost * return_pct,
            return_pct,
            holding_days: 2,
        }
    }

    fn tracker_with_two_strategies() -> StrategyTracker {
        let mut tracker = StrategyTracker::new();
        for (day, r) in [(2, 0.02), (9, -0.01), (16, 0.03), (23, 0.01)] {
            tracker.record_trade(make_trade("momentum", day, r));
        }
        for (day, r) in [(2, -0.01), (9, 0.02), (16, -0.02), (23, 0.015)] {
            tracker.record_trade(make_trade("turtle", day, r));
        }
        tracker
    }

    // ─── Stats ───────────────────────────────────────────────────

    #[test]
    fn stats_filter_by_strategy_name() {
        let tracker = tracker_with_two_strategies();
        assert_eq!(tracker.stats_for("momentum").trade_count, 4);
        assert_eq!(tracker.stats_for("turtle").trade_count, 4);
        assert_eq!(tracker.stats_for(ALL_STRATEGIES).trade_count, 8);
        assert_eq!(tracker.stats_for("unknown").trade_count, 0);
    }

    #[test]
    fn stats_sort_chronologically_before_compounding() {
        let mut tracker = StrategyTracker::new();
        // Inserted out of order: the loss predates the gains.
        tracker.record_trade(make_trade("m", 20, 0.10));
        tracker.record_trade(make_trade("m", 2, -0.20));
        let stats = tracker.stats_for("m");
        // Sorted curve [1.0, 0.8, 0.88] → dd from the 1.0 start = 0.2.
        assert!((stats.max_drawdown - 0.2).abs() < 1e-10);
    }

    // ─── Correlation ─────────────────────────────────────────────

    #[test]
    fn correlation_matrix_shape_and_diagonal() {
        let tracker = tracker_with_two_strategies();
        let matrix = tracker.correlation_matrix();
        assert_eq!(matrix.names, vec!["momentum", "turtle"]);
        assert_eq!(matrix.values[0][0], 1.0);
        assert_eq!(matrix.values[1][1], 1.0);
        assert_eq!(matrix.values[0][1], matrix.values[1][0]);
    }

    #[test]
    fn identical_ledgers_correlate_fully() {
        let mut tracker = StrategyTracker::new();
        for (day, r) in [(2, 0.02), (9, -0.01), (16, 0.03)] {
            tracker.record_trade(make_trade("a", day, r));
            tracker.record_trade(make_trade("b", day, r));
        }
        let c = tracker.correlation_matrix().get("a", "b").unwrap();
        assert!((c - 1.0).abs() < 1e-10);
    }

    #[test]
    fn mirrored_ledgers_correlate_negatively() {
        let mut tracker = StrategyTracker::new();
        for (day, r) in [(2, 0.02), (9, -0.01), (16, 0.03)] {
            tracker.record_trade(make_trade("a", day, r));
            tracker.record_trade(make_trade("b", day, -r));
        }
        let c = tracker.correlation_matrix().get("a", "b").unwrap();
        assert!((c - (-1.0)).abs() < 1e-10);
    }

    #[test]
    fn degenerate_series_correlate_zero() {
        let mut tracker = StrategyTracker::new();
        tracker.record_trade(make_trade("flat", 2, 0.01));
        tracker.record_trade(make_trade("flat", 9, 0.01));
        tracker.record_trade(make_trade("live", 2, 0.02));
        tracker.record_trade(make_trade("live", 9, -0.01));
        let matrix = tracker.correlation_matrix();
        assert_eq!(matrix.get("flat", "live"), Some(0.0));
        assert_eq!(matrix.get("flat", "flat"), Some(1.0));
    }

    // ─── Combination ─────────────────────────────────────────────

    #[test]
    fn combination_weights_sum_to_one() {
        let tracker = tracker_with_two_strategies();
        let rec = tracker.find_optimal_combination(2).unwrap();
        assert_eq!(rec.strategies.len(), 2);
        let sum: f64 = rec.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(rec.weights.iter().all(|&w| w >= 0.0));
        assert!(rec.expected_sharpe.is_finite());
    }

    #[test]
    fn combination_clamps_k_to_available() {
        let tracker = tracker_with_two_strategies();
        let rec = tracker.find_optimal_combination(5).unwrap();
        assert_eq!(rec.strategies.len(), 2);
    }

    #[test]
    fn combination_is_deterministic() {
        let tracker = tracker_with_two_strategies();
        let a = tracker.find_optimal_combination(2).unwrap();
        let b = tracker.find_optimal_combination(2).unwrap();
        assert_eq!(a.strategies, b.strategies);
        assert_eq!(a.weights, b.weights);
    }

    #[test]
    fn combination_empty_cases() {
        let tracker = StrategyTracker::new();
        assert!(tracker.find_optimal_combination(2).is_none());
        let loaded = tracker_with_two_strategies();
        assert!(loaded.find_optimal_combination(0).is_none());
    }

    #[test]
    fn load_trades_bulk() {
        let mut tracker = StrategyTracker::new();
        tracker.load_trades(vec![
            make_trade("a", 2, 0.01),
            make_trade("b", 3, 0.02),
        ]);
        assert_eq!(tracker.trades().len(), 2);
        assert_eq!(tracker.strategy_names(), vec!["a", "b"]);
    }
}
