//! Criterion benchmarks for SigLab hot paths.
//!
//! Benchmarks:
//! 1. Indicator batch (SMA, EMA, RSI, ATR, Bollinger over growing slices)
//! 2. Strategy evaluation (one `analyze` call on a full history)
//! 3. Single-asset backtest loop (signal per bar over the whole series)
//! 4. Portfolio backtest (10 symbols against one shared pool)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use siglab_core::backtest::{
    run_backtest, run_portfolio_backtest, BacktestConfig, PortfolioConfig, PortfolioEntry,
};
use siglab_core::domain::PriceBar;
use siglab_core::indicators::{atr, bollinger, ema, momentum, rsi, sma};
use siglab_core::strategies::{MarketSnapshot, MomentumStrategy, Strategy, TurtleStrategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect()
}

// ── 1. Indicator Batch ───────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_batch");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        group.bench_with_input(
            BenchmarkId::new("sma_20", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| sma(black_box(&closes), 20));
            },
        );

        // The stack a typical strategy computes per evaluation.
        group.bench_with_input(
            BenchmarkId::new("full_stack_6", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    let _ = sma(black_box(&closes), 50);
                    let _ = ema(black_box(&closes), 20);
                    let _ = rsi(black_box(&closes), 14);
                    let _ = momentum(black_box(&closes), 20);
                    let _ = bollinger(black_box(&closes), 20, 2.0);
                    let _ = atr(black_box(&bars), 14);
                });
            },
        );
    }

    group.finish();
}

// ── 2. Strategy Evaluation ───────────────────────────────────────────

fn bench_strategy_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_analyze");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        let momentum_strategy = MomentumStrategy::new();
        let turtle = TurtleStrategy::new();

        group.bench_with_input(
            BenchmarkId::new("momentum", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    let snapshot = MarketSnapshot::new("BENCH", black_box(&bars));
                    momentum_strategy.analyze(&snapshot)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("turtle", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    let snapshot = MarketSnapshot::new("BENCH", black_box(&bars));
                    turtle.analyze(&snapshot)
                });
            },
        );
    }

    group.finish();
}

// ── 3. Single-Asset Backtest Loop ────────────────────────────────────

fn bench_backtest_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest_loop");
    group.sample_size(20);

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        let strategy = MomentumStrategy::new();
        let config = BacktestConfig::default();

        group.bench_with_input(
            BenchmarkId::new("momentum", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    run_backtest(
                        black_box(&strategy),
                        "BENCH",
                        black_box(&bars),
                        black_box(&config),
                    )
                });
            },
        );
    }

    group.finish();
}

// ── 4. Portfolio Backtest ────────────────────────────────────────────

fn bench_portfolio(c: &mut Criterion) {
    let mut group = c.benchmark_group("portfolio_backtest");
    group.sample_size(10);

    group.bench_function("10_symbols_1260_bars", |b| {
        b.iter(|| {
            let entries: Vec<PortfolioEntry> = (0..10)
                .map(|i| PortfolioEntry {
                    strategy: Box::new(MomentumStrategy::new()),
                    symbol: format!("SYM{i}"),
                    weight: 0.1,
                    bars: make_bars(1260),
                })
                .collect();
            run_portfolio_backtest(black_box(&entries), &PortfolioConfig::default())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_indicators,
    bench_strategy_analyze,
    bench_backtest_loop,
    bench_portfolio,
);
criterion_main!(benches);
