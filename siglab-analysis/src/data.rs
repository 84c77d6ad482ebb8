//! Bar and trade loading, plus synthetic data generation.
//!
//! Real data arrives as CSV with a `date,open,high,low,close,volume`
//! header. Synthetic bars are a deterministic random walk seeded from the
//! symbol name, a developer convenience for running the engine without a
//! data feed.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use siglab_core::domain::{PriceBar, Trade};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("parse csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("{path} has no data rows")]
    Empty { path: String },
    #[error("bars out of order at data row {row}: {date} does not advance")]
    OutOfOrder { row: usize, date: NaiveDate },
}

/// Load a date-ascending bar series from a CSV file.
///
/// Rejects files whose dates repeat or go backwards; the engine assumes
/// a strictly ascending timeline everywhere downstream.
pub fn load_bars_csv(path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars: Vec<PriceBar> = Vec::new();
    for (i, row) in reader.deserialize::<PriceBar>().enumerate() {
        let bar = row?;
        if let Some(prev) = bars.last() {
            if bar.date <= prev.date {
                return Err(LoadError::OutOfOrder {
                    row: i + 1,
                    date: bar.date,
                });
            }
        }
        bars.push(bar);
    }
    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(bars)
}

/// Load a closed-trade ledger from a CSV file (the format `export`
/// writes). An empty ledger is a valid outcome here, unlike bars.
pub fn load_trades_csv(path: &Path) -> Result<Vec<Trade>, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut trades = Vec::new();
    for row in reader.deserialize::<Trade>() {
        trades.push(row?);
    }
    Ok(trades)
}

/// Generate synthetic bars for testing and development.
///
/// A simple random walk from a starting price of 100.0, weekends
/// skipped. The RNG is seeded from the symbol name and the caller's
/// seed, so the same inputs always produce the same series.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> Vec<PriceBar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(PriceBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

/// Deterministic BLAKE3 fingerprint over a set of bar series.
///
/// Covers dates and all OHLCV values in sorted symbol order, so the hash
/// is identical regardless of how the caller ordered the series.
pub fn dataset_hash(series: &[(String, Vec<PriceBar>)]) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut order: Vec<usize> = (0..series.len()).collect();
    order.sort_by(|&a, &b| series[a].0.cmp(&series[b].0));

    for index in order {
        let (symbol, bars) = &series[index];
        hasher.update(symbol.as_bytes());
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn month_of_bars(symbol: &str) -> Vec<PriceBar> {
        generate_synthetic_bars(symbol, jan(1), jan(31), 42)
    }

    // ── Synthetic generation ──

    #[test]
    fn synthetic_data_is_deterministic() {
        assert_eq!(month_of_bars("SPY"), month_of_bars("SPY"));
    }

    #[test]
    fn different_symbols_get_different_walks() {
        let spy = month_of_bars("SPY");
        let qqq = month_of_bars("QQQ");
        assert_eq!(spy.len(), qqq.len());
        assert_ne!(spy[0].close, qqq[0].close);
    }

    #[test]
    fn different_seeds_get_different_walks() {
        let a = generate_synthetic_bars("SPY", jan(1), jan(31), 1);
        let b = generate_synthetic_bars("SPY", jan(1), jan(31), 2);
        assert_ne!(a[0].close, b[0].close);
    }

    #[test]
    fn weekends_are_skipped() {
        for bar in month_of_bars("SPY") {
            let weekday = bar.date.weekday();
            assert_ne!(weekday, chrono::Weekday::Sat);
            assert_ne!(weekday, chrono::Weekday::Sun);
        }
    }

    #[test]
    fn synthetic_bars_are_sane() {
        let bars = month_of_bars("SPY");
        assert!(!bars.is_empty());
        for bar in &bars {
            assert!(bar.is_sane(), "insane bar on {}", bar.date);
        }
    }

    // ── CSV loading ──

    #[test]
    fn csv_roundtrip_preserves_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");

        let bars = month_of_bars("SPY");
        let mut writer = csv::Writer::from_path(&path).unwrap();
        for bar in &bars {
            writer.serialize(bar).unwrap();
        }
        writer.flush().unwrap();

        let loaded = load_bars_csv(&path).unwrap();
        assert_eq!(loaded, bars);
    }

    #[test]
    fn out_of_order_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-03,100.0,101.0,99.0,100.5,1000\n\
             2024-01-02,100.5,101.5,99.5,101.0,1100\n",
        )
        .unwrap();

        assert!(matches!(
            load_bars_csv(&path),
            Err(LoadError::OutOfOrder { row: 2, .. })
        ));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2024-01-02,100.0,101.0,99.0,100.5,1000\n\
             2024-01-02,100.5,101.5,99.5,101.0,1100\n",
        )
        .unwrap();

        assert!(matches!(
            load_bars_csv(&path),
            Err(LoadError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(&path, "date,open,high,low,close,volume\n").unwrap();

        assert!(matches!(load_bars_csv(&path), Err(LoadError::Empty { .. })));
    }

    // ── Dataset hashing ──

    #[test]
    fn dataset_hash_ignores_series_order() {
        let spy = ("SPY".to_string(), month_of_bars("SPY"));
        let qqq = ("QQQ".to_string(), month_of_bars("QQQ"));

        let forward = dataset_hash(&[spy.clone(), qqq.clone()]);
        let reversed = dataset_hash(&[qqq, spy]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn dataset_hash_sees_price_changes() {
        let mut bars = month_of_bars("SPY");
        let original = dataset_hash(&[("SPY".to_string(), bars.clone())]);
        bars[3].close += 0.01;
        let tweaked = dataset_hash(&[("SPY".to_string(), bars)]);
        assert_ne!(original, tweaked);
    }
}
