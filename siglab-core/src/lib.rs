//! SigLab Core — indicators, strategy signal generators, backtesters.
//!
//! This crate contains the heart of the signal & backtesting engine:
//! - Domain types (bars, signals, trades, strategy parameters, fundamentals)
//! - Indicator library (pure functions over ordered price/volume slices)
//! - Eight pluggable strategies behind one `Strategy` trait
//! - Single-asset backtester (FLAT→OPEN→FLAT state machine with frictions)
//! - Portfolio backtester (shared capital pool, max-positions ceiling)
//!
//! The engine is synchronous per run: bars are consumed in chronological
//! order because exit-rule evaluation depends on prior state. Parallelism
//! belongs one level up, across independent runs.

pub mod backtest;
pub mod domain;
pub mod indicators;
pub mod strategies;
