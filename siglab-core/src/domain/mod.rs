//! Domain types for the signal & backtesting engine.

pub mod bar;
pub mod fundamentals;
pub mod params;
pub mod signal;
pub mod trade;

pub use bar::PriceBar;
pub use fundamentals::FundamentalSnapshot;
pub use params::StrategyParams;
pub use signal::{Signal, SignalAction};
pub use trade::{ExitReason, Trade, TradeDirection};

/// Symbol type alias
pub type Symbol = String;
