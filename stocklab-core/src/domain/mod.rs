//! Domain types for StockLab

pub mod bar;
pub mod fill;
pub mod lot;
pub mod trade;

pub use bar::{Bar, PriceSeries};
pub use fill::Fill;
pub use lot::Lot;
pub use trade::{ClosedTrade, TradeEvent, TradeSide};
