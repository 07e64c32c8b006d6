//! Backtesting engine: bar-by-bar event loop and supporting infrastructure.
//!
//! The engine consumes a validated `PriceSeries` and a signal source, then
//! walks the bars once:
//!
//! 1. Buy: size by capital fraction, pay slippage and commission, open a lot
//! 2. Sell: close every open lot FIFO, realize P&L per lot
//! 3. Post-bar: mark-to-market into the equity curve

pub mod cost_model;
pub mod ledger;
pub mod loop_runner;
pub mod state;

pub use cost_model::{commission, execution_price, CostModel};
pub use ledger::PositionLedger;
pub use loop_runner::{run_backtest, BacktestEngine};
pub use state::{EngineConfig, RunResult};
