//! StockLab Core: price series, cost model, position ledger, bar-by-bar engine.
//!
//! This crate contains the simulation itself:
//! - Domain types (bars, lots, fills, trade events, closed trades)
//! - Cost model with directional slippage and fixed + percentage commission
//! - FIFO position ledger
//! - Single-asset event loop driven by a pluggable signal source
//! - Injected run logger (no global logging state)
//!
//! Metrics, benchmarking, configuration files and I/O live in `stocklab-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod signal;

pub use domain::{Bar, ClosedTrade, Fill, Lot, PriceSeries, TradeEvent, TradeSide};
pub use engine::{run_backtest, BacktestEngine, CostModel, EngineConfig, PositionLedger, RunResult};
pub use error::{ConfigError, EngineError, InputDataError, LedgerError};
pub use logging::{EngineEvent, NullLogger, RecordingLogger, RunLogger, SkipReason, TracingLogger};
pub use signal::{BarSignals, BuyAndHold, SeriesSignals, SignalSource, SignalTieBreak};
