//! Engine configuration and run result types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{ClosedTrade, Lot, TradeEvent};
use crate::engine::cost_model::CostModel;
use crate::error::ConfigError;
use crate::signal::SignalTieBreak;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub commission_fixed: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    /// Fraction of initial capital committed per buy, in (0, 1].
    pub position_size_pct: f64,
    pub tie_break: SignalTieBreak,
    /// When false, share counts are floored to whole shares.
    pub fractional_shares: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            commission_fixed: 20.0,
            commission_pct: 0.0003,
            slippage_pct: 0.001,
            position_size_pct: 0.25,
            tie_break: SignalTieBreak::BuyFirst,
            fractional_shares: true,
        }
    }
}

impl EngineConfig {
    /// No commission, no slippage, full capital per buy.
    pub fn frictionless(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            commission_fixed: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            position_size_pct: 1.0,
            ..Self::default()
        }
    }

    /// Validate every parameter and build the cost model.
    pub fn validate(&self) -> Result<CostModel, ConfigError> {
        if !self.initial_capital.is_finite() {
            return Err(ConfigError::NonFiniteParameter {
                name: "initial_capital",
            });
        }
        if self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if !(self.position_size_pct > 0.0 && self.position_size_pct <= 1.0) {
            return Err(ConfigError::PositionSizeOutOfRange(self.position_size_pct));
        }
        CostModel::new(self.slippage_pct, self.commission_fixed, self.commission_pct)
    }

    /// Per-buy budget cap: `initial_capital * position_size_pct`.
    pub fn max_position_value(&self) -> f64 {
        self.initial_capital * self.position_size_pct
    }
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub initial_capital: f64,
    /// Cash plus open lots marked at the last close.
    pub final_value: f64,
    pub final_cash: f64,
    /// Mark-to-market value at each bar close.
    pub equity_curve: Vec<f64>,
    /// Bar timestamps, aligned with `equity_curve`.
    pub timestamps: Vec<NaiveDate>,
    /// Every executed buy and sell, in order.
    pub trade_log: Vec<TradeEvent>,
    /// Realized lot closes, FIFO order.
    pub closed_trades: Vec<ClosedTrade>,
    /// Lots still open after the last bar.
    pub open_lots: Vec<Lot>,
    pub total_commission: f64,
    /// Sum of `shares * close * slippage_pct` over all executions.
    pub total_slippage: f64,
    /// Executed buys.
    pub num_trades: usize,
    pub skipped_buys: usize,
    pub skipped_sells: usize,
    pub conflicting_bars: usize,
    pub bar_count: usize,
    pub signal_source: String,
}

impl RunResult {
    pub fn closed_trade_count(&self) -> usize {
        self.closed_trades.len()
    }

    pub fn open_shares(&self) -> f64 {
        self.open_lots.iter().map(|l| l.shares).sum()
    }

    /// Mark-to-market value of the open lots at the last close.
    pub fn open_position_value(&self) -> f64 {
        self.final_value - self.final_cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed_trades.iter().map(|t| t.net_pnl).sum()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.timestamps.first().copied()
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }
}
