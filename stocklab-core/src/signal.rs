//! Signal sources: where the engine reads its buy/sell decisions from.
//!
//! Signals are portfolio-agnostic: a source sees the bar and its index,
//! never cash or position state. The default source reads the columns the
//! feature pipeline attached to each bar; the buy-and-hold source ignores
//! them and is used for the benchmark run.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Buy/sell flags for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarSignals {
    pub buy: bool,
    pub sell: bool,
}

impl BarSignals {
    pub fn is_conflicting(&self) -> bool {
        self.buy && self.sell
    }
}

pub trait SignalSource: Send + Sync {
    /// Human-readable name (e.g., "series_columns").
    fn name(&self) -> &str;

    /// Signals for the bar at `index`.
    fn signals(&self, index: usize, bar: &Bar) -> BarSignals;
}

/// Reads `buy_signal` / `sell_signal` straight off each bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesSignals;

impl SignalSource for SeriesSignals {
    fn name(&self) -> &str {
        "series_columns"
    }

    fn signals(&self, _index: usize, bar: &Bar) -> BarSignals {
        BarSignals {
            buy: bar.buy_signal,
            sell: bar.sell_signal,
        }
    }
}

/// Buy on the first bar, never sell.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl SignalSource for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn signals(&self, index: usize, _bar: &Bar) -> BarSignals {
        BarSignals {
            buy: index == 0,
            sell: false,
        }
    }
}

/// What to do on a bar where both buy and sell fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTieBreak {
    /// Try the buy; evaluate the sell only if no lot was opened.
    #[default]
    BuyFirst,
    /// Try the sell; evaluate the buy only if nothing was closed.
    SellFirst,
    /// Do nothing on a conflicting bar.
    Skip,
}
