//! Lot: one open tranche of shares acquired by a single buy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub entry_timestamp: NaiveDate,
    pub entry_bar: usize,
    /// Slippage-adjusted execution price.
    pub entry_price: f64,
    /// Shares still open in this lot.
    pub shares: f64,
    /// Entry commission still attributable to the open shares.
    pub entry_commission: f64,
    /// Entry slippage cost still attributable to the open shares.
    pub entry_slippage: f64,
}

impl Lot {
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.shares
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.shares - self.entry_commission
    }
}
