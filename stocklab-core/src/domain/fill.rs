use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An execution handed to the ledger: how many shares, at what price, for what cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: NaiveDate,
    pub bar_index: usize,
    pub shares: f64,
    /// Slippage-adjusted execution price.
    pub price: f64,
    /// Commission for the whole fill.
    pub commission: f64,
    /// Slippage cost for the whole fill (reporting only).
    pub slippage_cost: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.shares * self.price
    }
}
