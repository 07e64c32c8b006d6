//! Trade records: executed orders (`TradeEvent`) and realized round trips (`ClosedTrade`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One executed buy or sell, as it hit the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub side: TradeSide,
    pub timestamp: NaiveDate,
    pub bar_index: usize,
    /// Slippage-adjusted execution price.
    pub price: f64,
    pub shares: f64,
    pub commission: f64,
    /// `shares * close * slippage_pct`: reporting only, already inside `price`.
    pub slippage_cost: f64,
    /// Total open shares after this execution.
    pub position_after: f64,
    pub cash_after: f64,
}

/// A lot (or part of one) closed by a sell. Immutable once logged.
///
/// Commissions and slippage are pro-rated by shares: the entry side by the
/// fraction of the lot closed, the exit side by the fraction of the sell
/// order this lot absorbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    // ── Entry ──
    pub entry_timestamp: NaiveDate,
    pub entry_bar: usize,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_timestamp: NaiveDate,
    pub exit_bar: usize,
    pub exit_price: f64,

    // ── Size ──
    pub shares: f64,

    // ── Costs ──
    pub entry_commission: f64,
    pub exit_commission: f64,
    pub slippage_cost: f64,

    // ── PnL ──
    pub gross_pnl: f64,
    pub net_pnl: f64,
    /// `net_pnl / (entry_price * shares)`, 0 when the cost basis is 0.
    pub return_pct: f64,

    /// Caller-attached annotations (regime, ATR, rationale...). The engine
    /// never writes here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ClosedTrade {
    pub fn commission(&self) -> f64 {
        self.entry_commission + self.exit_commission
    }

    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.shares
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_timestamp - self.entry_timestamp).num_days()
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    /// Attach a caller-specific field, replacing any previous value.
    pub fn annotate(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.extensions.insert(key.into(), value);
    }
}

/// Return on cost basis, defined as 0 for a zero basis.
pub(crate) fn return_on_basis(net_pnl: f64, basis: f64) -> f64 {
    if basis == 0.0 {
        0.0
    } else {
        net_pnl / basis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> ClosedTrade {
        ClosedTrade {
            entry_timestamp: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            entry_bar: 4,
            entry_price: 100.0,
            exit_timestamp: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            exit_bar: 8,
            exit_price: 110.0,
            shares: 50.0,
            entry_commission: 5.0,
            exit_commission: 5.0,
            slippage_cost: 2.0,
            gross_pnl: 500.0,
            net_pnl: 490.0,
            return_pct: 490.0 / 5000.0,
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn derived_fields() {
        let trade = sample_trade();
        assert_eq!(trade.commission(), 10.0);
        assert_eq!(trade.cost_basis(), 5000.0);
        assert!(trade.is_winner());
        assert_eq!(trade.holding_days(), 6);
        assert_eq!(trade.bars_held(), 4);
    }

    #[test]
    fn return_on_zero_basis_is_zero() {
        assert_eq!(return_on_basis(-10.0, 0.0), 0.0);
        assert!((return_on_basis(50.0, 1000.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn annotations_survive_serialization() {
        let mut trade = sample_trade();
        trade.annotate("regime", serde_json::json!("trending"));
        let json = serde_json::to_string(&trade).unwrap();
        let back: ClosedTrade = serde_json::from_str(&json).unwrap();
        assert_eq!(back.extensions["regime"], serde_json::json!("trending"));
    }

    #[test]
    fn empty_extensions_are_omitted() {
        let json = serde_json::to_string(&sample_trade()).unwrap();
        assert!(!json.contains("extensions"));
    }
}
