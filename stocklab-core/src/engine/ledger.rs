//! Position ledger: cash, FIFO lot queue, and realized P&L per closed lot.
//!
//! Accounting identity, checked after every mutation in debug builds:
//! `open shares == total bought - total sold`.

use std::collections::VecDeque;

use crate::domain::trade::return_on_basis;
use crate::domain::{ClosedTrade, Fill, Lot};
use crate::error::LedgerError;

/// Relative tolerance for cash comparisons (absorbs float rounding in sizing).
const CASH_EPSILON: f64 = 1e-9;
/// Absolute tolerance below which a share quantity counts as zero.
pub(crate) const SHARE_EPSILON: f64 = 1e-9;

fn cash_tolerance(cash: f64) -> f64 {
    CASH_EPSILON * cash.abs().max(1.0)
}

#[derive(Debug, Clone)]
pub struct PositionLedger {
    cash: f64,
    lots: VecDeque<Lot>,
    total_bought: f64,
    total_sold: f64,
}

impl PositionLedger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            lots: VecDeque::new(),
            total_bought: 0.0,
            total_sold: 0.0,
        }
    }

    /// Append a lot and pay for it.
    ///
    /// Fails with `InsufficientCash` if `shares * price + commission` exceeds
    /// the current cash balance.
    pub fn open_lot(&mut self, fill: &Fill) -> Result<(), LedgerError> {
        check_quantity(fill.shares)?;
        let required = fill.notional() + fill.commission;
        if !self.can_afford(required) {
            return Err(LedgerError::InsufficientCash {
                required,
                available: self.cash,
            });
        }

        // Rounding may leave the balance a hair under zero; cash is never negative.
        self.cash = (self.cash - required).max(0.0);
        self.total_bought += fill.shares;
        self.lots.push_back(Lot {
            entry_timestamp: fill.timestamp,
            entry_bar: fill.bar_index,
            entry_price: fill.price,
            shares: fill.shares,
            entry_commission: fill.commission,
            entry_slippage: fill.slippage_cost,
        });
        self.debug_check_shares();
        Ok(())
    }

    /// Close `fill.shares` oldest-first and return one `ClosedTrade` per lot touched.
    ///
    /// Exit commission and slippage are split across lots in proportion to
    /// the shares each lot contributes. A request within `SHARE_EPSILON` of
    /// the open position drains every lot. Fails with `InvalidState` if more
    /// shares are requested than are open.
    pub fn close(&mut self, fill: &Fill) -> Result<Vec<ClosedTrade>, LedgerError> {
        check_quantity(fill.shares)?;
        let open = self.total_open_shares();
        if fill.shares > open + SHARE_EPSILON {
            return Err(LedgerError::InvalidState {
                requested: fill.shares,
                open,
            });
        }
        let proceeds = fill.shares.min(open) * fill.price - fill.commission;
        if self.cash + proceeds < -cash_tolerance(self.cash) {
            return Err(LedgerError::InsufficientCash {
                required: fill.commission,
                available: self.cash + fill.shares * fill.price,
            });
        }

        let full_close = fill.shares >= open - SHARE_EPSILON;
        let requested = if full_close { open } else { fill.shares };
        let mut remaining = requested;
        let mut closed = Vec::new();

        while full_close || remaining > SHARE_EPSILON {
            let lot = match self.lots.front_mut() {
                Some(lot) => lot,
                None => break,
            };

            let take = if full_close {
                lot.shares
            } else {
                remaining.min(lot.shares)
            };
            let lot_fraction = take / lot.shares;
            let order_fraction = take / requested;

            let entry_commission = lot.entry_commission * lot_fraction;
            let entry_slippage = lot.entry_slippage * lot_fraction;
            let exit_commission = fill.commission * order_fraction;
            let exit_slippage = fill.slippage_cost * order_fraction;

            let gross_pnl = (fill.price - lot.entry_price) * take;
            let net_pnl = gross_pnl - entry_commission - exit_commission;

            closed.push(ClosedTrade {
                entry_timestamp: lot.entry_timestamp,
                entry_bar: lot.entry_bar,
                entry_price: lot.entry_price,
                exit_timestamp: fill.timestamp,
                exit_bar: fill.bar_index,
                exit_price: fill.price,
                shares: take,
                entry_commission,
                exit_commission,
                slippage_cost: entry_slippage + exit_slippage,
                gross_pnl,
                net_pnl,
                return_pct: return_on_basis(net_pnl, lot.entry_price * take),
                extensions: Default::default(),
            });

            lot.shares -= take;
            lot.entry_commission -= entry_commission;
            lot.entry_slippage -= entry_slippage;
            remaining -= take;

            if lot.shares <= SHARE_EPSILON {
                self.lots.pop_front();
            }
        }

        self.cash = (self.cash + proceeds).max(0.0);
        self.total_sold += requested;
        self.debug_check_shares();
        Ok(closed)
    }

    /// Whether `amount` can be paid from cash, within rounding tolerance.
    pub fn can_afford(&self, amount: f64) -> bool {
        amount <= self.cash + cash_tolerance(self.cash)
    }

    /// `cash + open shares * price`.
    pub fn mark_to_market(&self, price: f64) -> f64 {
        self.cash + self.total_open_shares() * price
    }

    pub fn total_open_shares(&self) -> f64 {
        self.lots.iter().map(|l| l.shares).sum()
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.lots.iter().map(|l| l.unrealized_pnl(price)).sum()
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn is_flat(&self) -> bool {
        self.lots.is_empty()
    }

    /// Open lots, oldest first.
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn lot_count(&self) -> usize {
        self.lots.len()
    }

    pub fn total_bought(&self) -> f64 {
        self.total_bought
    }

    pub fn total_sold(&self) -> f64 {
        self.total_sold
    }

    fn debug_check_shares(&self) {
        #[cfg(debug_assertions)]
        {
            let open = self.total_open_shares();
            let expected = self.total_bought - self.total_sold;
            let tolerance = 1e-6 * self.total_bought.max(1.0);
            assert!(
                (open - expected).abs() <= tolerance,
                "share accounting violated: open={open}, bought={} - sold={} = {expected}",
                self.total_bought,
                self.total_sold
            );
        }
    }
}

fn check_quantity(shares: f64) -> Result<(), LedgerError> {
    if !shares.is_finite() || shares <= SHARE_EPSILON {
        return Err(LedgerError::InvalidQuantity(shares));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fill(bar: usize, shares: f64, price: f64, commission: f64) -> Fill {
        Fill {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(bar as i64),
            bar_index: bar,
            shares,
            price,
            commission,
            slippage_cost: 0.0,
        }
    }

    #[test]
    fn open_lot_debits_cash() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 5.0)).unwrap();
        assert_eq!(ledger.cash(), 10_000.0 - 1_000.0 - 5.0);
        assert_eq!(ledger.total_open_shares(), 10.0);
        assert_eq!(ledger.lot_count(), 1);
    }

    #[test]
    fn open_lot_rejects_overspend() {
        let mut ledger = PositionLedger::new(1_000.0);
        let err = ledger.open_lot(&fill(0, 10.0, 100.0, 5.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientCash { .. }));
        assert_eq!(ledger.cash(), 1_000.0);
        assert!(ledger.is_flat());
    }

    #[test]
    fn open_lot_rejects_zero_shares() {
        let mut ledger = PositionLedger::new(1_000.0);
        assert_eq!(
            ledger.open_lot(&fill(0, 0.0, 100.0, 0.0)),
            Err(LedgerError::InvalidQuantity(0.0))
        );
    }

    #[test]
    fn open_lot_rejects_dust_shares() {
        let mut ledger = PositionLedger::new(1_000.0);
        let dust = 8.7e-15;
        assert_eq!(
            ledger.open_lot(&fill(0, dust, 13.0, 0.0)),
            Err(LedgerError::InvalidQuantity(dust))
        );
        assert!(ledger.is_flat());
        assert_eq!(ledger.cash(), 1_000.0);
    }

    #[test]
    fn full_close_drains_every_lot() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 0.0)).unwrap();
        ledger.open_lot(&fill(1, 5.0, 110.0, 0.0)).unwrap();
        // A hair under the open position still counts as the whole position.
        let closed = ledger.close(&fill(2, 15.0 - 1e-12, 120.0, 3.0)).unwrap();
        assert_eq!(closed.len(), 2);
        assert!(ledger.is_flat());
        assert_eq!(ledger.total_open_shares(), 0.0);
        assert_eq!(closed[1].shares, 5.0);
        let exit_commission: f64 = closed.iter().map(|t| t.exit_commission).sum();
        assert!((exit_commission - 3.0).abs() < 1e-10);
    }

    #[test]
    fn close_partial_uses_oldest_lot() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 10.0)).unwrap();
        ledger.open_lot(&fill(1, 20.0, 110.0, 20.0)).unwrap();

        let closed = ledger.close(&fill(2, 4.0, 120.0, 8.0)).unwrap();
        assert_eq!(closed.len(), 1);
        let t = &closed[0];
        assert_eq!(t.entry_price, 100.0);
        assert_eq!(t.shares, 4.0);
        // 40% of the first lot's commission, all of the exit commission
        assert!((t.entry_commission - 4.0).abs() < 1e-10);
        assert!((t.exit_commission - 8.0).abs() < 1e-10);
        assert!((t.gross_pnl - 80.0).abs() < 1e-10);
        assert!((t.net_pnl - 68.0).abs() < 1e-10);

        let lots: Vec<&Lot> = ledger.lots().collect();
        assert_eq!(lots.len(), 2);
        assert!((lots[0].shares - 6.0).abs() < 1e-10);
        assert!((lots[0].entry_commission - 6.0).abs() < 1e-10);
        assert_eq!(lots[1].shares, 20.0);
    }

    #[test]
    fn close_spanning_lots_prorates_exit_costs() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 10.0)).unwrap();
        ledger.open_lot(&fill(1, 30.0, 110.0, 30.0)).unwrap();

        let closed = ledger.close(&fill(2, 40.0, 105.0, 40.0)).unwrap();
        assert_eq!(closed.len(), 2);
        assert!((closed[0].exit_commission - 10.0).abs() < 1e-10);
        assert!((closed[1].exit_commission - 30.0).abs() < 1e-10);
        assert!((closed[0].net_pnl - (50.0 - 10.0 - 10.0)).abs() < 1e-10);
        assert!((closed[1].net_pnl - (-150.0 - 30.0 - 30.0)).abs() < 1e-10);
        assert!(ledger.is_flat());
    }

    #[test]
    fn close_credits_cash() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 0.0)).unwrap();
        ledger.close(&fill(1, 10.0, 110.0, 5.0)).unwrap();
        assert!((ledger.cash() - (9_000.0 + 1_100.0 - 5.0)).abs() < 1e-10);
        assert_eq!(ledger.total_bought(), 10.0);
        assert_eq!(ledger.total_sold(), 10.0);
    }

    #[test]
    fn close_more_than_open_is_invalid_state() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 0.0)).unwrap();
        let err = ledger.close(&fill(1, 11.0, 100.0, 0.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
        assert_eq!(ledger.total_open_shares(), 10.0);
    }

    #[test]
    fn close_on_flat_ledger_is_invalid_state() {
        let mut ledger = PositionLedger::new(10_000.0);
        assert!(matches!(
            ledger.close(&fill(0, 1.0, 100.0, 0.0)),
            Err(LedgerError::InvalidState { .. })
        ));
    }

    #[test]
    fn mark_to_market_uses_current_price() {
        let mut ledger = PositionLedger::new(10_000.0);
        ledger.open_lot(&fill(0, 10.0, 100.0, 0.0)).unwrap();
        assert_eq!(ledger.mark_to_market(120.0), 9_000.0 + 1_200.0);
        assert_eq!(ledger.unrealized_pnl(120.0), 200.0);
    }
}
