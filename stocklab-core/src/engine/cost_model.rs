//! Cost model: slippage and commission calculation.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less (lower price).
//! Commission is a fixed amount plus a percentage of the traded notional.
//! Parameters are validated once, when the model is built; the per-bar
//! functions never fail.

use serde::{Deserialize, Serialize};

use crate::domain::TradeSide;
use crate::error::ConfigError;

/// Slippage-adjusted execution price for `close`.
///
/// Buy: `close * (1 + slippage_pct)`. Sell: `close * (1 - slippage_pct)`.
pub fn execution_price(close: f64, side: TradeSide, slippage_pct: f64) -> f64 {
    match side {
        TradeSide::Buy => close * (1.0 + slippage_pct),
        TradeSide::Sell => close * (1.0 - slippage_pct),
    }
}

/// Commission for a trade of the given notional: `fixed + notional * pct`.
pub fn commission(notional: f64, fixed: f64, pct: f64) -> f64 {
    fixed + notional * pct
}

/// Cost model for execution friction (slippage + commission).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    slippage_pct: f64,
    commission_fixed: f64,
    commission_pct: f64,
}

impl CostModel {
    /// Build a cost model, rejecting negative or non-finite parameters.
    pub fn new(
        slippage_pct: f64,
        commission_fixed: f64,
        commission_pct: f64,
    ) -> Result<Self, ConfigError> {
        check_non_negative("slippage_pct", slippage_pct)?;
        check_non_negative("commission_fixed", commission_fixed)?;
        check_non_negative("commission_pct", commission_pct)?;
        Ok(Self {
            slippage_pct,
            commission_fixed,
            commission_pct,
        })
    }

    pub fn frictionless() -> Self {
        Self {
            slippage_pct: 0.0,
            commission_fixed: 0.0,
            commission_pct: 0.0,
        }
    }

    pub fn slippage_pct(&self) -> f64 {
        self.slippage_pct
    }

    pub fn commission_fixed(&self) -> f64 {
        self.commission_fixed
    }

    pub fn commission_pct(&self) -> f64 {
        self.commission_pct
    }

    pub fn execution_price(&self, close: f64, side: TradeSide) -> f64 {
        execution_price(close, side, self.slippage_pct)
    }

    pub fn commission(&self, notional: f64) -> f64 {
        commission(notional, self.commission_fixed, self.commission_pct)
    }

    /// Slippage cost for reporting: `shares * close * slippage_pct`.
    pub fn slippage_cost(&self, close: f64, shares: f64) -> f64 {
        shares * close * self.slippage_pct
    }

    /// Largest share count whose price plus commission fits in `budget`.
    ///
    /// Solves `shares * price * (1 + pct) + fixed = budget`, floored at 0.
    pub fn affordable_shares(&self, budget: f64, price: f64) -> f64 {
        let per_share = price * (1.0 + self.commission_pct);
        if per_share <= 0.0 {
            return 0.0;
        }
        ((budget - self.commission_fixed) / per_share).max(0.0)
    }

    /// Notional plus commission for buying `shares` at `price`.
    pub fn total_buy_cost(&self, shares: f64, price: f64) -> f64 {
        let notional = shares * price;
        notional + self.commission(notional)
    }
}

pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFiniteParameter { name });
    }
    if value < 0.0 {
        return Err(ConfigError::NegativeCost { name, value });
    }
    Ok(())
}
