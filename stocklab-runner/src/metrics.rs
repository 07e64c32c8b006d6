//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or closed trades in,
//! scalar out. Degenerate inputs (empty curve, zero variance, no trades)
//! produce 0.0, never NaN. The one documented exception is
//! `profit_factor`, which is `+inf` when there are wins and no losses.

use serde::{Deserialize, Serialize};
use stocklab_core::domain::ClosedTrade;

/// Trading days per year, for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for one equity curve + trade list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    #[serde(with = "infinite_f64")]
    pub profit_factor: f64,
    pub expectancy: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_holding_days: f64,
    pub closed_trade_count: usize,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and closed-trade list.
    pub fn compute(equity_curve: &[f64], trades: &[ClosedTrade], initial_capital: f64) -> Self {
        let final_value = equity_curve.last().copied().unwrap_or(initial_capital);
        Self {
            total_return: total_return(initial_capital, final_value),
            cagr: cagr(initial_capital, final_value, equity_curve.len()),
            sharpe: sharpe_ratio(equity_curve),
            sortino: sortino_ratio(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            expectancy: expectancy(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            avg_holding_days: avg_holding_days(trades),
            closed_trade_count: trades.len(),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `final / initial - 1`. 0.0 for non-positive initial capital.
pub fn total_return(initial_capital: f64, final_value: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    final_value / initial_capital - 1.0
}

/// Compound annual growth rate over `bars` trading days.
pub fn cagr(initial_capital: f64, final_value: f64, bars: usize) -> f64 {
    if bars < 2 || initial_capital <= 0.0 || final_value <= 0.0 {
        return 0.0;
    }
    let years = bars as f64 / TRADING_DAYS_PER_YEAR;
    (final_value / initial_capital).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from daily returns (zero risk-free rate).
///
/// Sharpe = mean(daily returns) / std(daily returns) * sqrt(252).
/// Returns 0.0 if variance is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Maximum drawdown as a non-positive fraction (e.g., -0.15 = 15% drawdown).
///
/// `min((equity - running_max) / running_max)`; 0.0 for a curve that never falls.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of closed trades with `net_pnl > 0`.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit / gross loss.
///
/// `+inf` with wins and no losses; 0.0 with no wins.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_profit <= 0.0 {
        return 0.0;
    }
    if gross_loss <= 0.0 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

/// Mean net P&L per closed trade.
pub fn expectancy(trades: &[ClosedTrade]) -> f64 {
    let pnl: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
    mean_f64(&pnl)
}

/// Mean net P&L of winning trades.
pub fn avg_win(trades: &[ClosedTrade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.net_pnl)
        .collect();
    mean_f64(&wins)
}

/// Mean net P&L of non-winning trades (break-even counts as a loss).
pub fn avg_loss(trades: &[ClosedTrade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.net_pnl)
        .collect();
    mean_f64(&losses)
}

/// Mean calendar days between entry and exit.
pub fn avg_holding_days(trades: &[ClosedTrade]) -> f64 {
    let days: Vec<f64> = trades.iter().map(|t| t.holding_days() as f64).collect();
    mean_f64(&days)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Bar-over-bar percentage returns.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[ClosedTrade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

/// JSON has no infinity; `+inf` round-trips as the string `"inf"`.
pub(crate) mod infinite_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) if s.eq_ignore_ascii_case("inf") => Ok(f64::INFINITY),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"inf\", got \"{s}\""
            ))),
        }
    }
}
