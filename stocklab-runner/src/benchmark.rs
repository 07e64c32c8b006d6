//! Buy & hold benchmark: a second engine run driven by a buy-once signal source.
//!
//! The benchmark uses the same capital and cost model as the strategy run,
//! buys with the whole capital on the first bar and never sells. Strategy
//! and benchmark therefore pay costs through the same code path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stocklab_core::domain::{PriceSeries, TradeSide};
use stocklab_core::engine::{BacktestEngine, EngineConfig, RunResult};
use stocklab_core::error::EngineError;
use stocklab_core::logging::RunLogger;
use stocklab_core::signal::BuyAndHold;

use crate::metrics::PerformanceMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Mark-to-market value at the last close (lot still open).
    pub final_value: f64,
    /// Value if the lot were sold at the last close, net of slippage and commission.
    pub liquidation_value: f64,
    pub liquidation_return: f64,
    pub shares: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<f64>,
}

/// Run buy & hold over `series` with the strategy's capital and costs.
pub fn run_buy_and_hold(
    series: &PriceSeries,
    strategy_config: &EngineConfig,
    logger: Arc<dyn RunLogger>,
) -> Result<BenchmarkResult, EngineError> {
    let config = EngineConfig {
        position_size_pct: 1.0,
        ..strategy_config.clone()
    };
    let engine = BacktestEngine::new(config, logger)?;
    let run = engine.run_with(series, &BuyAndHold)?;
    let last_close = series.last().close;
    Ok(summarize(&engine, run, last_close))
}

fn summarize(engine: &BacktestEngine, run: RunResult, last_close: f64) -> BenchmarkResult {
    let cost = engine.cost_model();
    let shares = run.open_shares();

    let (exit_commission, exit_slippage, net_proceeds) = if shares > 0.0 {
        let price = cost.execution_price(last_close, TradeSide::Sell);
        let proceeds = shares * price;
        let commission = cost.commission(proceeds);
        (
            commission,
            cost.slippage_cost(last_close, shares),
            (proceeds - commission).max(0.0),
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let liquidation_value = run.final_cash + net_proceeds;
    let metrics = PerformanceMetrics::compute(&run.equity_curve, &run.closed_trades, run.initial_capital);

    BenchmarkResult {
        final_value: run.final_value,
        liquidation_value,
        liquidation_return: crate::metrics::total_return(run.initial_capital, liquidation_value),
        shares,
        total_commission: run.total_commission + exit_commission,
        total_slippage: run.total_slippage + exit_slippage,
        metrics,
        equity_curve: run.equity_curve,
    }
}
