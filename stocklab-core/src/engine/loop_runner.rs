//! Bar-by-bar event loop: the single pass over the series.
//!
//! Per bar:
//! 1. Read signals from the signal source
//! 2. Buy: size against `min(cash, initial_capital * position_size_pct)` and open a lot
//! 3. Sell: close the entire position FIFO at the slippage-adjusted price
//! 4. Mark-to-market at the bar's close
//!
//! Configuration is validated once in `BacktestEngine::new`; nothing inside
//! the loop can fail for configuration reasons. A buy or sell that cannot be
//! executed is logged and skipped for that bar only.

use std::sync::Arc;

use crate::domain::{Bar, ClosedTrade, Fill, PriceSeries, TradeEvent, TradeSide};
use crate::engine::cost_model::CostModel;
use crate::engine::ledger::{PositionLedger, SHARE_EPSILON};
use crate::error::{ConfigError, EngineError};
use crate::logging::{EngineEvent, NullLogger, RunLogger, SkipReason};
use crate::signal::{BarSignals, SeriesSignals, SignalSource, SignalTieBreak};

use super::state::{EngineConfig, RunResult};

pub struct BacktestEngine {
    config: EngineConfig,
    cost: CostModel,
    logger: Arc<dyn RunLogger>,
}

impl std::fmt::Debug for BacktestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacktestEngine")
            .field("config", &self.config)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl BacktestEngine {
    /// Validate `config` and build an engine that reports to `logger`.
    pub fn new(config: EngineConfig, logger: Arc<dyn RunLogger>) -> Result<Self, ConfigError> {
        let cost = config.validate()?;
        Ok(Self {
            config,
            cost,
            logger,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Run over the series using its own `buy_signal` / `sell_signal` columns.
    pub fn run(&self, series: &PriceSeries) -> Result<RunResult, EngineError> {
        self.run_with(series, &SeriesSignals)
    }

    /// Validate raw bars into a series, then run.
    pub fn run_bars(&self, bars: Vec<Bar>) -> Result<RunResult, EngineError> {
        let series = PriceSeries::new(bars)?;
        self.run(&series)
    }

    /// Run over the series with an explicit signal source.
    pub fn run_with(
        &self,
        series: &PriceSeries,
        signals: &dyn SignalSource,
    ) -> Result<RunResult, EngineError> {
        let mut run = RunState::new(self.config.initial_capital, series.len());

        self.logger.log(&EngineEvent::RunStarted {
            bars: series.len(),
            start: series.start(),
            end: series.end(),
            initial_capital: self.config.initial_capital,
            signal_source: signals.name().to_string(),
        });

        for (t, bar) in series.bars().iter().enumerate() {
            let sig = signals.signals(t, bar);
            self.process_signals(&mut run, t, bar, sig)?;

            // ─── Mark-to-market ───
            run.equity_curve.push(run.ledger.mark_to_market(bar.close));
            run.timestamps.push(bar.timestamp);
        }

        let last_close = series.last().close;
        let final_value = run.ledger.mark_to_market(last_close);
        let result = RunResult {
            initial_capital: self.config.initial_capital,
            final_value,
            final_cash: run.ledger.cash(),
            open_lots: run.ledger.lots().cloned().collect(),
            equity_curve: run.equity_curve,
            timestamps: run.timestamps,
            trade_log: run.trade_log,
            closed_trades: run.closed_trades,
            total_commission: run.total_commission,
            total_slippage: run.total_slippage,
            num_trades: run.num_trades,
            skipped_buys: run.skipped_buys,
            skipped_sells: run.skipped_sells,
            conflicting_bars: run.conflicting_bars,
            bar_count: series.len(),
            signal_source: signals.name().to_string(),
        };

        self.logger.log(&EngineEvent::RunFinished {
            final_value: result.final_value,
            num_trades: result.num_trades,
            closed_trades: result.closed_trade_count(),
            open_shares: result.open_shares(),
        });

        Ok(result)
    }

    fn process_signals(
        &self,
        run: &mut RunState,
        t: usize,
        bar: &Bar,
        sig: BarSignals,
    ) -> Result<(), EngineError> {
        if sig.is_conflicting() {
            run.conflicting_bars += 1;
            self.logger.log(&EngineEvent::ConflictingSignals {
                bar_index: t,
                timestamp: bar.timestamp,
            });
            match self.config.tie_break {
                SignalTieBreak::BuyFirst => {
                    if !self.try_buy(run, t, bar)? {
                        self.try_sell(run, t, bar)?;
                    }
                }
                SignalTieBreak::SellFirst => {
                    if !self.try_sell(run, t, bar)? {
                        self.try_buy(run, t, bar)?;
                    }
                }
                SignalTieBreak::Skip => {}
            }
            return Ok(());
        }

        if sig.buy {
            self.try_buy(run, t, bar)?;
        } else if sig.sell {
            self.try_sell(run, t, bar)?;
        }
        Ok(())
    }

    /// Returns true if a lot was opened.
    fn try_buy(&self, run: &mut RunState, t: usize, bar: &Bar) -> Result<bool, EngineError> {
        let cash = run.ledger.cash();
        if cash <= 0.0 {
            self.skip_buy(
                run,
                t,
                bar,
                SkipReason::InsufficientCash {
                    required: 0.0,
                    available: cash,
                },
            );
            return Ok(false);
        }

        let budget = cash.min(self.config.max_position_value());
        let price = self.cost.execution_price(bar.close, TradeSide::Buy);
        let mut shares = self.cost.affordable_shares(budget, price);
        if !self.config.fractional_shares {
            shares = shares.floor();
        }
        if shares <= SHARE_EPSILON {
            self.skip_buy(run, t, bar, SkipReason::ZeroShares { budget, price });
            return Ok(false);
        }

        let required = self.cost.total_buy_cost(shares, price);
        if !run.ledger.can_afford(required) {
            self.skip_buy(
                run,
                t,
                bar,
                SkipReason::InsufficientCash {
                    required,
                    available: cash,
                },
            );
            return Ok(false);
        }

        let fill = Fill {
            timestamp: bar.timestamp,
            bar_index: t,
            shares,
            price,
            commission: self.cost.commission(shares * price),
            slippage_cost: self.cost.slippage_cost(bar.close, shares),
        };
        run.ledger
            .open_lot(&fill)
            .map_err(|source| EngineError::Ledger {
                bar_index: t,
                source,
            })?;

        run.num_trades += 1;
        run.record(TradeSide::Buy, &fill);
        self.logger.log(&EngineEvent::LotOpened {
            bar_index: t,
            timestamp: bar.timestamp,
            shares,
            price,
            commission: fill.commission,
            cash_after: run.ledger.cash(),
        });
        Ok(true)
    }

    /// Returns true if the position was closed.
    fn try_sell(&self, run: &mut RunState, t: usize, bar: &Bar) -> Result<bool, EngineError> {
        let shares = run.ledger.total_open_shares();
        if shares <= 0.0 {
            return Ok(false);
        }

        let price = self.cost.execution_price(bar.close, TradeSide::Sell);
        let proceeds = shares * price;
        let commission = self.cost.commission(proceeds);
        if commission > proceeds {
            run.skipped_sells += 1;
            self.logger.log(&EngineEvent::SellSkipped {
                bar_index: t,
                timestamp: bar.timestamp,
                reason: SkipReason::CommissionExceedsProceeds {
                    commission,
                    proceeds,
                },
            });
            return Ok(false);
        }

        let fill = Fill {
            timestamp: bar.timestamp,
            bar_index: t,
            shares,
            price,
            commission,
            slippage_cost: self.cost.slippage_cost(bar.close, shares),
        };
        let closed = run
            .ledger
            .close(&fill)
            .map_err(|source| EngineError::Ledger {
                bar_index: t,
                source,
            })?;

        let net_pnl: f64 = closed.iter().map(|c| c.net_pnl).sum();
        let lots_closed = closed.len();
        run.closed_trades.extend(closed);
        run.record(TradeSide::Sell, &fill);
        self.logger.log(&EngineEvent::PositionClosed {
            bar_index: t,
            timestamp: bar.timestamp,
            shares,
            price,
            commission,
            lots_closed,
            net_pnl,
            cash_after: run.ledger.cash(),
        });
        Ok(true)
    }

    fn skip_buy(&self, run: &mut RunState, t: usize, bar: &Bar, reason: SkipReason) {
        run.skipped_buys += 1;
        self.logger.log(&EngineEvent::BuySkipped {
            bar_index: t,
            timestamp: bar.timestamp,
            reason,
        });
    }
}

/// Run a backtest with a throwaway silent logger.
pub fn run_backtest(series: &PriceSeries, config: &EngineConfig) -> Result<RunResult, EngineError> {
    BacktestEngine::new(config.clone(), Arc::new(NullLogger))?.run(series)
}

/// Mutable state that evolves bar-by-bar during one run.
struct RunState {
    ledger: PositionLedger,
    equity_curve: Vec<f64>,
    timestamps: Vec<chrono::NaiveDate>,
    trade_log: Vec<TradeEvent>,
    closed_trades: Vec<ClosedTrade>,
    total_commission: f64,
    total_slippage: f64,
    num_trades: usize,
    skipped_buys: usize,
    skipped_sells: usize,
    conflicting_bars: usize,
}

impl RunState {
    fn new(initial_capital: f64, bars: usize) -> Self {
        Self {
            ledger: PositionLedger::new(initial_capital),
            equity_curve: Vec::with_capacity(bars),
            timestamps: Vec::with_capacity(bars),
            trade_log: Vec::new(),
            closed_trades: Vec::new(),
            total_commission: 0.0,
            total_slippage: 0.0,
            num_trades: 0,
            skipped_buys: 0,
            skipped_sells: 0,
            conflicting_bars: 0,
        }
    }

    fn record(&mut self, side: TradeSide, fill: &Fill) {
        self.total_commission += fill.commission;
        self.total_slippage += fill.slippage_cost;
        self.trade_log.push(TradeEvent {
            side,
            timestamp: fill.timestamp,
            bar_index: fill.bar_index,
            price: fill.price,
            shares: fill.shares,
            commission: fill.commission,
            slippage_cost: fill.slippage_cost,
            position_after: self.ledger.total_open_shares(),
            cash_after: self.ledger.cash(),
        });
    }
}
