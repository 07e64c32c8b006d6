//! Run logging: the engine reports what it did through an injected sink.
//!
//! There is no process-wide logger inside the engine. Each `BacktestEngine`
//! owns an `Arc<dyn RunLogger>`; parallel sweep runs each carry their own
//! label and never share mutable logging state.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Why a signal did not turn into a trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Sizing produced zero shares (fixed fee eats the budget, or whole-share floor).
    ZeroShares { budget: f64, price: f64 },
    /// Total buy cost exceeds available cash.
    InsufficientCash { required: f64, available: f64 },
    /// Sell commission exceeds gross proceeds.
    CommissionExceedsProceeds { commission: f64, proceeds: f64 },
}

/// Everything the engine reports during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    RunStarted {
        bars: usize,
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
        signal_source: String,
    },
    LotOpened {
        bar_index: usize,
        timestamp: NaiveDate,
        shares: f64,
        price: f64,
        commission: f64,
        cash_after: f64,
    },
    BuySkipped {
        bar_index: usize,
        timestamp: NaiveDate,
        reason: SkipReason,
    },
    PositionClosed {
        bar_index: usize,
        timestamp: NaiveDate,
        shares: f64,
        price: f64,
        commission: f64,
        lots_closed: usize,
        net_pnl: f64,
        cash_after: f64,
    },
    SellSkipped {
        bar_index: usize,
        timestamp: NaiveDate,
        reason: SkipReason,
    },
    ConflictingSignals {
        bar_index: usize,
        timestamp: NaiveDate,
    },
    RunFinished {
        final_value: f64,
        num_trades: usize,
        closed_trades: usize,
        open_shares: f64,
    },
}

pub trait RunLogger: Send + Sync {
    fn log(&self, event: &EngineEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl RunLogger for NullLogger {
    fn log(&self, _event: &EngineEvent) {}
}

/// Emits each event as a structured `tracing` event tagged with the run label.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    label: String,
}

impl TracingLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl RunLogger for TracingLogger {
    fn log(&self, event: &EngineEvent) {
        let run = self.label.as_str();
        match event {
            EngineEvent::RunStarted {
                bars,
                start,
                end,
                initial_capital,
                signal_source,
            } => info!(
                run,
                bars,
                %start,
                %end,
                initial_capital,
                signal_source = signal_source.as_str(),
                "backtest started"
            ),
            EngineEvent::LotOpened {
                bar_index,
                timestamp,
                shares,
                price,
                commission,
                cash_after,
            } => debug!(
                run,
                bar_index,
                %timestamp,
                shares,
                price,
                commission,
                cash_after,
                "lot opened"
            ),
            EngineEvent::BuySkipped {
                bar_index,
                timestamp,
                reason,
            } => warn!(run, bar_index, %timestamp, ?reason, "buy skipped"),
            EngineEvent::PositionClosed {
                bar_index,
                timestamp,
                shares,
                price,
                commission,
                lots_closed,
                net_pnl,
                cash_after,
            } => debug!(
                run,
                bar_index,
                %timestamp,
                shares,
                price,
                commission,
                lots_closed,
                net_pnl,
                cash_after,
                "position closed"
            ),
            EngineEvent::SellSkipped {
                bar_index,
                timestamp,
                reason,
            } => warn!(run, bar_index, %timestamp, ?reason, "sell skipped"),
            EngineEvent::ConflictingSignals {
                bar_index,
                timestamp,
            } => debug!(run, bar_index, %timestamp, "buy and sell signals on the same bar"),
            EngineEvent::RunFinished {
                final_value,
                num_trades,
                closed_trades,
                open_shares,
            } => info!(
                run,
                final_value,
                num_trades,
                closed_trades,
                open_shares,
                "backtest finished"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count_where(&self, pred: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl RunLogger for RecordingLogger {
    fn log(&self, event: &EngineEvent) {
        let mut guard = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_logger_keeps_order() {
        let logger = RecordingLogger::new();
        logger.log(&EngineEvent::ConflictingSignals {
            bar_index: 3,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        });
        logger.log(&EngineEvent::RunFinished {
            final_value: 1.0,
            num_trades: 0,
            closed_trades: 0,
            open_shares: 0.0,
        });
        let events = logger.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::ConflictingSignals { bar_index: 3, .. }));
        assert_eq!(
            logger.count_where(|e| matches!(e, EngineEvent::RunFinished { .. })),
            1
        );
    }

    #[test]
    fn skip_reason_serializes_with_kind_tag() {
        let json = serde_json::to_value(SkipReason::ZeroShares {
            budget: 5.0,
            price: 100.0,
        })
        .unwrap();
        assert_eq!(json["kind"], "zero_shares");
        assert_eq!(json["budget"], 5.0);
    }

    #[test]
    fn loggers_are_object_safe() {
        let sinks: Vec<Arc<dyn RunLogger>> = vec![
            Arc::new(NullLogger),
            Arc::new(TracingLogger::new("test")),
            RecordingLogger::new(),
        ];
        for sink in &sinks {
            sink.log(&EngineEvent::RunFinished {
                final_value: 0.0,
                num_trades: 0,
                closed_trades: 0,
                open_shares: 0.0,
            });
        }
    }
}
