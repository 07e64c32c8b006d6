//! Criterion benchmarks for StockLab hot paths.
//!
//! Benchmarks:
//! 1. Bar event loop (full backtest iteration)
//! 2. Ledger FIFO close across many lots

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stocklab_core::domain::{Bar, Fill, PriceSeries};
use stocklab_core::engine::{run_backtest, EngineConfig, PositionLedger};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> PriceSeries {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let mut bar = Bar::flat(base_date + chrono::Duration::days(i as i64), close)
                .with_signals(i % 9 == 0, i % 23 == 11);
            bar.open = close - 0.3;
            bar.high = close + 1.5;
            bar.low = close - 1.5;
            bar.volume = 1_000_000 + (i as u64 % 500_000);
            bar
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

// ── 1. Event loop ────────────────────────────────────────────────────

fn bench_event_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_loop");
    let config = EngineConfig {
        position_size_pct: 0.1,
        ..EngineConfig::default()
    };
    for n in [252, 2_520, 25_200] {
        let series = make_series(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, series| {
            b.iter(|| run_backtest(black_box(series), black_box(&config)))
        });
    }
    group.finish();
}

// ── 2. Ledger ────────────────────────────────────────────────────────

fn bench_ledger_close(c: &mut Criterion) {
    let ts = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    c.bench_function("ledger_close_500_lots", |b| {
        b.iter(|| {
            let mut ledger = PositionLedger::new(1e9);
            for i in 0..500 {
                let fill = Fill {
                    timestamp: ts,
                    bar_index: i,
                    shares: 10.0,
                    price: 100.0 + i as f64 * 0.01,
                    commission: 1.0,
                    slippage_cost: 0.0,
                };
                let _ = ledger.open_lot(&fill);
            }
            let exit = Fill {
                timestamp: ts,
                bar_index: 500,
                shares: ledger.total_open_shares(),
                price: 101.0,
                commission: 5.0,
                slippage_cost: 0.0,
            };
            black_box(ledger.close(&exit))
        })
    });
}

criterion_group!(benches, bench_event_loop, bench_ledger_close);
criterion_main!(benches);
