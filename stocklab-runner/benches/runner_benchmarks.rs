//! Criterion benchmarks for metrics and sweep hot paths.
//!
//! Run with: `cargo bench -p stocklab-runner`

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stocklab_core::domain::{Bar, PriceSeries};
use stocklab_runner::config::BacktestConfig;
use stocklab_runner::metrics::{max_drawdown, sharpe_ratio, sortino_ratio};
use stocklab_runner::sweep::{ParamGrid, ParamSweep};

fn equity_curve(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100_000.0 * (1.0 + 0.0004 * i as f64) + 1_500.0 * (i as f64 / 11.0).sin())
        .collect()
}

fn series(len: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let bars = (0..len)
        .map(|i| {
            let close = 100.0 + (i as f64 / 13.0).sin() * 10.0 + i as f64 * 0.01;
            Bar::flat(start + chrono::Duration::days(i as i64), close)
                .with_signals(i % 20 == 3, i % 20 == 13)
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn bench_risk_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_metrics");
    for len in [252, 2520, 25200] {
        let curve = equity_curve(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &curve, |b, curve| {
            b.iter(|| {
                (
                    sharpe_ratio(black_box(curve)),
                    sortino_ratio(black_box(curve)),
                    max_drawdown(black_box(curve)),
                )
            });
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let series = series(2520);
    let mut base = BacktestConfig::default();
    base.benchmark.enabled = false;
    let grid = ParamGrid {
        position_size_pcts: vec![0.1, 0.25, 0.5, 1.0],
        slippage_pcts: vec![0.0, 0.001, 0.002, 0.005],
        ..ParamGrid::default()
    };

    let mut group = c.benchmark_group("sweep_16_variants");
    group.sample_size(20);
    for parallel in [false, true] {
        let sweep = ParamSweep::new().quiet(true).with_parallelism(parallel);
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| sweep.sweep(black_box(&series), &grid, &base).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_risk_metrics, bench_sweep);
criterion_main!(benches);
