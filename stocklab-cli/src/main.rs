//! StockLab CLI: run and sweep commands over a signal-annotated CSV.
//!
//! Commands:
//! - `run`: one backtest (optionally split in-sample / out-of-sample), artifacts saved
//! - `sweep`: parallel grid over position size and cost parameters, ranked

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stocklab_runner::{
    load_csv, run_single_backtest, run_split, save_artifacts, BacktestConfig, BacktestResult,
    ParamGrid, ParamSweep, PeriodReport, RankingMetric, SplitPoint,
};

#[derive(Parser)]
#[command(
    name = "stocklab",
    about = "StockLab CLI: single-asset backtests over precomputed signals"
)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest over a CSV of bars and signal columns.
    Run {
        /// CSV with Date,Open,High,Low,Close,Volume,buy_signal,sell_signal.
        #[arg(long)]
        data: PathBuf,

        /// TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Split into in-sample / out-of-sample: a fraction (0.7) or a date (2023-01-01).
        #[arg(long)]
        split: Option<SplitPoint>,

        /// Skip the buy & hold benchmark.
        #[arg(long, default_value_t = false)]
        no_benchmark: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep position size and cost parameters, print the best variants.
    Sweep {
        #[arg(long)]
        data: PathBuf,

        /// Base TOML config; grid axes override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Position sizes as fractions of equity (comma-separated).
        #[arg(long, value_delimiter = ',')]
        position_size: Vec<f64>,

        #[arg(long, value_delimiter = ',')]
        slippage: Vec<f64>,

        #[arg(long, value_delimiter = ',')]
        commission_fixed: Vec<f64>,

        #[arg(long, value_delimiter = ',')]
        commission_pct: Vec<f64>,

        /// Metric to rank by.
        #[arg(long, default_value = "sharpe")]
        rank_by: RankingMetric,

        /// Number of variants to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run variants one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Run {
            data,
            config,
            split,
            no_benchmark,
            output_dir,
        } => run_cmd(&data, config.as_deref(), split, no_benchmark, &output_dir),
        Commands::Sweep {
            data,
            config,
            position_size,
            slippage,
            commission_fixed,
            commission_pct,
            rank_by,
            top,
            sequential,
        } => {
            let grid = ParamGrid {
                position_size_pcts: position_size,
                slippage_pcts: slippage,
                commission_fixeds: commission_fixed,
                commission_pcts: commission_pct,
            };
            sweep_cmd(&data, config.as_deref(), &grid, rank_by, top, sequential)
        }
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).try_init()
    };
    result.map_err(|e| anyhow!("failed to init logging: {e}"))
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn run_cmd(
    data: &Path,
    config_path: Option<&Path>,
    split: Option<SplitPoint>,
    no_benchmark: bool,
    output_dir: &Path,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if no_benchmark {
        config.benchmark.enabled = false;
    }
    let series = load_csv(data)?;

    match split {
        None => {
            let result = run_single_backtest(&series, &config)?;
            print_summary(&result);
            let run_dir = save_artifacts(&result, output_dir)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
        Some(point) => {
            let report = run_split(&series, &config, point)?;
            print_split(&report);
            // Both periods share a config, so they need separate parents.
            for (name, period) in [
                ("in_sample", &report.in_sample),
                ("out_of_sample", &report.out_of_sample),
            ] {
                let run_dir = save_artifacts(period, &output_dir.join(name))?;
                println!("Artifacts saved to: {}", run_dir.display());
            }
        }
    }
    Ok(())
}

fn sweep_cmd(
    data: &Path,
    config_path: Option<&Path>,
    grid: &ParamGrid,
    rank_by: RankingMetric,
    top: usize,
    sequential: bool,
) -> Result<()> {
    let base = load_config(config_path)?;
    let series = load_csv(data)?;
    tracing::info!(variants = grid.size(), rank_by = rank_by.name(), "starting sweep");

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .quiet(true)
        .sweep(&series, grid, &base)?;

    println!();
    println!("=== Top {} by {} ===", top.min(results.len()), rank_by.name());
    println!(
        "{:>4}  {:>6} {:>8} {:>8} {:>9} {:>10} {:>9} {:>8} {:>7}",
        "#", "size", "slip", "fixed", "pct", rank_by.name(), "return", "max_dd", "trades"
    );
    for (rank, r) in results.top_n(rank_by, top).iter().enumerate() {
        println!(
            "{:>4}  {:>6.2} {:>8.4} {:>8.2} {:>9.5} {:>10.3} {:>8.2}% {:>7.2}% {:>7}",
            rank + 1,
            r.config.backtest.position_size_pct,
            r.config.costs.slippage_pct,
            r.config.costs.commission_fixed,
            r.config.costs.commission_pct,
            rank_by.extract(&r.metrics),
            r.metrics.total_return * 100.0,
            r.metrics.max_drawdown * 100.0,
            r.num_trades(),
        );
    }
    println!();
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result: {} ===", result.label);
    println!("Run ID:          {}", result.run_id);
    println!("Period:          {} to {}", result.start_date, result.end_date);
    println!("Bars:            {}", result.run.bar_count);
    println!("Initial Capital: {:.2}", result.initial_capital());
    println!("Final Value:     {:.2}", result.final_value());
    println!(
        "Trades:          {} buys, {} closed lots",
        result.num_trades(),
        result.closed_trade_count()
    );
    if result.run.skipped_buys + result.run.skipped_sells > 0 {
        println!(
            "Skipped:         {} buys, {} sells",
            result.run.skipped_buys, result.run.skipped_sells
        );
    }
    println!();
    println!("--- Performance ---");
    println!("Total Return:    {:.2}%", m.total_return * 100.0);
    println!("CAGR:            {:.2}%", m.cagr * 100.0);
    println!("Sharpe:          {:.3}", m.sharpe);
    println!("Sortino:         {:.3}", m.sortino);
    println!("Max Drawdown:    {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:        {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:   {:.2}", m.profit_factor);
    println!("Expectancy:      {:.2}", m.expectancy);
    println!("Avg Win / Loss:  {:.2} / {:.2}", m.avg_win, m.avg_loss);
    println!("Avg Holding:     {:.1} days", m.avg_holding_days);
    println!("Max Consec W/L:  {} / {}", m.max_consecutive_wins, m.max_consecutive_losses);
    println!();
    println!("--- Costs ---");
    println!(
        "Commission:      {:.2} ({:.3}% of capital)",
        result.costs.total_commission,
        result.costs.commission_impact * 100.0
    );
    println!(
        "Slippage:        {:.2} ({:.3}% of capital)",
        result.costs.total_slippage,
        result.costs.slippage_impact * 100.0
    );
    if let Some(bench) = &result.benchmark {
        println!();
        println!("--- Buy & Hold ---");
        println!("Final Value:     {:.2}", bench.final_value);
        println!(
            "Liquidation:     {:.2} ({:.2}%)",
            bench.liquidation_value,
            bench.liquidation_return * 100.0
        );
        println!("Total Return:    {:.2}%", bench.metrics.total_return * 100.0);
        if let Some(excess) = result.excess_return() {
            println!("Excess Return:   {:+.2}%", excess * 100.0);
        }
    }
    println!();
}

fn print_split(report: &PeriodReport) {
    println!();
    println!("=== In-Sample ({} to {}) ===", report.in_sample.start_date, report.in_sample.end_date);
    print_summary(&report.in_sample);
    println!(
        "=== Out-of-Sample ({} to {}) ===",
        report.out_of_sample.start_date, report.out_of_sample.end_date
    );
    print_summary(&report.out_of_sample);
    match report.sharpe_degradation() {
        Some(ratio) => println!("OOS / IS Sharpe: {ratio:.2}"),
        None => println!("OOS / IS Sharpe: n/a (in-sample Sharpe not positive)"),
    }
    println!();
}
