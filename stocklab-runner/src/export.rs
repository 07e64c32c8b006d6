//! Export: JSON and CSV artifacts for a backtest run.
//!
//! - **JSON**: full `BacktestResult` with schema versioning
//! - **CSV**: closed trades and the equity curve for external tools
//!
//! Persisted JSON carries `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stocklab_core::domain::ClosedTrade;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

const RUN_ID_PREFIX: usize = 12;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Closed trades, one row per (partial) lot.
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_date",
        "entry_bar",
        "entry_price",
        "exit_date",
        "exit_bar",
        "exit_price",
        "shares",
        "entry_commission",
        "exit_commission",
        "slippage_cost",
        "gross_pnl",
        "net_pnl",
        "return_pct",
        "holding_days",
    ])?;

    for t in trades {
        wtr.write_record([
            t.entry_timestamp.to_string(),
            t.entry_bar.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_timestamp.to_string(),
            t.exit_bar.to_string(),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.shares),
            format!("{:.4}", t.entry_commission),
            format!("{:.4}", t.exit_commission),
            format!("{:.4}", t.slippage_cost),
            format!("{:.4}", t.gross_pnl),
            format!("{:.4}", t.net_pnl),
            format!("{:.6}", t.return_pct),
            t.holding_days().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Equity curve with its dates.
pub fn export_equity_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "date", "equity"])?;
    for (i, (date, eq)) in result
        .run
        .timestamps
        .iter()
        .zip(&result.run.equity_curve)
        .enumerate()
    {
        wtr.write_record([i.to_string(), date.to_string(), format!("{eq:.4}")])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a run: `<label>_<run_id prefix>`.
///
/// Characters that are awkward in paths are replaced with `_`.
pub fn artifact_dir_name(result: &BacktestResult) -> String {
    let label: String = result
        .label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let prefix_len = result.run_id.len().min(RUN_ID_PREFIX);
    format!("{label}_{}", &result.run_id[..prefix_len])
}

/// Save the full artifact set for a single backtest run.
///
/// Creates `<label>_<run_id prefix>/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: closed trades
/// - `equity.csv`: bar-by-bar equity curve
///
/// Re-running the same config overwrites the same directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };
    write("manifest.json", export_json(result)?)?;
    write("trades.csv", export_trades_csv(&result.run.closed_trades)?)?;
    write("equity.csv", export_equity_csv(result)?)?;

    tracing::info!(dir = %run_dir.display(), run_id = %result.run_id, "saved artifacts");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
