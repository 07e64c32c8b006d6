//! Parameter sweep over engine settings.
//!
//! Signals come from the feature pipeline, so the grid varies only what the
//! engine controls: position size and the cost model. Every variant is an
//! independent run with its own ledger and logger, which is what makes the
//! rayon fan-out safe.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use stocklab_core::domain::PriceSeries;
use stocklab_core::logging::{NullLogger, RunLogger, TracingLogger};

use crate::config::BacktestConfig;
use crate::ranking::RankingMetric;
use crate::runner::{run_with_logger, BacktestResult, RunError};

/// Parameter grid. An empty axis keeps the base config's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub position_size_pcts: Vec<f64>,
    pub slippage_pcts: Vec<f64>,
    pub commission_fixeds: Vec<f64>,
    pub commission_pcts: Vec<f64>,
}

impl ParamGrid {
    /// Position sizes 10%..100% in 10% steps, base costs.
    pub fn position_size_default() -> Self {
        Self {
            position_size_pcts: (1..=10).map(|i| i as f64 / 10.0).collect(),
            ..Self::default()
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        [
            &self.position_size_pcts,
            &self.slippage_pcts,
            &self.commission_fixeds,
            &self.commission_pcts,
        ]
        .iter()
        .map(|axis| axis.len().max(1))
        .product()
    }

    /// Generates all configurations in the grid, labelled by their parameters.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let axis = |values: &[f64], fallback: f64| -> Vec<f64> {
            if values.is_empty() {
                vec![fallback]
            } else {
                values.to_vec()
            }
        };
        let sizes = axis(&self.position_size_pcts, base.backtest.position_size_pct);
        let slips = axis(&self.slippage_pcts, base.costs.slippage_pct);
        let fixeds = axis(&self.commission_fixeds, base.costs.commission_fixed);
        let pcts = axis(&self.commission_pcts, base.costs.commission_pct);

        let mut configs = Vec::with_capacity(self.size());
        for &size in &sizes {
            for &slip in &slips {
                for &fixed in &fixeds {
                    for &pct in &pcts {
                        let mut config = base.clone();
                        config.backtest.position_size_pct = size;
                        config.costs.slippage_pct = slip;
                        config.costs.commission_fixed = fixed;
                        config.costs.commission_pct = pct;
                        config.backtest.label = Some(format!(
                            "{}[size={size},slip={slip},fixed={fixed},pct={pct}]",
                            base.label()
                        ));
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
    quiet: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self {
            parallel: true,
            quiet: false,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Silence per-run engine logging.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn logger_for(&self, config: &BacktestConfig) -> Arc<dyn RunLogger> {
        if self.quiet {
            Arc::new(NullLogger)
        } else {
            Arc::new(TracingLogger::new(config.label()))
        }
    }

    /// Runs every configuration in the grid against `series`.
    ///
    /// The first invalid configuration aborts the sweep.
    pub fn sweep(
        &self,
        series: &PriceSeries,
        grid: &ParamGrid,
        base: &BacktestConfig,
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        let run = |config: &BacktestConfig| {
            run_with_logger(series, config, self.logger_for(config))
        };

        let results: Vec<BacktestResult> = if self.parallel {
            configs.par_iter().map(run).collect::<Result<Vec<_>, _>>()?
        } else {
            configs.iter().map(run).collect::<Result<Vec<_>, _>>()?
        };

        tracing::info!(runs = results.len(), "parameter sweep finished");
        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Gets a result by RunId.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results sorted best-first by `metric`. Ties keep grid order.
    pub fn ranked(&self, metric: RankingMetric) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| metric.compare(&a.metrics, &b.metrics));
        sorted
    }

    pub fn top_n(&self, metric: RankingMetric, n: usize) -> Vec<&BacktestResult> {
        self.ranked(metric).into_iter().take(n).collect()
    }

    pub fn best(&self, metric: RankingMetric) -> Option<&BacktestResult> {
        self.ranked(metric).into_iter().next()
    }
}
