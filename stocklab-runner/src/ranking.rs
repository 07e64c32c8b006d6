//! Ranking metric: configurable metric selector for sweep results.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceMetrics;

/// Which metric to rank by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    Sharpe,
    Sortino,
    TotalReturn,
    Cagr,
    WinRate,
    ProfitFactor,
    Expectancy,
    MaxDrawdown,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 8] = [
        Self::Sharpe,
        Self::Sortino,
        Self::TotalReturn,
        Self::Cagr,
        Self::WinRate,
        Self::ProfitFactor,
        Self::Expectancy,
        Self::MaxDrawdown,
    ];

    pub fn extract(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::Sharpe => metrics.sharpe,
            Self::Sortino => metrics.sortino,
            Self::TotalReturn => metrics.total_return,
            Self::Cagr => metrics.cagr,
            Self::WinRate => metrics.win_rate,
            Self::ProfitFactor => metrics.profit_factor,
            Self::Expectancy => metrics.expectancy,
            Self::MaxDrawdown => metrics.max_drawdown,
        }
    }

    /// Best-first ordering of two metric sets.
    ///
    /// Higher is better for every metric. MaxDrawdown is stored as a
    /// non-positive fraction, so -0.05 ranks above -0.20.
    pub fn compare(&self, a: &PerformanceMetrics, b: &PerformanceMetrics) -> Ordering {
        self.extract(b).total_cmp(&self.extract(a))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe",
            Self::Sortino => "sortino",
            Self::TotalReturn => "total_return",
            Self::Cagr => "cagr",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::Expectancy => "expectancy",
            Self::MaxDrawdown => "max_drawdown",
        }
    }
}

impl std::str::FromStr for RankingMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown metric '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
