//! Serializable backtest configuration, read from TOML.
//!
//! ```toml
//! [backtest]
//! label = "spy-sma"
//! initial_capital = 100000.0
//! position_size_pct = 0.25
//! tie_break = "buy_first"
//! fractional_shares = true
//!
//! [costs]
//! commission_fixed = 20.0
//! commission_pct = 0.0003
//! slippage_pct = 0.001
//!
//! [benchmark]
//! enabled = true
//! ```
//!
//! Every section and key is optional; omitted values take the defaults above.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocklab_core::engine::EngineConfig;
use stocklab_core::signal::SignalTieBreak;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid parameter: {0}")]
    Invalid(#[from] stocklab_core::error::ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub costs: CostSection,
    #[serde(default)]
    pub benchmark: BenchmarkSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub initial_capital: f64,
    pub position_size_pct: f64,
    pub tie_break: SignalTieBreak,
    pub fractional_shares: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            label: None,
            initial_capital: engine.initial_capital,
            position_size_pct: engine.position_size_pct,
            tie_break: engine.tie_break,
            fractional_shares: engine.fractional_shares,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSection {
    pub commission_fixed: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for CostSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            commission_fixed: engine.commission_fixed,
            commission_pct: engine.commission_pct,
            slippage_pct: engine.slippage_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSection {
    pub enabled: bool,
}

impl Default for BenchmarkSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl BacktestConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build from an engine config, e.g. to persist one built in code.
    pub fn from_engine_config(engine: &EngineConfig, label: Option<String>, benchmark: bool) -> Self {
        Self {
            backtest: BacktestSection {
                label,
                initial_capital: engine.initial_capital,
                position_size_pct: engine.position_size_pct,
                tie_break: engine.tie_break,
                fractional_shares: engine.fractional_shares,
            },
            costs: CostSection {
                commission_fixed: engine.commission_fixed,
                commission_pct: engine.commission_pct,
                slippage_pct: engine.slippage_pct,
            },
            benchmark: BenchmarkSection { enabled: benchmark },
        }
    }

    /// Convert to a validated engine config.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let engine = EngineConfig {
            initial_capital: self.backtest.initial_capital,
            commission_fixed: self.costs.commission_fixed,
            commission_pct: self.costs.commission_pct,
            slippage_pct: self.costs.slippage_pct,
            position_size_pct: self.backtest.position_size_pct,
            tie_break: self.backtest.tie_break,
            fractional_shares: self.backtest.fractional_shares,
        };
        engine.validate()?;
        Ok(engine)
    }

    pub fn label(&self) -> &str {
        self.backtest.label.as_deref().unwrap_or("backtest")
    }

    /// Deterministic blake3 hash of the serialized config.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        // Plain data with string keys; serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[backtest]
label = "spy-sma"
initial_capital = 50000.0
position_size_pct = 0.5
tie_break = "sell_first"
fractional_shares = false

[costs]
commission_fixed = 5.0
commission_pct = 0.001
slippage_pct = 0.002

[benchmark]
enabled = false
"#;

    #[test]
    fn parses_full_config() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.label(), "spy-sma");
        assert_eq!(config.backtest.tie_break, SignalTieBreak::SellFirst);
        assert!(!config.benchmark.enabled);

        let engine = config.to_engine_config().unwrap();
        assert_eq!(engine.initial_capital, 50_000.0);
        assert_eq!(engine.commission_fixed, 5.0);
        assert_eq!(engine.slippage_pct, 0.002);
        assert!(!engine.fractional_shares);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = BacktestConfig::from_toml("").unwrap();
        assert_eq!(config.label(), "backtest");
        assert!(config.benchmark.enabled);
        assert_eq!(config.to_engine_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_section_fills_missing_keys() {
        let config = BacktestConfig::from_toml("[costs]\nslippage_pct = 0.0\n").unwrap();
        assert_eq!(config.costs.slippage_pct, 0.0);
        assert_eq!(config.costs.commission_fixed, 20.0);
    }

    #[test]
    fn invalid_values_fail_conversion() {
        let config = BacktestConfig::from_toml("[costs]\ncommission_pct = -0.1\n").unwrap();
        assert!(matches!(
            config.to_engine_config(),
            Err(ConfigError::Invalid(_))
        ));
        let config = BacktestConfig::from_toml("[backtest]\nposition_size_pct = 1.5\n").unwrap();
        assert!(config.to_engine_config().is_err());
    }

    #[test]
    fn unknown_tie_break_is_a_parse_error() {
        let err = BacktestConfig::from_toml("[backtest]\ntie_break = \"random\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(BacktestConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = BacktestConfig::default();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);
        b.costs.slippage_pct = 0.002;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn engine_config_roundtrip() {
        let engine = EngineConfig {
            position_size_pct: 0.75,
            ..EngineConfig::default()
        };
        let config = BacktestConfig::from_engine_config(&engine, Some("x".into()), true);
        assert_eq!(config.to_engine_config().unwrap(), engine);
    }
}
