//! CLI configuration — TOML file with per-section defaults.
//!
//! ```toml
//! [store]
//! path = "/home/me/.local/share/stratlab/store.json"
//!
//! [simulation]
//! delay_ms = 1500
//! seed = 42
//! threads = 2
//!
//! [defaults]
//! strategy_name = "New Strategy"
//! initial_capital = 10000.0
//! risk_per_trade = 2.0
//! max_positions = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stratlab_core::domain::portfolio::{
    DEFAULT_INITIAL_CAPITAL, DEFAULT_MAX_POSITIONS, DEFAULT_RISK_PER_TRADE,
};
use stratlab_core::domain::DEFAULT_STRATEGY_NAME;
use stratlab_core::PortfolioConfig;

const APP_DIR: &str = "stratlab";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratlabConfig {
    pub store: StoreSection,
    pub simulation: SimulationSection,
    pub defaults: DefaultsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Snapshot file. Falls back to the platform data dir.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub delay_ms: u64,
    /// Master seed; random per process when absent.
    pub seed: Option<u64>,
    pub threads: usize,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            seed: None,
            threads: 2,
        }
    }
}

impl SimulationSection {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Starting values for a brand-new store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub strategy_name: String,
    pub initial_capital: f64,
    pub risk_per_trade: f64,
    pub max_positions: u32,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            strategy_name: DEFAULT_STRATEGY_NAME.to_string(),
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_per_trade: DEFAULT_RISK_PER_TRADE,
            max_positions: DEFAULT_MAX_POSITIONS,
        }
    }
}

impl DefaultsSection {
    pub fn portfolio(&self) -> PortfolioConfig {
        PortfolioConfig::new(self.initial_capital, self.risk_per_trade, self.max_positions)
    }
}

impl StratlabConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config TOML")
    }

    /// `path` if given, else the per-user config file if it exists, else
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_store_path)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("store.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = StratlabConfig::from_toml("").unwrap();
        assert_eq!(config, StratlabConfig::default());
        assert_eq!(config.simulation.delay(), Duration::from_millis(1500));
        assert_eq!(config.defaults.portfolio(), PortfolioConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = StratlabConfig::from_toml(
            r#"
[simulation]
seed = 42

[defaults]
initial_capital = 25000.0
"#,
        )
        .unwrap();
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.threads, 2);
        assert_eq!(config.defaults.initial_capital, 25_000.0);
        assert_eq!(config.defaults.max_positions, 10);
        assert_eq!(config.defaults.strategy_name, "New Strategy");
    }

    #[test]
    fn explicit_store_path_wins() {
        let config = StratlabConfig::from_toml("[store]\npath = \"/tmp/s.json\"\n").unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[simulation]\ndelay_ms = 0\nthreads = 4\n").unwrap();
        let config = StratlabConfig::from_file(&path).unwrap();
        assert_eq!(config.simulation.delay_ms, 0);
        assert_eq!(config.simulation.threads, 4);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(StratlabConfig::from_toml("[simulation]\ndelay_ms = \"soon\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(StratlabConfig::load(Some(Path::new("/nonexistent/stratlab.toml"))).is_err());
    }
}
