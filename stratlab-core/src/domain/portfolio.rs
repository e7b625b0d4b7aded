//! Portfolio configuration — sizing parameters for simulated positions.

use serde::{Deserialize, Serialize};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_RISK_PER_TRADE: f64 = 2.0;
pub const DEFAULT_MAX_POSITIONS: u32 = 10;

fn default_max_positions() -> u32 {
    DEFAULT_MAX_POSITIONS
}

/// Capital, per-trade risk (percent), and position cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioConfig {
    pub initial_capital: f64,
    pub risk_per_trade: f64,
    #[serde(default = "default_max_positions")]
    pub max_positions: u32,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_per_trade: DEFAULT_RISK_PER_TRADE,
            max_positions: DEFAULT_MAX_POSITIONS,
        }
    }
}

impl PortfolioConfig {
    pub fn new(initial_capital: f64, risk_per_trade: f64, max_positions: u32) -> Self {
        Self {
            initial_capital,
            risk_per_trade,
            max_positions,
        }
    }

    /// Every field strictly positive.
    pub fn is_valid(&self) -> bool {
        self.initial_capital > 0.0 && self.risk_per_trade > 0.0 && self.max_positions > 0
    }

    /// Shallow-merge `patch` into a copy of this config. Non-finite patch
    /// values are ignored.
    pub fn merged(&self, patch: &PortfolioPatch) -> Self {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Self {
            initial_capital: finite(patch.initial_capital).unwrap_or(self.initial_capital),
            risk_per_trade: finite(patch.risk_per_trade).unwrap_or(self.risk_per_trade),
            max_positions: patch.max_positions.unwrap_or(self.max_positions),
        }
    }

    /// Dollar amount at risk on a single trade.
    pub fn risk_amount(&self) -> f64 {
        self.initial_capital * self.risk_per_trade / 100.0
    }
}

/// Partial update for [`PortfolioConfig`]; `None` fields are left as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPatch {
    pub initial_capital: Option<f64>,
    pub risk_per_trade: Option<f64>,
    pub max_positions: Option<u32>,
}

impl PortfolioPatch {
    pub fn is_empty(&self) -> bool {
        self.initial_capital.is_none()
            && self.risk_per_trade.is_none()
            && self.max_positions.is_none()
    }
}

impl From<PortfolioConfig> for PortfolioPatch {
    fn from(config: PortfolioConfig) -> Self {
        Self {
            initial_capital: Some(config.initial_capital),
            risk_per_trade: Some(config.risk_per_trade),
            max_positions: Some(config.max_positions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PortfolioConfig::default();
        assert_eq!(config, PortfolioConfig::new(10_000.0, 2.0, 10));
        assert!(config.is_valid());
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let config = PortfolioConfig::default();
        let merged = config.merged(&PortfolioPatch {
            risk_per_trade: Some(1.0),
            ..Default::default()
        });
        assert_eq!(merged.initial_capital, 10_000.0);
        assert_eq!(merged.risk_per_trade, 1.0);
        assert_eq!(merged.max_positions, 10);
    }

    #[test]
    fn non_positive_field_invalidates() {
        assert!(!PortfolioConfig::new(0.0, 2.0, 10).is_valid());
        assert!(!PortfolioConfig::new(1000.0, -1.0, 10).is_valid());
        assert!(!PortfolioConfig::new(1000.0, 2.0, 0).is_valid());
    }

    #[test]
    fn non_finite_patch_values_are_ignored() {
        let merged = PortfolioConfig::default().merged(&PortfolioPatch {
            initial_capital: Some(f64::INFINITY),
            risk_per_trade: Some(f64::NAN),
            max_positions: Some(3),
        });
        assert_eq!(merged, PortfolioConfig::new(10_000.0, 2.0, 3));
    }

    #[test]
    fn missing_max_positions_defaults_to_ten() {
        let config: PortfolioConfig =
            serde_json::from_str(r#"{"initialCapital":5000,"riskPerTrade":1}"#).unwrap();
        assert_eq!(config.max_positions, 10);
    }

    #[test]
    fn risk_amount() {
        assert_eq!(PortfolioConfig::new(5_000.0, 1.0, 5).risk_amount(), 50.0);
    }
}
