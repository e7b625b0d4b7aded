//! Strategy entity — rule lists, portfolio configuration, identity and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{RuleId, StrategyId};
use super::portfolio::PortfolioConfig;
use super::rule::{Rule, RuleCategory};

pub const DEFAULT_STRATEGY_NAME: &str = "New Strategy";

/// Lifecycle status of a strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    #[default]
    Draft,
    Submitted,
    Simulated,
}

impl StrategyStatus {
    pub fn label(self) -> &'static str {
        match self {
            StrategyStatus::Draft => "draft",
            StrategyStatus::Submitted => "submitted",
            StrategyStatus::Simulated => "simulated",
        }
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A rule-based trading strategy.
///
/// `id` is `None` until the strategy is first persisted and never changes
/// afterwards. Rule lists keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: Option<StrategyId>,
    pub name: String,
    pub scanner_rules: Vec<Rule>,
    pub buy_rules: Vec<Rule>,
    pub sell_rules: Vec<Rule>,
    pub portfolio_config: PortfolioConfig,
    pub status: StrategyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::named(DEFAULT_STRATEGY_NAME)
    }
}

impl Strategy {
    /// Empty, unsaved draft with the default portfolio configuration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            scanner_rules: Vec::new(),
            buy_rules: Vec::new(),
            sell_rules: Vec::new(),
            portfolio_config: PortfolioConfig::default(),
            status: StrategyStatus::Draft,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn rules(&self, category: RuleCategory) -> &[Rule] {
        match category {
            RuleCategory::Scanner => &self.scanner_rules,
            RuleCategory::Buy => &self.buy_rules,
            RuleCategory::Sell => &self.sell_rules,
        }
    }

    pub(crate) fn rules_mut(&mut self, category: RuleCategory) -> &mut Vec<Rule> {
        match category {
            RuleCategory::Scanner => &mut self.scanner_rules,
            RuleCategory::Buy => &mut self.buy_rules,
            RuleCategory::Sell => &mut self.sell_rules,
        }
    }

    pub fn has_rule(&self, category: RuleCategory, id: &RuleId) -> bool {
        self.rules(category).iter().any(|r| &r.id == id)
    }

    pub fn rule_count(&self) -> usize {
        self.scanner_rules.len() + self.buy_rules.len() + self.sell_rules.len()
    }
}

/// Partial update for the editable top-level fields of a strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyPatch {
    pub name: Option<String>,
}

impl StrategyPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}
