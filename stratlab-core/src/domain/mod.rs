//! Domain types for the strategy builder

pub mod ids;
pub mod portfolio;
pub mod rule;
pub mod strategy;

pub use ids::{RuleId, StrategyId};
pub use portfolio::{PortfolioConfig, PortfolioPatch};
pub use rule::{Field, Operator, Rule, RuleCategory, RuleDraft, RuleError, RuleValue};
pub use strategy::{Strategy, StrategyPatch, StrategyStatus, DEFAULT_STRATEGY_NAME};
