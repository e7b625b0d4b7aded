//! Step validity — a pure projection of the strategy.
//!
//! [`step_validity`] is the only place the per-step requirements are written
//! down. Every flag the store keeps is produced by it.

use serde::{Deserialize, Serialize};

use crate::domain::{RuleCategory, Strategy};
use crate::navigator::Step;

/// Whether `strategy` meets the minimum requirements of `step`.
///
/// Rule steps need at least one rule; the simulation step needs an all-positive
/// portfolio configuration.
pub fn step_validity(strategy: &Strategy, step: Step) -> bool {
    match step.rule_category() {
        Some(category) => !strategy.rules(category).is_empty(),
        None => strategy.portfolio_config.is_valid(),
    }
}

/// Per-step validity flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationState {
    pub is_scanner_valid: bool,
    pub is_buy_valid: bool,
    pub is_sell_valid: bool,
    pub is_simulation_valid: bool,
}

impl ValidationState {
    /// All four flags computed from `strategy`.
    pub fn evaluate(strategy: &Strategy) -> Self {
        let mut state = Self::default();
        for step in Step::ALL {
            state.refresh(strategy, step);
        }
        state
    }

    pub fn is_valid(&self, step: Step) -> bool {
        match step {
            Step::Scanner => self.is_scanner_valid,
            Step::Buy => self.is_buy_valid,
            Step::Sell => self.is_sell_valid,
            Step::Simulation => self.is_simulation_valid,
        }
    }

    /// Recompute the flag for `step` only.
    pub fn refresh(&mut self, strategy: &Strategy, step: Step) {
        let valid = step_validity(strategy, step);
        match step {
            Step::Scanner => self.is_scanner_valid = valid,
            Step::Buy => self.is_buy_valid = valid,
            Step::Sell => self.is_sell_valid = valid,
            Step::Simulation => self.is_simulation_valid = valid,
        }
    }

    pub fn refresh_rules(&mut self, strategy: &Strategy, category: RuleCategory) {
        self.refresh(strategy, Step::from(category));
    }

    pub fn all_valid(&self) -> bool {
        Step::ALL.iter().all(|s| self.is_valid(*s))
    }
}
