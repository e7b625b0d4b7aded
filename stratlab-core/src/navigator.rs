//! Wizard step navigator.
//!
//! Four steps, Scanner → Buy → Sell → Simulation. Moving forward is gated on
//! the validity of the step being left; moving back is only bounded by the
//! first step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::RuleCategory;
use crate::validation::ValidationState;

/// A wizard step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Scanner,
    Buy,
    Sell,
    Simulation,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Scanner, Step::Buy, Step::Sell, Step::Simulation];

    pub fn index(self) -> usize {
        match self {
            Step::Scanner => 0,
            Step::Buy => 1,
            Step::Sell => 2,
            Step::Simulation => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Step::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Scanner => "Scanner",
            Step::Buy => "Buy",
            Step::Sell => "Sell",
            Step::Simulation => "Simulation",
        }
    }

    /// Following step, `None` at the terminal step.
    pub fn next(self) -> Option<Step> {
        Step::from_index(self.index() + 1)
    }

    /// Preceding step, `None` at the first step.
    pub fn prev(self) -> Option<Step> {
        self.index().checked_sub(1).and_then(Step::from_index)
    }

    pub fn is_terminal(self) -> bool {
        self == Step::Simulation
    }

    /// Rule list edited on this step; the simulation step edits the portfolio.
    pub fn rule_category(self) -> Option<RuleCategory> {
        match self {
            Step::Scanner => Some(RuleCategory::Scanner),
            Step::Buy => Some(RuleCategory::Buy),
            Step::Sell => Some(RuleCategory::Sell),
            Step::Simulation => None,
        }
    }
}

impl From<RuleCategory> for Step {
    fn from(category: RuleCategory) -> Self {
        match category {
            RuleCategory::Scanner => Step::Scanner,
            RuleCategory::Buy => Step::Buy,
            RuleCategory::Sell => Step::Sell,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(i) = s.parse::<usize>() {
            return Step::from_index(i).ok_or_else(|| format!("step index {i} out of range 0..=3"));
        }
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown step '{s}'"))
    }
}

/// Finite-state stepper over [`Step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepNavigator {
    current: Step,
}

impl StepNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(step: Step) -> Self {
        Self { current: step }
    }

    pub fn current(&self) -> Step {
        self.current
    }

    /// Whether `advance` would move, given the live validity flags.
    pub fn can_advance(&self, validation: &ValidationState) -> bool {
        !self.current.is_terminal() && validation.is_valid(self.current)
    }

    /// Move forward one step. Refused (returns `false`) at the terminal step or
    /// while the current step is invalid.
    pub fn advance(&mut self, validation: &ValidationState) -> bool {
        if !self.can_advance(validation) {
            return false;
        }
        match self.current.next() {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    /// Move back one step. Refused only at the first step.
    pub fn retreat(&mut self) -> bool {
        match self.current.prev() {
            Some(prev) => {
                self.current = prev;
                true
            }
            None => false,
        }
    }

    /// Jump directly to `step`, ungated.
    pub fn jump_to(&mut self, step: Step) {
        self.current = step;
    }

    pub fn reset(&mut self) {
        self.current = Step::Scanner;
    }
}
