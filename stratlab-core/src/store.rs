//! Strategy store — the working strategy plus the saved collection.
//!
//! Single-owner and synchronous: every action takes `&mut self` and runs to
//! completion. Saved entries are owned copies; editing the working strategy
//! never reaches into `saved_strategies`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::domain::{
    PortfolioPatch, Rule, RuleCategory, RuleDraft, RuleId, Strategy, StrategyId, StrategyPatch,
    StrategyStatus,
};
use crate::idgen::{HashedIds, IdGenerator};
use crate::navigator::{Step, StepNavigator};
use crate::validation::ValidationState;

/// Non-fatal failures surfaced on the store.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Strategy not found")]
    NotFound { id: StrategyId },

    #[error("{message}")]
    Message { message: String },
}

/// Everything the store holds apart from its id generator and clock.
///
/// Serializable so a presentation layer or persistence backend can snapshot
/// and restore it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub current_strategy: Strategy,
    pub saved_strategies: Vec<Strategy>,
    #[serde(rename = "currentStep")]
    pub navigator: StepNavigator,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default)]
    pub error: Option<StoreError>,
    pub validation: ValidationState,
}

pub struct StrategyStore {
    state: StoreState,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl Default for StrategyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StrategyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl StrategyStore {
    /// Fresh store with random-seeded ids and the wall clock.
    pub fn new() -> Self {
        Self::with_generators(HashedIds::from_entropy(), SystemClock)
    }

    pub fn with_generators(ids: impl IdGenerator + 'static, clock: impl Clock + 'static) -> Self {
        Self::from_state(StoreState::default(), ids, clock)
    }

    /// Restore a store from a previously captured state.
    pub fn from_state(
        state: StoreState,
        ids: impl IdGenerator + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            state,
            ids: Box::new(ids),
            clock: Box::new(clock),
        }
    }

    // ── Read access ─────────────────────────────────────────────────

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn into_state(self) -> StoreState {
        self.state
    }

    pub fn current_strategy(&self) -> &Strategy {
        &self.state.current_strategy
    }

    pub fn saved_strategies(&self) -> &[Strategy] {
        &self.state.saved_strategies
    }

    pub fn current_step(&self) -> Step {
        self.state.navigator.current()
    }

    pub fn validation(&self) -> &ValidationState {
        &self.state.validation
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn error(&self) -> Option<&StoreError> {
        self.state.error.as_ref()
    }

    pub fn find(&self, id: &StrategyId) -> Option<&Strategy> {
        self.state
            .saved_strategies
            .iter()
            .find(|s| s.id.as_ref() == Some(id))
    }

    fn position(&self, id: &StrategyId) -> Option<usize> {
        self.state
            .saved_strategies
            .iter()
            .position(|s| s.id.as_ref() == Some(id))
    }

    // ── Editing the working strategy ────────────────────────────────

    /// Append a rule to `category`'s list.
    ///
    /// Refused drafts (blank value, field/operator outside the category's
    /// vocabulary, ordering operator on text) leave the store untouched and
    /// return `None`.
    pub fn add_rule(&mut self, category: RuleCategory, draft: RuleDraft) -> Option<RuleId> {
        let value = match draft.validate(category) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(%category, error = %e, "rule refused");
                return None;
            }
        };
        let id = self.ids.next_rule_id();
        debug_assert!(
            !self.state.current_strategy.has_rule(category, &id),
            "rule id collision: {id}"
        );
        let rule = Rule {
            id: id.clone(),
            field: draft.field,
            operator: draft.operator,
            value,
        };
        self.state.current_strategy.rules_mut(category).push(rule);
        self.state
            .validation
            .refresh_rules(&self.state.current_strategy, category);
        Some(id)
    }

    /// Remove the rule with `id` from `category`'s list. Absent ids are a no-op.
    pub fn remove_rule(&mut self, category: RuleCategory, id: &RuleId) -> bool {
        let rules = self.state.current_strategy.rules_mut(category);
        let removed = match rules.iter().position(|r| &r.id == id) {
            Some(index) => {
                rules.remove(index);
                true
            }
            None => false,
        };
        self.state
            .validation
            .refresh_rules(&self.state.current_strategy, category);
        removed
    }

    /// Merge `patch` into the portfolio configuration and recompute the
    /// simulation flag.
    pub fn update_portfolio_config(&mut self, patch: PortfolioPatch) {
        let strategy = &mut self.state.current_strategy;
        strategy.portfolio_config = strategy.portfolio_config.merged(&patch);
        self.state.validation.refresh(strategy, Step::Simulation);
    }

    pub fn update_strategy(&mut self, patch: StrategyPatch) {
        if let Some(name) = patch.name {
            self.state.current_strategy.name = name;
        }
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Move to the next step if the current one is valid.
    pub fn advance(&mut self) -> bool {
        let moved = self.state.navigator.advance(&self.state.validation);
        if moved {
            self.validate_current_step();
        } else {
            tracing::debug!(step = %self.current_step(), "advance refused");
        }
        moved
    }

    pub fn retreat(&mut self) -> bool {
        let moved = self.state.navigator.retreat();
        if moved {
            self.validate_current_step();
        }
        moved
    }

    /// Jump to `step` without a validity gate.
    pub fn set_current_step(&mut self, step: Step) {
        self.state.navigator.jump_to(step);
        self.validate_current_step();
    }

    /// Recompute the validity flag of the current step only.
    pub fn validate_current_step(&mut self) {
        let step = self.current_step();
        self.state
            .validation
            .refresh(&self.state.current_strategy, step);
    }

    /// Submitting is offered on the simulation step only.
    pub fn can_submit(&self) -> bool {
        self.current_step().is_terminal()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Stamp the working strategy for persistence: assign an id on first
    /// persistence, set `status`, refresh `updated_at`. The working strategy
    /// keeps the id so later saves hit the same slot.
    fn stamp(&mut self, status: StrategyStatus) -> (StrategyId, Strategy) {
        let now = self.clock.now();
        let strategy = &mut self.state.current_strategy;
        let id = match strategy.id.clone() {
            Some(id) => id,
            None => {
                let id = self.ids.next_strategy_id();
                debug_assert!(
                    !self
                        .state
                        .saved_strategies
                        .iter()
                        .any(|s| s.id.as_ref() == Some(&id)),
                    "strategy id collision: {id}"
                );
                strategy.id = Some(id.clone());
                strategy.created_at = Some(now);
                id
            }
        };
        strategy.status = status;
        strategy.updated_at = Some(now);
        (id, strategy.clone())
    }

    /// Save the working strategy as a draft.
    ///
    /// An existing entry with the same id is replaced where it stands;
    /// otherwise the draft is appended.
    pub fn save_draft(&mut self) -> StrategyId {
        let (id, draft) = self.stamp(StrategyStatus::Draft);
        match self.position(&id) {
            Some(index) => self.state.saved_strategies[index] = draft,
            None => self.state.saved_strategies.push(draft),
        }
        tracing::info!(%id, "draft saved");
        id
    }

    /// Submit the working strategy.
    ///
    /// Any existing entry with the same id is removed and the submitted copy
    /// is appended, so a resubmitted strategy moves to the end of the list.
    pub fn submit_strategy(&mut self) -> StrategyId {
        let (id, submitted) = self.stamp(StrategyStatus::Submitted);
        self.state
            .saved_strategies
            .retain(|s| s.id.as_ref() != Some(&id));
        self.state.saved_strategies.push(submitted);
        tracing::info!(%id, "strategy submitted");
        id
    }

    /// Replace the working strategy with a copy of the saved entry `id` and
    /// recompute every validity flag.
    ///
    /// An unknown id leaves the working strategy alone and records
    /// [`StoreError::NotFound`] on the store.
    pub fn load_strategy(&mut self, id: &StrategyId) -> Result<(), StoreError> {
        match self.find(id).cloned() {
            Some(strategy) => {
                self.state.validation = ValidationState::evaluate(&strategy);
                self.state.current_strategy = strategy;
                self.state.error = None;
                tracing::info!(%id, "strategy loaded");
                Ok(())
            }
            None => {
                let err = StoreError::NotFound { id: id.clone() };
                tracing::warn!(%id, "load failed: strategy not found");
                self.state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Start over with an empty draft on the first step. All flags are cleared.
    pub fn reset_strategy(&mut self) {
        self.state.current_strategy = Strategy::default();
        self.state.navigator.reset();
        self.state.error = None;
        self.state.validation = ValidationState::default();
        tracing::info!("working strategy reset");
    }

    /// Remove the saved entry `id`, returning it. Unknown ids are a no-op.
    pub fn delete_strategy(&mut self, id: &StrategyId) -> Option<Strategy> {
        let index = self.position(id)?;
        let removed = self.state.saved_strategies.remove(index);
        tracing::info!(%id, "strategy deleted");
        Some(removed)
    }

    /// Append a draft copy of the saved entry `id` under a new id, with
    /// " (Copy)" appended to its name and fresh timestamps.
    pub fn duplicate_strategy(&mut self, id: &StrategyId) -> Option<StrategyId> {
        let original = self.find(id)?;
        let mut copy = original.clone();
        let new_id = self.ids.next_strategy_id();
        debug_assert!(self.position(&new_id).is_none(), "strategy id collision: {new_id}");
        let now = self.clock.now();
        copy.id = Some(new_id.clone());
        copy.name = format!("{} (Copy)", copy.name);
        copy.status = StrategyStatus::Draft;
        copy.created_at = Some(now);
        copy.updated_at = Some(now);
        self.state.saved_strategies.push(copy);
        tracing::info!(source = %id, copy = %new_id, "strategy duplicated");
        Some(new_id)
    }

    /// Flag the saved entry `id` as simulated. Unknown ids are a no-op.
    pub fn mark_simulated(&mut self, id: &StrategyId) -> bool {
        let now = self.clock.now();
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = &mut self.state.saved_strategies[index];
        entry.status = StrategyStatus::Simulated;
        entry.updated_at = Some(now);
        if self.state.current_strategy.id.as_ref() == Some(id) {
            self.state.current_strategy.status = StrategyStatus::Simulated;
        }
        true
    }

    // ── Utility ─────────────────────────────────────────────────────

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    pub fn set_error(&mut self, message: Option<String>) {
        self.state.error = message.map(|message| StoreError::Message { message });
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }
}
