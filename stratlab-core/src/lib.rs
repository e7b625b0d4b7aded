//! StratLab Core — strategy model, step validation, wizard navigator, store.
//!
//! This crate contains the state machine behind the strategy builder:
//! - Domain types (rules, portfolio configuration, strategies)
//! - Step validity as a pure projection of the strategy
//! - Four-step navigator gated by step validity
//! - Strategy store with the save / submit / load / duplicate / delete / reset
//!   lifecycle
//! - Injected id generator and clock

pub mod clock;
pub mod domain;
pub mod idgen;
pub mod navigator;
pub mod store;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    Field, Operator, PortfolioConfig, PortfolioPatch, Rule, RuleCategory, RuleDraft, RuleError,
    RuleId, RuleValue, Strategy, StrategyId, StrategyPatch, StrategyStatus,
};
pub use idgen::{HashedIds, IdGenerator, SequentialIds};
pub use navigator::{Step, StepNavigator};
pub use store::{StoreError, StoreState, StrategyStore};
pub use validation::{step_validity, ValidationState};
