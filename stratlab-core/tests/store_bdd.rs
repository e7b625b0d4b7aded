//! BDD tests for the strategy store.
//!
//! These tests walk the wizard the way a user would:
//! - Building a strategy step by step
//! - Saving, submitting and loading
//! - Resetting the working strategy
//! - Duplicating and deleting saved entries

use chrono::{Duration, TimeZone, Utc};
use stratlab_core::{
    Field, ManualClock, Operator, PortfolioConfig, PortfolioPatch, RuleCategory, RuleDraft,
    SequentialIds, Step, StoreError, StrategyId, StrategyStatus, StrategyStore, ValidationState,
};

fn new_store() -> StrategyStore {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    StrategyStore::with_generators(
        SequentialIds::new(),
        ManualClock::ticking(start, Duration::seconds(1)),
    )
}

/// Scanner, buy and sell rules plus a custom portfolio.
fn build_full_strategy(store: &mut StrategyStore) {
    store
        .add_rule(
            RuleCategory::Scanner,
            RuleDraft::new(Field::Price, Operator::Gt, 100),
        )
        .expect("scanner rule accepted");
    store
        .add_rule(RuleCategory::Buy, RuleDraft::new(Field::Rsi, Operator::Lt, 30))
        .expect("buy rule accepted");
    store
        .add_rule(
            RuleCategory::Sell,
            RuleDraft::new(Field::ProfitPercentage, Operator::Gt, 10),
        )
        .expect("sell rule accepted");
    store.update_portfolio_config(PortfolioConfig::new(5_000.0, 1.0, 5).into());
}

#[test]
fn bdd_scenario_build_strategy_through_all_steps() {
    // GIVEN a fresh store
    let mut store = new_store();
    assert_eq!(store.current_step(), Step::Scanner);

    // WHEN one rule per category and a custom portfolio are entered
    build_full_strategy(&mut store);

    // THEN every step is valid
    assert_eq!(
        *store.validation(),
        ValidationState {
            is_scanner_valid: true,
            is_buy_valid: true,
            is_sell_valid: true,
            is_simulation_valid: true,
        }
    );

    // AND three advances reach the simulation step
    assert!(store.advance());
    assert!(store.advance());
    assert!(store.advance());
    assert_eq!(store.current_step(), Step::Simulation);
    assert!(store.can_submit());

    // AND a fourth advance is refused
    assert!(!store.advance());
    assert_eq!(store.current_step(), Step::Simulation);
}

#[test]
fn bdd_scenario_advance_is_gated_on_current_step() {
    // GIVEN a fresh store with no scanner rules
    let mut store = new_store();

    // WHEN advancing from the scanner step
    let moved = store.advance();

    // THEN the store stays on the scanner step
    assert!(!moved);
    assert_eq!(store.current_step(), Step::Scanner);

    // WHEN a scanner rule is added
    store.add_rule(
        RuleCategory::Scanner,
        RuleDraft::new(Field::Volume, Operator::Gte, 1_000_000),
    );

    // THEN advancing works, and buy blocks the next advance
    assert!(store.advance());
    assert_eq!(store.current_step(), Step::Buy);
    assert!(!store.advance());

    // AND retreating needs no validity
    assert!(store.retreat());
    assert_eq!(store.current_step(), Step::Scanner);
    assert!(!store.retreat());
}

#[test]
fn bdd_scenario_submit_then_load_restores_submitted_strategy() {
    // GIVEN a complete strategy that has been submitted
    let mut store = new_store();
    build_full_strategy(&mut store);
    store.update_strategy(stratlab_core::StrategyPatch::rename("Oversold Bounce"));
    let id = store.submit_strategy();

    // WHEN the store is reset and the strategy is loaded back
    store.reset_strategy();
    store.load_strategy(&id).expect("submitted strategy exists");

    // THEN the working strategy is the submitted one
    let current = store.current_strategy();
    assert_eq!(current.id.as_ref(), Some(&id));
    assert_eq!(current.name, "Oversold Bounce");
    assert_eq!(current.status, StrategyStatus::Submitted);
    assert_eq!(current.scanner_rules.len(), 1);
    assert_eq!(current.portfolio_config, PortfolioConfig::new(5_000.0, 1.0, 5));

    // AND all four flags were recomputed
    assert!(store.validation().all_valid());
}

#[test]
fn bdd_scenario_reset_restores_initial_state() {
    // GIVEN a store mid-way through the wizard with an error recorded
    let mut store = new_store();
    build_full_strategy(&mut store);
    store.advance();
    store.advance();
    store.set_error(Some("network unavailable".into()));
    let saved = store.save_draft();

    // WHEN the working strategy is reset
    store.reset_strategy();

    // THEN the working strategy is an empty default draft on step 0
    let current = store.current_strategy();
    assert_eq!(store.current_step(), Step::Scanner);
    assert!(current.id.is_none());
    assert_eq!(current.rule_count(), 0);
    assert_eq!(current.portfolio_config, PortfolioConfig::new(10_000.0, 2.0, 10));
    assert_eq!(current.status, StrategyStatus::Draft);

    // AND all flags are cleared and the error is gone
    assert_eq!(*store.validation(), ValidationState::default());
    assert!(store.error().is_none());

    // AND the saved collection is untouched
    assert_eq!(store.saved_strategies().len(), 1);
    assert!(store.find(&saved).is_some());
}

#[test]
fn bdd_scenario_duplicate_then_delete() {
    // GIVEN a saved draft
    let mut store = new_store();
    build_full_strategy(&mut store);
    let original = store.save_draft();

    // WHEN it is duplicated
    let copy = store
        .duplicate_strategy(&original)
        .expect("original exists");

    // THEN the copy sits at the end under a fresh id
    assert_eq!(store.saved_strategies().len(), 2);
    assert_eq!(store.saved_strategies()[1].id.as_ref(), Some(&copy));
    assert_eq!(store.saved_strategies()[1].name, "New Strategy (Copy)");

    // WHEN the original is deleted
    let removed = store.delete_strategy(&original).expect("original exists");

    // THEN only the copy remains
    assert_eq!(removed.id.as_ref(), Some(&original));
    assert_eq!(store.saved_strategies().len(), 1);
    assert!(store.find(&original).is_none());

    // AND deleting again is a no-op
    assert!(store.delete_strategy(&original).is_none());
    assert_eq!(store.saved_strategies().len(), 1);
}

#[test]
fn bdd_scenario_loading_unknown_id_reports_not_found() {
    // GIVEN a store with a rule in progress
    let mut store = new_store();
    store.add_rule(
        RuleCategory::Scanner,
        RuleDraft::new(Field::Sector, Operator::Eq, "Technology"),
    );

    // WHEN loading an id that was never saved
    let result = store.load_strategy(&StrategyId::from("strategy-99"));

    // THEN the error is surfaced and the working strategy is unchanged
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
    assert_eq!(
        store.error().map(|e| e.to_string()).as_deref(),
        Some("Strategy not found")
    );
    assert_eq!(store.current_strategy().scanner_rules.len(), 1);

    // AND clearing the error works
    store.clear_error();
    assert!(store.error().is_none());
}

#[test]
fn bdd_scenario_invalid_portfolio_blocks_nothing_but_flags_simulation() {
    // GIVEN a complete strategy on the sell step
    let mut store = new_store();
    build_full_strategy(&mut store);
    store.set_current_step(Step::Sell);

    // WHEN the capital is set to zero
    store.update_portfolio_config(PortfolioPatch {
        initial_capital: Some(0.0),
        ..Default::default()
    });

    // THEN only the simulation flag drops
    assert!(!store.validation().is_simulation_valid);
    assert!(store.validation().is_sell_valid);

    // AND the sell step can still advance into simulation
    assert!(store.advance());
    assert_eq!(store.current_step(), Step::Simulation);
    assert!(!store.validation().is_simulation_valid);
}

#[test]
fn bdd_scenario_duplicate_then_delete_copy_restores_collection() {
    // GIVEN three saved strategies
    let mut store = new_store();
    store.save_draft();
    store.reset_strategy();
    let middle = store.submit_strategy();
    store.reset_strategy();
    store.save_draft();
    let before = store.saved_strategies().to_vec();

    // WHEN the middle one is duplicated and the copy deleted
    let copy = store.duplicate_strategy(&middle).expect("middle exists");
    store.delete_strategy(&copy).expect("copy exists");

    // THEN the collection is exactly what it was
    assert_eq!(store.saved_strategies(), before.as_slice());
}
