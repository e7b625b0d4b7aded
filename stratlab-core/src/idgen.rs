//! Unique id generation for strategies and rules.
//!
//! The store never derives ids from the wall clock. A generator is injected at
//! construction; two ids drawn from the same generator never collide.

use crate::domain::{RuleId, StrategyId};

/// Source of fresh strategy and rule ids.
pub trait IdGenerator: Send {
    fn next_strategy_id(&mut self) -> StrategyId;
    fn next_rule_id(&mut self) -> RuleId;
}

/// Hash-derived ids: BLAKE3 over `(seed, counter, kind)`, truncated to 16 hex
/// characters.
///
/// Different seeds give unrelated id streams, so generators created in
/// separate processes (each with a fresh random seed) do not collide in
/// practice, and a fixed seed gives a reproducible stream.
#[derive(Debug, Clone)]
pub struct HashedIds {
    seed: u64,
    counter: u64,
}

impl HashedIds {
    pub fn new(seed: u64) -> Self {
        Self { seed, counter: 0 }
    }

    /// Seeded from the thread-local RNG.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    fn next_hex(&mut self, kind: &[u8]) -> String {
        self.counter += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&self.counter.to_le_bytes());
        hasher.update(kind);
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..16].to_string()
    }
}

impl Default for HashedIds {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IdGenerator for HashedIds {
    fn next_strategy_id(&mut self) -> StrategyId {
        StrategyId(format!("s_{}", self.next_hex(b"strategy")))
    }

    fn next_rule_id(&mut self) -> RuleId {
        RuleId(format!("r_{}", self.next_hex(b"rule")))
    }
}

/// Counter ids (`strategy-1`, `rule-1`, ...). Readable, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    strategies: u64,
    rules: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_strategy_id(&mut self) -> StrategyId {
        self.strategies += 1;
        StrategyId(format!("strategy-{}", self.strategies))
    }

    fn next_rule_id(&mut self) -> RuleId {
        self.rules += 1;
        RuleId(format!("rule-{}", self.rules))
    }
}
