//! Simulators — turn a strategy id and portfolio configuration into a result.
//!
//! [`MockSimulator`] stands in for a real backtest engine. Its figures are
//! random but reproducible: a master seed, the strategy id and the run
//! iteration are hashed with BLAKE3 into a per-run sub-seed.

use std::time::Duration;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stratlab_core::{PortfolioConfig, StrategyId};

use crate::result::SimulationResult;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

/// Produces a [`SimulationResult`] for a strategy.
///
/// Implementations are shared across pool threads.
pub trait Simulator: Send + Sync {
    fn simulate(
        &self,
        strategy_id: &StrategyId,
        config: &PortfolioConfig,
        iteration: u64,
    ) -> SimulationResult;
}

#[derive(Debug, Clone)]
pub struct MockSimulator {
    master_seed: u64,
    delay: Duration,
    start: NaiveDate,
    end: NaiveDate,
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new(rand::random())
    }
}

impl MockSimulator {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            delay: DEFAULT_DELAY,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sub-seed for one `(strategy, iteration)` run, independent of the order
    /// runs are scheduled in.
    pub fn sub_seed(&self, strategy_id: &StrategyId, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(strategy_id.as_str().as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }

    fn rng_for(&self, strategy_id: &StrategyId, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(strategy_id, iteration))
    }
}

impl Simulator for MockSimulator {
    fn simulate(
        &self,
        strategy_id: &StrategyId,
        config: &PortfolioConfig,
        iteration: u64,
    ) -> SimulationResult {
        tracing::debug!(
            %strategy_id,
            iteration,
            capital = config.initial_capital,
            "mock simulation started"
        );
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut rng = self.rng_for(strategy_id, iteration);
        SimulationResult::new(
            rng.gen_range(-5.0..25.0),
            rng.gen_range(-5.0..35.0),
            -rng.gen_range(0.0..15.0),
            rng.gen_range(30.0..80.0),
            rng.gen_range(0.0..2.0),
            rng.gen_range(0..200),
            self.start,
            self.end,
        )
    }
}
