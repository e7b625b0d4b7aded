//! Simulation result — headline performance figures for one run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Performance summary of a simulated strategy.
///
/// Percent figures are rounded to one decimal, the Sharpe ratio to two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Total return over the period, percent
    pub total_return: f64,

    /// Annualized return, percent
    pub annualized_return: f64,

    /// Maximum peak-to-trough drawdown, percent (zero or negative)
    pub max_drawdown: f64,

    /// Share of winning trades, percent
    pub win_rate: f64,

    pub sharpe_ratio: f64,
    pub trades_executed: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SimulationResult {
    /// Build a result, rounding every figure to its display precision.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        total_return: f64,
        annualized_return: f64,
        max_drawdown: f64,
        win_rate: f64,
        sharpe_ratio: f64,
        trades_executed: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            total_return: round_to(total_return, 1),
            annualized_return: round_to(annualized_return, 1),
            max_drawdown: round_to(max_drawdown, 1),
            win_rate: round_to(win_rate, 1),
            sharpe_ratio: round_to(sharpe_ratio, 2),
            trades_executed,
            start_date,
            end_date,
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.total_return > 0.0
    }

    /// Calendar days covered, inclusive of both ends.
    pub fn period_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "return {:+.1}% (ann. {:+.1}%), drawdown {:.1}%, win rate {:.1}%, sharpe {:.2}, \
             {} trades, {}..{}",
            self.total_return,
            self.annualized_return,
            self.max_drawdown,
            self.win_rate,
            self.sharpe_ratio,
            self.trades_executed,
            self.start_date,
            self.end_date,
        )
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
