//! Simulation book — latest result per strategy, tolerant of out-of-order
//! completions.
//!
//! Each run is issued a [`Ticket`] from a monotonically increasing counter.
//! A completion only lands if its ticket is newer than the one already
//! recorded for that strategy, so a slow early run can never overwrite a
//! faster later one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratlab_core::StrategyId;

use crate::result::SimulationResult;

/// Run number handed out by [`SimulationBook::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recorded {
    pub ticket: Ticket,
    pub result: SimulationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Entry {
    issued: Option<Ticket>,
    latest: Option<Recorded>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationBook {
    next_ticket: u64,
    entries: BTreeMap<StrategyId, Entry>,
}

impl SimulationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new run of `id`.
    pub fn begin(&mut self, id: &StrategyId) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.entries.entry(id.clone()).or_default().issued = Some(ticket);
        tracing::debug!(%id, %ticket, "simulation begun");
        ticket
    }

    /// Record a finished run. Returns `false` (and drops the result) when the
    /// id is unknown or a run with a newer ticket has already landed.
    pub fn complete(&mut self, ticket: Ticket, id: &StrategyId, result: SimulationResult) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            tracing::debug!(%id, %ticket, "completion for unknown strategy dropped");
            return false;
        };
        if entry.latest.as_ref().is_some_and(|r| r.ticket >= ticket) {
            tracing::debug!(%id, %ticket, "stale completion dropped");
            return false;
        }
        entry.latest = Some(Recorded { ticket, result });
        true
    }

    /// A run was issued for `id` and nothing at least as new has landed yet.
    pub fn is_running(&self, id: &StrategyId) -> bool {
        self.entries.get(id).is_some_and(|e| match (&e.issued, &e.latest) {
            (Some(issued), Some(latest)) => latest.ticket < *issued,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    pub fn result(&self, id: &StrategyId) -> Option<&SimulationResult> {
        self.recorded(id).map(|r| &r.result)
    }

    pub fn recorded(&self, id: &StrategyId) -> Option<&Recorded> {
        self.entries.get(id).and_then(|e| e.latest.as_ref())
    }

    /// Drop everything known about `id`. Late completions for it are ignored.
    pub fn forget(&mut self, id: &StrategyId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Strategies with a recorded result, in id order.
    pub fn results(&self) -> impl Iterator<Item = (&StrategyId, &SimulationResult)> {
        self.entries
            .iter()
            .filter_map(|(id, e)| e.latest.as_ref().map(|r| (id, &r.result)))
    }

    pub fn len(&self) -> usize {
        self.results().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn result(total_return: f64) -> SimulationResult {
        let d = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        SimulationResult::new(total_return, 0.0, 0.0, 50.0, 1.0, 10, d, d)
    }

    #[test]
    fn tickets_increase() {
        let mut book = SimulationBook::new();
        let a = book.begin(&StrategyId::from("a"));
        let b = book.begin(&StrategyId::from("b"));
        assert!(b > a);
    }

    #[test]
    fn running_until_completed() {
        let mut book = SimulationBook::new();
        let id = StrategyId::from("a");
        assert!(!book.is_running(&id));
        let t = book.begin(&id);
        assert!(book.is_running(&id));
        assert!(book.complete(t, &id, result(5.0)));
        assert!(!book.is_running(&id));
        assert_eq!(book.result(&id).unwrap().total_return, 5.0);
    }

    #[test]
    fn older_completion_never_overwrites_newer() {
        let mut book = SimulationBook::new();
        let id = StrategyId::from("a");
        let first = book.begin(&id);
        let second = book.begin(&id);
        assert!(book.complete(second, &id, result(2.0)));
        assert!(!book.complete(first, &id, result(1.0)));
        assert_eq!(book.recorded(&id).unwrap().ticket, second);
        assert_eq!(book.result(&id).unwrap().total_return, 2.0);
    }

    #[test]
    fn older_completion_lands_while_newer_pending() {
        let mut book = SimulationBook::new();
        let id = StrategyId::from("a");
        let first = book.begin(&id);
        let _second = book.begin(&id);
        assert!(book.complete(first, &id, result(1.0)));
        assert!(book.is_running(&id));
    }

    #[test]
    fn forgotten_ids_drop_late_results() {
        let mut book = SimulationBook::new();
        let id = StrategyId::from("a");
        let t = book.begin(&id);
        assert!(book.forget(&id));
        assert!(!book.complete(t, &id, result(1.0)));
        assert!(book.is_empty());
    }

    #[test]
    fn serializes_with_string_keys() {
        let mut book = SimulationBook::new();
        let id = StrategyId::from("s_1");
        let t = book.begin(&id);
        book.complete(t, &id, result(3.0));
        let json = serde_json::to_string(&book).unwrap();
        let back: SimulationBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }
}
