//! Snapshot persistence — store state and simulation results as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use stratlab_core::{
    HashedIds, PortfolioPatch, StoreState, StrategyPatch, StrategyStore, SystemClock,
};
use stratlab_sim::SimulationBook;

use crate::config::DefaultsSection;

pub const SCHEMA_VERSION: u32 = 1;

/// Everything written to the store file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    pub state: StoreState,
    #[serde(default)]
    pub results: SimulationBook,
}

/// Load a snapshot. A missing file is `Ok(None)`; an unreadable, corrupt or
/// newer-schema file is an error.
pub fn load(path: &Path) -> Result<Option<Snapshot>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read store file {}", path.display()))
        }
    };
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse store file {}", path.display()))?;
    if snapshot.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} in {} (max supported: {})",
            snapshot.schema_version,
            path.display(),
            SCHEMA_VERSION
        );
    }
    Ok(Some(snapshot))
}

/// Save a snapshot. Creates parent directories if needed.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot).context("failed to serialize snapshot")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// A store and its results, bound to the file they came from.
pub struct Session {
    pub store: StrategyStore,
    pub results: SimulationBook,
    path: PathBuf,
}

impl Session {
    /// Open the snapshot at `path`, or start a fresh store seeded from
    /// `defaults` when there is none yet.
    pub fn open(path: &Path, defaults: &DefaultsSection) -> Result<Self> {
        let (store, results) = match load(path)? {
            Some(snapshot) => {
                tracing::debug!(path = %path.display(), "snapshot loaded");
                (restore(snapshot.state), snapshot.results)
            }
            None => {
                tracing::info!(path = %path.display(), "no snapshot found, starting fresh");
                (fresh_store(defaults), SimulationBook::new())
            }
        };
        Ok(Self {
            store,
            results,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION,
            state: self.store.state().clone(),
            results: self.results.clone(),
        }
    }

    pub fn save(&self) -> Result<()> {
        save(&self.path, &self.snapshot())
    }
}

fn restore(state: StoreState) -> StrategyStore {
    StrategyStore::from_state(state, HashedIds::from_entropy(), SystemClock)
}

/// Working strategy named and sized per `defaults`. Validity flags stay as
/// the store computes them.
fn fresh_store(defaults: &DefaultsSection) -> StrategyStore {
    let mut store = StrategyStore::new();
    let portfolio = defaults.portfolio();
    if defaults.strategy_name != store.current_strategy().name {
        store.update_strategy(StrategyPatch::rename(defaults.strategy_name.clone()));
    }
    if portfolio != store.current_strategy().portfolio_config {
        store.update_portfolio_config(PortfolioPatch::from(portfolio));
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratlab_core::{Field, Operator, RuleCategory, RuleDraft, Step};

    #[test]
    fn missing_file_opens_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let session = Session::open(&path, &DefaultsSection::default()).unwrap();
        assert!(session.store.saved_strategies().is_empty());
        assert_eq!(session.store.current_step(), Step::Scanner);
        assert!(!session.store.validation().is_simulation_valid);
    }

    #[test]
    fn defaults_seed_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = DefaultsSection {
            strategy_name: "Swing".into(),
            initial_capital: 50_000.0,
            ..Default::default()
        };
        let session = Session::open(&dir.path().join("store.json"), &defaults).unwrap();
        let current = session.store.current_strategy();
        assert_eq!(current.name, "Swing");
        assert_eq!(current.portfolio_config.initial_capital, 50_000.0);
        assert!(session.store.validation().is_simulation_valid);
    }

    #[test]
    fn roundtrip_through_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.json");

        let mut session = Session::open(&path, &DefaultsSection::default()).unwrap();
        session
            .store
            .add_rule(RuleCategory::Scanner, RuleDraft::new(Field::Price, Operator::Gt, 100));
        session.store.advance();
        let id = session.store.save_draft();
        session.save().unwrap();

        let reopened = Session::open(&path, &DefaultsSection::default()).unwrap();
        assert_eq!(reopened.store.state(), session.store.state());
        assert_eq!(reopened.store.current_step(), Step::Buy);
        assert!(reopened.store.find(&id).is_some());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let snapshot = Snapshot {
            schema_version: SCHEMA_VERSION + 1,
            ..Default::default()
        };
        save(&path, &snapshot).unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }
}
