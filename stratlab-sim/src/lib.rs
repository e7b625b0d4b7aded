//! StratLab Sim — simulation of saved strategies and result export.
//!
//! This crate builds on `stratlab-core` to provide:
//! - `Simulator` trait and a seeded mock implementation
//! - Background worker on a private rayon pool
//! - Ticketed result book that tolerates out-of-order completions
//! - CSV and JSON export

pub mod book;
pub mod export;
pub mod result;
pub mod simulator;
pub mod worker;

pub use book::{Recorded, SimulationBook, Ticket};
pub use export::{export_json, export_results_csv, import_json, ExportEntry, ResultsExport};
pub use result::SimulationResult;
pub use simulator::{MockSimulator, Simulator, DEFAULT_DELAY};
pub use worker::{SimCommand, SimResponse, SimulationWorker};
