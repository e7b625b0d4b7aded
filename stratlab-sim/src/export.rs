//! Export — saved strategies and their latest results as CSV or JSON.
//!
//! The JSON document carries a `schemaVersion`; unknown newer versions are
//! rejected on import.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use stratlab_core::Strategy;

use crate::book::SimulationBook;
use crate::result::SimulationResult;

pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// One saved strategy with its latest simulation, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub strategy: Strategy,
    #[serde(default)]
    pub result: Option<SimulationResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsExport {
    pub schema_version: u32,
    pub entries: Vec<ExportEntry>,
}

impl ResultsExport {
    /// Pair each strategy with its book entry, keeping the saved order.
    pub fn collect(strategies: &[Strategy], book: &SimulationBook) -> Self {
        let entries = strategies
            .iter()
            .map(|s| ExportEntry {
                strategy: s.clone(),
                result: s.id.as_ref().and_then(|id| book.result(id)).cloned(),
            })
            .collect();
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            entries,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(strategies: &[Strategy], book: &SimulationBook) -> Result<String> {
    serde_json::to_string_pretty(&ResultsExport::collect(strategies, book))
        .context("failed to serialize results export to JSON")
}

pub fn import_json(json: &str) -> Result<ResultsExport> {
    let export: ResultsExport =
        serde_json::from_str(json).context("failed to deserialize results export from JSON")?;
    if export.schema_version > EXPORT_SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            export.schema_version,
            EXPORT_SCHEMA_VERSION
        );
    }
    Ok(export)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per saved strategy.
///
/// Columns: id, name, status, scanner_rules, buy_rules, sell_rules,
/// initial_capital, risk_per_trade, max_positions, total_return,
/// annualized_return, max_drawdown, win_rate, sharpe_ratio, trades_executed,
/// start_date, end_date. Result columns are empty for unsimulated strategies.
pub fn export_results_csv(strategies: &[Strategy], book: &SimulationBook) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "name",
        "status",
        "scanner_rules",
        "buy_rules",
        "sell_rules",
        "initial_capital",
        "risk_per_trade",
        "max_positions",
        "total_return",
        "annualized_return",
        "max_drawdown",
        "win_rate",
        "sharpe_ratio",
        "trades_executed",
        "start_date",
        "end_date",
    ])?;

    for s in strategies {
        let id = s.id.as_ref().map(|id| id.to_string()).unwrap_or_default();
        let result = s.id.as_ref().and_then(|id| book.result(id));
        let mut row = vec![
            id,
            s.name.clone(),
            s.status.to_string(),
            s.scanner_rules.len().to_string(),
            s.buy_rules.len().to_string(),
            s.sell_rules.len().to_string(),
            format!("{:.2}", s.portfolio_config.initial_capital),
            format!("{:.2}", s.portfolio_config.risk_per_trade),
            s.portfolio_config.max_positions.to_string(),
        ];
        match result {
            Some(r) => row.extend([
                format!("{:.1}", r.total_return),
                format!("{:.1}", r.annualized_return),
                format!("{:.1}", r.max_drawdown),
                format!("{:.1}", r.win_rate),
                format!("{:.2}", r.sharpe_ratio),
                r.trades_executed.to_string(),
                r.start_date.to_string(),
                r.end_date.to_string(),
            ]),
            None => row.extend(std::iter::repeat(String::new()).take(8)),
        }
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}
