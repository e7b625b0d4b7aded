//! StratLab CLI — drive the strategy wizard from the shell.
//!
//! Every invocation loads the snapshot, applies one store action, and writes
//! the snapshot back. Commands:
//! - `status`, `list` — inspect the working strategy and saved collection
//! - `rename`, `add-rule`, `remove-rule`, `portfolio` — edit the working strategy
//! - `next`, `back`, `goto` — move through the wizard steps
//! - `save`, `submit`, `load`, `duplicate`, `delete`, `reset` — lifecycle
//! - `simulate` — run the mock simulator over saved strategies
//! - `export` — write saved strategies and results as CSV or JSON

mod config;
mod persistence;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stratlab_core::{
    Field, Operator, PortfolioPatch, RuleCategory, RuleDraft, RuleId, Step, Strategy, StrategyId,
    StrategyPatch, StrategyStore,
};
use stratlab_sim::{
    export_json, export_results_csv, MockSimulator, SimResponse, SimulationBook,
    SimulationResult, SimulationWorker, Ticket,
};

use crate::config::{SimulationSection, StratlabConfig};
use crate::persistence::Session;

/// Seed key for runs of a working strategy that has no id yet.
const UNSAVED_RUN_ID: &str = "unsaved";

/// Slack on top of the simulated delay before a run counts as lost.
const RECV_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(
    name = "stratlab",
    version,
    about = "StratLab CLI — build, save and simulate rule-based trading strategies"
)]
struct Cli {
    /// Config file. Defaults to the per-user config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store snapshot file. Overrides the config file.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the working strategy, current step and validity.
    Status,
    /// List saved strategies.
    List,
    /// Rename the working strategy.
    Rename { name: String },
    /// Add a rule, e.g. `add-rule scanner price gt 100`.
    AddRule {
        /// scanner, buy or sell.
        category: RuleCategory,
        field: Field,
        /// Symbol (>, <, =, >=, <=) or alias (gt, lt, eq, gte, lte, contains, startswith).
        operator: Operator,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Remove a rule by id.
    RemoveRule { category: RuleCategory, id: String },
    /// Update the portfolio configuration.
    Portfolio {
        #[arg(long, allow_hyphen_values = true, value_parser = parse_finite)]
        capital: Option<f64>,
        /// Percent of capital risked per trade.
        #[arg(long, allow_hyphen_values = true, value_parser = parse_finite)]
        risk: Option<f64>,
        #[arg(long)]
        max_positions: Option<u32>,
    },
    /// Advance to the next step (requires the current step to be valid).
    Next,
    /// Go back one step.
    Back,
    /// Jump to a step by index (0-3) or name.
    Goto { step: Step },
    /// Save the working strategy as a draft.
    Save,
    /// Submit the working strategy (simulation step only).
    Submit,
    /// Load a saved strategy into the working slot.
    Load { id: String },
    /// Duplicate a saved strategy.
    Duplicate { id: String },
    /// Delete a saved strategy.
    Delete { id: String },
    /// Discard the working strategy and start over.
    Reset,
    /// Simulate saved strategies (all of them when no id is given).
    Simulate {
        ids: Vec<String>,
        /// Simulate the working strategy instead, saved or not.
        #[arg(long, conflicts_with = "ids")]
        current: bool,
    },
    /// Export saved strategies and results.
    Export {
        #[arg(long, conflicts_with = "json")]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = StratlabConfig::load(cli.config.as_deref())?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path());
    let mut session = Session::open(&store_path, &config.defaults)?;

    // The store may record an error (e.g. a failed load) even when the
    // command fails, so the snapshot is written either way.
    let outcome = run_command(cli.command, &mut session, &config);
    session.save()?;
    tracing::debug!(path = %session.path().display(), "snapshot saved");
    outcome
}

/// Any finite number. Non-positive values pass and are flagged by the store.
fn parse_finite(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("'{raw}' is not a finite number"));
    }
    Ok(value)
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(command: Commands, session: &mut Session, config: &StratlabConfig) -> Result<()> {
    let store = &mut session.store;
    match command {
        Commands::Status => print_status(store),
        Commands::List => print_list(store.saved_strategies(), &session.results),
        Commands::Rename { name } => {
            store.update_strategy(StrategyPatch::rename(name));
            println!("Renamed to '{}'", store.current_strategy().name);
        }
        Commands::AddRule {
            category,
            field,
            operator,
            value,
        } => {
            let draft = RuleDraft::new(field, operator, value);
            if let Err(e) = draft.validate(category) {
                bail!("rule refused: {e}");
            }
            match store.add_rule(category, draft) {
                Some(id) => println!("Added {category} rule {id}"),
                None => bail!("rule refused"),
            }
        }
        Commands::RemoveRule { category, id } => {
            if store.remove_rule(category, &RuleId::new(id.clone())) {
                println!("Removed {category} rule {id}");
            } else {
                println!("No {category} rule with id '{id}', nothing removed");
            }
        }
        Commands::Portfolio {
            capital,
            risk,
            max_positions,
        } => {
            let patch = PortfolioPatch {
                initial_capital: capital,
                risk_per_trade: risk,
                max_positions,
            };
            if patch.is_empty() {
                bail!("nothing to update: pass --capital, --risk or --max-positions");
            }
            store.update_portfolio_config(patch);
            print_portfolio(store.current_strategy());
            if !store.validation().is_simulation_valid {
                println!("Warning: every portfolio value must be positive");
            }
        }
        Commands::Next => {
            if !store.advance() {
                let step = store.current_step();
                if step.is_terminal() {
                    bail!("already at the last step ({step})");
                }
                bail!("{step} step is incomplete: {}", requirement(step));
            }
            println!("Step {}: {}", store.current_step().index(), store.current_step());
        }
        Commands::Back => {
            if !store.retreat() {
                bail!("already at the first step");
            }
            println!("Step {}: {}", store.current_step().index(), store.current_step());
        }
        Commands::Goto { step } => {
            store.set_current_step(step);
            println!("Step {}: {}", step.index(), step);
        }
        Commands::Save => {
            let id = store.save_draft();
            println!("Saved draft {id}");
        }
        Commands::Submit => {
            if !store.can_submit() {
                bail!(
                    "submit is only available on the {} step",
                    Step::Simulation
                );
            }
            let id = store.submit_strategy();
            println!("Submitted {id}");
        }
        Commands::Load { id } => {
            store.load_strategy(&StrategyId::new(id.clone()))?;
            println!("Loaded {id}");
        }
        Commands::Duplicate { id } => {
            match store.duplicate_strategy(&StrategyId::new(id.clone())) {
                Some(copy) => println!("Duplicated {id} as {copy}"),
                None => println!("No saved strategy with id '{id}', nothing duplicated"),
            }
        }
        Commands::Delete { id } => {
            let id = StrategyId::new(id);
            match store.delete_strategy(&id) {
                Some(removed) => {
                    session.results.forget(&id);
                    println!("Deleted {} ({id})", removed.name);
                }
                None => println!("No saved strategy with id '{id}', nothing deleted"),
            }
        }
        Commands::Reset => {
            store.reset_strategy();
            println!("Working strategy reset");
        }
        Commands::Simulate { ids, current } => {
            if current {
                let result =
                    run_current_simulation(store, &mut session.results, &config.simulation)?;
                println!("{}: {result}", store.current_strategy().name);
            } else {
                let ids = ids.into_iter().map(StrategyId::new).collect::<Vec<_>>();
                run_simulations(store, &mut session.results, &ids, &config.simulation)?;
            }
        }
        Commands::Export { csv, json } => {
            let strategies = store.saved_strategies();
            match (csv, json) {
                (Some(path), _) => {
                    let out = export_results_csv(strategies, &session.results)?;
                    std::fs::write(&path, out)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported {} strategies to {}", strategies.len(), path.display());
                }
                (None, Some(path)) => {
                    let out = export_json(strategies, &session.results)?;
                    std::fs::write(&path, out)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported {} strategies to {}", strategies.len(), path.display());
                }
                (None, None) => bail!("one of --csv or --json is required"),
            }
        }
    }
    Ok(())
}

/// Run the mock simulator over `ids` (every saved strategy when empty) and
/// record the results.
fn run_simulations(
    store: &mut StrategyStore,
    book: &mut SimulationBook,
    ids: &[StrategyId],
    settings: &SimulationSection,
) -> Result<()> {
    let targets: Vec<Strategy> = if ids.is_empty() {
        store.saved_strategies().to_vec()
    } else {
        ids.iter()
            .map(|id| {
                store
                    .find(id)
                    .cloned()
                    .with_context(|| format!("no saved strategy with id '{id}'"))
            })
            .collect::<Result<_>>()?
    };
    if targets.is_empty() {
        bail!("nothing to simulate: save or submit a strategy first");
    }

    let worker = spawn_worker(settings)?;

    store.set_loading(true);
    for strategy in &targets {
        let Some(id) = strategy.id.clone() else {
            continue;
        };
        let ticket = book.begin(&id);
        worker.submit(ticket, id, strategy.portfolio_config)?;
    }
    println!("Simulating {} strategies...", targets.len());

    let timeout = settings.delay() + RECV_GRACE;
    let mut outcome = Ok(());
    for _ in 0..targets.len() {
        match worker.recv_timeout(timeout) {
            Ok(SimResponse::Completed {
                ticket,
                strategy_id,
                result,
            }) => {
                if book.complete(ticket, &strategy_id, result.clone()) {
                    store.mark_simulated(&strategy_id);
                    println!("{strategy_id}: {result}");
                }
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    store.set_loading(false);
    worker.shutdown()?;
    outcome
}

/// Simulate the working strategy's portfolio configuration.
///
/// The result is recorded in `book` only when the working strategy has been
/// saved; an unsaved draft gets a one-off run that leaves the book alone.
fn run_current_simulation(
    store: &mut StrategyStore,
    book: &mut SimulationBook,
    settings: &SimulationSection,
) -> Result<SimulationResult> {
    let current = store.current_strategy();
    if !current.portfolio_config.is_valid() {
        bail!("cannot simulate: {}", requirement(Step::Simulation));
    }
    let saved_id = current.id.clone().filter(|id| store.find(id).is_some());
    let config = current.portfolio_config;

    let worker = spawn_worker(settings)?;
    let (ticket, run_id) = match &saved_id {
        Some(id) => (book.begin(id), id.clone()),
        None => (Ticket(0), StrategyId::new(UNSAVED_RUN_ID)),
    };
    store.set_loading(true);
    println!("Simulating working strategy...");
    let response = worker
        .submit(ticket, run_id, config)
        .and_then(|_| worker.recv_timeout(settings.delay() + RECV_GRACE));
    store.set_loading(false);
    worker.shutdown()?;

    let SimResponse::Completed { ticket, result, .. } = response?;
    if let Some(id) = saved_id {
        if book.complete(ticket, &id, result.clone()) {
            store.mark_simulated(&id);
        }
    }
    Ok(result)
}

fn spawn_worker(settings: &SimulationSection) -> Result<SimulationWorker> {
    let simulator = match settings.seed {
        Some(seed) => MockSimulator::new(seed),
        None => MockSimulator::default(),
    }
    .with_delay(settings.delay());
    SimulationWorker::spawn(Arc::new(simulator), settings.threads)
}

fn requirement(step: Step) -> &'static str {
    match step.rule_category() {
        Some(_) => "add at least one rule",
        None => "every portfolio value must be positive",
    }
}

fn print_status(store: &StrategyStore) {
    let current = store.current_strategy();
    let validation = store.validation();
    let id = current
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unsaved".to_string());
    println!("{} [{}] ({})", current.name, current.status, id);
    println!(
        "Step {} of {}: {}",
        store.current_step().index() + 1,
        Step::ALL.len(),
        store.current_step()
    );
    println!();
    for category in RuleCategory::ALL {
        let step = Step::from(category);
        let mark = if validation.is_valid(step) { "ok" } else { "--" };
        println!("{} rules [{mark}]", category.label());
        for rule in current.rules(category) {
            println!(
                "  {}  {} {} {}",
                rule.id,
                rule.field.label(),
                rule.operator,
                rule.value
            );
        }
    }
    let mark = if validation.is_simulation_valid { "ok" } else { "--" };
    println!("Portfolio [{mark}]");
    print_portfolio(current);
    if let Some(err) = store.error() {
        println!();
        println!("Error: {err}");
    }
}

fn print_portfolio(strategy: &Strategy) {
    let p = &strategy.portfolio_config;
    println!("  initial capital  {:.2}", p.initial_capital);
    println!("  risk per trade   {:.2}% ({:.2})", p.risk_per_trade, p.risk_amount());
    println!("  max positions    {}", p.max_positions);
}

fn print_list(strategies: &[Strategy], book: &SimulationBook) {
    if strategies.is_empty() {
        println!("No saved strategies");
        return;
    }
    println!(
        "{:<20} {:<24} {:<10} {:>5}  {}",
        "ID", "NAME", "STATUS", "RULES", "RESULT"
    );
    for s in strategies {
        let id = s.id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        let result = s
            .id
            .as_ref()
            .and_then(|id| book.result(id))
            .map(|r| {
                format!(
                    "{:+.1}% / sharpe {:.2} / {} trades",
                    r.total_return, r.sharpe_ratio, r.trades_executed
                )
            })
            .unwrap_or_default();
        println!(
            "{:<20} {:<24} {:<10} {:>5}  {}",
            id,
            s.name,
            s.status,
            s.rule_count(),
            result
        );
    }
}
