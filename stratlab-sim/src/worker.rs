//! Background simulation worker.
//!
//! One dispatcher thread receives commands over an `mpsc` channel and fans
//! runs out onto a private rayon::ThreadPool (not the global pool). Runs
//! finish in whatever order the pool schedules them; every response carries
//! the ticket it was issued with so the caller can reconcile.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use stratlab_core::{PortfolioConfig, StrategyId};

use crate::book::Ticket;
use crate::result::SimulationResult;
use crate::simulator::Simulator;

/// Commands sent to the worker.
#[derive(Debug)]
pub enum SimCommand {
    Run {
        ticket: Ticket,
        strategy_id: StrategyId,
        config: PortfolioConfig,
    },
    Shutdown,
}

/// Responses sent back from the worker.
#[derive(Debug, Clone)]
pub enum SimResponse {
    Completed {
        ticket: Ticket,
        strategy_id: StrategyId,
        result: SimulationResult,
    },
}

pub struct SimulationWorker {
    commands: Sender<SimCommand>,
    responses: Receiver<SimResponse>,
    handle: Option<JoinHandle<()>>,
}

impl SimulationWorker {
    /// Spawn the dispatcher thread and its pool of `threads` workers
    /// (at least one).
    pub fn spawn(simulator: Arc<dyn Simulator>, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("stratlab-sim-{i}"))
            .build()
            .context("failed to build simulation thread pool")?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("stratlab-worker".into())
            .spawn(move || dispatch_loop(cmd_rx, resp_tx, pool, simulator))
            .context("failed to spawn simulation worker thread")?;

        tracing::debug!(threads = threads.max(1), "simulation worker started");
        Ok(Self {
            commands: cmd_tx,
            responses: resp_rx,
            handle: Some(handle),
        })
    }

    /// Queue a run. Fails only if the worker has already stopped.
    pub fn submit(
        &self,
        ticket: Ticket,
        strategy_id: StrategyId,
        config: PortfolioConfig,
    ) -> Result<()> {
        self.commands
            .send(SimCommand::Run {
                ticket,
                strategy_id,
                config,
            })
            .map_err(|_| anyhow!("simulation worker has stopped"))
    }

    /// Next response if one is ready.
    pub fn try_recv(&self) -> Option<SimResponse> {
        self.responses.try_recv().ok()
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SimResponse> {
        self.responses.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                anyhow!("timed out waiting for simulation after {timeout:?}")
            }
            RecvTimeoutError::Disconnected => anyhow!("simulation worker has stopped"),
        })
    }

    /// Stop accepting work and join the dispatcher. Runs already on the pool
    /// still finish.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let _ = self.commands.send(SimCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("simulation worker thread panicked"))?;
            tracing::debug!("simulation worker stopped");
        }
        Ok(())
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "simulation worker did not stop cleanly");
        }
    }
}

fn dispatch_loop(
    rx: Receiver<SimCommand>,
    tx: Sender<SimResponse>,
    pool: rayon::ThreadPool,
    simulator: Arc<dyn Simulator>,
) {
    loop {
        match rx.recv() {
            Ok(SimCommand::Shutdown) | Err(_) => break,
            Ok(SimCommand::Run {
                ticket,
                strategy_id,
                config,
            }) => {
                let tx = tx.clone();
                let simulator = Arc::clone(&simulator);
                pool.spawn(move || {
                    let result = simulator.simulate(&strategy_id, &config, ticket.0);
                    tracing::info!(%strategy_id, %ticket, "simulation complete");
                    // The receiver may already be gone; nothing to report to.
                    let _ = tx.send(SimResponse::Completed {
                        ticket,
                        strategy_id,
                        result,
                    });
                });
            }
        }
    }
}
