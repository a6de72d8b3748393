//! Background fetch worker.
//!
//! The UI thread never blocks on the network. Commands go in over one
//! channel; every completed request comes back over the other, tagged with
//! the ticket it was issued under so the store can discard stale results.

use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::ThreadPool;
use tracing::{debug, error, info};

use runscope_core::api::{BacktestApi, FetchError};
use runscope_core::domain::Run;
use runscope_core::store::{FetchKind, FetchPayload};
use runscope_core::FetchTicket;

/// Commands sent from the UI thread.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    LoadRuns,
    /// Fetch signals, trades, metrics and final value concurrently.
    FetchRun { ticket: FetchTicket },
    Shutdown,
}

/// Responses sent back to the UI thread.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Runs(Result<Vec<Run>, FetchError>),
    Fetched {
        ticket: FetchTicket,
        kind: FetchKind,
        result: Result<FetchPayload, FetchError>,
    },
}

const POOL_THREADS: usize = 4;

pub fn spawn_worker(
    api: Arc<dyn BacktestApi>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("runscope-worker".into())
        .spawn(move || worker_loop(api, rx, tx))
}

fn worker_loop(api: Arc<dyn BacktestApi>, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>) {
    // Private pool, not the global one.
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(POOL_THREADS)
        .thread_name(|i| format!("runscope-fetch-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            error!(error = %e, "fetch pool unavailable, fetching sequentially");
            None
        }
    };
    info!(source = api.name(), "worker started");

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::LoadRuns) => {
                let runs = api.runs();
                if let Err(e) = &runs {
                    error!(error = %e, "run list fetch failed");
                }
                let _ = tx.send(WorkerResponse::Runs(runs));
            }
            Ok(WorkerCommand::FetchRun { ticket }) => {
                fetch_run(pool.as_ref(), &api, &tx, ticket);
            }
        }
    }
    debug!("worker stopped");
}

fn fetch_run(
    pool: Option<&ThreadPool>,
    api: &Arc<dyn BacktestApi>,
    tx: &Sender<WorkerResponse>,
    ticket: FetchTicket,
) {
    debug!(%ticket, "fetching run");
    for kind in FetchKind::ALL {
        let api = Arc::clone(api);
        let tx = tx.clone();
        let ticket = ticket.clone();
        let job = move || {
            let result = api.fetch(kind, &ticket.run_id);
            if let Err(e) = &result {
                error!(%ticket, %kind, error = %e, "fetch failed");
            }
            // The UI may already have quit.
            let _ = tx.send(WorkerResponse::Fetched { ticket, kind, result });
        };
        match pool {
            Some(pool) => pool.spawn(job),
            None => job(),
        }
    }
}
