//! Bounded fan-out of detail fetches.
//!
//! `worker_limit` tasks pull stubs off a shared backlog in submission order and push their
//! results through one channel, so results arrive in completion order. Each unit runs in its
//! own task: a panicking fetch becomes a `future_exception` failure instead of taking its
//! worker (and the stubs still queued behind it) down.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::error;

use crate::fetch::{fetch_one, DetailSource};
use crate::info_time;
use crate::model::{DeputyStub, ErrorKind, FetchResult};
use crate::progress::{ProgressCounters, ProgressTracker};

type Backlog = Arc<Mutex<VecDeque<DeputyStub>>>;

/// Everything a finished fan-out hands back.
#[derive(Debug)]
pub struct Dispatched {
    /// One result per input stub, in completion order.
    pub results: Vec<FetchResult>,
    pub progress: ProgressCounters,
    pub elapsed: Duration,
}

/// Fetches the details of every stub with at most `worker_limit` fetches in flight.
/// Returns once every stub has a result. A limit of 0 is treated as 1.
pub async fn dispatch_all<S>(source: Arc<S>, stubs: Vec<DeputyStub>, worker_limit: usize) -> Dispatched
where
    S: DetailSource + 'static,
{
    let start_time = Local::now();
    let total = stubs.len();
    let worker_count = worker_limit.clamp(1, total.max(1));
    info_time!(
        "Starting parallel processing with {} workers for {} deputies",
        worker_count,
        total
    );

    let progress = Arc::new(ProgressTracker::new(total));
    let backlog: Backlog = Arc::new(Mutex::new(stubs.into_iter().collect()));
    let (result_tx, mut result_rx) = mpsc::channel(worker_count * 2);

    let mut workers = JoinSet::new();
    for n in 0..worker_count {
        workers.spawn(run_worker(
            format!("detail-worker-{n}"),
            source.clone(),
            backlog.clone(),
            progress.clone(),
            result_tx.clone(),
        ));
    }
    // The channel closes once the last worker drops its sender.
    drop(result_tx);

    let mut results = Vec::with_capacity(total);
    while let Some(result) = result_rx.recv().await {
        results.push(result);
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!("detail worker died: {e}");
        }
    }

    // Only reachable if a worker itself died; its queued stubs still need a result.
    while let Some(stub) = next_stub(&backlog) {
        progress.record(false);
        results.push(FetchResult::failure(
            stub,
            ErrorKind::FutureException,
            "Future exception: worker stopped before processing",
        ));
    }

    let elapsed = (Local::now() - start_time).to_std().unwrap_or_default();
    let progress = progress.snapshot();
    info_time!(
        start_time,
        "Parallel processing finished. Total: {}, Successes: {}, Errors: {}",
        results.len(),
        progress.succeeded,
        progress.failed()
    );

    Dispatched {
        results,
        progress,
        elapsed,
    }
}

async fn run_worker<S>(
    tag: String,
    source: Arc<S>,
    backlog: Backlog,
    progress: Arc<ProgressTracker>,
    result_tx: mpsc::Sender<FetchResult>,
) where
    S: DetailSource + 'static,
{
    while let Some(stub) = next_stub(&backlog) {
        let unit = tokio::spawn({
            let source = source.clone();
            let progress = progress.clone();
            let stub = stub.clone();
            let tag = tag.clone();
            async move { fetch_one(source.as_ref(), stub, &progress, &tag).await }
        });

        let result = match unit.await {
            Ok(result) => result,
            Err(e) => {
                error!(worker = %tag, id = %stub.id, "{} raised: {e}", stub.label());
                progress.record(false);
                FetchResult::failure(
                    stub,
                    ErrorKind::FutureException,
                    format!("Future exception: {e}"),
                )
            }
        };

        if result_tx.send(result).await.is_err() {
            break;
        }
    }
}

fn next_stub(backlog: &Backlog) -> Option<DeputyStub> {
    backlog
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}
