//! Bounded worker pool for trusted bulk execution.
//!
//! Dispatcher + worker inbox design:
//! - single-consumer upstream `mpsc::Receiver` (dispatcher)
//! - per-worker `mpsc` inbox channels
//! - each job runs on tokio's blocking pool, capped at the worker count
//! - a wave closes the upstream sender and awaits every worker before returning

use crate::types::{ExecutionOutcome, Operation, SyncError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Per-worker inbox depth
const INBOX_CAPACITY: usize = 4;

/// Handler run for each job on a blocking worker thread
pub type JobHandler = dyn Fn(&Operation) -> ExecutionOutcome + Send + Sync;

/// Worker pool started on the transition into bulk mode
pub struct WorkerPool {
    runtime: Runtime,
    workers: usize,
}

impl WorkerPool {
    /// Start a pool with `worker_count` workers (at least one).
    pub fn start(worker_count: usize) -> Result<Self, SyncError> {
        let workers = worker_count.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .thread_name("mirrorsync-worker")
            .enable_all()
            .build()
            .map_err(|e| SyncError::WorkerPool(format!("cannot start runtime: {e}")))?;

        debug!(workers, "worker pool started");
        Ok(Self { runtime, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job and return once all of them have finished
    ///
    /// Exactly one outcome is returned per job, in completion order. A job
    /// whose task dies is reported as a failed outcome, never dropped.
    pub fn run_wave(
        &self,
        jobs: Vec<Operation>,
        handler: Arc<JobHandler>,
    ) -> Vec<ExecutionOutcome> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(jobs.len())));
        let workers = self.workers.min(jobs.len());

        self.runtime.block_on(async {
            let (enqueue_tx, enqueue_rx) = mpsc::channel::<Operation>(workers * INBOX_CAPACITY);

            let mut worker_txs = Vec::with_capacity(workers);
            let mut worker_handles = Vec::with_capacity(workers);
            for worker_id in 0..workers {
                let (worker_tx, worker_rx) = mpsc::channel::<Operation>(INBOX_CAPACITY);
                worker_txs.push(worker_tx);
                worker_handles.push(tokio::spawn(worker_loop(
                    worker_id,
                    worker_rx,
                    Arc::clone(&handler),
                    Arc::clone(&outcomes),
                )));
            }
            let dispatcher = tokio::spawn(dispatcher_loop(
                enqueue_rx,
                worker_txs,
                Arc::clone(&outcomes),
            ));

            for job in jobs {
                if let Err(rejected) = enqueue_tx.send(job).await {
                    record(
                        &outcomes,
                        ExecutionOutcome::failed(
                            rejected.0,
                            SyncError::WorkerPool("dispatcher stopped accepting jobs".to_string()),
                        ),
                    );
                }
            }
            // Closing the queue lets the dispatcher drain and close worker inboxes.
            drop(enqueue_tx);

            if let Err(e) = dispatcher.await {
                debug!(error = %e, "dispatcher task failed");
            }
            for handle in worker_handles {
                if let Err(e) = handle.await {
                    debug!(error = %e, "worker task failed");
                }
            }
        });

        let mut guard = outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

/// Hand jobs to the first worker with room, starting after the last one used
async fn dispatcher_loop(
    mut enqueue_rx: mpsc::Receiver<Operation>,
    worker_txs: Vec<mpsc::Sender<Operation>>,
    outcomes: Arc<Mutex<Vec<ExecutionOutcome>>>,
) {
    let worker_len = worker_txs.len();
    let mut next_worker = 0usize;

    'jobs: while let Some(mut job) = enqueue_rx.recv().await {
        for offset in 0..worker_len {
            let target = (next_worker + offset) % worker_len;
            match worker_txs[target].try_send(job) {
                Ok(()) => {
                    next_worker = (target + 1) % worker_len;
                    continue 'jobs;
                }
                Err(TrySendError::Full(returned)) | Err(TrySendError::Closed(returned)) => {
                    job = returned;
                }
            }
        }

        // Every inbox is full: wait on the next worker in turn
        let target = next_worker % worker_len;
        if let Err(rejected) = worker_txs[target].send(job).await {
            record(
                &outcomes,
                ExecutionOutcome::failed(
                    rejected.0,
                    SyncError::WorkerPool(format!("worker {target} stopped")),
                ),
            );
        }
        next_worker = (target + 1) % worker_len;
    }
    // worker_txs are dropped here, which closes worker inboxes.
}

async fn worker_loop(
    worker_id: usize,
    mut worker_rx: mpsc::Receiver<Operation>,
    handler: Arc<JobHandler>,
    outcomes: Arc<Mutex<Vec<ExecutionOutcome>>>,
) {
    let mut completed = 0usize;
    while let Some(job) = worker_rx.recv().await {
        let handler = Arc::clone(&handler);
        let operation = job.clone();
        let outcome = match tokio::task::spawn_blocking(move || handler(&job)).await {
            Ok(outcome) => outcome,
            Err(e) => ExecutionOutcome::failed(
                operation,
                SyncError::WorkerPool(format!("worker task failed: {e}")),
            ),
        };
        record(&outcomes, outcome);
        completed += 1;
    }
    debug!(worker = worker_id, completed, "worker drained");
}

fn record(outcomes: &Mutex<Vec<ExecutionOutcome>>, outcome: ExecutionOutcome) {
    outcomes
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn jobs(count: usize) -> Vec<Operation> {
        (0..count).map(|i| Operation::copy(format!("f{i}"))).collect()
    }

    #[test]
    fn test_wave_returns_one_outcome_per_job() {
        let pool = WorkerPool::start(4).expect("start pool");
        let handler: Arc<JobHandler> =
            Arc::new(|op: &Operation| ExecutionOutcome::succeeded(op.clone()));

        let outcomes = pool.run_wave(jobs(64), handler);

        assert_eq!(outcomes.len(), 64);
        let paths: HashSet<&str> = outcomes.iter().map(ExecutionOutcome::path).collect();
        assert_eq!(paths.len(), 64);
        assert!(outcomes.iter().all(ExecutionOutcome::is_success));
    }

    #[test]
    fn test_wave_runs_jobs_concurrently_within_bound() {
        let pool = WorkerPool::start(3).expect("start pool");
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handler: Arc<JobHandler> = {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            Arc::new(move |op: &Operation| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
                ExecutionOutcome::succeeded(op.clone())
            })
        };

        let outcomes = pool.run_wave(jobs(12), handler);

        assert_eq!(outcomes.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) > 1, "expected parallel execution");
    }

    #[test]
    fn test_panicking_job_becomes_failed_outcome() {
        let pool = WorkerPool::start(2).expect("start pool");
        let handler: Arc<JobHandler> = Arc::new(|op: &Operation| {
            if op.path() == "f1" {
                panic!("job exploded");
            }
            ExecutionOutcome::succeeded(op.clone())
        });

        let outcomes = pool.run_wave(jobs(3), handler);

        assert_eq!(outcomes.len(), 3);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.is_failure()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path(), "f1");
        assert!(matches!(failed[0].error(), Some(SyncError::WorkerPool(_))));
    }

    #[test]
    fn test_empty_wave_and_minimum_one_worker() {
        let pool = WorkerPool::start(0).expect("start pool");
        assert_eq!(pool.workers(), 1);
        let handler: Arc<JobHandler> =
            Arc::new(|op: &Operation| ExecutionOutcome::succeeded(op.clone()));
        assert!(pool.run_wave(Vec::new(), Arc::clone(&handler)).is_empty());
        assert_eq!(pool.run_wave(jobs(2), handler).len(), 2);
    }
}
