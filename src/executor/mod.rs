//! Executor module: applies a plan kind by kind

mod apply;
mod confirm;
mod copy;
mod pool;

pub use apply::{apply, apply_operation};
pub use confirm::{
    ConfirmationSource, Decision, KindMachine, KindState, LinePrompt, Step, TrustAll,
};
pub use copy::{copy_file_atomic, copy_symlink};
pub use pool::{JobHandler, WorkerPool};

use crate::diff::SyncPlan;
use crate::types::{
    parent_dirs, path_depth, ExecutionOutcome, ExecutionSummary, OpKind, Operation, SyncError,
};
use crate::ui::Reporter;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applier signature shared by serial and bulk execution
type Applier = dyn Fn(&Path, &Path, &Operation) -> ExecutionOutcome + Send + Sync;

/// Applies a plan kind by kind (copy → replace → delete)
///
/// Each kind starts in the Prompting state; a `trust` answer moves the rest
/// of that kind onto a worker pool, which is joined before the next kind.
/// Must not be called from inside a tokio runtime.
pub struct ExecutionEngine {
    workers: usize,
    applier: Arc<Applier>,
}

impl ExecutionEngine {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            applier: Arc::new(apply_operation),
        }
    }

    #[cfg(test)]
    fn with_applier(workers: usize, applier: Arc<Applier>) -> Self {
        Self {
            workers: workers.max(1),
            applier,
        }
    }

    /// Execute every operation in `plan`
    ///
    /// Every operation ends up in the summary exactly once: succeeded, failed
    /// or skipped. If `confirm` fails, prompting stops for the rest of the
    /// run and all remaining operations are skipped.
    pub fn execute(
        &self,
        plan: &SyncPlan,
        confirm: &mut dyn ConfirmationSource,
        reporter: Arc<dyn Reporter>,
    ) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        let mut kept = KeptPaths::default();

        for kind in OpKind::ORDER {
            let operations = plan.operations(kind);
            if operations.is_empty() {
                continue;
            }
            if summary.interrupted.is_some() {
                skip_all(&mut summary, operations);
                continue;
            }

            let mut machine = KindMachine::new(kind);
            let mut next = 0;
            while next < operations.len() {
                let operation = &operations[next];
                if kept.holds(operation) {
                    let outcome = hold_back(reporter.as_ref(), operation);
                    kept.record(&outcome);
                    summary.outcomes.push(outcome);
                    next += 1;
                    continue;
                }
                let decision = match confirm.prompt(operation) {
                    Ok(decision) => decision,
                    Err(e) => {
                        warn!(error = %e, "confirmation failed, skipping remaining operations");
                        reporter.report(&format!("Stopped: {e}"));
                        summary.interrupted = Some(e.to_string());
                        break;
                    }
                };

                match machine.advance(decision) {
                    Step::Apply => {
                        let outcome = (self.applier)(
                            plan.source_root.as_path(),
                            plan.destination_root.as_path(),
                            operation,
                        );
                        report_failure(reporter.as_ref(), &outcome);
                        kept.record(&outcome);
                        summary.outcomes.push(outcome);
                    }
                    Step::Skip => {
                        let outcome = ExecutionOutcome::skipped(operation.clone());
                        kept.record(&outcome);
                        summary.outcomes.push(outcome);
                    }
                    Step::Bulk => break,
                }
                next += 1;
            }

            let remaining = &operations[next..];
            if machine.is_bulk() {
                let outcomes =
                    self.run_bulk(plan, kind, remaining, &mut kept, Arc::clone(&reporter));
                summary.outcomes.extend(outcomes);
            } else {
                // Only reached early when prompting was interrupted
                skip_all(&mut summary, remaining);
            }
        }

        summary
    }

    /// Run the trusted remainder of one kind on a freshly started pool
    fn run_bulk(
        &self,
        plan: &SyncPlan,
        kind: OpKind,
        operations: &[Operation],
        kept: &mut KeptPaths,
        reporter: Arc<dyn Reporter>,
    ) -> Vec<ExecutionOutcome> {
        let total = operations.len();
        reporter.report(&format!(
            "Trusting {total} remaining {} operation(s), running on up to {} workers",
            kind.label(),
            self.workers
        ));

        let pool = match WorkerPool::start(self.workers) {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "worker pool unavailable");
                return operations
                    .iter()
                    .map(|op| {
                        ExecutionOutcome::failed(op.clone(), SyncError::WorkerPool(e.to_string()))
                    })
                    .collect();
            }
        };

        reporter.progress(kind, 0, total);
        let completed = Arc::new(AtomicUsize::new(0));
        let handler: Arc<JobHandler> = {
            let applier = Arc::clone(&self.applier);
            let source_root = plan.source_root.clone();
            let destination_root = plan.destination_root.clone();
            let completed = Arc::clone(&completed);
            let reporter = Arc::clone(&reporter);
            Arc::new(move |operation: &Operation| {
                let outcome = applier(source_root.as_path(), destination_root.as_path(), operation);
                report_failure(reporter.as_ref(), &outcome);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                reporter.progress(kind, done, total);
                outcome
            })
        };

        let mut outcomes = Vec::with_capacity(total);
        for wave in waves(operations) {
            let (held, runnable): (Vec<Operation>, Vec<Operation>) =
                wave.into_iter().partition(|operation| kept.holds(operation));
            for operation in &held {
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                reporter.progress(kind, done, total);
                let outcome = hold_back(reporter.as_ref(), operation);
                kept.record(&outcome);
                outcomes.push(outcome);
            }

            let finished = pool.run_wave(runnable, Arc::clone(&handler));
            for outcome in &finished {
                kept.record(outcome);
            }
            outcomes.extend(finished);
        }
        drop(pool);

        info!(kind = %kind, total, "bulk execution joined");
        outcomes
    }
}

/// Split a kind's operations into barrier-separated waves
///
/// Directory deletes go one depth level per wave, deepest first, after every
/// file delete, so a parent is never removed while a child removal is in flight.
fn waves(operations: &[Operation]) -> Vec<Vec<Operation>> {
    let mut waves: Vec<Vec<Operation>> = Vec::new();
    let mut current_depth: Option<usize> = None;

    for operation in operations {
        let depth = operation
            .is_dir_delete()
            .then(|| path_depth(operation.path()));
        match waves.last_mut() {
            Some(wave) if depth == current_depth => wave.push(operation.clone()),
            _ => {
                waves.push(vec![operation.clone()]);
                current_depth = depth;
            }
        }
    }
    waves
}

/// Ancestors of delete targets that are still on disk
///
/// A file or directory delete that was skipped or failed leaves its entry in
/// place, so removing any enclosing directory would fail as non-empty.
#[derive(Debug, Default)]
struct KeptPaths(HashSet<String>);

impl KeptPaths {
    fn record(&mut self, outcome: &ExecutionOutcome) {
        if outcome.kind() == OpKind::Delete && !outcome.is_success() {
            self.0
                .extend(parent_dirs(outcome.path()).map(str::to_string));
        }
    }

    fn holds(&self, operation: &Operation) -> bool {
        operation.is_dir_delete() && self.0.contains(operation.path())
    }
}

/// Skip a directory delete whose contents were deliberately left behind
fn hold_back(reporter: &dyn Reporter, operation: &Operation) -> ExecutionOutcome {
    debug!(path = operation.path(), "directory kept, entries inside were not deleted");
    reporter.report(&format!("Skipped {operation}: entries inside were kept"));
    ExecutionOutcome::skipped(operation.clone())
}

fn skip_all(summary: &mut ExecutionSummary, operations: &[Operation]) {
    summary
        .outcomes
        .extend(operations.iter().cloned().map(ExecutionOutcome::skipped));
}

fn report_failure(reporter: &dyn Reporter, outcome: &ExecutionOutcome) {
    if let Some(error) = outcome.error() {
        warn!(operation = %outcome.operation, error = %error, "operation failed");
        let prefix = if error.is_structural() {
            "INCONSISTENT"
        } else {
            "FAILED"
        };
        reporter.report(&format!("{prefix} {}: {error}", outcome.operation));
    }
}
