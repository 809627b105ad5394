//! Execution outcomes and the end-of-run summary

use super::{OpKind, Operation, SyncError};

/// Result of one planned operation
#[derive(Debug)]
pub enum OutcomeStatus {
    Succeeded,
    /// Operator answered `no`, or prompting stopped before this operation
    Skipped,
    Failed(SyncError),
}

/// Per-operation record accumulated for the final summary
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub operation: Operation,
    pub status: OutcomeStatus,
}

impl ExecutionOutcome {
    pub fn succeeded(operation: Operation) -> Self {
        Self {
            operation,
            status: OutcomeStatus::Succeeded,
        }
    }

    pub fn skipped(operation: Operation) -> Self {
        Self {
            operation,
            status: OutcomeStatus::Skipped,
        }
    }

    pub fn failed(operation: Operation, error: SyncError) -> Self {
        Self {
            operation,
            status: OutcomeStatus::Failed(error),
        }
    }

    pub fn kind(&self) -> OpKind {
        self.operation.kind()
    }

    pub fn path(&self) -> &str {
        self.operation.path()
    }

    pub fn error(&self) -> Option<&SyncError> {
        match &self.status {
            OutcomeStatus::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}

/// Succeeded / failed / skipped tally for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Everything the engine did in one run
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    pub outcomes: Vec<ExecutionOutcome>,

    /// Set when the confirmation source failed and the run stopped prompting
    pub interrupted: Option<String>,
}

impl ExecutionSummary {
    pub fn counts(&self, kind: OpKind) -> KindCounts {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.kind() == kind)
            .fold(KindCounts::default(), |mut counts, outcome| {
                match outcome.status {
                    OutcomeStatus::Succeeded => counts.succeeded += 1,
                    OutcomeStatus::Skipped => counts.skipped += 1,
                    OutcomeStatus::Failed(_) => counts.failed += 1,
                }
                counts
            })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failure())
    }

    /// Failures that point at the destination changing underneath the plan
    pub fn structural_failures(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.failures()
            .filter(|outcome| outcome.error().is_some_and(SyncError::is_structural))
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}
