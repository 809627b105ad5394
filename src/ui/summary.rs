//! End-of-run summary with grouped, plain-English failures

use crate::types::{ExecutionOutcome, ExecutionSummary, OpKind, ScanError, SyncError};
use std::collections::BTreeMap;
use std::io::ErrorKind;

/// Failures shown per group before collapsing the rest
const GROUP_PREVIEW: usize = 3;

#[derive(Debug)]
struct ErrorRecord<'a> {
    kind: &'static str,
    path: &'a str,
    message: String,
    suggestion: Option<&'static str>,
}

impl<'a> ErrorRecord<'a> {
    fn new(outcome: &'a ExecutionOutcome, error: &SyncError) -> Self {
        let (message, suggestion) = humanize_error(error);
        Self {
            kind: error_kind_label(error),
            path: outcome.path(),
            message,
            suggestion,
        }
    }
}

/// Render per-kind counts followed by grouped failures
///
/// `scan_errors` are the entries neither scan could read; they were left out of
/// the plan and are listed after the operation failures.
pub fn format_summary(summary: &ExecutionSummary, scan_errors: &[ScanError]) -> String {
    let mut lines = vec!["Summary:".to_string()];
    for kind in OpKind::ORDER {
        let counts = summary.counts(kind);
        lines.push(format!(
            "  {:<8} {} succeeded, {} failed, {} skipped",
            format!("{}:", kind.label()),
            counts.succeeded,
            counts.failed,
            counts.skipped
        ));
    }

    if let Some(reason) = &summary.interrupted {
        lines.push(format!(
            "Stopped prompting: {reason}. Remaining operations were skipped."
        ));
    }

    let structural: Vec<&ExecutionOutcome> = summary.structural_failures().collect();
    if !structural.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Structural inconsistencies ({}): the destination changed after planning.",
            structural.len()
        ));
        for outcome in &structural {
            if let Some(SyncError::StructuralInconsistency { path, detail }) = outcome.error() {
                lines.push(format!("  ! {path}: {detail}"));
            }
        }
        lines.push("  Re-run to compute a fresh plan.".to_string());
    }

    let records: Vec<ErrorRecord> = summary
        .failures()
        .filter_map(|outcome| {
            outcome
                .error()
                .filter(|error| !error.is_structural())
                .map(|error| ErrorRecord::new(outcome, error))
        })
        .collect();
    if !records.is_empty() {
        lines.push(String::new());
        lines.push(format_error_summary(&records));
    }

    if let Some(section) = format_scan_errors(scan_errors) {
        lines.push(String::new());
        lines.push(section);
    }

    lines.join("\n")
}

/// Entries skipped while scanning, or `None` when both scans were clean
pub fn format_scan_errors(errors: &[ScanError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    let mut lines = vec![format!(
        "Unreadable during scan ({}), not compared or synced:",
        errors.len()
    )];
    for error in errors.iter().take(GROUP_PREVIEW) {
        lines.push(format!("    - {error}"));
    }
    if errors.len() > GROUP_PREVIEW {
        lines.push(format!("    - ... {} more", errors.len() - GROUP_PREVIEW));
    }
    Some(lines.join("\n"))
}

fn humanize_error(error: &SyncError) -> (String, Option<&'static str>) {
    let io = match error {
        SyncError::Io(io) | SyncError::Apply { source: io, .. } => io,
        SyncError::WorkerPool(msg) => {
            return (
                format!("A worker stopped unexpectedly: {msg}"),
                Some("Retry the sync; the affected operation was not applied."),
            )
        }
        other => return (other.to_string(), None),
    };

    match io.kind() {
        ErrorKind::NotFound => (
            "File or directory was not found".to_string(),
            Some("Verify the path still exists and retry."),
        ),
        ErrorKind::PermissionDenied => (
            "Permission denied while accessing file".to_string(),
            Some("Check file permissions or run with a user that has access."),
        ),
        ErrorKind::AlreadyExists => (
            "The destination path already exists as a file or directory".to_string(),
            Some("Remove or rename the conflicting path, then retry."),
        ),
        ErrorKind::WriteZero | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => (
            "File transfer was interrupted before completion".to_string(),
            Some("Retry the sync and check disk stability."),
        ),
        _ => (
            format!("I/O operation failed: {io}"),
            Some("Retry the sync. If this keeps happening, check disk health and permissions."),
        ),
    }
}

fn error_kind_label(error: &SyncError) -> &'static str {
    if let Some(io) = error.io_error() {
        return match io.kind() {
            ErrorKind::PermissionDenied => "Permission denied",
            ErrorKind::NotFound => "Not found",
            _ => "I/O error",
        };
    }
    match error {
        SyncError::WorkerPool(_) => "Worker pool",
        SyncError::Prompt(_) => "Confirmation",
        SyncError::StructuralInconsistency { .. } => "Structural inconsistency",
        _ => "Other",
    }
}

fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = vec!["Error summary:".to_string()];
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(GROUP_PREVIEW) {
            lines.push(format!("    - {}", record.message));
            lines.push(format!("      Path: {}", record.path));
            if let Some(suggestion) = record.suggestion {
                lines.push(format!("      Try: {suggestion}"));
            }
        }
        if items.len() > GROUP_PREVIEW {
            lines.push(format!("    - ... {} more", items.len() - GROUP_PREVIEW));
        }
    }
    lines.join("\n")
}
