//! Main sync command

use crate::diff::{compare_states, SyncPlan};
use crate::executor::{ConfirmationSource, ExecutionEngine};
use crate::scanner::{scan_root, ProgressCallback};
use crate::types::{DirectoryState, ExecutionSummary, ScanError, SyncError};
use crate::ui::{format_scan_errors, format_summary, render_plan, ProgressReporter, Reporter};
use crate::Config;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// What a run produced
#[derive(Debug)]
pub struct RunReport {
    pub plan: SyncPlan,
    /// `None` for dry runs and plans with nothing to do
    pub summary: Option<ExecutionSummary>,
    /// Entries in either root that could not be read and were left out
    pub scan_errors: Vec<ScanError>,
}

impl RunReport {
    /// Check if any operation failed or prompting was cut short
    pub fn is_incomplete(&self) -> bool {
        self.summary
            .as_ref()
            .is_some_and(|summary| summary.has_failures() || summary.interrupted.is_some())
    }
}

/// Run the sync operation
///
/// Scans both roots, prints the full plan, then (unless `dry_run`) executes
/// it with confirmation answers taken from `confirm`.
pub fn run(
    config: &Config,
    confirm: &mut dyn ConfirmationSource,
    reporter: Arc<ProgressReporter>,
) -> Result<RunReport, SyncError> {
    config.validate()?;

    let src_state = scan_with_progress(&config.source, "source", config, &reporter)?;
    let dest_state = scan_with_progress(&config.destination, "destination", config, &reporter)?;

    let plan = compare_states(&src_state, &dest_state)?;
    let scan_errors: Vec<ScanError> = src_state
        .errors()
        .iter()
        .chain(dest_state.errors())
        .cloned()
        .collect();
    drop(src_state);
    drop(dest_state);

    reporter.report(&render_plan(&plan));

    if config.dry_run || plan.is_empty() {
        if let Some(section) = format_scan_errors(&scan_errors) {
            reporter.report(&section);
        }
        if config.dry_run {
            reporter.report("Dry-run mode: no changes were made.");
        }
        return Ok(RunReport {
            plan,
            summary: None,
            scan_errors,
        });
    }

    let engine = ExecutionEngine::new(config.workers);
    let sink: Arc<dyn Reporter> = reporter.clone();
    let summary = engine.execute(&plan, confirm, sink);
    reporter.report(&format_summary(&summary, &scan_errors));

    info!(
        operations = plan.len(),
        failed = summary.failed_count(),
        interrupted = summary.interrupted.is_some(),
        scan_errors = scan_errors.len(),
        "sync finished"
    );
    Ok(RunReport {
        plan,
        summary: Some(summary),
        scan_errors,
    })
}

fn scan_with_progress(
    root: &Path,
    label: &'static str,
    config: &Config,
    reporter: &Arc<ProgressReporter>,
) -> Result<DirectoryState, SyncError> {
    reporter.start_scan(label);
    let on_progress: ProgressCallback = {
        let reporter = Arc::clone(reporter);
        Box::new(move |files: u64, bytes: u64| reporter.update_scan(label, files, bytes))
    };

    let state = scan_root(root, config, Some(&on_progress))?;
    reporter.finish_scan(label, state.len(), state.errors().len());
    info!(
        root = %root.display(),
        files = state.len(),
        dirs = state.dirs().count(),
        errors = state.errors().len(),
        mode = %state.mode,
        "scanned {label}"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TrustAll;
    use crate::types::OpKind;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(src: &TempDir, dst: &TempDir) -> Config {
        Config {
            source: src.path().to_path_buf(),
            destination: dst.path().to_path_buf(),
            workers: 2,
            ..Config::default()
        }
    }

    #[test]
    fn test_dry_run_leaves_destination_untouched() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        fs::write(src.path().join("new.txt"), b"new").expect("write src");
        fs::write(dst.path().join("old.txt"), b"old").expect("write dst");

        let config = Config {
            dry_run: true,
            ..config_for(&src, &dst)
        };
        let report = run(&config, &mut TrustAll, Arc::new(ProgressReporter::hidden()))
            .expect("run succeeds");

        assert!(report.summary.is_none());
        assert_eq!(report.plan.count(OpKind::Copy), 1);
        assert_eq!(report.plan.count(OpKind::Delete), 1);
        assert!(!dst.path().join("new.txt").exists());
        assert!(dst.path().join("old.txt").exists());
    }

    #[test]
    fn test_trusted_run_mirrors_source() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        fs::create_dir(src.path().join("sub")).expect("create sub");
        fs::write(src.path().join("sub/b.txt"), b"bbbb").expect("write src");
        fs::write(dst.path().join("stale.txt"), b"stale").expect("write dst");

        let report = run(&config_for(&src, &dst), &mut TrustAll, Arc::new(ProgressReporter::hidden()))
            .expect("run succeeds");

        assert!(!report.is_incomplete());
        assert_eq!(fs::read(dst.path().join("sub/b.txt")).expect("read"), b"bbbb");
        assert!(!dst.path().join("stale.txt").exists());
    }

    #[test]
    fn test_missing_destination_is_fatal() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        let config = Config {
            destination: dst.path().join("missing"),
            ..config_for(&src, &dst)
        };

        let result = run(&config, &mut TrustAll, Arc::new(ProgressReporter::hidden()));
        assert!(matches!(result, Err(SyncError::RootUnavailable { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_unreadable_source_file_is_carried_in_report() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        fs::write(src.path().join("ok.txt"), b"ok").expect("write src");
        let locked = src.path().join("locked.txt");
        fs::write(&locked, b"locked").expect("write locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod 000");
        if fs::File::open(&locked).is_ok() {
            return;
        }

        let config = Config {
            compare_mode: crate::types::CompareMode::Checksum,
            ..config_for(&src, &dst)
        };
        let report = run(&config, &mut TrustAll, Arc::new(ProgressReporter::hidden()))
            .expect("run succeeds");

        assert_eq!(report.scan_errors.len(), 1);
        assert_eq!(report.scan_errors[0].path.as_deref(), Some("locked.txt"));
        assert_eq!(report.plan.count(OpKind::Copy), 1);
        assert!(dst.path().join("ok.txt").exists());
        assert!(!dst.path().join("locked.txt").exists());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).expect("restore mode");
    }

    #[test]
    fn test_in_sync_roots_skip_execution() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        fs::write(src.path().join("same.txt"), b"same").expect("write src");
        fs::write(dst.path().join("same.txt"), b"same").expect("write dst");

        let report = run(&config_for(&src, &dst), &mut TrustAll, Arc::new(ProgressReporter::hidden()))
            .expect("run succeeds");
        assert!(report.plan.is_empty());
        assert!(report.summary.is_none());
    }
}
