//! Multi-threaded scan on top of the ignore walker
//!
//! Checksum computation happens inside the walker callbacks, so hashing is
//! spread over the configured worker count.

use crate::config::Config;
use crate::scanner::walker::{compile_overrides, open_root, visit, ProgressCallback, Visit};
use crate::types::{ComparisonKey, DirectoryState, ScanError, SyncError};
use ignore::WalkState;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

#[derive(Default)]
struct CollectedScan {
    files: Vec<(String, ComparisonKey)>,
    dirs: Vec<String>,
    errors: Vec<ScanError>,
    scanned_files: u64,
    scanned_bytes: u64,
}

/// Scan a directory in parallel and build a `DirectoryState`.
///
/// Produces the same state as [`scan_directory`](crate::scanner::scan_directory).
/// The progress callback is invoked under the collection lock, so calls never overlap.
pub fn scan_directory_parallel(
    root_path: &Path,
    config: &Config,
    on_progress: Option<&ProgressCallback>,
) -> Result<DirectoryState, SyncError> {
    let start_time = Instant::now();
    open_root(root_path)?;

    let mode = config.compare_mode;
    let overrides = compile_overrides(root_path, &config.exclude_patterns)?;
    let collected = Arc::new(Mutex::new(CollectedScan::default()));

    let walker = ignore::WalkBuilder::new(root_path)
        .threads(config.workers.max(1))
        .standard_filters(false)
        .follow_links(false)
        .overrides(overrides)
        .build_parallel();

    walker.run(|| {
        let collected = Arc::clone(&collected);
        let root = root_path.to_path_buf();

        Box::new(move |result| {
            let contribution = visit(&root, result, mode);

            let Ok(mut scan) = collected.lock() else {
                return WalkState::Quit;
            };
            match contribution {
                Visit::Dir(path) => scan.dirs.push(path),
                Visit::File { path, key, bytes } => {
                    scan.files.push((path, key));
                    scan.scanned_files += 1;
                    scan.scanned_bytes += bytes;
                    if let Some(callback) = on_progress {
                        callback(scan.scanned_files, scan.scanned_bytes);
                    }
                }
                Visit::Skip => {}
                Visit::Failed(error) => scan.errors.push(error),
            }
            WalkState::Continue
        })
    });

    let mut scan = collected
        .lock()
        .map_err(|_| SyncError::WorkerPool("Parallel scanner state lock poisoned".to_string()))?;

    let mut state = DirectoryState::new(root_path.to_path_buf(), mode);
    for dir in scan.dirs.drain(..) {
        state.insert_dir(dir);
    }
    for (path, key) in scan.files.drain(..) {
        state.insert(path, key)?;
    }
    for error in scan.errors.drain(..) {
        state.record_error(error);
    }

    state.set_scan_duration(start_time.elapsed());
    debug!(
        root = %root_path.display(),
        files = state.len(),
        errors = state.errors().len(),
        threads = config.workers,
        "parallel scan complete"
    );
    Ok(state)
}
