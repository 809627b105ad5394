//! Sequential directory walker

use crate::config::Config;
use crate::hash::{checksum_bytes, compute_checksum};
use crate::types::{
    to_relative_key, CompareMode, ComparisonKey, DirectoryState, ScanError, SyncError,
};
use ignore::overrides::{Override, OverrideBuilder};
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Callback for reporting scan progress
///
/// Arguments:
/// - `files_scanned`: Total number of files scanned so far
/// - `bytes_scanned`: Total bytes scanned so far
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// What a single walker entry contributes to the state
pub(crate) enum Visit {
    Dir(String),
    File {
        path: String,
        key: ComparisonKey,
        bytes: u64,
    },
    Skip,
    Failed(ScanError),
}

/// Scan a directory and build a DirectoryState
///
/// Walks the tree recursively without any implicit filtering: hidden files,
/// `.gitignore`d paths and the like are all included. Only `exclude_patterns`
/// from the config remove paths.
///
/// # Errors
/// * The root cannot be opened → `SyncError::RootUnavailable`
/// * Invalid exclude patterns → `SyncError::Config`
/// * Unreadable entries are recorded as `ScanError`s and the scan continues
pub fn scan_directory(
    root_path: &Path,
    config: &Config,
    on_progress: Option<&ProgressCallback>,
) -> Result<DirectoryState, SyncError> {
    let start_time = Instant::now();
    open_root(root_path)?;

    let mode = config.compare_mode;
    let mut state = DirectoryState::new(root_path.to_path_buf(), mode);
    let overrides = compile_overrides(root_path, &config.exclude_patterns)?;

    let mut scanned_count: u64 = 0;
    let mut scanned_bytes: u64 = 0;

    let walker = ignore::WalkBuilder::new(root_path)
        .standard_filters(false)
        .follow_links(false)
        .overrides(overrides)
        .build();

    for result in walker {
        match visit(root_path, result, mode) {
            Visit::Dir(path) => state.insert_dir(path),
            Visit::File { path, key, bytes } => {
                state.insert(path, key)?;
                scanned_count += 1;
                scanned_bytes += bytes;
                if let Some(callback) = on_progress {
                    callback(scanned_count, scanned_bytes);
                }
            }
            Visit::Skip => {}
            Visit::Failed(error) => state.record_error(error),
        }
    }

    state.set_scan_duration(start_time.elapsed());
    debug!(
        root = %root_path.display(),
        files = state.len(),
        errors = state.errors().len(),
        elapsed_ms = state.scan_duration.as_millis() as u64,
        "scan complete"
    );
    Ok(state)
}

/// Fail fast when the root itself cannot be listed
pub(crate) fn open_root(root_path: &Path) -> Result<(), SyncError> {
    let unavailable = |reason: String| SyncError::RootUnavailable {
        path: root_path.to_path_buf(),
        reason,
    };
    let metadata = fs::metadata(root_path).map_err(|e| unavailable(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }
    fs::read_dir(root_path).map_err(|e| unavailable(e.to_string()))?;
    Ok(())
}

/// Build ignore-crate overrides from exclude globs
pub(crate) fn compile_overrides(root_path: &Path, patterns: &[String]) -> Result<Override, SyncError> {
    let mut override_builder = OverrideBuilder::new(root_path);
    for pattern in patterns {
        // A leading ! turns an override glob into an exclusion
        override_builder
            .add(&format!("!{pattern}"))
            .map_err(|e| SyncError::Config(format!("Invalid exclude pattern '{pattern}': {e}")))?;
    }
    override_builder
        .build()
        .map_err(|e| SyncError::Config(format!("Failed to build exclude overrides: {e}")))
}

/// Turn one walker result into a state contribution
pub(crate) fn visit(
    root_path: &Path,
    result: Result<ignore::DirEntry, ignore::Error>,
    mode: CompareMode,
) -> Visit {
    let entry = match result {
        Ok(entry) => entry,
        Err(e) => {
            let error = ScanError {
                path: error_path(&e).map(|p| display_path(root_path, p)),
                message: e.to_string(),
            };
            warn!(error = %error, "skipping unreadable entry");
            return Visit::Failed(error);
        }
    };

    if entry.depth() == 0 {
        return Visit::Skip;
    }

    let Some(relative) = entry
        .path()
        .strip_prefix(root_path)
        .ok()
        .and_then(to_relative_key)
    else {
        warn!(path = %entry.path().display(), "entry outside scan root, skipped");
        return Visit::Skip;
    };

    let Some(file_type) = entry.file_type() else {
        return Visit::Skip;
    };

    if file_type.is_dir() {
        return Visit::Dir(relative);
    }

    // Pipes, sockets, devices
    if !file_type.is_file() && !file_type.is_symlink() {
        debug!(path = %relative, "special file skipped");
        return Visit::Skip;
    }

    let metadata = match entry.metadata() {
        Ok(m) => m,
        Err(e) => return failed(relative, e.to_string()),
    };

    match compute_key(entry.path(), &metadata, mode) {
        Ok(key) => Visit::File {
            path: relative,
            key,
            bytes: metadata.len(),
        },
        Err(e) => failed(relative, e.to_string()),
    }
}

fn failed(path: String, message: String) -> Visit {
    let error = ScanError {
        path: Some(path),
        message,
    };
    warn!(error = %error, "skipping unreadable file");
    Visit::Failed(error)
}

/// Comparison key for a file or symlink
///
/// `metadata` must not follow symlinks; links are keyed by their own length or
/// by a digest of their target path.
pub fn compute_key(
    path: &Path,
    metadata: &Metadata,
    mode: CompareMode,
) -> Result<ComparisonKey, std::io::Error> {
    match mode {
        CompareMode::Size => Ok(ComparisonKey::Size(metadata.len())),
        CompareMode::Checksum if metadata.file_type().is_symlink() => {
            let target = fs::read_link(path)?;
            Ok(ComparisonKey::Checksum(checksum_bytes(
                target.as_os_str().as_encoded_bytes(),
            )))
        }
        CompareMode::Checksum => compute_checksum(path).map(ComparisonKey::Checksum),
    }
}

fn error_path(error: &ignore::Error) -> Option<&Path> {
    match error {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

fn display_path(root_path: &Path, path: &Path) -> String {
    path.strip_prefix(root_path)
        .ok()
        .and_then(to_relative_key)
        .unwrap_or_else(|| path.display().to_string())
}
