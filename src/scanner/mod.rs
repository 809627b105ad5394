//! Directory scanning logic

mod parallel;
mod walker;

pub use parallel::scan_directory_parallel;
pub use walker::{compute_key, scan_directory, ProgressCallback};

use crate::config::Config;
use crate::types::{DirectoryState, SyncError};
use std::path::Path;

/// Scan a root with the walker matching the configured worker count
///
/// One worker walks sequentially; more spread traversal and hashing over
/// `config.workers` threads.
pub fn scan_root(
    root_path: &Path,
    config: &Config,
    on_progress: Option<&ProgressCallback>,
) -> Result<DirectoryState, SyncError> {
    if config.workers <= 1 {
        scan_directory(root_path, config, on_progress)
    } else {
        scan_directory_parallel(root_path, config, on_progress)
    }
}
