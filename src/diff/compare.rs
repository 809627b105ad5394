//! State comparison: two directory states in, one plan out

use crate::diff::SyncPlan;
use crate::types::{parent_dirs, DirectoryState, OpKind, Operation, SyncError};
use std::collections::HashSet;
use tracing::debug;

/// Compare a source state against a destination state
///
/// * source file missing from the destination → `Copy`
/// * file in both with unequal keys → `Replace`
/// * destination file missing from the source → `Delete`
///
/// A path that is a file on one side and a directory on the other is a
/// `Replace`; the engine removes the old entity before writing the new one.
/// Destination entries beneath such a path are covered by the replace and get
/// no operation of their own. Destination directories with no source file
/// anywhere beneath the matching path are removed after the file deletes,
/// deepest first; empty source directories are neither created nor kept.
///
/// # Errors
/// `SyncError::ModeMismatch` if the states were scanned under different modes.
pub fn compare_states(src: &DirectoryState, dest: &DirectoryState) -> Result<SyncPlan, SyncError> {
    if src.mode != dest.mode {
        return Err(SyncError::ModeMismatch {
            src_mode: src.mode,
            dest_mode: dest.mode,
        });
    }

    let mut operations = Vec::new();
    let mut replaced: HashSet<&str> = HashSet::new();

    for (path, src_key) in src.iter() {
        match dest.get(path) {
            Some(dest_key) if dest_key != src_key => {
                operations.push(Operation::replace(path));
            }
            Some(_) => {}
            None if dest.contains_dir(path) => {
                // Directory in the destination, file in the source
                replaced.insert(path);
                operations.push(Operation::replace(path));
            }
            None => operations.push(Operation::copy(path)),
        }
    }

    // Source directories exist in the mirror only through the files under them
    let src_dirs: HashSet<&str> = src.paths().flat_map(|path| parent_dirs(path)).collect();

    for &dir in &src_dirs {
        if dest.contains(dir) {
            // File in the destination, directory in the source
            operations.push(Operation::replace(dir));
        }
    }

    let covered = |path: &str| parent_dirs(path).any(|dir| replaced.contains(dir));

    for path in dest.paths() {
        if !src.contains(path) && !src_dirs.contains(path) && !covered(path) {
            operations.push(Operation::delete_file(path));
        }
    }

    for dir in dest.dirs() {
        if !src_dirs.contains(dir) && !src.contains(dir) && !covered(dir) {
            operations.push(Operation::delete_dir(dir));
        }
    }

    let plan = SyncPlan::from_operations(
        src.root_path.clone(),
        dest.root_path.clone(),
        operations,
    );
    debug!(
        copy = plan.count(OpKind::Copy),
        replace = plan.count(OpKind::Replace),
        delete = plan.count(OpKind::Delete),
        "plan computed"
    );
    Ok(plan)
}
