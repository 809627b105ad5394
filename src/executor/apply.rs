//! Applying one planned operation to the destination

use crate::executor::copy::{
    copy_file_atomic, copy_symlink, ensure_dir, ensure_parent_dirs, remove_path_any,
};
use crate::types::{EntryKind, ExecutionOutcome, OpKind, Operation, SyncError};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

/// Apply `operation` and wrap the result as an outcome
pub fn apply_operation(
    source_root: &Path,
    destination_root: &Path,
    operation: &Operation,
) -> ExecutionOutcome {
    match apply(source_root, destination_root, operation) {
        Ok(()) => ExecutionOutcome::succeeded(operation.clone()),
        Err(error) => ExecutionOutcome::failed(operation.clone(), error),
    }
}

/// Apply one operation; only the destination root is ever written
///
/// * `Copy` / `Replace`: parents are created, and whatever entity currently
///   occupies the path is removed when its type differs from the source's.
/// * `Delete` (file): a file that is already gone counts as deleted.
/// * `Delete` (directory): the directory must be empty; anything else is a
///   `StructuralInconsistency`.
pub fn apply(
    source_root: &Path,
    destination_root: &Path,
    operation: &Operation,
) -> Result<(), SyncError> {
    match operation {
        Operation::Copy { path } => transfer(OpKind::Copy, source_root, destination_root, path),
        Operation::Replace { path } => {
            transfer(OpKind::Replace, source_root, destination_root, path)
        }
        Operation::Delete {
            path,
            entry: EntryKind::File,
        } => delete_file(destination_root, path),
        Operation::Delete {
            path,
            entry: EntryKind::Directory,
        } => delete_dir(destination_root, path),
    }
}

fn transfer(
    kind: OpKind,
    source_root: &Path,
    destination_root: &Path,
    path: &str,
) -> Result<(), SyncError> {
    let src = source_root.join(path);
    let dest = destination_root.join(path);

    ensure_parent_dirs(destination_root, path).map_err(|e| apply_error(kind, path, e))?;
    let src_type = fs::symlink_metadata(&src)
        .map_err(|e| apply_error(kind, path, e))?
        .file_type();

    if src_type.is_dir() {
        // File in the destination, directory in the source
        return ensure_dir(&dest).map_err(|e| apply_error(kind, path, e));
    }

    if fs::symlink_metadata(&dest).is_ok_and(|m| m.file_type().is_dir()) {
        // Directory in the destination, file in the source
        remove_path_any(&dest).map_err(|e| apply_error(kind, path, e))?;
    }

    let copied = if src_type.is_symlink() {
        copy_symlink(&src, &dest)
    } else {
        copy_file_atomic(&src, &dest).map(|_| ())
    };
    copied.map_err(|e| apply_error(kind, path, e))
}

fn delete_file(destination_root: &Path, path: &str) -> Result<(), SyncError> {
    let target = destination_root.join(path);
    let metadata = match fs::symlink_metadata(&target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(apply_error(OpKind::Delete, path, e)),
    };

    if metadata.file_type().is_dir() {
        return Err(SyncError::StructuralInconsistency {
            path: path.to_string(),
            detail: "expected a file, found a directory".to_string(),
        });
    }

    match fs::remove_file(&target) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(apply_error(OpKind::Delete, path, e)),
        _ => Ok(()),
    }
}

fn delete_dir(destination_root: &Path, path: &str) -> Result<(), SyncError> {
    let target = destination_root.join(path);
    let metadata = match fs::symlink_metadata(&target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(apply_error(OpKind::Delete, path, e)),
    };

    if !metadata.file_type().is_dir() {
        return Err(SyncError::StructuralInconsistency {
            path: path.to_string(),
            detail: "expected an empty directory, found a file".to_string(),
        });
    }

    match fs::remove_dir(&target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(_) if has_entries(&target) => Err(SyncError::StructuralInconsistency {
            path: path.to_string(),
            detail: "directory is not empty".to_string(),
        }),
        Err(e) => Err(apply_error(OpKind::Delete, path, e)),
    }
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_some())
}

fn apply_error(kind: OpKind, path: &str, source: io::Error) -> SyncError {
    SyncError::Apply {
        kind,
        path: path.to_string(),
        source,
    }
}
