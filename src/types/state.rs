//! DirectoryState - comparable snapshot of one root

use super::{CompareMode, ComparisonKey, ScanError, SyncError};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Flat snapshot of a directory tree
///
/// Keys are root-relative, slash-separated paths. Iteration order is arbitrary;
/// callers sort before producing anything user-visible.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryState {
    /// Map: relative_path → ComparisonKey
    entries: HashMap<String, ComparisonKey>,

    /// Every directory beneath the root (the root itself excluded)
    dirs: HashSet<String>,

    /// Paths that could not be read during the scan
    errors: Vec<ScanError>,

    /// Mode every key in this state was produced by
    pub mode: CompareMode,

    /// Scan metadata
    pub scan_duration: Duration,
    pub root_path: PathBuf,
}

impl DirectoryState {
    /// Create a new empty state
    pub fn new(root_path: PathBuf, mode: CompareMode) -> Self {
        Self {
            entries: HashMap::new(),
            dirs: HashSet::new(),
            errors: Vec::new(),
            mode,
            scan_duration: Duration::from_secs(0),
            root_path,
        }
    }

    /// Insert a file key
    ///
    /// Ancestors of `path` are registered as directories. Keys produced by a
    /// different mode than the state's are rejected.
    pub fn insert(&mut self, path: impl Into<String>, key: ComparisonKey) -> Result<(), SyncError> {
        let path = path.into();
        if key.mode() != self.mode {
            return Err(SyncError::ForeignKey {
                path,
                key_mode: key.mode(),
                state_mode: self.mode,
            });
        }

        for dir in parent_dirs(&path) {
            self.dirs.insert(dir.to_string());
        }
        self.entries.insert(path, key);
        Ok(())
    }

    /// Register a directory (and its ancestors)
    pub fn insert_dir(&mut self, path: impl Into<String>) {
        let path = path.into();
        for dir in parent_dirs(&path) {
            self.dirs.insert(dir.to_string());
        }
        self.dirs.insert(path);
    }

    /// Record a per-path scan failure
    pub fn record_error(&mut self, error: ScanError) {
        self.errors.push(error);
    }

    pub fn get(&self, path: &str) -> Option<&ComparisonKey> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn contains_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    /// Number of file entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over all (path, key) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComparisonKey)> {
        self.entries.iter().map(|(path, key)| (path.as_str(), key))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        self.dirs.iter().map(String::as_str)
    }

    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    /// Set the scan duration after scanning completes
    pub fn set_scan_duration(&mut self, duration: Duration) {
        self.scan_duration = duration;
    }
}

/// Ancestor directories of a relative path, nearest first.
///
/// `"a/b/c.txt"` yields `"a/b"` then `"a"`.
pub fn parent_dirs(path: &str) -> impl Iterator<Item = &str> {
    let mut rest = path;
    std::iter::from_fn(move || {
        let idx = rest.rfind('/')?;
        rest = &rest[..idx];
        Some(rest)
    })
    .filter(|dir| !dir.is_empty())
}

/// Number of path components in a relative path
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|part| !part.is_empty()).count()
}

/// Convert a root-relative filesystem path into the slash-separated key form
///
/// Returns `None` for paths that escape the root or are empty.
pub fn to_relative_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
