//! Operation - a single planned filesystem change

use std::fmt;

/// The three operation categories, processed in `OpKind::ORDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Copy,
    Replace,
    Delete,
}

impl OpKind {
    /// Fixed execution order: destinations exist before being overwritten, removals last
    pub const ORDER: [OpKind; 3] = [OpKind::Copy, OpKind::Replace, OpKind::Delete];

    /// Tree marker used by the plan renderer
    pub fn marker(self) -> &'static str {
        match self {
            OpKind::Copy => "[+]",
            OpKind::Replace => "[~]",
            OpKind::Delete => "[-]",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OpKind::Copy => "copy",
            OpKind::Replace => "replace",
            OpKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Copy => f.write_str("Copy"),
            OpKind::Replace => f.write_str("Replace"),
            OpKind::Delete => f.write_str("Delete"),
        }
    }
}

/// What a delete removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    /// Empty-directory cleanup, run after file deletes
    Directory,
}

/// Planned change; `path` is relative to both roots
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Copy { path: String },
    Replace { path: String },
    Delete { path: String, entry: EntryKind },
}

impl Operation {
    pub fn copy(path: impl Into<String>) -> Self {
        Operation::Copy { path: path.into() }
    }

    pub fn replace(path: impl Into<String>) -> Self {
        Operation::Replace { path: path.into() }
    }

    pub fn delete_file(path: impl Into<String>) -> Self {
        Operation::Delete {
            path: path.into(),
            entry: EntryKind::File,
        }
    }

    pub fn delete_dir(path: impl Into<String>) -> Self {
        Operation::Delete {
            path: path.into(),
            entry: EntryKind::Directory,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Copy { .. } => OpKind::Copy,
            Operation::Replace { .. } => OpKind::Replace,
            Operation::Delete { .. } => OpKind::Delete,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Operation::Copy { path } | Operation::Replace { path } | Operation::Delete { path, .. } => {
                path
            }
        }
    }

    /// Check if this is an empty-directory removal
    pub fn is_dir_delete(&self) -> bool {
        matches!(
            self,
            Operation::Delete {
                entry: EntryKind::Directory,
                ..
            }
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dir_delete() {
            write!(f, "{} '{}/'", self.kind(), self.path())
        } else {
            write!(f, "{} '{}'", self.kind(), self.path())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_is_copy_replace_delete() {
        assert_eq!(OpKind::ORDER, [OpKind::Copy, OpKind::Replace, OpKind::Delete]);
    }

    #[test]
    fn test_operation_accessors() {
        let op = Operation::delete_dir("sub/empty");
        assert_eq!(op.kind(), OpKind::Delete);
        assert_eq!(op.path(), "sub/empty");
        assert!(op.is_dir_delete());
        assert!(!Operation::delete_file("x").is_dir_delete());
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::copy("a.txt").to_string(), "Copy 'a.txt'");
        assert_eq!(Operation::delete_dir("old").to_string(), "Delete 'old/'");
    }
}
