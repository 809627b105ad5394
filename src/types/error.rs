//! Error types for mirrorsync

use super::{CompareMode, OpKind};
use std::path::PathBuf;
use thiserror::Error;

/// Error types for mirrorsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A root directory is missing, not a directory, or cannot be opened
    #[error("Root unavailable: {path}: {reason}")]
    RootUnavailable { path: PathBuf, reason: String },

    /// The two states were captured under different comparison modes
    #[error("Comparison mode mismatch: source scanned by {src_mode}, destination by {dest_mode}")]
    ModeMismatch {
        src_mode: CompareMode,
        dest_mode: CompareMode,
    },

    /// A key computed under one mode was offered to a state of another
    #[error("Key for '{path}' was computed by {key_mode}, but the state compares by {state_mode}")]
    ForeignKey {
        path: String,
        key_mode: CompareMode,
        state_mode: CompareMode,
    },

    /// A single copy/replace/delete failed
    #[error("{kind} failed for '{path}': {source}")]
    Apply {
        kind: OpKind,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The destination no longer matches what the plan was built from
    #[error("Structural inconsistency at '{path}': {detail}")]
    StructuralInconsistency { path: String, detail: String },

    /// The confirmation source could not produce an answer
    #[error("Confirmation failed: {0}")]
    Prompt(String),

    /// Worker pool could not be started or a worker task died
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl SyncError {
    /// Errors that abort the run before any plan is executed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_)
                | SyncError::RootUnavailable { .. }
                | SyncError::ModeMismatch { .. }
                | SyncError::ForeignKey { .. }
        )
    }

    /// Check if this error signals a plan/filesystem disagreement
    pub fn is_structural(&self) -> bool {
        matches!(self, SyncError::StructuralInconsistency { .. })
    }

    /// Underlying IO error, if any
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            SyncError::Io(e) | SyncError::Apply { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// A file or directory that could not be read while walking a root.
///
/// Recorded per path; the entry is left out of the state and the walk continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// Root-relative path when known, otherwise the absolute path reported by the walker
    pub path: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_automatic_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let sync_error: SyncError = io_error.into();

        assert!(matches!(sync_error, SyncError::Io(_)));
        assert!(sync_error.to_string().contains("IO error"));
        assert!(sync_error.io_error().is_some());
    }

    #[test]
    fn test_root_unavailable_is_fatal() {
        let error = SyncError::RootUnavailable {
            path: PathBuf::from("/missing"),
            reason: "does not exist".to_string(),
        };
        assert!(error.is_fatal());
        assert!(error.to_string().contains("/missing"));
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn test_mode_mismatch_message_names_both_modes() {
        let error = SyncError::ModeMismatch {
            src_mode: CompareMode::Size,
            dest_mode: CompareMode::Checksum,
        };
        let msg = error.to_string();
        assert!(msg.contains("size"));
        assert!(msg.contains("checksum"));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_apply_error_keeps_source() {
        use std::error::Error;

        let error = SyncError::Apply {
            kind: OpKind::Replace,
            path: "a/b.txt".to_string(),
            source: IoError::new(ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!error.is_fatal());
        assert!(!error.is_structural());
        assert!(error.source().is_some());
        assert!(error.to_string().contains("Replace failed for 'a/b.txt'"));
        assert_eq!(
            error.io_error().map(IoError::kind),
            Some(ErrorKind::PermissionDenied)
        );
    }

    #[test]
    fn test_structural_inconsistency_flag() {
        let error = SyncError::StructuralInconsistency {
            path: "sub/empty".to_string(),
            detail: "directory is not empty".to_string(),
        };
        assert!(error.is_structural());
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_scan_error_display() {
        let with_path = ScanError {
            path: Some("locked.bin".to_string()),
            message: "Permission denied".to_string(),
        };
        assert_eq!(with_path.to_string(), "locked.bin: Permission denied");

        let without_path = ScanError {
            path: None,
            message: "walker failed".to_string(),
        };
        assert_eq!(without_path.to_string(), "walker failed");
    }
}
