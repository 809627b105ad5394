//! Core type definitions for mirrorsync

mod error;
mod key;
mod operation;
mod outcome;
mod state;

pub use error::{ScanError, SyncError};
pub use key::{CompareMode, ComparisonKey};
pub use operation::{EntryKind, OpKind, Operation};
pub use outcome::{ExecutionOutcome, ExecutionSummary, KindCounts, OutcomeStatus};
pub use state::{parent_dirs, path_depth, to_relative_key, DirectoryState};
