//! # mirrorsync - Directory Mirroring with a Reviewable Plan
//!
//! Makes a destination directory identical to a source directory. Both trees
//! are scanned, diffed into copy/replace/delete operations, and the full plan is
//! shown before anything changes. Each operation kind is then confirmed one by
//! one until the operator trusts it, after which the rest of that kind runs on
//! a bounded worker pool.

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use diff::SyncPlan;
pub use executor::ExecutionEngine;
pub use types::{CompareMode, DirectoryState, ExecutionSummary, Operation, SyncError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
