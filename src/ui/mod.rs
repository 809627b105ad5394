//! Terminal output: plan tree, progress bars, run summary

mod progress;
mod summary;
mod tree;

pub use progress::{ProgressReporter, Reporter};
pub use summary::{format_scan_errors, format_summary};
pub use tree::{format_counts, render_plan};
