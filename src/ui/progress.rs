//! Progress reporting

use crate::types::OpKind;
use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Sink for engine status lines and bulk progress
///
/// Both methods are called from pool workers concurrently; implementations
/// must keep lines whole and in call order.
pub trait Reporter: Send + Sync {
    /// One immediate status line
    fn report(&self, message: &str);

    /// Bulk-mode progress for one kind
    fn progress(&self, kind: OpKind, completed: usize, total: usize);
}

struct BulkBar {
    kind: OpKind,
    bar: ProgressBar,
}

/// Terminal reporter backed by indicatif
///
/// Status lines are printed with the active bar suspended, so they land above
/// it instead of tearing through it.
pub struct ProgressReporter {
    visible: bool,
    scan_bar: Mutex<Option<ProgressBar>>,
    bulk_bar: Mutex<Option<BulkBar>>,
}

impl ProgressReporter {
    /// Create a new progress reporter drawing to stderr
    pub fn new() -> Self {
        Self::with_visibility(true)
    }

    /// Reporter whose bars never draw; status lines still print
    pub fn hidden() -> Self {
        Self::with_visibility(false)
    }

    fn with_visibility(visible: bool) -> Self {
        Self {
            visible,
            scan_bar: Mutex::new(None),
            bulk_bar: Mutex::new(None),
        }
    }

    fn target(&self) -> ProgressDrawTarget {
        if self.visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        }
    }

    /// Mark start of a scanning phase.
    pub fn start_scan(&self, label: &str) {
        let scan_bar = ProgressBar::with_draw_target(None, self.target());
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            scan_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        scan_bar.enable_steady_tick(Duration::from_millis(120));
        scan_bar.set_message(format!("Scanning {label}..."));

        if let Ok(mut slot) = self.scan_bar.lock() {
            *slot = Some(scan_bar);
        }
    }

    /// Update scanning progress counters.
    pub fn update_scan(&self, label: &str, files: u64, bytes: u64) {
        if let Ok(slot) = self.scan_bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(format!(
                    "Scanning {label}... {files} files | {}",
                    HumanBytes(bytes)
                ));
            }
        }
    }

    /// Mark completion of a scanning phase.
    pub fn finish_scan(&self, label: &str, files: usize, errors: usize) {
        if let Ok(mut slot) = self.scan_bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
        let mut line = format!("Scanned {files} files in {label}");
        if errors > 0 {
            line.push_str(&format!(" ({errors} unreadable, skipped)"));
        }
        self.report(&line);
    }

    #[cfg(test)]
    fn bulk_position(&self) -> Option<(OpKind, u64, Option<u64>)> {
        let slot = self.bulk_bar.lock().ok()?;
        slot.as_ref()
            .map(|bulk| (bulk.kind, bulk.bar.position(), bulk.bar.length()))
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ProgressReporter {
    fn report(&self, message: &str) {
        match self.bulk_bar.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(bulk) => bulk.bar.suspend(|| println!("{message}")),
                None => println!("{message}"),
            },
            Err(_) => println!("{message}"),
        }
    }

    fn progress(&self, kind: OpKind, completed: usize, total: usize) {
        let Ok(mut slot) = self.bulk_bar.lock() else {
            return;
        };

        if slot.as_ref().map_or(true, |bulk| bulk.kind != kind) {
            if let Some(previous) = slot.take() {
                previous.bar.finish_and_clear();
            }
            let bar = ProgressBar::with_draw_target(Some(total as u64), self.target());
            if let Ok(style) =
                ProgressStyle::with_template("{prefix:>8} {bar:30.cyan/blue} {pos}/{len}")
            {
                bar.set_style(style.progress_chars("=>-"));
            }
            bar.set_prefix(kind.label());
            *slot = Some(BulkBar { kind, bar });
        }

        if let Some(bulk) = slot.as_ref() {
            bulk.bar.set_length(total as u64);
            bulk.bar.set_position(completed as u64);
        }

        if completed >= total {
            if let Some(done) = slot.take() {
                done.bar.finish_and_clear();
            }
        }
    }
}
