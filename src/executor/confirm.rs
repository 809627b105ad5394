//! Operator confirmation and the per-kind Prompting → Bulk state machine

use crate::types::{OpKind, Operation, SyncError};
use std::io::{BufRead, Write};
use tracing::info;

/// Operator answer to one confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply this operation, keep asking
    Yes,
    /// Skip this operation, keep asking
    No,
    /// Stop asking for this kind and run the rest in parallel
    Trust,
}

impl Decision {
    /// Parse `y`/`yes`, `n`/`no`, `t`/`trust`, ignoring case and surrounding space
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Decision::Yes),
            "n" | "no" => Some(Decision::No),
            "t" | "trust" => Some(Decision::Trust),
            _ => None,
        }
    }
}

/// Where confirmation answers come from
pub trait ConfirmationSource {
    /// Ask about one operation
    ///
    /// An error means no further answers can be obtained; the engine stops
    /// prompting and skips everything that is left.
    fn prompt(&mut self, operation: &Operation) -> Result<Decision, SyncError>;
}

/// Line-based prompt over any reader/writer pair (stdin/stderr in the binary)
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmationSource for LinePrompt<R, W> {
    fn prompt(&mut self, operation: &Operation) -> Result<Decision, SyncError> {
        let io_failed = |e: std::io::Error| SyncError::Prompt(e.to_string());

        loop {
            write!(self.output, "{operation}? (y/n/t): ").map_err(io_failed)?;
            self.output.flush().map_err(io_failed)?;

            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(io_failed)? == 0 {
                return Err(SyncError::Prompt("input closed".to_string()));
            }

            match Decision::parse(&line) {
                Some(decision) => return Ok(decision),
                None => writeln!(self.output, "Please answer y (yes), n (no) or t (trust).")
                    .map_err(io_failed)?,
            }
        }
    }
}

/// Answers `trust` to everything (`--yes`)
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustAll;

impl ConfirmationSource for TrustAll {
    fn prompt(&mut self, _operation: &Operation) -> Result<Decision, SyncError> {
        Ok(Decision::Trust)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindState {
    Prompting,
    /// Terminal for the kind
    Bulk,
}

/// What the engine does with the operation it just asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Apply,
    Skip,
    /// This and every remaining operation of the kind go to the worker pool
    Bulk,
}

/// Confirmation state for one operation kind
#[derive(Debug)]
pub struct KindMachine {
    kind: OpKind,
    state: KindState,
}

impl KindMachine {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            state: KindState::Prompting,
        }
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn state(&self) -> KindState {
        self.state
    }

    pub fn is_bulk(&self) -> bool {
        self.state == KindState::Bulk
    }

    /// Feed one decision and get the step to take
    pub fn advance(&mut self, decision: Decision) -> Step {
        match (self.state, decision) {
            (KindState::Bulk, _) => Step::Bulk,
            (KindState::Prompting, Decision::Yes) => Step::Apply,
            (KindState::Prompting, Decision::No) => Step::Skip,
            (KindState::Prompting, Decision::Trust) => {
                info!(kind = %self.kind, "trusted, switching to bulk execution");
                self.state = KindState::Bulk;
                Step::Bulk
            }
        }
    }
}
