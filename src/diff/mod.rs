//! Diff engine - state comparison and plan generation

mod compare;
mod plan;

pub use compare::compare_states;
pub use plan::SyncPlan;
