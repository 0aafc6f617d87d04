//! Version ledger logic.
//!
//! This module implements the pure side of the ledger:
//! - The `(version, dirty)` state and operation outcomes
//! - Planning which scripts an apply or revert runs
//! - Refusals for dirty or unknown ledger versions

pub mod error;
pub mod plan;
pub mod state;

#[cfg(test)]
mod plan_props;

pub use error::PlanError;
pub use plan::{Step, check_force, plan_apply, plan_revert};
pub use state::{ApplyOutcome, LedgerState, RevertOutcome};
