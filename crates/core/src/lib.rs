//! Core migration logic for pgshift.
//!
//! This crate contains pure logic with ZERO database dependencies.
//! Script discovery, validation and ledger planning live here; the
//! database side is in `pgshift-db`.
//!
//! # Modules
//!
//! - `script` - Migration scripts, directory discovery and scaffolding
//! - `ledger` - Ledger state, outcomes and apply/revert planning

pub mod ledger;
pub mod script;
