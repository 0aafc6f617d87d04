//! Ledger planning errors.

use pgshift_shared::Version;
use thiserror::Error;

use crate::script::DiscoveryError;

/// Reasons a migration cannot be planned against the current ledger.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A previous migration was interrupted; manual correction is required.
    #[error("ledger is dirty at version {0}")]
    Dirty(Version),

    /// The ledger and the discovered scripts disagree.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
