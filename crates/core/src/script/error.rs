//! Script discovery and scaffolding errors.

use std::path::PathBuf;

use pgshift_shared::Version;
use thiserror::Error;

use super::types::Direction;

/// Errors raised while reading or validating the scripts location.
///
/// All of these are fatal and surface before any database mutation.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The scripts location is missing or cannot be read.
    #[error("cannot read scripts location {}", .path.display())]
    Unreadable {
        /// Location that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A script file cannot be read.
    #[error("cannot read script {}", .path.display())]
    UnreadableScript {
        /// Script that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A `.sql` file does not follow `{version}_{description}.{up|down}.sql`.
    #[error("malformed script name '{name}': {reason}")]
    MalformedName {
        /// Offending file name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two files claim the same version and direction.
    #[error("duplicate {direction} script for version {version}")]
    DuplicateVersion {
        /// Repeated version.
        version: Version,
        /// Repeated direction.
        direction: Direction,
    },

    /// A version has only one of its two halves.
    #[error("version {version} has no {missing} script")]
    MissingPair {
        /// Incomplete version.
        version: Version,
        /// Half that is absent.
        missing: Direction,
    },

    /// Versions are not contiguous from 1.
    #[error("script versions must be contiguous: expected {expected}, found {found}")]
    Gap {
        /// Version that should come next.
        expected: Version,
        /// Version that was found instead.
        found: Version,
    },

    /// The ledger records a version with no discovered scripts.
    #[error("ledger is at version {version} but the scripts location only goes up to {latest}")]
    UnknownVersion {
        /// Version recorded in the ledger.
        version: Version,
        /// Highest discovered version.
        latest: Version,
    },
}

/// Errors raised while creating a new script pair.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// The name contains no usable characters.
    #[error("migration name '{0}' has no letters or digits")]
    EmptyName(String),

    /// No further version can be allocated.
    #[error("no version left after {0}")]
    VersionExhausted(Version),

    /// A script file cannot be written.
    #[error("cannot write script {}", .path.display())]
    Write {
        /// File that was written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
