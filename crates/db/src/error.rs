//! Migration engine error types.

use std::time::Duration;

use pgshift_core::ledger::PlanError;
use pgshift_core::script::{Direction, DiscoveryError};
use pgshift_shared::{ParseVersionError, Version};
use thiserror::Error;

/// Errors reaching, probing or holding the database connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection string cannot be parsed.
    #[error("invalid connection string")]
    InvalidUrl(#[source] sqlx::Error),

    /// The backend refused or could not be reached.
    #[error("cannot connect to database")]
    Unreachable(#[source] sqlx::Error),

    /// The backend did not answer within the connect timeout.
    #[error("timed out after {0:?} connecting to database")]
    Timeout(Duration),

    /// The liveness probe failed after connecting.
    #[error("database liveness probe failed")]
    Probe(#[source] sqlx::Error),

    /// The engine has been closed.
    #[error("migration engine is closed")]
    Closed,
}

/// Errors raised by the migration engine.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Connection problems; fatal, never retried.
    #[error("cannot {operation}")]
    Connection {
        /// Operation being attempted.
        operation: &'static str,
        /// What went wrong.
        #[source]
        source: ConnectionError,
    },

    /// Scripts location problems; raised before any mutation.
    #[error("cannot {operation}")]
    Discovery {
        /// Operation being attempted.
        operation: &'static str,
        /// What went wrong.
        #[source]
        source: DiscoveryError,
    },

    /// A script failed; its transaction was rolled back.
    #[error("{direction} script for version {version} failed")]
    Execution {
        /// Version of the failing script.
        version: Version,
        /// Direction of the failing script.
        direction: Direction,
        /// Database error.
        #[source]
        source: sqlx::Error,
    },

    /// The ledger is dirty; nothing was run.
    #[error("cannot {operation}: ledger is dirty at version {version}")]
    Dirty {
        /// Operation being attempted.
        operation: &'static str,
        /// Dirty ledger version.
        version: Version,
    },

    /// Another process holds the migration lock.
    #[error("cannot {operation}: migration lock still held after {waited:?}")]
    LockTimeout {
        /// Operation being attempted.
        operation: &'static str,
        /// How long the engine waited.
        waited: Duration,
    },

    /// Reading or writing the ledger failed.
    #[error("cannot {operation}")]
    Query {
        /// Operation being attempted.
        operation: &'static str,
        /// Database error.
        #[source]
        source: sqlx::Error,
    },

    /// The ledger row holds a value that is not a version.
    #[error("ledger holds an invalid version")]
    InvalidLedger(#[source] ParseVersionError),

    /// The configured ledger table name is not a plain SQL identifier.
    #[error("invalid ledger table name '{0}'")]
    InvalidTable(String),
}

impl MigrateError {
    /// Wraps a planning refusal with the operation being attempted.
    pub(crate) fn from_plan(operation: &'static str, err: PlanError) -> Self {
        match err {
            PlanError::Dirty(version) => Self::Dirty { operation, version },
            PlanError::Discovery(source) => Self::Discovery { operation, source },
        }
    }

    /// Builds a `Query` error mapper for `map_err`.
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Query { operation, source }
    }

    /// Returns true for connection failures.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns true for scripts location failures.
    #[must_use]
    pub const fn is_discovery(&self) -> bool {
        matches!(self, Self::Discovery { .. })
    }

    /// Returns true when a script failed to execute.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_from_plan_dirty() {
        let v = Version::new(3).unwrap();
        let err = MigrateError::from_plan("apply migrations", PlanError::Dirty(v));
        assert!(matches!(err, MigrateError::Dirty { version, .. } if version == v));
        assert_eq!(
            err.to_string(),
            "cannot apply migrations: ledger is dirty at version 3"
        );
    }

    #[test]
    fn test_from_plan_discovery() {
        let err = MigrateError::from_plan(
            "revert migration",
            PlanError::Discovery(DiscoveryError::UnknownVersion {
                version: Version::new(9).unwrap(),
                latest: Version::new(2).unwrap(),
            }),
        );
        assert!(err.is_discovery());
        assert_eq!(err.to_string(), "cannot revert migration");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("ledger is at version 9 but the scripts location only goes up to 2")
        );
    }

    #[test]
    fn test_connection_display() {
        let err = MigrateError::Connection {
            operation: "open engine",
            source: ConnectionError::Closed,
        };
        assert!(err.is_connection());
        assert_eq!(err.to_string(), "cannot open engine");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("migration engine is closed")
        );
    }

    #[test]
    fn test_messages_do_not_repeat_their_source() {
        let err = MigrateError::Query {
            operation: "read ledger",
            source: sqlx::Error::RowNotFound,
        };
        let source = err.source().map(ToString::to_string).unwrap();
        assert_eq!(err.to_string(), "cannot read ledger");
        assert!(!err.to_string().contains(&source));

        let err = MigrateError::Execution {
            version: Version::new(2).unwrap(),
            direction: Direction::Up,
            source: sqlx::Error::PoolClosed,
        };
        assert_eq!(err.to_string(), "up script for version 2 failed");
        assert!(err.source().is_some());
    }
}
