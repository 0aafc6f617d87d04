//! PostgreSQL side of pgshift.
//!
//! This crate provides:
//! - The migration [`Engine`] over one dedicated connection
//! - The ledger table recording `(version, dirty)`
//! - The advisory lock serialising concurrent runs

pub mod engine;
pub mod error;
pub mod ledger;
pub mod lock;

pub use engine::{Engine, EngineOptions};
pub use error::{ConnectionError, MigrateError};
pub use ledger::LedgerTable;
pub use lock::AdvisoryLock;

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

/// Opens a single connection and probes it.
///
/// The URL is parsed before any network activity.
///
/// # Errors
///
/// Returns an error if the URL is malformed, the backend cannot be reached
/// within `timeout`, or the liveness probe fails.
pub async fn connect(database_url: &str, timeout: Duration) -> Result<PgConnection, ConnectionError> {
    let options = PgConnectOptions::from_str(database_url).map_err(ConnectionError::InvalidUrl)?;

    let mut conn = tokio::time::timeout(timeout, PgConnection::connect_with(&options))
        .await
        .map_err(|_| ConnectionError::Timeout(timeout))?
        .map_err(ConnectionError::Unreachable)?;

    conn.ping().await.map_err(ConnectionError::Probe)?;
    tracing::debug!(
        host = options.get_host(),
        port = options.get_port(),
        "Connected to database"
    );
    Ok(conn)
}
