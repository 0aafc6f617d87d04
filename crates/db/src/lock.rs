//! Session-scoped advisory lock serialising migration runs.
//!
//! The lock lives on the engine's single connection, so it is released by
//! PostgreSQL if the process dies mid-run.

use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use sqlx::PgConnection;

use crate::error::MigrateError;

/// Delay between acquisition attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A PostgreSQL advisory lock keyed on the migration target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisoryLock {
    key: i64,
}

impl AdvisoryLock {
    /// Derives the lock key from the database and ledger table names.
    ///
    /// Every process migrating the same ledger computes the same key.
    #[must_use]
    pub fn for_target(database: &str, table: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(database.as_bytes());
        hasher.update(b"/");
        hasher.update(table.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self {
            key: i64::from_be_bytes(bytes),
        }
    }

    /// The numeric key passed to `pg_*_advisory_lock`.
    #[must_use]
    pub const fn key(&self) -> i64 {
        self.key
    }

    /// Waits up to `timeout` for the lock.
    pub async fn acquire(
        &self,
        conn: &mut PgConnection,
        operation: &'static str,
        timeout: Duration,
    ) -> Result<(), MigrateError> {
        let deadline = Instant::now() + timeout;
        loop {
            let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
                .bind(self.key)
                .fetch_one(&mut *conn)
                .await
                .map_err(MigrateError::query("acquire migration lock"))?;

            if locked {
                tracing::debug!(key = self.key, "Acquired migration lock");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MigrateError::LockTimeout {
                    operation,
                    waited: timeout,
                });
            }
            tracing::debug!(key = self.key, "Migration lock busy, retrying");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Releases the lock.
    pub async fn release(&self, conn: &mut PgConnection) -> Result<(), MigrateError> {
        let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .fetch_one(conn)
            .await
            .map_err(MigrateError::query("release migration lock"))?;

        if released {
            tracing::debug!(key = self.key, "Released migration lock");
        } else {
            tracing::warn!(key = self.key, "Migration lock was not held at release");
        }
        Ok(())
    }
}
