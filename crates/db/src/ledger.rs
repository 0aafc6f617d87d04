//! The version ledger table.
//!
//! A single row `(version BIGINT, dirty BOOLEAN)`; an absent row means
//! version zero. Writes replace the row wholesale and are only issued on a
//! connection that is already inside a transaction (see [`LedgerTable::commit`]
//! for the standalone case).

use pgshift_core::ledger::LedgerState;
use pgshift_shared::Version;
use sqlx::{Connection, PgConnection};

use crate::error::MigrateError;

/// Handle on the ledger table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTable {
    name: String,
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && part.len() <= 63
}

impl LedgerTable {
    /// Validates `name` as `table` or `schema.table`.
    ///
    /// The name is interpolated into SQL, so anything but plain identifiers
    /// is rejected.
    pub fn new(name: &str) -> Result<Self, MigrateError> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 || !parts.iter().all(|p| is_identifier(p)) {
            return Err(MigrateError::InvalidTable(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Qualified table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT NOT NULL PRIMARY KEY, dirty BOOLEAN NOT NULL)",
            self.name
        )
    }

    fn select_sql(&self) -> String {
        format!("SELECT version, dirty FROM {} LIMIT 1", self.name)
    }

    fn clear_sql(&self) -> String {
        format!("DELETE FROM {}", self.name)
    }

    fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (version, dirty) VALUES ($1, $2)", self.name)
    }

    /// Creates the table if it does not exist yet.
    pub async fn ensure(&self, conn: &mut PgConnection) -> Result<(), MigrateError> {
        sqlx::query(&self.create_sql())
            .execute(conn)
            .await
            .map_err(MigrateError::query("create ledger table"))?;
        Ok(())
    }

    /// Reads the ledger row; an absent row is clean at zero.
    pub async fn read(&self, conn: &mut PgConnection) -> Result<LedgerState, MigrateError> {
        let row: Option<(i64, bool)> = sqlx::query_as(&self.select_sql())
            .fetch_optional(conn)
            .await
            .map_err(MigrateError::query("read ledger"))?;

        match row {
            None => Ok(LedgerState::default()),
            Some((version, dirty)) => {
                let version = Version::try_from(version).map_err(MigrateError::InvalidLedger)?;
                Ok(LedgerState { version, dirty })
            }
        }
    }

    /// Replaces the ledger row with `state`.
    ///
    /// Must run inside a transaction so the delete and insert land together.
    pub async fn write(
        &self,
        conn: &mut PgConnection,
        state: LedgerState,
    ) -> Result<(), MigrateError> {
        sqlx::query(&self.clear_sql())
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::query("clear ledger"))?;

        // Clean at zero is stored as no row at all.
        if state.version.is_zero() && state.is_clean() {
            return Ok(());
        }

        sqlx::query(&self.insert_sql())
            .bind(state.version.to_i64())
            .bind(state.dirty)
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::query("write ledger"))?;
        Ok(())
    }

    /// Writes `state` in its own transaction.
    pub async fn commit(
        &self,
        conn: &mut PgConnection,
        state: LedgerState,
    ) -> Result<(), MigrateError> {
        let mut tx = conn
            .begin()
            .await
            .map_err(MigrateError::query("begin ledger transaction"))?;
        self.write(&mut tx, state).await?;
        tx.commit()
            .await
            .map_err(MigrateError::query("commit ledger"))?;
        Ok(())
    }
}
