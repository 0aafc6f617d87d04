//! The migration engine.
//!
//! An [`Engine`] owns one dedicated PostgreSQL connection, the scripts
//! discovered when it was opened, and the ledger table. Mutating operations
//! run under a session advisory lock that is released on every exit path;
//! each script runs in its own transaction together with its ledger update.

use std::time::{Duration, Instant};

use pgshift_core::ledger::{
    ApplyOutcome, LedgerState, RevertOutcome, Step, check_force, plan_apply, plan_revert,
};
use pgshift_core::script::{MigrationSet, discover, normalize_location, split_statements};
use pgshift_shared::{AppConfig, Version};
use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

use crate::connect;
use crate::error::{ConnectionError, MigrateError};
use crate::ledger::LedgerTable;
use crate::lock::AdvisoryLock;

/// Tunables for [`Engine::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Ledger table name, optionally schema-qualified.
    pub table: String,
    /// Bound on the initial connection.
    pub connect_timeout: Duration,
    /// Bound on waiting for another process's migration lock.
    pub lock_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl EngineOptions {
    /// Takes the engine tunables from the application configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            table: config.migrations.table.clone(),
            connect_timeout: config.database.connect_timeout(),
            lock_timeout: config.migrations.lock_timeout(),
        }
    }
}

/// Schema migration engine over a single PostgreSQL connection.
#[derive(Debug)]
pub struct Engine {
    conn: Option<PgConnection>,
    scripts: MigrationSet,
    ledger: LedgerTable,
    lock: AdvisoryLock,
    lock_timeout: Duration,
}

fn live<'c>(
    conn: &'c mut Option<PgConnection>,
    operation: &'static str,
) -> Result<&'c mut PgConnection, MigrateError> {
    conn.as_mut().ok_or(MigrateError::Connection {
        operation,
        source: ConnectionError::Closed,
    })
}

impl Engine {
    /// Connects, probes liveness, discovers scripts and ensures the ledger table.
    ///
    /// The connection string is checked before the scripts location is
    /// touched, so a bad URL always reports a connection error.
    ///
    /// # Errors
    ///
    /// `Connection` when the backend cannot be reached, `Discovery` when the
    /// scripts location is missing or malformed.
    pub async fn open(
        database_url: &str,
        location: &str,
        options: EngineOptions,
    ) -> Result<Self, MigrateError> {
        const OP: &str = "open migration engine";

        let ledger = LedgerTable::new(&options.table)?;
        let mut conn = connect(database_url, options.connect_timeout)
            .await
            .map_err(|source| MigrateError::Connection {
                operation: OP,
                source,
            })?;

        match prepare(&mut conn, location, &ledger, options.lock_timeout).await {
            Ok((scripts, lock)) => {
                info!(
                    scripts = scripts.len(),
                    latest = %scripts.latest(),
                    ledger = ledger.name(),
                    "Migration engine ready"
                );
                Ok(Self {
                    conn: Some(conn),
                    scripts,
                    ledger,
                    lock,
                    lock_timeout: options.lock_timeout,
                })
            }
            Err(err) => {
                if let Err(close_err) = conn.close().await {
                    warn!(error = %close_err, "Failed to close connection after open error");
                }
                Err(err)
            }
        }
    }

    /// Scripts discovered at open time.
    #[must_use]
    pub const fn scripts(&self) -> &MigrationSet {
        &self.scripts
    }

    /// Whether [`Engine::close`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Applies every pending `up` script in ascending order.
    ///
    /// Scripts committed before a failure stay committed; the failing one is
    /// rolled back with its ledger update.
    ///
    /// # Errors
    ///
    /// `Execution` when a script fails, `Dirty` when the ledger needs manual
    /// correction, `LockTimeout` when another run holds the lock.
    pub async fn apply_all(&mut self) -> Result<ApplyOutcome, MigrateError> {
        const OP: &str = "apply migrations";

        let conn = live(&mut self.conn, OP)?;
        self.lock.acquire(conn, OP, self.lock_timeout).await?;
        let result = apply_pending(conn, &self.ledger, &self.scripts).await;
        let released = self.lock.release(conn).await;
        let outcome = result?;
        released?;
        Ok(outcome)
    }

    /// Runs the `down` script for the current version.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::apply_all`].
    pub async fn revert_one(&mut self) -> Result<RevertOutcome, MigrateError> {
        const OP: &str = "revert migration";

        let conn = live(&mut self.conn, OP)?;
        self.lock.acquire(conn, OP, self.lock_timeout).await?;
        let result = revert_latest(conn, &self.ledger, &self.scripts).await;
        let released = self.lock.release(conn).await;
        let outcome = result?;
        released?;
        Ok(outcome)
    }

    /// Reads `(version, dirty)` from the ledger. Takes no lock.
    pub async fn current_state(&mut self) -> Result<LedgerState, MigrateError> {
        let conn = live(&mut self.conn, "read migration state")?;
        self.ledger.read(conn).await
    }

    /// Number of discovered scripts above the current version.
    pub async fn pending(&mut self) -> Result<usize, MigrateError> {
        let state = self.current_state().await?;
        Ok(self.scripts.after(state.version).count())
    }

    /// Overwrites the ledger with `(version, clean)`.
    ///
    /// This is the administrative way out of a dirty ledger; no script runs.
    ///
    /// # Errors
    ///
    /// `Discovery` unless `version` is zero or a discovered version.
    pub async fn force(&mut self, version: Version) -> Result<(), MigrateError> {
        const OP: &str = "force ledger version";

        check_force(version, &self.scripts).map_err(|e| MigrateError::from_plan(OP, e))?;
        let conn = live(&mut self.conn, OP)?;
        self.lock.acquire(conn, OP, self.lock_timeout).await?;
        let result = self.ledger.commit(conn, LedgerState::clean(version)).await;
        let released = self.lock.release(conn).await;
        result?;
        released?;
        warn!(version = %version, "Ledger forced to a clean version");
        Ok(())
    }

    /// Releases the connection. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Error while closing database connection");
            }
        }
    }
}

async fn prepare(
    conn: &mut PgConnection,
    location: &str,
    ledger: &LedgerTable,
    lock_timeout: Duration,
) -> Result<(MigrationSet, AdvisoryLock), MigrateError> {
    const OP: &str = "open migration engine";

    let scripts = discover(&normalize_location(location))
        .map_err(|source| MigrateError::Discovery {
            operation: OP,
            source,
        })?;

    let database: String = sqlx::query_scalar("SELECT current_database()")
        .fetch_one(&mut *conn)
        .await
        .map_err(MigrateError::query("resolve database name"))?;
    let lock = AdvisoryLock::for_target(&database, ledger.name());

    // Concurrent CREATE TABLE IF NOT EXISTS can still collide in pg_type.
    lock.acquire(conn, OP, lock_timeout).await?;
    let ensured = ledger.ensure(conn).await;
    let released = lock.release(conn).await;
    ensured?;
    released?;

    Ok((scripts, lock))
}

async fn apply_pending(
    conn: &mut PgConnection,
    ledger: &LedgerTable,
    scripts: &MigrationSet,
) -> Result<ApplyOutcome, MigrateError> {
    let state = ledger.read(conn).await?;
    let steps =
        plan_apply(state, scripts).map_err(|e| MigrateError::from_plan("apply migrations", e))?;

    let Some(last) = steps.last() else {
        info!(version = %state.version, "No pending migrations");
        return Ok(ApplyOutcome::NoChange {
            version: state.version,
        });
    };

    for step in &steps {
        run_step(conn, ledger, step).await?;
    }
    Ok(ApplyOutcome::Applied {
        count: steps.len(),
        version: last.to,
    })
}

async fn revert_latest(
    conn: &mut PgConnection,
    ledger: &LedgerTable,
    scripts: &MigrationSet,
) -> Result<RevertOutcome, MigrateError> {
    let state = ledger.read(conn).await?;
    let step =
        plan_revert(state, scripts).map_err(|e| MigrateError::from_plan("revert migration", e))?;

    let Some(step) = step else {
        info!("Nothing to revert");
        return Ok(RevertOutcome::NoChange);
    };

    run_step(conn, ledger, &step).await?;
    Ok(RevertOutcome::Reverted {
        from: step.from,
        to: step.to,
    })
}

/// Executes one script and moves the ledger to `step.to`.
///
/// Transactional scripts share a transaction with the ledger write. Others
/// mark the ledger dirty at `step.from` first, so an interruption is visible,
/// and send their statements one at a time.
async fn run_step(
    conn: &mut PgConnection,
    ledger: &LedgerTable,
    step: &Step<'_>,
) -> Result<(), MigrateError> {
    let script = step.script;
    let failed = |source| MigrateError::Execution {
        version: script.version(),
        direction: script.direction(),
        source,
    };
    let started = Instant::now();

    if script.is_transactional() {
        let mut tx = conn
            .begin()
            .await
            .map_err(MigrateError::query("begin migration transaction"))?;
        if !script.is_blank() {
            sqlx::raw_sql(script.sql())
                .execute(&mut *tx)
                .await
                .map_err(failed)?;
        }
        ledger.write(&mut tx, step.committed()).await?;
        tx.commit().await.map_err(failed)?;
    } else {
        ledger.commit(conn, LedgerState::dirty(step.from)).await?;
        for statement in split_statements(script.sql()) {
            if let Err(source) = sqlx::raw_sql(&statement).execute(&mut *conn).await {
                warn!(
                    version = %step.from,
                    script = %script.file_name(),
                    "Non-transactional script failed; ledger left dirty"
                );
                return Err(failed(source));
            }
        }
        ledger.commit(conn, step.committed()).await?;
    }

    info!(
        version = %script.version(),
        direction = %script.direction(),
        description = script.description(),
        ledger = %step.to,
        elapsed_ms = started.elapsed().as_millis(),
        "Migration script applied"
    );
    Ok(())
}
