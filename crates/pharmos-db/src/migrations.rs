//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and applied
//! on startup by [`Database::new`](crate::Database::new).
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   products, batches, doctors,
//!                              bills, bill_items, audit_events (+ triggers)
//! ```
//!
//! Applied files are recorded with their checksum in `_sqlx_migrations`.
//! A shipped file is never edited; schema changes go in a new `NNN_*.sql`.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far the connected database is behind the embedded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Migrations embedded in this build.
    pub embedded: usize,
    /// Migrations recorded as applied in the database.
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }

    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Applies every pending migration, in file order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        info!(applied = before.applied, "Schema is current");
        return Ok(());
    }

    info!(pending = before.pending(), "Applying schema migrations");
    MIGRATOR.run(pool).await?;
    info!(embedded = before.embedded, "Schema migrations applied");
    Ok(())
}

/// Compares the embedded migrations with those recorded in the database.
///
/// A database that has never been migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let embedded = MIGRATOR.migrations.len();

    let applied = match sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await
    {
        Ok(count) => count as usize,
        Err(sqlx::Error::Database(e)) if e.message().contains("no such table") => 0,
        Err(e) => {
            warn!(error = %e, "Could not read migration history");
            return Err(e.into());
        }
    };

    Ok(MigrationStatus { embedded, applied })
}
