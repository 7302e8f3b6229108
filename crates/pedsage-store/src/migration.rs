//! Schema migration system.
//!
//! Migrations are static SQL strings keyed by version number. The applied
//! version is tracked in a `_migrations` table so each migration runs once.

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// A single migration definition.
struct Migration {
    /// Monotonically increasing version number (1, 2, 3, ...).
    version: u32,
    description: &'static str,
    /// Raw SQL. May contain multiple statements separated by `;`.
    sql: &'static str,
}

/// All migrations in order. Append new migrations to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "key-value blob store",
    sql: r#"
            CREATE TABLE kv_store (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
        "#,
}];

// ── public API ───────────────────────────────────────────────────────

/// Run all pending migrations against `conn`.
///
/// Synchronous; call it from `spawn_blocking`.
pub fn run_all(conn: &mut Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "database schema is up to date");
        return Ok(());
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "running pending migrations"
    );

    for migration in pending {
        apply(conn, migration)?;
    }

    Ok(())
}

/// Return the latest applied migration version, or 0 if none.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to read current version: {e}"),
    })
}

// ── internals ────────────────────────────────────────────────────────

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })
}

/// Apply one migration and record it, all in one immediate transaction.
///
/// The transaction rolls back when dropped, so any early return leaves the
/// schema untouched.
fn apply(conn: &mut Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );

    let failed = |e: rusqlite::Error| StoreError::Migration {
        version: migration.version,
        message: e.to_string(),
    };

    let result = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(failed)
        .and_then(|tx| {
            tx.execute_batch(migration.sql).map_err(failed)?;
            tx.execute(
                "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    migration.version,
                    migration.description,
                    chrono::Utc::now().timestamp()
                ],
            )
            .map_err(failed)?;
            tx.commit().map_err(failed)
        });

    if let Err(err) = &result {
        warn!(version = migration.version, %err, "migration rolled back");
    }
    result
}

// ── tests ────────────────────────────────────────────────────────────
