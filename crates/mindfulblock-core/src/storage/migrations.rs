//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: rules, groups, overrides, daily domain stats, kv.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("applying schema v1");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS groups (
            id        TEXT PRIMARY KEY,
            name      TEXT NOT NULL UNIQUE COLLATE NOCASE,
            is_system INTEGER NOT NULL DEFAULT 0,
            position  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS rules (
            id         TEXT PRIMARY KEY,
            domain     TEXT NOT NULL UNIQUE,
            group_name TEXT NOT NULL DEFAULT 'General',
            mode       TEXT NOT NULL DEFAULT 'hard',
            is_active  INTEGER NOT NULL DEFAULT 1,
            version    INTEGER NOT NULL DEFAULT 1,
            position   INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS overrides (
            hostname      TEXT PRIMARY KEY,
            expires_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS domain_stats (
            date       TEXT NOT NULL,
            domain     TEXT NOT NULL,
            blocked    INTEGER NOT NULL DEFAULT 0,
            overridden INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (date, domain)
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_rules_group ON rules(group_name);
        CREATE INDEX IF NOT EXISTS idx_domain_stats_date ON domain_stats(date);",
    )?;
    set_schema_version(conn, 1)
}
