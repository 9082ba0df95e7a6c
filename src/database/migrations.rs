//! Schema migrations for the Passdrop SQLite database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Migrations are versioned: each runs exactly once and is recorded in
/// the `schema_version` table. Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // WAL and foreign keys are connection settings, not versioned
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: entries, shares, share links, activity log")?;
    }

    if current < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "Add version and inactive_reason to shares")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: Create all core tables.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS password_entries (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            service_name TEXT NOT NULL,
            service_url TEXT,
            username TEXT NOT NULL,
            secret TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_password_entries_owner ON password_entries(owner_id);

        CREATE TABLE IF NOT EXISTS shares (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            recipient_label TEXT,
            token TEXT NOT NULL UNIQUE,
            comment TEXT,
            created_at INTEGER NOT NULL,
            expires_at INTEGER,
            viewed INTEGER NOT NULL DEFAULT 0,
            viewed_at INTEGER,
            opened_once INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_shares_owner ON shares(owner_id);

        CREATE TABLE IF NOT EXISTS share_entries (
            share_id TEXT NOT NULL,
            entry_id TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (share_id, entry_id),
            FOREIGN KEY (share_id) REFERENCES shares(id)
        );

        CREATE TABLE IF NOT EXISTS activity_logs (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            action TEXT NOT NULL,
            service_name TEXT,
            recipient_label TEXT,
            status TEXT NOT NULL,
            viewed_at INTEGER,
            expires_at INTEGER,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activity_logs_owner ON activity_logs(owner_id, created_at);
        ",
    )
}

/// V2: Optimistic-locking version and the reason a share went inactive.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    if conn.prepare("SELECT version FROM shares LIMIT 0").is_err() {
        conn.execute_batch("ALTER TABLE shares ADD COLUMN version INTEGER NOT NULL DEFAULT 0;")?;
    }
    if conn.prepare("SELECT inactive_reason FROM shares LIMIT 0").is_err() {
        conn.execute_batch("ALTER TABLE shares ADD COLUMN inactive_reason TEXT;")?;
    }
    Ok(())
}
