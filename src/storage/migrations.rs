/// Database migration management
///
/// This module handles creating and updating the SQLite database schema.
/// Databases written by older versions of the app may already contain some
/// of the later columns without any version bookkeeping, so column additions
/// tolerate columns that already exist.

use rusqlite::Connection;
use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 2;

/// Initialize the database schema
///
/// This creates all required tables and indexes if they don't exist and
/// brings older schemas up to date without touching existing rows.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    // Create version tracking table first
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < CURRENT_VERSION {
        run_migrations(conn, current_version)?;
        set_version(conn, CURRENT_VERSION)?;
    }

    Ok(())
}

/// Get the current database schema version
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .unwrap_or(0); // No version row means a fresh or pre-versioning database

    Ok(version)
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Run database migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    if from_version < 2 {
        migration_v2(conn)?;
    }

    Ok(())
}

/// Migration to version 1: habits and their daily records
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS habits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            createdAt TEXT NOT NULL,
            deletedAt TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habitId INTEGER NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            durationMinutes INTEGER,
            FOREIGN KEY (habitId) REFERENCES habits (id),
            UNIQUE (habitId, date)
        )",
        [],
    )?;

    create_indexes_v1(conn)?;

    tracing::info!("Applied migration v1: Created habit tables");
    Ok(())
}

/// Create database indexes for version 1
fn create_indexes_v1(conn: &Connection) -> Result<(), StorageError> {
    // Daily listing joins records by date
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_records_date
         ON habit_records (date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_records_habitId
         ON habit_records (habitId)",
        [],
    )?;

    Ok(())
}

/// Migration to version 2: planned time, criticality and completion time
fn migration_v2(conn: &Connection) -> Result<(), StorageError> {
    add_column_if_missing(conn, "habits", "scheduledTime", "TEXT")?;
    add_column_if_missing(conn, "habits", "isCritical", "INTEGER DEFAULT 0")?;
    add_column_if_missing(conn, "habit_records", "completionTime", "TEXT")?;

    tracing::info!("Applied migration v2: Added scheduling and completion columns");
    Ok(())
}

/// Add a column, treating "already exists" as success
pub(crate) fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<(), StorageError> {
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);

    match conn.execute(&sql, []) {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("duplicate column name") => {
            tracing::warn!("Column {}.{} already present, skipping", table, column);
            Ok(())
        }
        Err(e) => Err(StorageError::Migration(format!(
            "Failed to add column {}.{}: {}",
            table, column, e
        ))),
    }
}
