/// Storage layer for persisting habit data
///
/// This module defines the backend contract shared by the SQLite backend and
/// the key-value backend. Both must produce identical results for every
/// operation; the habit service only ever talks to this interface.

pub mod sqlite;
pub mod migrations;
pub mod kv;
pub mod key_value;

// Re-export the main storage types
pub use sqlite::*;
pub use kv::*;
pub use key_value::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use crate::domain::{Habit, HabitId, HabitRecord, HabitWithStatus, RecordUpdate, TimeOfDay};

/// Errors that can occur during storage operations
///
/// Missing habits and records are never errors: updates and deletes that
/// match nothing are no-ops.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage initialization failed: {0}")]
    Initialization(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Storage is locked by another process: {0}")]
    Locked(String),

    #[error("Corrupt stored value for {field}: {value}")]
    CorruptValue { field: &'static str, value: String },
}

/// Trait defining the storage interface for habits and their daily records
///
/// Every operation may suspend on I/O. Callers issue one operation at a time.
#[async_trait]
pub trait HabitStorage: Send + Sync {
    /// Create a habit and its pending record for today, returning the new id
    async fn create_habit(
        &self,
        name: &str,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> Result<HabitId, StorageError>;

    /// Change or clear a habit's planned time (no-op for unknown ids)
    async fn update_habit_scheduled_time(
        &self,
        habit_id: HabitId,
        scheduled_time: Option<TimeOfDay>,
    ) -> Result<(), StorageError>;

    /// All habits that are not deleted, oldest first
    async fn get_all_active_habits(&self) -> Result<Vec<Habit>, StorageError>;

    /// Soft delete a habit as of today (no-op for unknown ids)
    async fn delete_habit(&self, habit_id: HabitId) -> Result<(), StorageError>;

    /// Insert or fully replace the record for (habit, date)
    async fn create_or_replace_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError>;

    /// The record for (habit, date), if one exists
    async fn get_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StorageError>;

    /// Update the record for (habit, date), creating it when missing
    async fn update_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError>;

    /// Habits visible on `date` joined with that day's record, oldest first
    async fn get_habits_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<HabitWithStatus>, StorageError>;
}

/// Read-only inspection of everything a backend holds
///
/// Kept apart from `HabitStorage` so the service never depends on it.
#[async_trait]
pub trait StorageDiagnostics: Send + Sync {
    /// Every habit, including deleted ones, oldest first
    async fn all_habits(&self) -> Result<Vec<Habit>, StorageError>;

    /// Every record, newest date first, then by habit id
    async fn all_records(&self) -> Result<Vec<HabitRecord>, StorageError>;

    /// Short name of the backend for logs and reports
    fn backend_name(&self) -> &'static str;
}

/// A complete backend: the storage contract plus diagnostics
pub trait StorageBackend: HabitStorage + StorageDiagnostics {}

impl<T: HabitStorage + StorageDiagnostics> StorageBackend for T {}
