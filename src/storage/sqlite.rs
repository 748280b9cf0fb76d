/// SQLite implementation of the habit storage interface
///
/// This module provides the relational backend. It holds a single
/// connection to the database file, runs migrations when opening it, and
/// re-opens it once if an operation finds the handle gone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, SubsecRound};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use crate::domain::{
    format_date, parse_date, Clock, Habit, HabitId, HabitRecord, HabitWithStatus,
    RecordId, RecordStatus, RecordUpdate, TimeOfDay,
};
use crate::storage::{migrations, HabitStorage, StorageDiagnostics, StorageError};

/// Layout of `createdAt`; fixed width so text order is time order
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const HABIT_COLUMNS: &str = "id, name, createdAt, deletedAt, scheduledTime, isCritical";

const RECORD_COLUMNS: &str = "id, habitId, date, status, durationMinutes, completionTime";

/// SQLite-based storage implementation
///
/// The connection sits behind an async mutex so the backend can be shared
/// by reference; operations still run one at a time.
pub struct SqliteStorage {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    /// Open (or create) the database at `db_path`
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let conn = Self::open_connection(&db_path)?;

        tracing::info!("SQLite storage initialized at: {:?}", db_path);

        Ok(Self {
            path: db_path,
            conn: Mutex::new(Some(conn)),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_connection(db_path: &Path) -> Result<Connection, StorageError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Initialization(format!("Failed to open database: {}", e)))?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Initialization(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)
            .map_err(|e| StorageError::Initialization(format!("Failed to prepare schema: {}", e)))?;

        Ok(conn)
    }

    /// Close the connection; the next operation re-opens it
    pub async fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::Query(e))?;
            tracing::debug!("Closed SQLite connection to {:?}", self.path);
        }
        Ok(())
    }

    /// Replace the current connection with a fresh one
    ///
    /// The old handle is closed first so two connections never coexist.
    pub async fn reopen(&self) -> Result<(), StorageError> {
        let mut guard = self.conn.lock().await;
        if let Some(old) = guard.take() {
            if let Err((_, e)) = old.close() {
                tracing::warn!("Error closing previous SQLite connection: {}", e);
            }
        }
        *guard = Some(Self::open_connection(&self.path)?);
        Ok(())
    }

    /// Run `op` against the live connection
    ///
    /// A missing handle triggers one re-initialization before `op` runs; if
    /// that fails, the initialization error is returned.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send,
    {
        let mut guard = self.conn.lock().await;

        if guard.is_none() {
            tracing::warn!("SQLite connection missing, reinitializing {:?}", self.path);
            *guard = Some(Self::open_connection(&self.path)?);
        }

        match guard.as_mut() {
            Some(conn) => op(conn),
            None => Err(StorageError::Initialization(
                "Database connection unavailable".to_string(),
            )),
        }
    }
}

/// Write a record for (habit, date) if the habit exists on that date
///
/// The INSERT selects from `habits`, so unknown habits and dates before the
/// habit's creation day insert nothing instead of violating the foreign key.
fn upsert_record(
    conn: &Connection,
    habit_id: HabitId,
    date: NaiveDate,
    update: &RecordUpdate,
) -> Result<usize, StorageError> {
    let rows = conn.execute(
        "INSERT OR REPLACE INTO habit_records (habitId, date, status, durationMinutes, completionTime)
         SELECT id, ?2, ?3, ?4, ?5 FROM habits
         WHERE id = ?1 AND DATE(createdAt) <= ?2",
        params![
            habit_id.0,
            format_date(date),
            update.status.as_str(),
            update.duration_minutes,
            update.completion_time.as_ref().map(|t| t.as_str()),
        ],
    )?;

    if rows == 0 {
        tracing::debug!("Skipped record for habit {} on {}: no such habit on that date", habit_id, date);
    }
    Ok(rows)
}

fn invalid_column(idx: usize, message: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, message.to_string(), rusqlite::types::Type::Text)
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
        .map_err(|_| invalid_column(idx, "Invalid datetime"))
}

/// Dates may have been written as full timestamps; only the day matters
fn parse_stored_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    parse_date(s.get(..10).unwrap_or(s)).map_err(|_| invalid_column(idx, "Invalid date"))
}

fn parse_time(idx: usize, s: Option<String>) -> rusqlite::Result<Option<TimeOfDay>> {
    s.map(|t| TimeOfDay::parse(&t).map_err(|_| invalid_column(idx, "Invalid time of day")))
        .transpose()
}

/// Map the leading `HABIT_COLUMNS` of a row
fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let created_at_str: String = row.get(2)?;
    let created_at = parse_timestamp(2, &created_at_str)?;

    let deleted_at = match row.get::<_, Option<String>>(3)? {
        Some(s) => Some(parse_stored_date(3, &s)?),
        None => None,
    };

    Ok(Habit::from_existing(
        HabitId(row.get(0)?),
        row.get(1)?, // name
        created_at,
        deleted_at,
        parse_time(4, row.get(4)?)?,
        row.get::<_, Option<bool>>(5)?.unwrap_or(false),
    ))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HabitRecord> {
    let date_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let status = status_str
        .parse::<RecordStatus>()
        .map_err(|_| invalid_column(3, "Invalid status"))?;

    Ok(HabitRecord::from_existing(
        RecordId(row.get(0)?),
        HabitId(row.get(1)?),
        parse_stored_date(2, &date_str)?,
        status,
        row.get(4)?, // durationMinutes
        parse_time(5, row.get(5)?)?,
    ))
}

fn query_habits(conn: &Connection, sql: &str) -> Result<Vec<Habit>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let habit_iter = stmt.query_map([], habit_from_row)?;

    let mut habits = Vec::new();
    for habit in habit_iter {
        habits.push(habit?);
    }

    Ok(habits)
}

#[async_trait]
impl HabitStorage for SqliteStorage {
    async fn create_habit(
        &self,
        name: &str,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> Result<HabitId, StorageError> {
        // Stored to the millisecond; keep the returned value in step
        let created_at = self.clock.now().trunc_subsecs(3);
        let today = created_at.date();

        let habit_id = self
            .with_connection(move |conn| {
                // Habit and today's record land together or not at all
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO habits (name, createdAt, deletedAt, scheduledTime, isCritical)
                     VALUES (?1, ?2, NULL, ?3, ?4)",
                    params![
                        name,
                        created_at.format(TIMESTAMP_FORMAT).to_string(),
                        scheduled_time.as_ref().map(|t| t.as_str()),
                        is_critical
                    ],
                )?;
                let habit_id = HabitId(tx.last_insert_rowid());
                upsert_record(&tx, habit_id, today, &RecordUpdate::pending())?;
                tx.commit()?;
                Ok(habit_id)
            })
            .await?;

        tracing::debug!("Created habit: {} ({})", name, habit_id);
        Ok(habit_id)
    }

    async fn update_habit_scheduled_time(
        &self,
        habit_id: HabitId,
        scheduled_time: Option<TimeOfDay>,
    ) -> Result<(), StorageError> {
        let rows = self
            .with_connection(move |conn| {
                Ok(conn.execute(
                    "UPDATE habits SET scheduledTime = ?1 WHERE id = ?2",
                    params![scheduled_time.as_ref().map(|t| t.as_str()), habit_id.0],
                )?)
            })
            .await?;

        tracing::debug!("Updated scheduled time for habit {} ({} rows)", habit_id, rows);
        Ok(())
    }

    async fn get_all_active_habits(&self) -> Result<Vec<Habit>, StorageError> {
        self.with_connection(|conn| {
            query_habits(
                conn,
                &format!(
                    "SELECT {} FROM habits WHERE deletedAt IS NULL ORDER BY createdAt ASC, id ASC",
                    HABIT_COLUMNS
                ),
            )
        })
        .await
    }

    async fn delete_habit(&self, habit_id: HabitId) -> Result<(), StorageError> {
        let today = self.clock.today();

        // A habit that is already deleted keeps its original deletion day
        let rows = self
            .with_connection(move |conn| {
                Ok(conn.execute(
                    "UPDATE habits SET deletedAt = ?1 WHERE id = ?2 AND deletedAt IS NULL",
                    params![format_date(today), habit_id.0],
                )?)
            })
            .await?;

        tracing::debug!("Soft deleted habit {} as of {} ({} rows)", habit_id, today, rows);
        Ok(())
    }

    async fn create_or_replace_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError> {
        self.with_connection(move |conn| upsert_record(conn, habit_id, date, &update))
            .await?;
        Ok(())
    }

    async fn get_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StorageError> {
        self.with_connection(move |conn| {
            let record = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM habit_records WHERE habitId = ?1 AND date = ?2",
                        RECORD_COLUMNS
                    ),
                    params![habit_id.0, format_date(date)],
                    record_from_row,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn update_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError> {
        self.with_connection(move |conn| {
            let rows = conn.execute(
                "UPDATE habit_records
                 SET status = ?1, durationMinutes = ?2, completionTime = ?3
                 WHERE habitId = ?4 AND date = ?5",
                params![
                    update.status.as_str(),
                    update.duration_minutes,
                    update.completion_time.as_ref().map(|t| t.as_str()),
                    habit_id.0,
                    format_date(date)
                ],
            )?;

            if rows == 0 {
                upsert_record(conn, habit_id, date, &update)?;
            }
            Ok(())
        })
        .await?;

        tracing::debug!("Updated record for habit {} on {}", habit_id, date);
        Ok(())
    }

    async fn get_habits_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<HabitWithStatus>, StorageError> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT h.id, h.name, h.createdAt, h.deletedAt, h.scheduledTime, h.isCritical,
                        COALESCE(hr.status, 'pending'), hr.durationMinutes, hr.completionTime
                 FROM habits h
                 LEFT JOIN habit_records hr ON h.id = hr.habitId AND hr.date = ?1
                 WHERE DATE(h.createdAt) <= ?1
                   AND (h.deletedAt IS NULL OR DATE(h.deletedAt) > ?1)
                 ORDER BY h.createdAt ASC, h.id ASC",
            )?;

            let rows = stmt.query_map(params![format_date(date)], |row| {
                let habit = habit_from_row(row)?;
                let status_str: String = row.get(6)?;
                let status = status_str
                    .parse::<RecordStatus>()
                    .map_err(|_| invalid_column(6, "Invalid status"))?;

                Ok(HabitWithStatus {
                    habit,
                    status,
                    duration_minutes: row.get(7)?,
                    completion_time: parse_time(8, row.get(8)?)?,
                })
            })?;

            let mut habits = Vec::new();
            for habit in rows {
                habits.push(habit?);
            }
            Ok(habits)
        })
        .await
    }
}

#[async_trait]
impl StorageDiagnostics for SqliteStorage {
    async fn all_habits(&self) -> Result<Vec<Habit>, StorageError> {
        self.with_connection(|conn| {
            query_habits(
                conn,
                &format!("SELECT {} FROM habits ORDER BY createdAt ASC, id ASC", HABIT_COLUMNS),
            )
        })
        .await
    }

    async fn all_records(&self) -> Result<Vec<HabitRecord>, StorageError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM habit_records ORDER BY date DESC, habitId ASC",
                RECORD_COLUMNS
            ))?;
            let record_iter = stmt.query_map([], record_from_row)?;

            let mut records = Vec::new();
            for record in record_iter {
                records.push(record?);
            }
            Ok(records)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
