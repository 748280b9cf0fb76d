/// Key-value implementation of the habit storage interface
///
/// Habits and records live in memory and are written back in full, as JSON
/// blobs under fixed keys, before every mutating call returns. Id counters
/// are stored next to them so ids are never reused.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, SubsecRound};
use tokio::sync::Mutex;

use crate::domain::{
    Clock, Habit, HabitId, HabitRecord, HabitWithStatus, RecordId, RecordUpdate, TimeOfDay,
};
use crate::storage::{HabitStorage, KeyValueStore, StorageDiagnostics, StorageError};

pub const KEY_HABITS: &str = "myhabit_habits";
pub const KEY_RECORDS: &str = "myhabit_records";
pub const KEY_LAST_HABIT_ID: &str = "myhabit_last_habit_id";
pub const KEY_LAST_RECORD_ID: &str = "myhabit_last_record_id";

/// Everything the backend persists
#[derive(Debug, Clone, Default)]
struct Collections {
    habits: Vec<Habit>,
    records: Vec<HabitRecord>,
    last_habit_id: i64,
    last_record_id: i64,
}

impl Collections {
    fn habit(&self, habit_id: HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == habit_id)
    }

    fn habit_mut(&mut self, habit_id: HabitId) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|h| h.id == habit_id)
    }

    fn record(&self, habit_id: HabitId, date: NaiveDate) -> Option<&HabitRecord> {
        self.records
            .iter()
            .find(|r| r.habit_id == habit_id && r.date == date)
    }

    /// Insert or replace the record for (habit, date)
    ///
    /// Returns false when the habit is unknown or did not exist yet on
    /// `date`; nothing is written in that case.
    fn upsert_record(&mut self, habit_id: HabitId, date: NaiveDate, update: RecordUpdate) -> bool {
        let accepts = self
            .habit(habit_id)
            .map_or(false, |habit| habit.accepts_records_on(date));
        if !accepts {
            tracing::debug!("Skipped record for habit {} on {}: no such habit on that date", habit_id, date);
            return false;
        }

        // Replacing assigns a fresh row id, like INSERT OR REPLACE
        self.records
            .retain(|r| !(r.habit_id == habit_id && r.date == date));
        self.last_record_id += 1;
        self.records.push(HabitRecord::from_existing(
            RecordId(self.last_record_id),
            habit_id,
            date,
            update.status,
            update.duration_minutes,
            update.completion_time,
        ));
        true
    }

    /// Append a new habit under the next id
    fn add_habit(
        &mut self,
        name: String,
        created_at: NaiveDateTime,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> HabitId {
        self.last_habit_id += 1;
        let habit_id = HabitId(self.last_habit_id);
        self.habits.push(Habit::from_existing(
            habit_id,
            name,
            created_at,
            None,
            scheduled_time,
            is_critical,
        ));
        habit_id
    }

    /// Visible habits, oldest first
    fn visible_on(&self, date: NaiveDate) -> Vec<&Habit> {
        let mut habits: Vec<&Habit> = self
            .habits
            .iter()
            .filter(|h| h.is_visible_on(date))
            .collect();
        habits.sort_by_key(|h| (h.created_at, h.id));
        habits
    }
}

/// Key-value backed storage
///
/// `createdAt` is kept to the millisecond, the precision the relational
/// backend stores.
pub struct KeyValueStorage {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<Collections>,
    clock: Arc<dyn Clock>,
}

impl KeyValueStorage {
    /// Load the persisted collections from `store`
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let state = Self::load(store.as_ref())
            .await
            .map_err(|e| StorageError::Initialization(format!("Failed to load key-value storage: {}", e)))?;

        tracing::info!(
            "Key-value storage initialized: {} habits, {} records",
            state.habits.len(),
            state.records.len()
        );

        Ok(Self {
            store,
            state: Mutex::new(state),
            clock,
        })
    }

    async fn load(store: &dyn KeyValueStore) -> Result<Collections, StorageError> {
        let habits: Vec<Habit> = match store.get(KEY_HABITS).await? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        let records: Vec<HabitRecord> = match store.get(KEY_RECORDS).await? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        // Never hand out an id that is already taken, even if a counter was lost
        let max_habit_id = habits.iter().map(|h| h.id.0).max().unwrap_or(0);
        let max_record_id = records.iter().map(|r| r.id.0).max().unwrap_or(0);
        let last_habit_id = Self::load_counter(store, KEY_LAST_HABIT_ID).await?.max(max_habit_id);
        let last_record_id = Self::load_counter(store, KEY_LAST_RECORD_ID).await?.max(max_record_id);

        Ok(Collections {
            habits,
            records,
            last_habit_id,
            last_record_id,
        })
    }

    async fn load_counter(store: &dyn KeyValueStore, key: &'static str) -> Result<i64, StorageError> {
        match store.get(key).await? {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .map_err(|_| StorageError::CorruptValue { field: key, value }),
            None => Ok(0),
        }
    }

    /// Write all four blobs as one batch
    async fn persist(&self, state: &Collections) -> Result<(), StorageError> {
        let entries = [
            (KEY_HABITS, serde_json::to_string(&state.habits)?),
            (KEY_RECORDS, serde_json::to_string(&state.records)?),
            (KEY_LAST_HABIT_ID, state.last_habit_id.to_string()),
            (KEY_LAST_RECORD_ID, state.last_record_id.to_string()),
        ];
        self.store.set_many(&entries).await
    }

    /// Apply `change` to a copy of the collections and persist it
    ///
    /// The in-memory state is only replaced once the store has accepted the
    /// new collections, so a failed write leaves the backend as it was.
    async fn commit<T, F>(&self, change: F) -> Result<T, StorageError>
    where
        T: Send,
        F: FnOnce(&mut Collections) -> T + Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();

        let result = change(&mut next);
        self.persist(&next).await?;
        *state = next;
        Ok(result)
    }

    /// Like `commit`, but `change` returns `None` when it changed nothing
    /// and nothing is written
    async fn mutate<T, F>(&self, change: F) -> Result<Option<T>, StorageError>
    where
        T: Send,
        F: FnOnce(&mut Collections) -> Option<T> + Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();

        let result = change(&mut next);
        if result.is_some() {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(result)
    }

    async fn read<T, F>(&self, query: F) -> T
    where
        F: FnOnce(&Collections) -> T + Send,
    {
        let state = self.state.lock().await;
        query(&state)
    }
}

#[async_trait]
impl HabitStorage for KeyValueStorage {
    async fn create_habit(
        &self,
        name: &str,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> Result<HabitId, StorageError> {
        let created_at = self.clock.now().trunc_subsecs(3);
        let today = created_at.date();

        let habit_id = self
            .commit(move |state| {
                let habit_id = state.add_habit(name.to_string(), created_at, scheduled_time, is_critical);
                state.upsert_record(habit_id, today, RecordUpdate::pending());
                habit_id
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
        let updated = self
            .mutate(move |state| {
                let habit = state.habit_mut(habit_id)?;
                habit.scheduled_time = scheduled_time;
                Some(())
            })
            .await?;

        tracing::debug!("Updated scheduled time for habit {} (found: {})", habit_id, updated.is_some());
        Ok(())
    }

    async fn get_all_active_habits(&self) -> Result<Vec<Habit>, StorageError> {
        Ok(self
            .read(|state| {
                let mut habits: Vec<Habit> = state
                    .habits
                    .iter()
                    .filter(|h| h.is_active())
                    .cloned()
                    .collect();
                habits.sort_by_key(|h| (h.created_at, h.id));
                habits
            })
            .await)
    }

    async fn delete_habit(&self, habit_id: HabitId) -> Result<(), StorageError> {
        let today = self.clock.today();

        let deleted = self
            .mutate(move |state| {
                let habit = state.habit_mut(habit_id)?;
                // A habit that is already deleted keeps its original deletion day
                if habit.deleted_at.is_some() {
                    return None;
                }
                habit.deleted_at = Some(today);
                Some(())
            })
            .await?;

        tracing::debug!("Soft deleted habit {} as of {} (changed: {})", habit_id, today, deleted.is_some());
        Ok(())
    }

    async fn create_or_replace_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError> {
        self.mutate(move |state| state.upsert_record(habit_id, date, update).then_some(()))
            .await?;
        Ok(())
    }

    async fn get_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StorageError> {
        Ok(self
            .read(move |state| state.record(habit_id, date).cloned())
            .await)
    }

    async fn update_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError> {
        self.mutate(move |state| {
            match state
                .records
                .iter_mut()
                .find(|r| r.habit_id == habit_id && r.date == date)
            {
                Some(record) => {
                    record.status = update.status;
                    record.duration_minutes = update.duration_minutes;
                    record.completion_time = update.completion_time;
                    Some(())
                }
                None => state.upsert_record(habit_id, date, update).then_some(()),
            }
        })
        .await?;

        tracing::debug!("Updated record for habit {} on {}", habit_id, date);
        Ok(())
    }

    async fn get_habits_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<HabitWithStatus>, StorageError> {
        Ok(self
            .read(move |state| {
                let records: HashMap<HabitId, &HabitRecord> = state
                    .records
                    .iter()
                    .filter(|r| r.date == date)
                    .map(|r| (r.habit_id, r))
                    .collect();

                state
                    .visible_on(date)
                    .into_iter()
                    .map(|habit| HabitWithStatus::from_parts(habit.clone(), records.get(&habit.id).copied()))
                    .collect()
            })
            .await)
    }
}

#[async_trait]
impl StorageDiagnostics for KeyValueStorage {
    async fn all_habits(&self) -> Result<Vec<Habit>, StorageError> {
        Ok(self
            .read(|state| {
                let mut habits = state.habits.clone();
                habits.sort_by_key(|h| (h.created_at, h.id));
                habits
            })
            .await)
    }

    async fn all_records(&self) -> Result<Vec<HabitRecord>, StorageError> {
        Ok(self
            .read(|state| {
                let mut records = state.records.clone();
                records.sort_by(|a, b| b.date.cmp(&a.date).then(a.habit_id.cmp(&b.habit_id)));
                records
            })
            .await)
    }

    fn backend_name(&self) -> &'static str {
        "kv"
    }
}
