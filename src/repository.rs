/// Backend selection and forwarding
///
/// The repository opens exactly one backend, chosen from the configuration,
/// and forwards every call to it unchanged. A backend that fails to open is
/// reported as an error; the other backend is never tried in its place.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::{BackendKind, TrackerConfig};
use crate::domain::{Clock, Habit, HabitId, HabitRecord, HabitWithStatus, RecordUpdate, TimeOfDay};
use crate::storage::{
    FileKeyValueStore, HabitStorage, KeyValueStorage, SqliteStorage, StorageBackend,
    StorageDiagnostics, StorageError,
};

pub struct HabitRepository {
    backend: Box<dyn StorageBackend>,
}

impl HabitRepository {
    /// Open the backend named by `config`
    pub async fn open(config: &TrackerConfig, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        tracing::info!("Opening {} backend in {}", config.backend, config.data_dir.display());

        tokio::fs::create_dir_all(&config.data_dir).await.map_err(|e| {
            StorageError::Initialization(format!(
                "Cannot create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        let backend: Box<dyn StorageBackend> = match config.backend {
            BackendKind::Sqlite => Box::new(SqliteStorage::new(config.database_path(), clock)?),
            BackendKind::KeyValue => {
                let store = FileKeyValueStore::open(config.key_value_dir())
                    .await
                    .map_err(|e| StorageError::Initialization(format!("Cannot open key-value store: {}", e)))?;
                Box::new(KeyValueStorage::open(Arc::new(store), clock).await?)
            }
        };

        Ok(Self { backend })
    }

    /// Wrap an already opened backend
    pub fn from_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl HabitStorage for HabitRepository {
    async fn create_habit(
        &self,
        name: &str,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> Result<HabitId, StorageError> {
        self.backend.create_habit(name, scheduled_time, is_critical).await
    }

    async fn update_habit_scheduled_time(
        &self,
        habit_id: HabitId,
        scheduled_time: Option<TimeOfDay>,
    ) -> Result<(), StorageError> {
        self.backend.update_habit_scheduled_time(habit_id, scheduled_time).await
    }

    async fn get_all_active_habits(&self) -> Result<Vec<Habit>, StorageError> {
        self.backend.get_all_active_habits().await
    }

    async fn delete_habit(&self, habit_id: HabitId) -> Result<(), StorageError> {
        self.backend.delete_habit(habit_id).await
    }

    async fn create_or_replace_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError> {
        self.backend.create_or_replace_record(habit_id, date, update).await
    }

    async fn get_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StorageError> {
        self.backend.get_record(habit_id, date).await
    }

    async fn update_record(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        update: RecordUpdate,
    ) -> Result<(), StorageError> {
        self.backend.update_record(habit_id, date, update).await
    }

    async fn get_habits_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<HabitWithStatus>, StorageError> {
        self.backend.get_habits_for_date(date).await
    }
}

#[async_trait]
impl StorageDiagnostics for HabitRepository {
    async fn all_habits(&self) -> Result<Vec<Habit>, StorageError> {
        self.backend.all_habits().await
    }

    async fn all_records(&self) -> Result<Vec<HabitRecord>, StorageError> {
        self.backend.all_records().await
    }

    fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }
}
