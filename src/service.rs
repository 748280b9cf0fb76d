/// The habit data service
///
/// Resolves "today", makes sure every visible habit has a concrete record
/// for a day before that day is read, maps rows to view models and orders
/// today's list for display. Storage errors pass through untouched.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::TrackerConfig;
use crate::domain::{
    format_date, sort_by_priority, Clock, Habit, HabitId, HabitWithStatus, RecordUpdate, TimeOfDay,
};
use crate::repository::HabitRepository;
use crate::storage::HabitStorage;
use crate::TrackerError;

/// Entry point for everything that reads or changes habits
///
/// Construct one per process and pass it to whoever needs it.
pub struct HabitService {
    repository: HabitRepository,
    clock: Arc<dyn Clock>,
}

impl HabitService {
    pub fn new(repository: HabitRepository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Open the configured backend and build the service on top of it
    pub async fn open(config: &TrackerConfig, clock: Arc<dyn Clock>) -> Result<Self, TrackerError> {
        let repository = HabitRepository::open(config, clock.clone()).await?;
        Ok(Self::new(repository, clock))
    }

    pub fn repository(&self) -> &HabitRepository {
        &self.repository
    }

    /// Today's local calendar date, recomputed on every call
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Today as "YYYY-MM-DD"
    pub fn today_date_string(&self) -> String {
        format_date(self.today())
    }

    /// Create a habit; it gets a pending record for today straight away
    pub async fn create_habit(
        &self,
        name: &str,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> Result<HabitId, TrackerError> {
        let name = Habit::validate_name(name)?;
        let habit_id = self
            .repository
            .create_habit(&name, scheduled_time, is_critical)
            .await?;

        tracing::info!("Created habit '{}' ({})", name, habit_id);
        Ok(habit_id)
    }

    pub async fn update_habit_scheduled_time(
        &self,
        habit_id: HabitId,
        scheduled_time: Option<TimeOfDay>,
    ) -> Result<(), TrackerError> {
        self.repository
            .update_habit_scheduled_time(habit_id, scheduled_time)
            .await?;
        Ok(())
    }

    /// Today's habits in display order
    pub async fn get_today_habits(&self) -> Result<Vec<HabitWithStatus>, TrackerError> {
        let today = self.today();
        let mut habits = self.load_day(today).await?;
        sort_by_priority(&mut habits);
        Ok(habits)
    }

    /// Habits as they stood on `date`, oldest first
    ///
    /// Backfills pending records for habits that existed on `date` but never
    /// got one.
    pub async fn get_habits_for_date(&self, date: NaiveDate) -> Result<Vec<HabitWithStatus>, TrackerError> {
        self.load_day(date).await
    }

    async fn load_day(&self, date: NaiveDate) -> Result<Vec<HabitWithStatus>, TrackerError> {
        self.ensure_records_for_date(date).await?;
        let habits = self.repository.get_habits_for_date(date).await?;

        tracing::debug!("Loaded {} habits for {}", habits.len(), date);
        Ok(habits)
    }

    /// Give every habit visible on `date` a record, returning how many were created
    ///
    /// Stops at the first failed write.
    pub async fn ensure_records_for_date(&self, date: NaiveDate) -> Result<usize, TrackerError> {
        let visible = self.repository.get_habits_for_date(date).await?;

        let mut created = 0;
        for habit in &visible {
            if self.repository.get_record(habit.id(), date).await?.is_none() {
                self.repository
                    .create_or_replace_record(habit.id(), date, RecordUpdate::pending())
                    .await?;
                created += 1;
            }
        }

        if created > 0 {
            tracing::debug!("Materialized {} pending records for {}", created, date);
        }
        Ok(created)
    }

    /// Mark today's record done
    ///
    /// Deleted habits are accepted; they are already hidden from today on.
    pub async fn mark_habit_done(
        &self,
        habit_id: HabitId,
        duration_minutes: Option<u32>,
        completion_time: Option<TimeOfDay>,
    ) -> Result<(), TrackerError> {
        let today = self.today();
        self.repository
            .update_record(habit_id, today, RecordUpdate::done(duration_minutes, completion_time))
            .await?;

        tracing::info!("Marked habit {} done for {}", habit_id, today);
        Ok(())
    }

    /// Reset today's record to pending, clearing duration and completion time
    pub async fn mark_habit_pending(&self, habit_id: HabitId) -> Result<(), TrackerError> {
        let today = self.today();
        self.repository
            .update_record(habit_id, today, RecordUpdate::pending())
            .await?;

        tracing::info!("Reset habit {} to pending for {}", habit_id, today);
        Ok(())
    }

    /// Soft delete: the habit disappears from today onwards
    pub async fn delete_habit(&self, habit_id: HabitId) -> Result<(), TrackerError> {
        self.repository.delete_habit(habit_id).await?;

        tracing::info!("Deleted habit {}", habit_id);
        Ok(())
    }
}
