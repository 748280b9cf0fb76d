/// Read-only dump of everything the active backend holds
///
/// Built purely from backend reads; nothing here materializes records or
/// otherwise writes.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::domain::{Habit, HabitRecord, HabitWithStatus};
use crate::service::HabitService;
use crate::storage::{HabitStorage, StorageDiagnostics};
use crate::TrackerError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    pub backend: &'static str,
    pub today: NaiveDate,
    /// Including deleted habits
    pub all_habits: Vec<Habit>,
    pub active_habits: Vec<Habit>,
    pub all_records: Vec<HabitRecord>,
    pub today_habits: Vec<HabitWithStatus>,
    pub yesterday_habits: Vec<HabitWithStatus>,
}

/// Capture the current state of the service's backend
pub async fn snapshot(service: &HabitService) -> Result<DiagnosticsReport, TrackerError> {
    let repository = service.repository();
    let today = service.today();
    let yesterday = today - Duration::days(1);

    Ok(DiagnosticsReport {
        backend: repository.backend_name(),
        today,
        all_habits: repository.all_habits().await?,
        active_habits: repository.get_all_active_habits().await?,
        all_records: repository.all_records().await?,
        today_habits: repository.get_habits_for_date(today).await?,
        yesterday_habits: repository.get_habits_for_date(yesterday).await?,
    })
}
