/// The per-day view model handed to callers
///
/// A habit joined with its record for one date. Days without a record read
/// as pending with no duration or completion time.

use serde::{Deserialize, Serialize};
use crate::domain::{Habit, HabitId, HabitRecord, RecordStatus, TimeOfDay};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitWithStatus {
    #[serde(flatten)]
    pub habit: Habit,
    pub status: RecordStatus,
    pub duration_minutes: Option<u32>,
    pub completion_time: Option<TimeOfDay>,
}

impl HabitWithStatus {
    /// Join a habit with its (possibly missing) record for the day
    pub fn from_parts(habit: Habit, record: Option<&HabitRecord>) -> Self {
        match record {
            Some(record) => Self {
                habit,
                status: record.status,
                duration_minutes: record.duration_minutes,
                completion_time: record.completion_time.clone(),
            },
            None => Self {
                habit,
                status: RecordStatus::Pending,
                duration_minutes: None,
                completion_time: None,
            },
        }
    }

    pub fn id(&self) -> HabitId {
        self.habit.id
    }

    pub fn name(&self) -> &str {
        &self.habit.name
    }

    pub fn scheduled_time(&self) -> Option<&TimeOfDay> {
        self.habit.scheduled_time.as_ref()
    }

    pub fn is_critical(&self) -> bool {
        self.habit.is_critical
    }

    pub fn is_done(&self) -> bool {
        self.status == RecordStatus::Done
    }
}
