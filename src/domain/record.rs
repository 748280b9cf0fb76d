/// HabitRecord entity for tracking a habit's state on one day
///
/// Each (habit, date) pair has at most one record. Records are created
/// pending and updated in place as the user completes or resets a habit.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{HabitId, RecordId, RecordStatus, TimeOfDay};

/// The completion state of one habit on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    /// Backend-assigned row id
    pub id: RecordId,
    /// Which habit this record is for
    pub habit_id: HabitId,
    /// The calendar day this record covers
    pub date: NaiveDate,
    pub status: RecordStatus,
    /// How long the habit took, in minutes
    pub duration_minutes: Option<u32>,
    /// When the habit was completed
    pub completion_time: Option<TimeOfDay>,
}

impl HabitRecord {
    /// Create a record from existing data (used when loading from storage)
    pub fn from_existing(
        id: RecordId,
        habit_id: HabitId,
        date: NaiveDate,
        status: RecordStatus,
        duration_minutes: Option<u32>,
        completion_time: Option<TimeOfDay>,
    ) -> Self {
        Self {
            id,
            habit_id,
            date,
            status,
            duration_minutes,
            completion_time,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == RecordStatus::Done
    }
}

/// The values written by a record upsert
///
/// Grouped so the backend operations keep a short signature; the key is
/// passed separately.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordUpdate {
    pub status: RecordStatus,
    pub duration_minutes: Option<u32>,
    pub completion_time: Option<TimeOfDay>,
}

impl RecordUpdate {
    /// A fresh pending record with no details
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn done(duration_minutes: Option<u32>, completion_time: Option<TimeOfDay>) -> Self {
        Self {
            status: RecordStatus::Done,
            duration_minutes,
            completion_time,
        }
    }
}
