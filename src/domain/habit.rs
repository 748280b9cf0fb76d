/// Habit entity and its visibility window
///
/// This module defines the Habit struct that represents something the user
/// wants to do every day, along with the soft-delete visibility rule shared
/// by both storage backends.

use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveDateTime};
use crate::domain::{DomainError, HabitId, TimeOfDay};

/// A habit the user tracks once per calendar day
///
/// Habits are never physically removed. Deleting one sets `deleted_at` to
/// the deletion day, which hides it from that day forward while leaving its
/// history visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Backend-assigned identifier
    pub id: HabitId,
    /// Display name (e.g., "Exercise", "Read")
    pub name: String,
    /// Local wall-clock time the habit was created
    pub created_at: NaiveDateTime,
    /// First day the habit is no longer visible, if deleted
    pub deleted_at: Option<NaiveDate>,
    /// Planned time of day
    pub scheduled_time: Option<TimeOfDay>,
    /// Critical habits are listed first while pending
    #[serde(default)]
    pub is_critical: bool,
}

impl Habit {
    /// Create a habit from existing data (used when loading from storage)
    pub fn from_existing(
        id: HabitId,
        name: String,
        created_at: NaiveDateTime,
        deleted_at: Option<NaiveDate>,
        scheduled_time: Option<TimeOfDay>,
        is_critical: bool,
    ) -> Self {
        Self {
            id,
            name,
            created_at,
            deleted_at,
            scheduled_time,
            is_critical,
        }
    }

    /// Calendar day the habit was created
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date()
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether the habit shows up in the listing for `date`
    ///
    /// Visible from its creation day (inclusive) up to its deletion day
    /// (exclusive).
    pub fn is_visible_on(&self, date: NaiveDate) -> bool {
        self.created_on() <= date && self.deleted_at.map_or(true, |deleted| deleted > date)
    }

    /// Whether a record may exist for `date`
    ///
    /// Records never predate the habit. Deleted habits still accept records
    /// so that late completions of the deletion day are not lost.
    pub fn accepts_records_on(&self, date: NaiveDate) -> bool {
        self.created_on() <= date
    }

    /// Validate and normalize a habit name
    pub fn validate_name(name: &str) -> Result<String, DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        Ok(trimmed.to_string())
    }
}
