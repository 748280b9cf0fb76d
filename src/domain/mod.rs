/// Domain module containing the habit data model
///
/// This module defines the core entities (Habit, HabitRecord) and the
/// HabitWithStatus view model, together with the date helpers, the time
/// source and the priority ordering used to present a day's habits.

pub mod habit;
pub mod record;
pub mod status;
pub mod ordering;
pub mod dates;
pub mod types;

// Re-export public types for easy access
pub use habit::*;
pub use record::*;
pub use status::*;
pub use ordering::*;
pub use dates::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid time of day '{0}', expected HH:MM (24-hour)")]
    InvalidTime(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid record status: {0}")]
    InvalidStatus(String),
}
