/// Presentation order for a day's habits
///
/// Pending habits come before done ones. Pending habits put critical ones
/// first, then go by scheduled time; done habits go by scheduled time only.
/// Unscheduled habits trail scheduled ones in both groups.

use std::cmp::Ordering;

use crate::domain::{HabitWithStatus, TimeOfDay};

/// Compare two habits for display
pub fn compare_priority(a: &HabitWithStatus, b: &HabitWithStatus) -> Ordering {
    match (a.is_done(), b.is_done()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, false) => b
            .is_critical()
            .cmp(&a.is_critical())
            .then_with(|| compare_scheduled(a.scheduled_time(), b.scheduled_time())),
        (true, true) => compare_scheduled(a.scheduled_time(), b.scheduled_time()),
    }
}

/// Scheduled before unscheduled, earlier before later
fn compare_scheduled(a: Option<&TimeOfDay>, b: Option<&TimeOfDay>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort in place; ties keep their input order
pub fn sort_by_priority(habits: &mut [HabitWithStatus]) {
    // slice::sort_by is stable
    habits.sort_by(compare_priority);
}
