//! Next-occurrence date math for recurring bookings
//!
//! Pure calendar arithmetic, no I/O. Completing a recurring booking asks
//! this module for the successor's schedule time.

use chrono::{DateTime, Days, Months, Utc};

use crate::domain::bookings::RecurrenceType;

/// When the next occurrence of a recurring booking lands.
///
/// Daily and weekly shift by whole days, keeping the time of day. Monthly
/// adds one calendar month, clamping to the last valid day of the receiving
/// month (Jan 31 -> Feb 28/29). Non-recurring bookings have no successor.
pub fn next_occurrence(
    from: DateTime<Utc>,
    recurrence: RecurrenceType,
) -> Option<DateTime<Utc>> {
    match recurrence {
        RecurrenceType::None => None,
        RecurrenceType::Daily => from.checked_add_days(Days::new(1)),
        RecurrenceType::Weekly => from.checked_add_days(Days::new(7)),
        RecurrenceType::Monthly => from.checked_add_months(Months::new(1)),
    }
}
