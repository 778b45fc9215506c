//! Calendar-day arithmetic shared by the streak and quest/challenge logic.
//!
//! Streak continuity and time-boxed objectives operate on whole calendar
//! days in UTC, never on raw instants.

use chrono::{DateTime, NaiveDate, Utc};

/// Convert an instant to its UTC calendar day.
pub fn day_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Today's UTC calendar day.
pub fn today() -> NaiveDate {
    day_of(Utc::now())
}

/// Signed whole-day delta `to - from`. Negative when `to` precedes `from`
/// (clock skew or out-of-order input).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}
