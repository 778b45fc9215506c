//! Streak continuity: decides whether a completion on `today` continues,
//! resets, or leaves the user's streak untouched.

use chrono::NaiveDate;

use crate::engine::calendar::days_between;
use crate::engine::types::{TaskRecord, UserRecord};

/// Advance the user-level and per-task streak counters for a completion on
/// `today`.
///
/// - first-ever completion: both streaks become 1
/// - exactly one day since the last completion: both increment
/// - a gap of more than one day: both reset to 1
/// - same-day completion: both unchanged (continuity is neither advanced
///   nor broken by a repeat event)
/// - a negative delta (clock skew, out-of-order input) takes the reset
///   branch rather than rejecting
///
/// `last_completed_day` is restamped to `today` unconditionally, including
/// on the same-day branch.
pub fn advance_streak(user: &mut UserRecord, task: &mut TaskRecord, today: NaiveDate) {
    match user.last_completed_day {
        None => {
            user.streak = 1;
            task.streak = 1;
        }
        Some(last) => match days_between(last, today) {
            0 => {}
            1 => {
                user.streak += 1;
                task.streak += 1;
            }
            _ => {
                user.streak = 1;
                task.streak = 1;
            }
        },
    }
    user.last_completed_day = Some(today);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (UserRecord, TaskRecord) {
        (UserRecord::new("u1", "Alice"), TaskRecord::new("u1", "Run"))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn first_completion_starts_both_streaks() {
        let (mut user, mut task) = fixtures();
        advance_streak(&mut user, &mut task, day(1));
        assert_eq!(user.streak, 1);
        assert_eq!(task.streak, 1);
        assert_eq!(user.last_completed_day, Some(day(1)));
    }

    #[test]
    fn consecutive_days_increment() {
        let (mut user, mut task) = fixtures();
        advance_streak(&mut user, &mut task, day(1));
        advance_streak(&mut user, &mut task, day(2));
        advance_streak(&mut user, &mut task, day(3));
        assert_eq!(user.streak, 3);
        assert_eq!(task.streak, 3);
    }

    #[test]
    fn gap_resets_to_one() {
        let (mut user, mut task) = fixtures();
        advance_streak(&mut user, &mut task, day(1));
        advance_streak(&mut user, &mut task, day(6));
        assert_eq!(user.streak, 1);
        assert_eq!(task.streak, 1);
    }

    #[test]
    fn same_day_leaves_streak_flat_but_restamps() {
        let (mut user, mut task) = fixtures();
        advance_streak(&mut user, &mut task, day(1));
        advance_streak(&mut user, &mut task, day(2));
        advance_streak(&mut user, &mut task, day(2));
        assert_eq!(user.streak, 2);
        assert_eq!(task.streak, 2);
        assert_eq!(user.last_completed_day, Some(day(2)));
    }

    #[test]
    fn backwards_day_takes_reset_branch() {
        let (mut user, mut task) = fixtures();
        advance_streak(&mut user, &mut task, day(10));
        advance_streak(&mut user, &mut task, day(11));
        advance_streak(&mut user, &mut task, day(5));
        assert_eq!(user.streak, 1);
        assert_eq!(task.streak, 1);
        assert_eq!(user.last_completed_day, Some(day(5)));
    }
}
