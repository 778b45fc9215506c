//! One-time badge grants driven by streak and completion counters.

use crate::engine::types::UserRecord;

pub const BADGE_STREAK_7: &str = "streak_7";
pub const BADGE_STREAK_30: &str = "streak_30";
pub const BADGE_TASKS_10: &str = "tasks_10";
pub const BADGE_TASKS_50: &str = "tasks_50";

/// Inspect the user's counters and grant any badges whose threshold was
/// just reached. Returns the newly granted badge identifiers.
///
/// Checks fire on exact equality, not `>=`: this is an exact-match policy,
/// not a one-time-crossing policy. With the +1 increments used here the two
/// coincide, but a counter tuned to jump past a threshold would silently
/// skip its badge. Already-held badges are never granted twice.
pub fn grant_badges(user: &mut UserRecord) -> Vec<String> {
    let mut granted = Vec::new();

    let checks: [(&str, bool); 4] = [
        (BADGE_STREAK_7, user.streak == 7),
        (BADGE_STREAK_30, user.streak == 30),
        (BADGE_TASKS_10, user.total_tasks_completed == 10),
        (BADGE_TASKS_50, user.total_tasks_completed == 50),
    ];

    for (badge, hit) in checks {
        if hit && !user.has_badge(badge) {
            user.badges.push(badge.to_string());
            granted.push(badge.to_string());
        }
    }

    granted
}
