//! Leaderboard projections: sortable stat views over all users with dense
//! 1-based ranks per metric.

use serde::{Deserialize, Serialize};

use crate::engine::types::UserRecord;

/// Metric a leaderboard can be ranked by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Level, ties broken by XP descending.
    Level,
    Xp,
    Coins,
    Streak,
    TasksCompleted,
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position in the sorted order. Ties are not rank-shared;
    /// every user gets a distinct sequential rank.
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub value: i64,
}

fn metric_value(user: &UserRecord, metric: Metric) -> i64 {
    match metric {
        Metric::Level => i64::from(user.level),
        Metric::Xp => i64::from(user.xp),
        Metric::Coins => user.coins,
        Metric::Streak => i64::from(user.streak),
        Metric::TasksCompleted => i64::from(user.total_tasks_completed),
    }
}

/// Rank all users by `metric`, descending. Exact ties are broken by user id
/// ascending so the ordering is deterministic and reproducible.
pub fn rank(users: &[UserRecord], metric: Metric) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&UserRecord> = users.iter().collect();
    sorted.sort_by(|a, b| {
        metric_value(b, metric)
            .cmp(&metric_value(a, metric))
            .then_with(|| match metric {
                Metric::Level => b.xp.cmp(&a.xp),
                _ => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, user)| LeaderboardEntry {
            rank: idx + 1,
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            value: metric_value(user, metric),
        })
        .collect()
}
