//! Task completion orchestrator: the entry point for "complete task".
//!
//! Enforces the once-per-day idempotency rule, then runs the streak,
//! reward, and badge passes in sequence. Either every cascade applies and
//! both records are persisted, or nothing runs at all.

use chrono::NaiveDate;
use log::{debug, info};

use crate::engine::badges::grant_badges;
use crate::engine::errors::{EngineError, Rejection};
use crate::engine::rewards::{apply_reward, CoinSource};
use crate::engine::storage::Store;
use crate::engine::streak::advance_streak;
use crate::engine::types::CompletionOutcome;
use crate::logutil::escape_log;

/// Complete `task_id` for `user_id` on the calendar day `today`.
///
/// Rejects with [`Rejection::AlreadyCompletedToday`] when the task already
/// has a completion recorded for `today`; the second of two concurrent
/// completions for the same user+task pair sees the first one's write
/// because the whole read-modify-write cycle runs under the user's guard.
pub fn complete_task(
    store: &Store,
    user_id: &str,
    task_id: &str,
    today: NaiveDate,
) -> Result<CompletionOutcome, EngineError> {
    let guard = store.user_guard(user_id);
    let _held = guard
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let mut user = store.ensure_user(user_id)?;
    let mut task = store.get_task(user_id, task_id)?;

    if task.completed_on(today) {
        debug!(
            "rejecting repeat completion of '{}' for {}",
            escape_log(&task.title),
            user_id
        );
        return Err(Rejection::AlreadyCompletedToday.into());
    }

    task.completed_dates.insert(today);
    task.completed = true;

    advance_streak(&mut user, &mut task, today);
    user.total_tasks_completed += 1;

    let levels_gained = apply_reward(&mut user, task.xp_reward, task.coin_reward, CoinSource::Earned);
    let new_badges = grant_badges(&mut user);

    if levels_gained > 0 {
        info!("{} reached level {}", user_id, user.level);
    }
    for badge in &new_badges {
        info!("{} unlocked badge {}", user_id, badge);
    }

    let outcome = CompletionOutcome {
        xp_awarded: task.xp_reward,
        coins_awarded: task.coin_reward,
        level_up: levels_gained > 0,
        levels_gained,
        new_badges,
    };

    store.put_task_and_user(task, user)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::badges::BADGE_TASKS_10;
    use crate::engine::storage::StoreBuilder;
    use crate::engine::types::{TaskRecord, UserRecord, LEVEL_UP_COIN_BONUS};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store) {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn seed_task(store: &Store, user_id: &str, xp: u32, coins: i64) -> String {
        let task = TaskRecord::new(user_id, "Read a chapter").with_rewards(xp, coins);
        let id = task.id.clone();
        store.put_task(task).expect("put task");
        id
    }

    #[test]
    fn fresh_user_first_completion() {
        let (_dir, store) = setup();
        let task_id = seed_task(&store, "alice", 10, 5);

        let outcome = complete_task(&store, "alice", &task_id, day(1)).expect("complete");
        assert_eq!(outcome.xp_awarded, 10);
        assert_eq!(outcome.coins_awarded, 5);
        assert!(!outcome.level_up);
        assert!(outcome.new_badges.is_empty());

        let user = store.get_user("alice").expect("user");
        assert_eq!(user.xp, 10);
        assert_eq!(user.coins, 5);
        assert_eq!(user.streak, 1);
        assert_eq!(user.total_tasks_completed, 1);

        let task = store.get_task("alice", &task_id).expect("task");
        assert!(task.completed);
        assert!(task.completed_on(day(1)));
        assert_eq!(task.streak, 1);
    }

    #[test]
    fn second_completion_same_day_is_rejected_without_change() {
        let (_dir, store) = setup();
        let task_id = seed_task(&store, "alice", 10, 5);

        complete_task(&store, "alice", &task_id, day(1)).expect("first");
        let before_user = store.get_user("alice").expect("user");
        let before_task = store.get_task("alice", &task_id).expect("task");

        let err = complete_task(&store, "alice", &task_id, day(1)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Rejected(Rejection::AlreadyCompletedToday)
        ));

        let after_user = store.get_user("alice").expect("user");
        let after_task = store.get_task("alice", &task_id).expect("task");
        assert_eq!(after_user.xp, before_user.xp);
        assert_eq!(after_user.coins, before_user.coins);
        assert_eq!(after_user.streak, before_user.streak);
        assert_eq!(after_user.total_tasks_completed, before_user.total_tasks_completed);
        assert_eq!(after_task.completed_dates, before_task.completed_dates);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let (_dir, store) = setup();
        let err = complete_task(&store, "alice", "missing", day(1)).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn level_up_applies_bonus_and_carries_xp() {
        let (_dir, store) = setup();
        let mut user = UserRecord::new("alice", "Alice");
        user.xp = 95;
        store.put_user(user).expect("put user");
        let task_id = seed_task(&store, "alice", 10, 0);

        let outcome = complete_task(&store, "alice", &task_id, day(1)).expect("complete");
        assert!(outcome.level_up);
        assert_eq!(outcome.levels_gained, 1);

        let user = store.get_user("alice").expect("user");
        assert_eq!(user.level, 2);
        assert_eq!(user.xp, 5);
        assert_eq!(user.coins, LEVEL_UP_COIN_BONUS);
    }

    #[test]
    fn streak_sequence_across_days() {
        let (_dir, store) = setup();
        let task_id = seed_task(&store, "alice", 10, 5);

        complete_task(&store, "alice", &task_id, day(1)).expect("d1");
        complete_task(&store, "alice", &task_id, day(2)).expect("d2");
        complete_task(&store, "alice", &task_id, day(3)).expect("d3");
        assert_eq!(store.get_user("alice").unwrap().streak, 3);

        complete_task(&store, "alice", &task_id, day(8)).expect("gap");
        assert_eq!(store.get_user("alice").unwrap().streak, 1);
    }

    #[test]
    fn poisoned_guard_does_not_block_completion() {
        let (_dir, store) = setup();
        let task_id = seed_task(&store, "alice", 10, 5);

        let guard = store.user_guard("alice");
        let poisoner = guard.clone();
        let _ = std::thread::spawn(move || {
            let _held = poisoner.lock().unwrap();
            panic!("poison the guard");
        })
        .join();
        assert!(guard.is_poisoned());

        let outcome = complete_task(&store, "alice", &task_id, day(1)).expect("complete");
        assert_eq!(outcome.xp_awarded, 10);
        assert_eq!(store.get_user("alice").unwrap().streak, 1);
    }

    #[test]
    fn tenth_completion_grants_tasks_badge() {
        let (_dir, store) = setup();
        let task_id = seed_task(&store, "alice", 1, 1);

        for d in 1..=9 {
            complete_task(&store, "alice", &task_id, day(d)).expect("complete");
        }
        let outcome = complete_task(&store, "alice", &task_id, day(10)).expect("tenth");
        assert_eq!(outcome.new_badges, vec![BADGE_TASKS_10.to_string()]);
    }
}
