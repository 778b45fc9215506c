//! Progression and objective-evaluation engine.
//!
//! The engine turns a single "task completed" or "check progress" event
//! into updates of XP, coins, level, streak continuity, badge unlocking,
//! and quest/challenge completion. Persistence is a sled-backed store;
//! operations that modify a user run under that user's serialization guard
//! so idempotency checks and the leveling carry-over never race.

pub mod badges;
pub mod calendar;
pub mod catalog;
pub mod completion;
pub mod errors;
pub mod leaderboard;
pub mod lifecycle;
pub mod objective;
pub mod rewards;
pub mod shop;
pub mod storage;
pub mod streak;
pub mod types;

pub use badges::{grant_badges, BADGE_STREAK_30, BADGE_STREAK_7, BADGE_TASKS_10, BADGE_TASKS_50};
pub use calendar::{day_of, days_between, today};
pub use catalog::TemplateCatalog;
pub use completion::complete_task;
pub use errors::{EngineError, Rejection};
pub use leaderboard::{rank, LeaderboardEntry, Metric};
pub use lifecycle::{
    abandon_quest, active_quests, check_challenge, check_quest, completed_quests, start_challenge,
    start_quest, sweep_challenges,
};
pub use objective::{evaluate, EvalContext, ProgressSnapshot};
pub use rewards::{apply_reward, CoinSource};
pub use shop::{owned_inventory_value, purchase_item, ShopItem};
pub use storage::{Store, StoreBuilder};
pub use types::*;
