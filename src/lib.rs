//! # HabitForge - Gamified Habit and Task Tracking
//!
//! HabitForge is a habit/task tracker with progression mechanics: completing
//! tasks earns experience points, coins, and streaks; streaks and totals
//! unlock one-time badges; quests and time-boxed challenges track objectives
//! over the same state and pay out snapshotted rewards on completion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use habitforge::config::Config;
//! use habitforge::engine::{self, Store, TaskRecord, TemplateCatalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = Store::open(&config.storage.data_dir)?;
//!     let catalog = TemplateCatalog::load_or_builtin(&config.tracker.seed_dir)?;
//!
//!     let task = TaskRecord::new("alice", "Morning run").with_rewards(10, 5);
//!     let task_id = task.id.clone();
//!     store.put_task(task)?;
//!     let outcome = engine::complete_task(&store, "alice", &task_id, engine::today())?;
//!     println!("+{} xp, +{} coins", outcome.xp_awarded, outcome.coins_awarded);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Progression rules: rewards, streaks, badges, task
//!   completion, objective evaluation, quest/challenge lifecycle,
//!   leaderboard, shop, and the sled-backed store
//! - [`config`] - Configuration management and validation
//! - [`logutil`] - Log sanitization for user-supplied strings
//!
//! ## Architecture
//!
//! The engine is synchronous, single-threaded logic over persisted records:
//! an operation reads the affected records, validates preconditions, applies
//! its full cascade (streak → counters → rewards → badges), and persists the
//! result. Operations that mutate a user's state serialize on a per-user
//! guard held by the store, so the once-per-day idempotency check and the
//! leveling carry-over loop never race. Cross-user reads (the leaderboard)
//! take no guard and see best-effort snapshots.

pub mod config;
pub mod engine;
pub mod logutil;
