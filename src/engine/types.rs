use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const TASK_SCHEMA_VERSION: u8 = 1;
pub const INSTANCE_SCHEMA_VERSION: u8 = 1;

/// XP required to clear a level is `level * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u32 = 100;
/// Coins granted each time a user levels up.
pub const LEVEL_UP_COIN_BONUS: i64 = 50;

/// How often a recurring task is expected to repeat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Custom,
}

impl Default for Frequency {
    fn default() -> Self {
        Self::Daily
    }
}

/// A tracked user's progression state. Created on first interaction with
/// default values and mutated exclusively through engine operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub level: u32,
    /// Remaining XP toward the next level; `0 <= xp < level * XP_PER_LEVEL`
    /// after every leveling pass.
    pub xp: u32,
    /// Spendable coin balance.
    pub coins: i64,
    /// Lifetime coins earned, independent of spending.
    #[serde(default)]
    pub total_coins_earned: i64,
    /// Consecutive calendar days with at least one completion.
    pub streak: u32,
    pub last_completed_day: Option<NaiveDate>,
    pub total_tasks_completed: u32,
    /// Badge identifiers, each granted at most once.
    #[serde(default)]
    pub badges: Vec<String>,
    /// Owned shop item identifiers, each purchasable at most once.
    #[serde(default)]
    pub inventory: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(id: &str, display_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            level: 1,
            xp: 0,
            coins: 0,
            total_coins_earned: 0,
            streak: 0,
            last_completed_day: None,
            total_tasks_completed: 0,
            badges: Vec::new(),
            inventory: vec!["default".to_string()],
            created_at: now,
            updated_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn has_badge(&self, badge: &str) -> bool {
        self.badges.iter().any(|b| b == badge)
    }

    pub fn owns_item(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|i| i == item_id)
    }

    /// XP needed to clear the current level.
    pub fn xp_needed(&self) -> u32 {
        self.level * XP_PER_LEVEL
    }
}

/// A user-owned task. CRUD on title/description/schedule is boundary
/// plumbing; completion dates and streaks are engine-owned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub frequency: Frequency,
    /// Optional "HH:MM" time-of-day the task is scheduled for.
    #[serde(default)]
    pub scheduled_time: Option<String>,
    /// Reward amounts are fixed at creation time.
    pub xp_reward: u32,
    pub coin_reward: i64,
    /// Whether the task was ever completed.
    #[serde(default)]
    pub completed: bool,
    /// Calendar days the task was completed on. A set: a given day appears
    /// at most once.
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,
    /// Consecutive days this specific task was completed.
    #[serde(default)]
    pub streak: u32,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl TaskRecord {
    pub fn new(user_id: &str, title: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            recurring: false,
            frequency: Frequency::Daily,
            scheduled_time: None,
            xp_reward: 10,
            coin_reward: 5,
            completed: false,
            completed_dates: BTreeSet::new(),
            streak: 0,
            created_at: Utc::now(),
            schema_version: TASK_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_recurring(mut self, frequency: Frequency) -> Self {
        self.recurring = true;
        self.frequency = frequency;
        self
    }

    pub fn with_scheduled_time(mut self, time: &str) -> Self {
        self.scheduled_time = Some(time.to_string());
        self
    }

    pub fn with_rewards(mut self, xp: u32, coins: i64) -> Self {
        self.xp_reward = xp;
        self.coin_reward = coins;
        self
    }

    pub fn completed_on(&self, day: NaiveDate) -> bool {
        self.completed_dates.contains(&day)
    }
}

/// Objective kinds evaluated polymorphically by the objective evaluator.
/// Each variant carries its own requirement threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Complete `required` tasks today whose scheduled time sorts before
    /// the "HH:MM" cutoff (lexicographic comparison).
    TasksBeforeTime { cutoff: String, required: u32 },
    /// Reach a user streak of `required` consecutive days.
    StreakThreshold { required: u32 },
    /// Lifetime coin holdings (balance plus cost of owned shop items)
    /// reach `required`.
    CoinsEarned { required: i64 },
    /// Reach level `required`.
    LevelThreshold { required: u32 },
    /// Own `required` shop items.
    InventoryCount { required: u32 },
    /// Complete `required` tasks on or after the instance's start day.
    TasksWithinChallenge { required: u32 },
}

impl ObjectiveKind {
    pub fn required(&self) -> i64 {
        match self {
            ObjectiveKind::TasksBeforeTime { required, .. }
            | ObjectiveKind::StreakThreshold { required }
            | ObjectiveKind::LevelThreshold { required }
            | ObjectiveKind::InventoryCount { required }
            | ObjectiveKind::TasksWithinChallenge { required } => i64::from(*required),
            ObjectiveKind::CoinsEarned { required } => *required,
        }
    }
}

/// Immutable quest definition. Rewards are snapshotted into instances at
/// start time, so later template edits never change awarded amounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub objective: ObjectiveKind,
    pub xp_reward: u32,
    pub coin_reward: i64,
}

/// Immutable challenge definition. Like a quest template but time-boxed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub objective: ObjectiveKind,
    pub duration_hours: i64,
    pub xp_reward: u32,
    pub coin_reward: i64,
}

/// Lifecycle state of a quest or challenge instance. Each instance
/// transitions out of `Active` exactly once and never reopens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Active { started_at: DateTime<Utc> },
    Completed { completed_at: DateTime<Utc> },
    /// Challenge deadline passed without the objective being met. Terminal
    /// and unsuccessful: no reward was granted.
    Expired { expired_at: DateTime<Utc> },
}

impl InstanceState {
    pub fn is_active(&self) -> bool {
        matches!(self, InstanceState::Active { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            InstanceState::Active { started_at } => Some(*started_at),
            _ => None,
        }
    }
}

/// A quest started from a template for a specific user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestInstance {
    pub id: String,
    pub user_id: String,
    pub template_id: String,
    pub state: InstanceState,
    /// Start time, retained across state transitions.
    pub started_at: DateTime<Utc>,
    pub progress: i64,
    /// Rewards copied from the template at start time.
    pub xp_reward: u32,
    pub coin_reward: i64,
    pub schema_version: u8,
}

impl QuestInstance {
    pub fn start(user_id: &str, template: &QuestTemplate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            template_id: template.id.clone(),
            state: InstanceState::Active { started_at: now },
            started_at: now,
            progress: 0,
            xp_reward: template.xp_reward,
            coin_reward: template.coin_reward,
            schema_version: INSTANCE_SCHEMA_VERSION,
        }
    }
}

/// A challenge started from a template; carries its deadline window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeInstance {
    pub id: String,
    pub user_id: String,
    pub template_id: String,
    pub state: InstanceState,
    pub started_at: DateTime<Utc>,
    pub duration_hours: i64,
    pub progress: i64,
    pub xp_reward: u32,
    pub coin_reward: i64,
    pub schema_version: u8,
}

impl ChallengeInstance {
    pub fn start(user_id: &str, template: &ChallengeTemplate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            template_id: template.id.clone(),
            state: InstanceState::Active { started_at: now },
            started_at: now,
            duration_hours: template.duration_hours,
            progress: 0,
            xp_reward: template.xp_reward,
            coin_reward: template.coin_reward,
            schema_version: INSTANCE_SCHEMA_VERSION,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::hours(self.duration_hours)
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }
}

/// Effects of a successful task completion, assembled by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOutcome {
    pub xp_awarded: u32,
    pub coins_awarded: i64,
    pub level_up: bool,
    pub levels_gained: u32,
    pub new_badges: Vec<String>,
}

/// Result of a quest/challenge progress check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Objective not yet met; progress was updated on the instance.
    InProgress { progress: i64, required: i64 },
    /// Objective newly met: rewards were granted and the instance moved to
    /// its completed terminal state.
    Completed {
        xp_awarded: u32,
        coins_awarded: i64,
        level_up: bool,
    },
    /// Challenge deadline passed while still active. No reward.
    Expired,
}
