use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sled::transaction::TransactionError;
use sled::{IVec, Transactional};

use crate::engine::errors::EngineError;
use crate::engine::types::{
    ChallengeInstance, QuestInstance, TaskRecord, UserRecord, INSTANCE_SCHEMA_VERSION,
    TASK_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "habitforge";
const TREE_INSTANCES: &str = "habitforge_instances";

fn commit_err(err: TransactionError<EngineError>) -> EngineError {
    match err {
        TransactionError::Storage(e) => EngineError::Sled(e),
        TransactionError::Abort(e) => e,
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct StoreBuilder {
    path: PathBuf,
}

impl StoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<Store, EngineError> {
        Store::open(self.path)
    }
}

/// Sled-backed persistence for users, tasks, and quest/challenge instances.
///
/// Engine operations that modify a user's state must hold that user's guard
/// (see [`Store::user_guard`]) across their read-modify-write cycle so the
/// once-per-day idempotency check and the leveling carry-over never race.
pub struct Store {
    _db: sled::Db,
    primary: sled::Tree,
    instances: sled::Tree,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Store {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let instances = db.open_tree(TREE_INSTANCES)?;
        Ok(Self {
            _db: db,
            primary,
            instances,
            user_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch the serialization guard for a user. Callers lock the returned
    /// mutex for the duration of a read-modify-write cycle; cross-user reads
    /// (the leaderboard) do not take guards and see best-effort snapshots.
    pub fn user_guard(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn user_key(user_id: &str) -> Vec<u8> {
        format!("users:{}", user_id).into_bytes()
    }

    fn task_key(user_id: &str, task_id: &str) -> Vec<u8> {
        format!("tasks:{}:{}", user_id, task_id).into_bytes()
    }

    fn quest_key(user_id: &str, instance_id: &str) -> Vec<u8> {
        format!("quests:{}:{}", user_id, instance_id).into_bytes()
    }

    fn challenge_key(user_id: &str, instance_id: &str) -> Vec<u8> {
        format!("challenges:{}:{}", user_id, instance_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EngineError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a user record.
    pub fn put_user(&self, mut user: UserRecord) -> Result<(), EngineError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        let key = Self::user_key(&user.id);
        let bytes = Self::serialize(&user)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a user record by id.
    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, EngineError> {
        let key = Self::user_key(user_id);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(EngineError::NotFound(format!("user: {}", user_id)));
        };
        let record: UserRecord = Self::deserialize(bytes)?;
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch a user, creating the default record on first interaction.
    pub fn ensure_user(&self, user_id: &str) -> Result<UserRecord, EngineError> {
        match self.get_user(user_id) {
            Ok(user) => Ok(user),
            Err(EngineError::NotFound(_)) => {
                let user = UserRecord::new(user_id, user_id);
                self.put_user(user.clone())?;
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    /// List all stored user ids.
    pub fn list_user_ids(&self) -> Result<Vec<String>, EngineError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(b"users:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix("users:") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Load every user record (leaderboard projection input).
    pub fn list_users(&self) -> Result<Vec<UserRecord>, EngineError> {
        let mut users = Vec::new();
        for entry in self.primary.scan_prefix(b"users:") {
            let (_, bytes) = entry?;
            let record: UserRecord = Self::deserialize(bytes)?;
            if record.schema_version != USER_SCHEMA_VERSION {
                return Err(EngineError::SchemaMismatch {
                    entity: "user",
                    expected: USER_SCHEMA_VERSION,
                    found: record.schema_version,
                });
            }
            users.push(record);
        }
        Ok(users)
    }

    /// Insert or update a task record.
    pub fn put_task(&self, mut task: TaskRecord) -> Result<(), EngineError> {
        task.schema_version = TASK_SCHEMA_VERSION;
        let key = Self::task_key(&task.user_id, &task.id);
        let bytes = Self::serialize(&task)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a task owned by `user_id`. An id owned by someone else is
    /// indistinguishable from a missing one.
    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<TaskRecord, EngineError> {
        let key = Self::task_key(user_id, task_id);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(EngineError::NotFound(format!("task: {}", task_id)));
        };
        let record: TaskRecord = Self::deserialize(bytes)?;
        if record.schema_version != TASK_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "task",
                expected: TASK_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List all tasks owned by a user.
    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<TaskRecord>, EngineError> {
        let prefix = format!("tasks:{}:", user_id);
        let mut tasks = Vec::new();
        for entry in self.primary.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            tasks.push(Self::deserialize(bytes)?);
        }
        Ok(tasks)
    }

    /// Delete a task owned by `user_id`.
    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<(), EngineError> {
        let key = Self::task_key(user_id, task_id);
        if self.primary.remove(&key)?.is_none() {
            return Err(EngineError::NotFound(format!("task: {}", task_id)));
        }
        self.primary.flush()?;
        Ok(())
    }

    /// Persist a task and its owner's record in one atomic commit, so a
    /// completion's recorded date and the reward cascade land together or
    /// not at all.
    pub fn put_task_and_user(
        &self,
        mut task: TaskRecord,
        mut user: UserRecord,
    ) -> Result<(), EngineError> {
        task.schema_version = TASK_SCHEMA_VERSION;
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        let task_key = Self::task_key(&task.user_id, &task.id);
        let user_key = Self::user_key(&user.id);
        let task_bytes = Self::serialize(&task)?;
        let user_bytes = Self::serialize(&user)?;
        self.primary
            .transaction(|tx| {
                tx.insert(task_key.as_slice(), task_bytes.as_slice())?;
                tx.insert(user_key.as_slice(), user_bytes.as_slice())?;
                Ok(())
            })
            .map_err(commit_err)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Persist a user and a quest instance in one atomic cross-tree commit.
    pub fn put_user_and_quest(
        &self,
        mut user: UserRecord,
        mut instance: QuestInstance,
    ) -> Result<(), EngineError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        instance.schema_version = INSTANCE_SCHEMA_VERSION;
        let user_key = Self::user_key(&user.id);
        let quest_key = Self::quest_key(&instance.user_id, &instance.id);
        let user_bytes = Self::serialize(&user)?;
        let quest_bytes = Self::serialize(&instance)?;
        (&self.primary, &self.instances)
            .transaction(|(primary, instances)| {
                primary.insert(user_key.as_slice(), user_bytes.as_slice())?;
                instances.insert(quest_key.as_slice(), quest_bytes.as_slice())?;
                Ok(())
            })
            .map_err(commit_err)?;
        self.primary.flush()?;
        self.instances.flush()?;
        Ok(())
    }

    /// Persist a user and a challenge instance in one atomic cross-tree
    /// commit.
    pub fn put_user_and_challenge(
        &self,
        mut user: UserRecord,
        mut instance: ChallengeInstance,
    ) -> Result<(), EngineError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        instance.schema_version = INSTANCE_SCHEMA_VERSION;
        let user_key = Self::user_key(&user.id);
        let challenge_key = Self::challenge_key(&instance.user_id, &instance.id);
        let user_bytes = Self::serialize(&user)?;
        let challenge_bytes = Self::serialize(&instance)?;
        (&self.primary, &self.instances)
            .transaction(|(primary, instances)| {
                primary.insert(user_key.as_slice(), user_bytes.as_slice())?;
                instances.insert(challenge_key.as_slice(), challenge_bytes.as_slice())?;
                Ok(())
            })
            .map_err(commit_err)?;
        self.primary.flush()?;
        self.instances.flush()?;
        Ok(())
    }

    /// Insert or update a quest instance.
    pub fn put_quest(&self, mut instance: QuestInstance) -> Result<(), EngineError> {
        instance.schema_version = INSTANCE_SCHEMA_VERSION;
        let key = Self::quest_key(&instance.user_id, &instance.id);
        let bytes = Self::serialize(&instance)?;
        self.instances.insert(key, bytes)?;
        self.instances.flush()?;
        Ok(())
    }

    pub fn get_quest(&self, user_id: &str, instance_id: &str) -> Result<QuestInstance, EngineError> {
        let key = Self::quest_key(user_id, instance_id);
        let Some(bytes) = self.instances.get(&key)? else {
            return Err(EngineError::NotFound(format!("quest: {}", instance_id)));
        };
        let record: QuestInstance = Self::deserialize(bytes)?;
        if record.schema_version != INSTANCE_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "quest",
                expected: INSTANCE_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List all quest instances for a user, active and terminal alike.
    pub fn list_quests(&self, user_id: &str) -> Result<Vec<QuestInstance>, EngineError> {
        let prefix = format!("quests:{}:", user_id);
        let mut quests = Vec::new();
        for entry in self.instances.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            quests.push(Self::deserialize(bytes)?);
        }
        Ok(quests)
    }

    /// Remove a quest instance (abandon). The record is simply no longer
    /// tracked; nothing on it transitions.
    pub fn remove_quest(&self, user_id: &str, instance_id: &str) -> Result<(), EngineError> {
        let key = Self::quest_key(user_id, instance_id);
        if self.instances.remove(&key)?.is_none() {
            return Err(EngineError::NotFound(format!("quest: {}", instance_id)));
        }
        self.instances.flush()?;
        Ok(())
    }

    /// Insert or update a challenge instance.
    pub fn put_challenge(&self, mut instance: ChallengeInstance) -> Result<(), EngineError> {
        instance.schema_version = INSTANCE_SCHEMA_VERSION;
        let key = Self::challenge_key(&instance.user_id, &instance.id);
        let bytes = Self::serialize(&instance)?;
        self.instances.insert(key, bytes)?;
        self.instances.flush()?;
        Ok(())
    }

    pub fn get_challenge(
        &self,
        user_id: &str,
        instance_id: &str,
    ) -> Result<ChallengeInstance, EngineError> {
        let key = Self::challenge_key(user_id, instance_id);
        let Some(bytes) = self.instances.get(&key)? else {
            return Err(EngineError::NotFound(format!("challenge: {}", instance_id)));
        };
        let record: ChallengeInstance = Self::deserialize(bytes)?;
        if record.schema_version != INSTANCE_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "challenge",
                expected: INSTANCE_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List all challenge instances for a user.
    pub fn list_challenges(&self, user_id: &str) -> Result<Vec<ChallengeInstance>, EngineError> {
        let prefix = format!("challenges:{}:", user_id);
        let mut challenges = Vec::new();
        for entry in self.instances.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            challenges.push(Self::deserialize(bytes)?);
        }
        Ok(challenges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_user() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        let mut user = UserRecord::new("alice", "Alice");
        user.coins = 42;
        store.put_user(user.clone()).expect("put");
        let fetched = store.get_user("alice").expect("get");
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.coins, 42);
        assert_eq!(fetched.schema_version, USER_SCHEMA_VERSION);
    }

    #[test]
    fn ensure_user_bootstraps_defaults_once() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        let user = store.ensure_user("bob").expect("ensure");
        assert_eq!(user.level, 1);
        assert_eq!(user.inventory, vec!["default".to_string()]);

        let mut user = store.get_user("bob").expect("get");
        user.coins = 7;
        store.put_user(user).expect("put");
        let again = store.ensure_user("bob").expect("ensure again");
        assert_eq!(again.coins, 7, "ensure must not reset an existing user");
    }

    #[test]
    fn tasks_are_scoped_to_their_owner() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        let task = TaskRecord::new("alice", "Water plants");
        let task_id = task.id.clone();
        store.put_task(task).expect("put");

        assert!(store.get_task("alice", &task_id).is_ok());
        assert!(matches!(
            store.get_task("mallory", &task_id),
            Err(EngineError::NotFound(_))
        ));
        assert_eq!(store.list_tasks("alice").expect("list").len(), 1);
        assert!(store.list_tasks("mallory").expect("list").is_empty());
    }

    #[test]
    fn delete_missing_task_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        assert!(matches!(
            store.delete_task("alice", "nope"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn task_and_user_land_in_one_commit() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        let mut user = UserRecord::new("alice", "Alice");
        user.xp = 10;
        let mut task = TaskRecord::new("alice", "Run");
        task.completed = true;
        let task_id = task.id.clone();

        store.put_task_and_user(task, user).expect("commit");

        let user = store.get_user("alice").expect("user");
        assert_eq!(user.xp, 10);
        assert_eq!(user.schema_version, USER_SCHEMA_VERSION);
        let task = store.get_task("alice", &task_id).expect("task");
        assert!(task.completed);
        assert_eq!(task.schema_version, TASK_SCHEMA_VERSION);
    }

    #[test]
    fn stale_schema_user_fails_listing() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        let mut user = UserRecord::new("old", "Old");
        user.schema_version = 0;
        let bytes = bincode::serialize(&user).expect("serialize");
        store
            .primary
            .insert(Store::user_key("old"), bytes)
            .expect("raw insert");

        assert!(matches!(
            store.list_users(),
            Err(EngineError::SchemaMismatch {
                entity: "user",
                found: 0,
                ..
            })
        ));
    }

    #[test]
    fn user_guard_is_stable_per_user() {
        let dir = TempDir::new().expect("tempdir");
        let store = StoreBuilder::new(dir.path()).open().expect("store");
        let g1 = store.user_guard("alice");
        let g2 = store.user_guard("alice");
        assert!(Arc::ptr_eq(&g1, &g2));
        let g3 = store.user_guard("bob");
        assert!(!Arc::ptr_eq(&g1, &g3));
    }
}
