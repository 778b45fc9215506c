//! Static template catalogs: quest templates, challenge templates, and the
//! shop item table.
//!
//! Catalogs are read-only reference data constructed once at startup and
//! passed by reference to the engine. Seed JSON under `data/seeds/` lets
//! operators customize content without recompiling; builtin defaults cover
//! missing files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::engine::errors::EngineError;
use crate::engine::shop::ShopItem;
use crate::engine::types::{ChallengeTemplate, ObjectiveKind, QuestTemplate};

/// Immutable catalog of quest/challenge templates and shop items.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    pub quests: HashMap<String, QuestTemplate>,
    pub challenges: HashMap<String, ChallengeTemplate>,
    pub shop_items: HashMap<String, ShopItem>,
}

impl TemplateCatalog {
    pub fn empty() -> Self {
        Self {
            quests: HashMap::new(),
            challenges: HashMap::new(),
            shop_items: HashMap::new(),
        }
    }

    /// Catalog with the builtin default content.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for quest in builtin_quests() {
            catalog.quests.insert(quest.id.clone(), quest);
        }
        for challenge in builtin_challenges() {
            catalog.challenges.insert(challenge.id.clone(), challenge);
        }
        for item in builtin_shop_items() {
            catalog.shop_items.insert(item.id.clone(), item);
        }
        catalog
    }

    /// Build a catalog from seed JSON under `seed_dir`, falling back to the
    /// builtin table for any missing file.
    pub fn load_or_builtin<P: AsRef<Path>>(seed_dir: P) -> Result<Self, EngineError> {
        let dir = seed_dir.as_ref();
        let mut catalog = Self::empty();

        let quests = match load_seed_file::<QuestTemplate>(&dir.join("quests.json"))? {
            Some(list) => list,
            None => {
                debug!("no quests.json seed, using builtin quest templates");
                builtin_quests()
            }
        };
        for quest in quests {
            catalog.quests.insert(quest.id.clone(), quest);
        }

        let challenges = match load_seed_file::<ChallengeTemplate>(&dir.join("challenges.json"))? {
            Some(list) => list,
            None => {
                debug!("no challenges.json seed, using builtin challenge templates");
                builtin_challenges()
            }
        };
        for challenge in challenges {
            catalog.challenges.insert(challenge.id.clone(), challenge);
        }

        let items = match load_seed_file::<ShopItem>(&dir.join("shop_items.json"))? {
            Some(list) => list,
            None => {
                debug!("no shop_items.json seed, using builtin shop items");
                builtin_shop_items()
            }
        };
        for item in items {
            catalog.shop_items.insert(item.id.clone(), item);
        }

        Ok(catalog)
    }
}

fn load_seed_file<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<Vec<T>>, EngineError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let records: Vec<T> = serde_json::from_str(&contents).map_err(|e| {
        EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to parse {}: {}", path.display(), e),
        ))
    })?;
    Ok(Some(records))
}

fn builtin_quests() -> Vec<QuestTemplate> {
    vec![
        QuestTemplate {
            id: "early_bird".to_string(),
            name: "Early Bird".to_string(),
            description: "Complete 3 tasks before 9am".to_string(),
            objective: ObjectiveKind::TasksBeforeTime {
                cutoff: "09:00".to_string(),
                required: 3,
            },
            xp_reward: 30,
            coin_reward: 15,
        },
        QuestTemplate {
            id: "week_warrior".to_string(),
            name: "Week Warrior".to_string(),
            description: "Hold a 7-day streak".to_string(),
            objective: ObjectiveKind::StreakThreshold { required: 7 },
            xp_reward: 50,
            coin_reward: 25,
        },
        QuestTemplate {
            id: "coin_collector".to_string(),
            name: "Coin Collector".to_string(),
            description: "Hold 500 coins in balance and unlocks combined".to_string(),
            objective: ObjectiveKind::CoinsEarned { required: 500 },
            xp_reward: 40,
            coin_reward: 20,
        },
        QuestTemplate {
            id: "rising_star".to_string(),
            name: "Rising Star".to_string(),
            description: "Reach level 5".to_string(),
            objective: ObjectiveKind::LevelThreshold { required: 5 },
            xp_reward: 60,
            coin_reward: 30,
        },
        QuestTemplate {
            id: "closet_full".to_string(),
            name: "Closet Full".to_string(),
            description: "Own 3 customization items".to_string(),
            objective: ObjectiveKind::InventoryCount { required: 3 },
            xp_reward: 40,
            coin_reward: 20,
        },
    ]
}

fn builtin_challenges() -> Vec<ChallengeTemplate> {
    vec![
        ChallengeTemplate {
            id: "daily_dash".to_string(),
            name: "Daily Dash".to_string(),
            description: "Complete 5 tasks within 24 hours".to_string(),
            objective: ObjectiveKind::TasksWithinChallenge { required: 5 },
            duration_hours: 24,
            xp_reward: 50,
            coin_reward: 25,
        },
        ChallengeTemplate {
            id: "weekend_sprint".to_string(),
            name: "Weekend Sprint".to_string(),
            description: "Complete 10 tasks within 48 hours".to_string(),
            objective: ObjectiveKind::TasksWithinChallenge { required: 10 },
            duration_hours: 48,
            xp_reward: 80,
            coin_reward: 40,
        },
        ChallengeTemplate {
            id: "streak_guard".to_string(),
            name: "Streak Guard".to_string(),
            description: "Build a 3-day streak before time runs out".to_string(),
            objective: ObjectiveKind::StreakThreshold { required: 3 },
            duration_hours: 96,
            xp_reward: 45,
            coin_reward: 20,
        },
        ChallengeTemplate {
            id: "gold_rush".to_string(),
            name: "Gold Rush".to_string(),
            description: "Amass 200 coins of lifetime holdings".to_string(),
            objective: ObjectiveKind::CoinsEarned { required: 200 },
            duration_hours: 72,
            xp_reward: 35,
            coin_reward: 15,
        },
    ]
}

fn builtin_shop_items() -> Vec<ShopItem> {
    vec![
        ShopItem::new("theme_dark", "Dark Theme", 100),
        ShopItem::new("theme_ocean", "Ocean Theme", 150),
        ShopItem::new("avatar_ninja", "Ninja Avatar", 200),
        ShopItem::new("avatar_wizard", "Wizard Avatar", 250),
        ShopItem::new("frame_gold", "Gold Badge Frame", 500),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_all_objective_kinds() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.quests.len(), 5);
        assert_eq!(catalog.challenges.len(), 4);
        assert!(!catalog.shop_items.is_empty());

        let quest_kinds: Vec<_> = catalog
            .quests
            .values()
            .map(|q| std::mem::discriminant(&q.objective))
            .collect();
        // Each quest template uses a distinct objective kind.
        for (i, kind) in quest_kinds.iter().enumerate() {
            assert!(!quest_kinds[..i].contains(kind));
        }
    }

    #[test]
    fn missing_seed_dir_falls_back_to_builtin() {
        let catalog = TemplateCatalog::load_or_builtin("does/not/exist").expect("catalog");
        assert_eq!(catalog.quests.len(), 5);
        assert!(catalog.challenges.contains_key("daily_dash"));
    }

    #[test]
    fn seed_files_override_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let quests = r#"[
            {
                "id": "custom",
                "name": "Custom Quest",
                "description": "",
                "objective": { "streak_threshold": { "required": 2 } },
                "xp_reward": 5,
                "coin_reward": 1
            }
        ]"#;
        std::fs::write(dir.path().join("quests.json"), quests).expect("write seed");

        let catalog = TemplateCatalog::load_or_builtin(dir.path()).expect("catalog");
        assert_eq!(catalog.quests.len(), 1);
        assert!(catalog.quests.contains_key("custom"));
        // Other tables still fall back.
        assert_eq!(catalog.challenges.len(), 4);
    }

    #[test]
    fn malformed_seed_is_invalid_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("quests.json"), "not json").expect("write seed");
        let err = TemplateCatalog::load_or_builtin(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
