//! Quest and challenge lifecycle: starting instances from templates,
//! checking progress, granting completion rewards, abandoning quests, and
//! expiring overdue challenges.
//!
//! Rewards are snapshotted onto the instance at start time, so template
//! edits never change what an in-flight instance pays out.

use chrono::{DateTime, Utc};
use log::info;

use crate::engine::calendar::day_of;
use crate::engine::catalog::TemplateCatalog;
use crate::engine::errors::{EngineError, Rejection};
use crate::engine::objective::{evaluate, EvalContext};
use crate::engine::rewards::{apply_reward, CoinSource};
use crate::engine::storage::Store;
use crate::engine::types::{
    ChallengeInstance, CheckOutcome, InstanceState, ObjectiveKind, QuestInstance,
};

/// Start a quest from a template for `user_id`.
pub fn start_quest(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    template_id: &str,
    now: DateTime<Utc>,
) -> Result<QuestInstance, EngineError> {
    let template = catalog
        .quests
        .get(template_id)
        .ok_or_else(|| Rejection::UnknownTemplate(template_id.to_string()))?;
    store.ensure_user(user_id)?;
    let instance = QuestInstance::start(user_id, template, now);
    store.put_quest(instance.clone())?;
    info!("{} started quest {}", user_id, template_id);
    Ok(instance)
}

/// Start a challenge from a template for `user_id`.
pub fn start_challenge(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    template_id: &str,
    now: DateTime<Utc>,
) -> Result<ChallengeInstance, EngineError> {
    let template = catalog
        .challenges
        .get(template_id)
        .ok_or_else(|| Rejection::UnknownTemplate(template_id.to_string()))?;
    store.ensure_user(user_id)?;
    let instance = ChallengeInstance::start(user_id, template, now);
    store.put_challenge(instance.clone())?;
    info!("{} started challenge {}", user_id, template_id);
    Ok(instance)
}

fn quest_objective<'a>(
    catalog: &'a TemplateCatalog,
    template_id: &str,
) -> Result<&'a ObjectiveKind, EngineError> {
    catalog
        .quests
        .get(template_id)
        .map(|t| &t.objective)
        .ok_or_else(|| Rejection::UnknownTemplate(template_id.to_string()).into())
}

fn challenge_objective<'a>(
    catalog: &'a TemplateCatalog,
    template_id: &str,
) -> Result<&'a ObjectiveKind, EngineError> {
    catalog
        .challenges
        .get(template_id)
        .map(|t| &t.objective)
        .ok_or_else(|| Rejection::UnknownTemplate(template_id.to_string()).into())
}

/// Re-evaluate a quest instance's objective. Progress is stored
/// unconditionally; the first evaluation that satisfies the objective
/// transitions the instance to Completed, stamps the completion time, and
/// grants the snapshotted rewards. A terminal instance is rejected and
/// never re-evaluated.
pub fn check_quest(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    instance_id: &str,
    now: DateTime<Utc>,
) -> Result<CheckOutcome, EngineError> {
    let guard = store.user_guard(user_id);
    let _held = guard
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let mut instance = store.get_quest(user_id, instance_id)?;
    if instance.state.is_terminal() {
        return Err(Rejection::AlreadyCompleted.into());
    }
    let objective = quest_objective(catalog, &instance.template_id)?;

    let user = store.ensure_user(user_id)?;
    let tasks = store.list_tasks(user_id)?;
    let snapshot = evaluate(
        objective,
        &EvalContext {
            user: &user,
            tasks: &tasks,
            catalog,
            today: day_of(now),
            start_day: day_of(instance.started_at),
        },
    );

    instance.progress = snapshot.progress;
    if snapshot.completed {
        instance.state = InstanceState::Completed { completed_at: now };
        let mut user = user;
        let levels_gained = apply_reward(
            &mut user,
            instance.xp_reward,
            instance.coin_reward,
            CoinSource::Earned,
        );
        store.put_user_and_quest(user, instance.clone())?;
        info!("{} completed quest {}", user_id, instance.template_id);
        return Ok(CheckOutcome::Completed {
            xp_awarded: instance.xp_reward,
            coins_awarded: instance.coin_reward,
            level_up: levels_gained > 0,
        });
    }

    store.put_quest(instance)?;
    Ok(CheckOutcome::InProgress {
        progress: snapshot.progress,
        required: snapshot.required,
    })
}

/// Re-evaluate a challenge instance's objective. A challenge whose
/// deadline has passed while still active expires instead: terminal,
/// unsuccessful, and rewardless — distinct from objective-met completion.
pub fn check_challenge(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    instance_id: &str,
    now: DateTime<Utc>,
) -> Result<CheckOutcome, EngineError> {
    let guard = store.user_guard(user_id);
    let _held = guard
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let mut instance = store.get_challenge(user_id, instance_id)?;
    if instance.state.is_terminal() {
        return Err(Rejection::AlreadyCompleted.into());
    }

    if instance.is_past_deadline(now) {
        instance.state = InstanceState::Expired { expired_at: now };
        store.put_challenge(instance.clone())?;
        info!("{} challenge {} expired", user_id, instance.template_id);
        return Ok(CheckOutcome::Expired);
    }

    let objective = challenge_objective(catalog, &instance.template_id)?;
    let user = store.ensure_user(user_id)?;
    let tasks = store.list_tasks(user_id)?;
    let snapshot = evaluate(
        objective,
        &EvalContext {
            user: &user,
            tasks: &tasks,
            catalog,
            today: day_of(now),
            start_day: day_of(instance.started_at),
        },
    );

    instance.progress = snapshot.progress;
    if snapshot.completed {
        instance.state = InstanceState::Completed { completed_at: now };
        let mut user = user;
        let levels_gained = apply_reward(
            &mut user,
            instance.xp_reward,
            instance.coin_reward,
            CoinSource::Earned,
        );
        store.put_user_and_challenge(user, instance.clone())?;
        info!("{} completed challenge {}", user_id, instance.template_id);
        return Ok(CheckOutcome::Completed {
            xp_awarded: instance.xp_reward,
            coins_awarded: instance.coin_reward,
            level_up: levels_gained > 0,
        });
    }

    store.put_challenge(instance)?;
    Ok(CheckOutcome::InProgress {
        progress: snapshot.progress,
        required: snapshot.required,
    })
}

/// Abandon an active quest: the instance is removed and no longer tracked.
/// No reward, no terminal stamp. Challenges cannot be abandoned.
pub fn abandon_quest(store: &Store, user_id: &str, instance_id: &str) -> Result<(), EngineError> {
    let guard = store.user_guard(user_id);
    let _held = guard
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let instance = store.get_quest(user_id, instance_id)?;
    if instance.state.is_terminal() {
        return Err(Rejection::AlreadyCompleted.into());
    }
    store.remove_quest(user_id, instance_id)?;
    info!("{} abandoned quest {}", user_id, instance.template_id);
    Ok(())
}

/// Sweep a user's challenges, expiring any still-active instance whose
/// deadline has passed. Runs on listing so stale instances never show as
/// active. Returns the refreshed list.
pub fn sweep_challenges(
    store: &Store,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ChallengeInstance>, EngineError> {
    let guard = store.user_guard(user_id);
    let _held = guard
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let mut challenges = store.list_challenges(user_id)?;
    for challenge in challenges.iter_mut() {
        if challenge.state.is_active() && challenge.is_past_deadline(now) {
            challenge.state = InstanceState::Expired { expired_at: now };
            store.put_challenge(challenge.clone())?;
            info!("{} challenge {} expired", user_id, challenge.template_id);
        }
    }
    Ok(challenges)
}

/// A user's active quest instances.
pub fn active_quests(store: &Store, user_id: &str) -> Result<Vec<QuestInstance>, EngineError> {
    Ok(store
        .list_quests(user_id)?
        .into_iter()
        .filter(|q| q.state.is_active())
        .collect())
}

/// A user's completed quest instances.
pub fn completed_quests(store: &Store, user_id: &str) -> Result<Vec<QuestInstance>, EngineError> {
    Ok(store
        .list_quests(user_id)?
        .into_iter()
        .filter(|q| matches!(q.state, InstanceState::Completed { .. }))
        .collect())
}
