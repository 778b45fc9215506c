//! Reward ledger: applies XP/coin deltas to a user and runs the leveling
//! carry-over loop.

use crate::engine::types::{UserRecord, LEVEL_UP_COIN_BONUS, XP_PER_LEVEL};

/// Whether a coin delta counts toward lifetime earnings. Refunds and other
/// non-earned movements leave `total_coins_earned` untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSource {
    Earned,
    Refund,
}

/// Apply XP and coin deltas to `user`, then carry XP over into levels while
/// it clears the `level * XP_PER_LEVEL` bar. Each level gained adds the
/// fixed coin bonus. Returns the number of levels gained (0 if none).
///
/// Inputs are non-negative deltas from trusted internal callers; there are
/// no error conditions. The XP invariant `0 <= xp < level * XP_PER_LEVEL`
/// holds on return.
pub fn apply_reward(user: &mut UserRecord, xp_delta: u32, coin_delta: i64, source: CoinSource) -> u32 {
    user.coins += coin_delta;
    if source == CoinSource::Earned {
        user.total_coins_earned += coin_delta;
    }
    user.xp += xp_delta;

    let mut level_ups = 0u32;
    while user.xp >= user.level * XP_PER_LEVEL {
        user.xp -= user.level * XP_PER_LEVEL;
        user.level += 1;
        user.coins += LEVEL_UP_COIN_BONUS;
        user.total_coins_earned += LEVEL_UP_COIN_BONUS;
        level_ups += 1;
    }
    level_ups
}
