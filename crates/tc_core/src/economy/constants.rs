// Session economy tuning values
//
// Every number the reward pipeline and stake settlement depend on lives
// here, so balancing passes touch one file.

/// Base XP for a competitive (or ranked match) session.
pub const COMPETITIVE_BASE_XP: i32 = 100;
/// Base XP for a social session.
pub const SOCIAL_BASE_XP: i32 = 50;
/// Base XP for a coached training session.
pub const TRAINING_BASE_XP: i32 = 40;

/// Flat token reward for an unstaked competitive session.
pub const COMPETITIVE_BASE_TOKENS: u64 = 30;
/// Flat token reward for an unstaked social session.
pub const SOCIAL_BASE_TOKENS: u64 = 15;
/// Coach-fee token amount for training, paid win or lose.
pub const TRAINING_COACH_FEE_TOKENS: u64 = 12;

/// Share of a staked pool paid to the winner.
pub const STAKE_WINNER_SHARE: f64 = 0.90;
/// House rake retained from a staked pool (1 - winner share).
pub const HOUSE_RAKE: f64 = 0.10;
/// Maximum stake honored for a social session; the remainder is not paid.
pub const SOCIAL_STAKE_CAP: u64 = 20;
/// Loser participation tokens as a share of the session's base token reward.
pub const PARTICIPATION_TOKEN_RATIO: f64 = 0.3;

/// Loser XP as a share of the winner's XP.
pub const LOSER_XP_RATIO: f64 = 0.7;

/// Level-difference multiplier slope when the opponent is higher level.
pub const LEVEL_SLOPE_UP: f64 = 0.15;
/// Level-difference multiplier slope when the opponent is lower level.
pub const LEVEL_SLOPE_DOWN: f64 = 0.10;
/// Bounds for the difficulty multiplier.
pub const DIFFICULTY_MULT_MIN: f64 = 0.5;
pub const DIFFICULTY_MULT_MAX: f64 = 3.0;

/// Skill-tier multiplier slopes and floor.
pub const SKILL_SLOPE_UP: f64 = 0.20;
pub const SKILL_SLOPE_DOWN: f64 = 0.15;
pub const SKILL_MULT_FLOOR: f64 = 0.6;

/// Tennis bonus multiplier terms.
pub const BONUS_DOUBLE_BREAK: f64 = 0.5;
pub const BONUS_COMEBACK: f64 = 0.3;
/// Clutch multiplies the running bonus rather than adding to it.
pub const BONUS_CLUTCH_FACTOR: f64 = 2.0;
pub const BONUS_MULT_MIN: f64 = 1.0;
pub const BONUS_MULT_MAX: f64 = 4.0;

/// Base HP cost per session category (before duration scaling).
pub const COMPETITIVE_HP_COST: i32 = 10;
pub const SOCIAL_HP_COST: i32 = 5;
pub const TRAINING_HP_COST: i32 = 6;
/// Fixed HP bonus granted to the winner before netting out the cost.
pub const WINNER_HP_BONUS: i32 = 12;
/// Minimum HP cost once a session has any HP impact at all.
pub const HP_COST_FLOOR: i32 = 1;

/// Duration scaling: a 60-minute session is the baseline, every extra two
/// hours doubles the cost, capped at x2.
pub const DURATION_BASELINE_MINUTES: f64 = 60.0;
pub const DURATION_SCALE_MINUTES: f64 = 120.0;
pub const DURATION_MULT_MAX: f64 = 2.0;
/// Sessions longer than this are rejected into the fallback path.
pub const MAX_SESSION_MINUTES: f64 = 24.0 * 60.0;

/// Fixed display conversion rate, dollars per token. Informational only;
/// no currency conversion happens in the engine.
pub const TOKEN_TO_DOLLAR_RATE: f64 = 0.10;

/// Winner payout and house rake for a staked pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeSplit {
    pub winner_payout: u64,
    pub rake: u64,
}

/// Split a staked token pool into winner payout and rake.
///
/// The winner receives `floor(pool * 0.9)`; whatever remains is the rake,
/// so the split always sums back to the pool.
pub fn split_stake_pool(pool: u64) -> StakeSplit {
    let winner_payout = (pool as f64 * STAKE_WINNER_SHARE).floor() as u64;
    StakeSplit { winner_payout, rake: pool - winner_payout }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_split_scenario_a() {
        // Competitive stake of 100: 90 to the winner, 10 rake
        let split = split_stake_pool(100);
        assert_eq!(split.winner_payout, 90);
        assert_eq!(split.rake, 10);
    }

    #[test]
    fn test_stake_split_conserves_pool() {
        for pool in [0u64, 1, 7, 19, 20, 33, 100, 999] {
            let split = split_stake_pool(pool);
            assert_eq!(split.winner_payout + split.rake, pool);
        }
    }

    #[test]
    fn test_social_cap_split() {
        // Social stake 30 capped to 20 before splitting: 18 / 2
        let split = split_stake_pool(SOCIAL_STAKE_CAP.min(30));
        assert_eq!(split.winner_payout, 18);
        assert_eq!(split.rake, 2);
    }
}
