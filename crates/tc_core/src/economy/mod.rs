// Session economy: tuning constants and the reward engine
pub mod constants;
pub mod rewards;

pub use constants::{split_stake_pool, StakeSplit};
pub use rewards::{
    level_multiplier, skill_multiplier, tennis_bonus_multiplier, RewardEngine, RewardRequest,
    SessionRewardResult, SessionType, SkillTier,
};
