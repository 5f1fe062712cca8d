// Session reward computation: XP / HP / tokens with balancing multipliers
use crate::analysis::{MomentumState, TennisAnalysis};
use crate::economy::constants::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Session categories the economy distinguishes.
///
/// `Match` is the ranked-ladder variant of `Competitive` and aliases to it
/// for all reward math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    Social,
    Competitive,
    Training,
    Match,
}

impl SessionType {
    /// The category used for economy math.
    pub fn economic(self) -> SessionType {
        match self {
            SessionType::Match => SessionType::Competitive,
            other => other,
        }
    }

    pub fn base_xp(self) -> i32 {
        match self.economic() {
            SessionType::Competitive => COMPETITIVE_BASE_XP,
            SessionType::Social => SOCIAL_BASE_XP,
            SessionType::Training => TRAINING_BASE_XP,
            SessionType::Match => unreachable!("Match aliases to Competitive"),
        }
    }

    pub fn base_tokens(self) -> u64 {
        match self.economic() {
            SessionType::Competitive => COMPETITIVE_BASE_TOKENS,
            SessionType::Social => SOCIAL_BASE_TOKENS,
            SessionType::Training => TRAINING_COACH_FEE_TOKENS,
            SessionType::Match => unreachable!("Match aliases to Competitive"),
        }
    }

    pub fn base_hp_cost(self) -> i32 {
        match self.economic() {
            SessionType::Competitive => COMPETITIVE_HP_COST,
            SessionType::Social => SOCIAL_HP_COST,
            SessionType::Training => TRAINING_HP_COST,
            SessionType::Match => unreachable!("Match aliases to Competitive"),
        }
    }
}

/// Self-reported skill tiers, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillTier {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

impl SkillTier {
    fn index(self) -> i64 {
        match self {
            SkillTier::Beginner => 0,
            SkillTier::Intermediate => 1,
            SkillTier::Advanced => 2,
            SkillTier::Professional => 3,
        }
    }

    /// Parse the tier strings used by player profiles.
    pub fn parse(value: &str) -> Option<SkillTier> {
        match value.to_ascii_lowercase().as_str() {
            "beginner" => Some(SkillTier::Beginner),
            "intermediate" => Some(SkillTier::Intermediate),
            "advanced" => Some(SkillTier::Advanced),
            "professional" => Some(SkillTier::Professional),
            _ => None,
        }
    }
}

/// Everything the reward engine needs about one finished (or in-progress)
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRequest {
    pub session_type: SessionType,
    pub player_level: u32,
    pub opponent_level: u32,
    pub is_winner: bool,
    /// Staked token pool for this session (both sides combined)
    pub stakes_tokens: u64,
    pub duration_minutes: f64,
    pub player_skill: Option<SkillTier>,
    pub opponent_skill: Option<SkillTier>,
    /// Suppress all HP impact (zero-HP social/training variants)
    pub suppress_hp: bool,
    pub analysis: Option<TennisAnalysis>,
    pub momentum: Option<MomentumState>,
}

impl RewardRequest {
    /// A plain request with neutral optional inputs.
    pub fn new(
        session_type: SessionType,
        player_level: u32,
        opponent_level: u32,
        is_winner: bool,
    ) -> Self {
        Self {
            session_type,
            player_level,
            opponent_level,
            is_winner,
            stakes_tokens: 0,
            duration_minutes: DURATION_BASELINE_MINUTES,
            player_skill: None,
            opponent_skill: None,
            suppress_hp: false,
            analysis: None,
            momentum: None,
        }
    }
}

/// Computed rewards for both sides of a session. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRewardResult {
    pub win_xp: i32,
    /// HP delta for the winner (net gain, at least +1 unless suppressed)
    pub win_hp: i32,
    pub win_tokens: u64,
    pub lose_xp: i32,
    /// HP delta for the loser (a cost, so zero or negative)
    pub lose_hp: i32,
    pub lose_tokens: u64,
    /// Level-difference multiplier actually applied, in [0.5, 3.0]
    pub difficulty_multiplier: f64,
    /// `opponent_level - player_level`
    pub level_difference: i32,
}

/// Internal computation faults. Never leave this module: `calculate`
/// resolves them to the baseline table.
#[derive(Debug, thiserror::Error)]
enum ComputeError {
    #[error("level out of range: player {player}, opponent {opponent}")]
    LevelOutOfRange { player: u32, opponent: u32 },
    #[error("duration out of range: {0}")]
    DurationOutOfRange(f64),
    #[error("non-finite multiplier")]
    NonFiniteMultiplier,
}

/// Stateless reward calculator.
///
/// The public contract is "always returns a result": any internal fault is
/// logged and resolved to the fixed baseline table for the session type,
/// so callers never special-case reward computation failures.
pub struct RewardEngine;

impl RewardEngine {
    pub fn calculate(request: &RewardRequest) -> SessionRewardResult {
        match Self::compute(request) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, session_type = ?request.session_type,
                      "reward computation fell back to baseline table");
                Self::baseline(request.session_type)
            }
        }
    }

    /// Fixed deterministic fallback rewards: base values, all multipliers
    /// neutral.
    pub fn baseline(session_type: SessionType) -> SessionRewardResult {
        let econ = session_type.economic();
        let win_xp = econ.base_xp();
        let base_tokens = econ.base_tokens();
        SessionRewardResult {
            win_xp,
            win_hp: 1,
            win_tokens: base_tokens,
            lose_xp: (win_xp as f64 * LOSER_XP_RATIO).floor() as i32,
            lose_hp: -econ.base_hp_cost(),
            lose_tokens: participation_tokens(econ),
            difficulty_multiplier: 1.0,
            level_difference: 0,
        }
    }

    fn compute(request: &RewardRequest) -> Result<SessionRewardResult, ComputeError> {
        if request.player_level == 0 || request.opponent_level == 0 {
            return Err(ComputeError::LevelOutOfRange {
                player: request.player_level,
                opponent: request.opponent_level,
            });
        }
        if !request.duration_minutes.is_finite()
            || request.duration_minutes <= 0.0
            || request.duration_minutes > MAX_SESSION_MINUTES
        {
            return Err(ComputeError::DurationOutOfRange(request.duration_minutes));
        }

        let econ = request.session_type.economic();
        let level_difference = request.opponent_level as i32 - request.player_level as i32;
        let difficulty = level_multiplier(request.player_level, request.opponent_level);
        let skill = skill_multiplier(request.player_skill, request.opponent_skill);
        let bonus = tennis_bonus_multiplier(request.analysis.as_ref());

        let combined = difficulty * skill * bonus;
        if !combined.is_finite() {
            return Err(ComputeError::NonFiniteMultiplier);
        }

        // Momentum is observability context only; it never changes the math.
        if let Some(momentum) = &request.momentum {
            debug!(momentum_score = momentum.score, "momentum context attached to reward request");
        }

        let win_xp = (econ.base_xp() as f64 * combined).floor() as i32;
        let lose_xp = (win_xp as f64 * LOSER_XP_RATIO).floor() as i32;

        let (win_tokens, lose_tokens) = token_distribution(econ, request.stakes_tokens);
        let (win_hp, lose_hp) = hp_impact(econ, request.duration_minutes, request.suppress_hp);

        Ok(SessionRewardResult {
            win_xp,
            win_hp,
            win_tokens,
            lose_xp,
            lose_hp,
            lose_tokens,
            difficulty_multiplier: difficulty,
            level_difference,
        })
    }
}

/// Level-difference multiplier: facing up rewards more than facing down
/// penalizes, clamped to [0.5, 3.0].
pub fn level_multiplier(player_level: u32, opponent_level: u32) -> f64 {
    let diff = opponent_level as f64 - player_level as f64;
    let raw = if diff >= 0.0 {
        1.0 + LEVEL_SLOPE_UP * diff
    } else {
        (1.0 + LEVEL_SLOPE_DOWN * diff).max(DIFFICULTY_MULT_MIN)
    };
    raw.clamp(DIFFICULTY_MULT_MIN, DIFFICULTY_MULT_MAX)
}

/// Skill-tier multiplier, neutral when either side has no declared tier.
pub fn skill_multiplier(player: Option<SkillTier>, opponent: Option<SkillTier>) -> f64 {
    match (player, opponent) {
        (Some(p), Some(o)) => {
            let diff = (o.index() - p.index()) as f64;
            if diff >= 0.0 {
                1.0 + SKILL_SLOPE_UP * diff
            } else {
                (1.0 + SKILL_SLOPE_DOWN * diff).max(SKILL_MULT_FLOOR)
            }
        }
        _ => 1.0,
    }
}

/// Tennis bonus multiplier from analyzed set scores, in [1.0, 4.0].
/// Breaks and comebacks add; a clutch finish doubles the running total.
pub fn tennis_bonus_multiplier(analysis: Option<&TennisAnalysis>) -> f64 {
    let Some(analysis) = analysis else {
        return BONUS_MULT_MIN;
    };
    let mut bonus = 1.0;
    if analysis.double_break_bonus {
        bonus += BONUS_DOUBLE_BREAK;
    }
    if analysis.is_comeback {
        bonus += BONUS_COMEBACK;
    }
    if analysis.clutch_bonus {
        bonus *= BONUS_CLUTCH_FACTOR;
    }
    bonus.clamp(BONUS_MULT_MIN, BONUS_MULT_MAX)
}

/// Loser participation tokens: a fixed share of the session's base reward.
fn participation_tokens(econ: SessionType) -> u64 {
    (econ.base_tokens() as f64 * PARTICIPATION_TOKEN_RATIO).floor() as u64
}

/// Token amounts for winner and loser by session category.
fn token_distribution(econ: SessionType, stakes_tokens: u64) -> (u64, u64) {
    match econ {
        // Coach fee is paid win or lose, independent of stakes.
        SessionType::Training => (TRAINING_COACH_FEE_TOKENS, TRAINING_COACH_FEE_TOKENS),
        SessionType::Competitive if stakes_tokens > 0 => {
            let split = split_stake_pool(stakes_tokens);
            (split.winner_payout, participation_tokens(econ))
        }
        SessionType::Social if stakes_tokens > 0 => {
            let split = split_stake_pool(stakes_tokens.min(SOCIAL_STAKE_CAP));
            (split.winner_payout, participation_tokens(econ))
        }
        _ => (econ.base_tokens(), participation_tokens(econ)),
    }
}

/// HP deltas for winner and loser.
fn hp_impact(econ: SessionType, duration_minutes: f64, suppress_hp: bool) -> (i32, i32) {
    if suppress_hp {
        return (0, 0);
    }
    let duration_mult = (1.0
        + (duration_minutes - DURATION_BASELINE_MINUTES) / DURATION_SCALE_MINUTES)
        .min(DURATION_MULT_MAX);
    let cost = ((econ.base_hp_cost() as f64 * duration_mult).round() as i32).max(HP_COST_FLOOR);
    let win_hp = (WINNER_HP_BONUS - cost).max(1);
    (win_hp, -cost)
}
