// Set-score analysis: breaks, comebacks, clutch finishes
use serde::{Deserialize, Serialize};

/// Final score of a single set, from the player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    /// Games won by the player
    pub player_games: i32,
    /// Games won by the opponent
    pub opponent_games: i32,
    /// Whether the set has been played to completion
    pub completed: bool,
}

impl SetScore {
    pub fn new(player_games: i32, opponent_games: i32, completed: bool) -> Self {
        Self { player_games, opponent_games, completed }
    }

    /// Game differential from the player's perspective.
    pub fn differential(&self) -> i32 {
        self.player_games - self.opponent_games
    }

    /// Whether the player took the set.
    pub fn player_won(&self) -> bool {
        self.player_games > self.opponent_games
    }
}

/// Which side the most recent set swung towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MomentumShift {
    Player,
    Opponent,
    #[default]
    Neutral,
}

/// Bonus conditions derived from the set scores of one match.
///
/// Derived per evaluation, never persisted. Break detection works from
/// final set scores only (no point-by-point data), so it is an
/// approximation rather than a rules-accurate tennis statistic; callers
/// that later gain exact data can swap this module without touching the
/// reward pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TennisAnalysis {
    /// Estimated service breaks achieved by the player
    pub break_count: i32,
    /// Lost the first set, won a later one
    pub is_comeback: bool,
    /// The deciding set has been reached
    pub is_final_set: bool,
    /// Reached the deciding set while leading on sets won
    pub clutch_bonus: bool,
    /// Two or more estimated breaks
    pub double_break_bonus: bool,
    /// Direction of the last completed set
    pub momentum_shift: MomentumShift,
}

/// Maximum sets for a match format: best-of-3 for doubles, best-of-5 for
/// singles.
pub fn max_sets_for_format(is_doubles: bool) -> usize {
    if is_doubles {
        3
    } else {
        5
    }
}

/// Analyze an ordered sequence of set scores.
///
/// Pure and deterministic. Sets that are not `completed` are ignored.
/// An empty history yields all-false/neutral defaults.
pub fn analyze(sets: &[SetScore], max_sets: usize) -> TennisAnalysis {
    let completed: Vec<&SetScore> = sets.iter().filter(|s| s.completed).collect();
    if completed.is_empty() {
        return TennisAnalysis::default();
    }

    // Break heuristic: a clear two-game win from 6+ games counts as one
    // break, a dominant scoreline (opponent held to 2 or fewer) adds a
    // half-break credit. Half credits are tracked in units of 0.5 and the
    // total floored.
    let mut half_credits: i32 = 0;
    for set in &completed {
        if set.player_games >= 6 && set.differential() >= 2 {
            half_credits += 2;
        }
        if set.player_games >= 6 && set.opponent_games <= 2 {
            half_credits += 1;
        }
    }
    let break_count = half_credits / 2;

    let lost_first = !completed[0].player_won();
    let won_later = completed.iter().skip(1).any(|s| s.player_won());
    let is_comeback = lost_first && won_later;

    let sets_won = completed.iter().filter(|s| s.player_won()).count();
    let sets_lost = completed.len() - sets_won;

    let is_final_set = completed.len() >= max_sets.saturating_sub(1);
    let clutch_bonus = is_final_set && sets_won > sets_lost;

    let momentum_shift = match completed.last().map(|s| s.differential()) {
        Some(d) if d >= 3 => MomentumShift::Player,
        Some(d) if d <= -3 => MomentumShift::Opponent,
        _ => MomentumShift::Neutral,
    };

    TennisAnalysis {
        break_count,
        is_comeback,
        is_final_set,
        clutch_bonus,
        double_break_bonus: break_count >= 2,
        momentum_shift,
    }
}
