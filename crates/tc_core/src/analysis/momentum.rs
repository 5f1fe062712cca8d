// Momentum signal derived from set-score history
use crate::analysis::match_analyzer::{SetScore, TennisAnalysis};
use serde::{Deserialize, Serialize};

/// Direction the momentum score is moving between sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MomentumTrend {
    Rising,
    Falling,
    #[default]
    Stable,
}

/// How pronounced the momentum score is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MomentumIntensity {
    #[default]
    Low,
    Medium,
    High,
}

/// Bounded momentum snapshot for one evaluation.
///
/// Derived per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumState {
    /// Momentum score in [-100, 100], positive favors the player
    pub score: i32,
    pub trend: MomentumTrend,
    pub intensity: MomentumIntensity,
    /// Grows with the number of completed sets, in [0, 1]
    pub confidence: f32,
}

impl MomentumState {
    /// Display label for the current score range, a fixed six-label
    /// ladder.
    pub fn description(&self) -> &'static str {
        describe(self.score)
    }
}

impl Default for MomentumState {
    fn default() -> Self {
        Self {
            score: 0,
            trend: MomentumTrend::Stable,
            intensity: MomentumIntensity::Low,
            confidence: 0.3,
        }
    }
}

// Factor weights
const LAST_SET_WEIGHT: f32 = 1.5;
const SCORE_DIFF_SCALE: f32 = 5.0;
const SCORE_DIFF_CLAMP: f32 = 50.0;
const RECENT_WIN_POINTS: i32 = 20;
const RECENT_LOSS_POINTS: i32 = -15;
const RECENT_MARGIN_BONUS: i32 = 10;
const RECENT_MARGIN_GAMES: i32 = 3;
const RECENT_CLAMP: i32 = 30;
const CONTEXT_DOUBLE_BREAK: i32 = 15;
const CONTEXT_COMEBACK: i32 = 20;
const CONTEXT_CLUTCH: i32 = 25;

/// Evaluate the momentum signal after `current_set_index` sets.
///
/// Only sets up to the index that are marked `completed` contribute.
/// Supplying the match analysis adds the bonus-condition context factor.
pub fn evaluate(
    sets: &[SetScore],
    current_set_index: usize,
    analysis: Option<&TennisAnalysis>,
) -> MomentumState {
    let bound = current_set_index.min(sets.len());
    let completed: Vec<&SetScore> = sets[..bound].iter().filter(|s| s.completed).collect();

    if completed.is_empty() {
        return MomentumState::default();
    }

    let score_difference = score_difference_factor(&completed);
    let recent_performance = recent_performance_factor(&completed);
    let match_context = analysis.map(context_factor).unwrap_or(0);

    let raw = score_difference + recent_performance as f32 + match_context as f32;
    let score = (raw.clamp(-100.0, 100.0)).round() as i32;

    MomentumState {
        score,
        trend: trend(&completed),
        intensity: intensity(score),
        confidence: (0.3 + 0.2 * completed.len() as f32).min(1.0),
    }
}

/// Weighted per-set game differentials, most recent set counting extra.
fn score_difference_factor(completed: &[&SetScore]) -> f32 {
    let last = completed.len() - 1;
    let sum: f32 = completed
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let weight = if i == last { LAST_SET_WEIGHT } else { 1.0 };
            s.differential() as f32 * weight
        })
        .sum();
    (sum * SCORE_DIFF_SCALE).clamp(-SCORE_DIFF_CLAMP, SCORE_DIFF_CLAMP)
}

/// Win/loss points over the last two sets, with a margin bonus for
/// lopsided scorelines.
fn recent_performance_factor(completed: &[&SetScore]) -> i32 {
    let recent = &completed[completed.len().saturating_sub(2)..];
    let mut points = 0;
    for set in recent {
        if set.player_won() {
            points += RECENT_WIN_POINTS;
            if set.differential() >= RECENT_MARGIN_GAMES {
                points += RECENT_MARGIN_BONUS;
            }
        } else {
            points += RECENT_LOSS_POINTS;
            if -set.differential() >= RECENT_MARGIN_GAMES {
                points -= RECENT_MARGIN_BONUS;
            }
        }
    }
    points.clamp(-RECENT_CLAMP, RECENT_CLAMP)
}

fn context_factor(analysis: &TennisAnalysis) -> i32 {
    let mut points = 0;
    if analysis.double_break_bonus {
        points += CONTEXT_DOUBLE_BREAK;
    }
    if analysis.is_comeback {
        points += CONTEXT_COMEBACK;
    }
    if analysis.clutch_bonus {
        points += CONTEXT_CLUTCH;
    }
    points
}

/// Compare the differentials of the last two completed sets.
fn trend(completed: &[&SetScore]) -> MomentumTrend {
    if completed.len() < 2 {
        return MomentumTrend::Stable;
    }
    let last = completed[completed.len() - 1].differential();
    let previous = completed[completed.len() - 2].differential();
    let delta = last - previous;
    if delta > 1 {
        MomentumTrend::Rising
    } else if delta < -1 {
        MomentumTrend::Falling
    } else {
        MomentumTrend::Stable
    }
}

fn intensity(score: i32) -> MomentumIntensity {
    match score.abs() {
        60.. => MomentumIntensity::High,
        30..=59 => MomentumIntensity::Medium,
        _ => MomentumIntensity::Low,
    }
}

/// Fixed six-label ladder keyed on score ranges.
fn describe(score: i32) -> &'static str {
    if score > 60 {
        "Dominating the match"
    } else if score > 30 {
        "Building strong momentum"
    } else if score > 10 {
        "Holding a slight edge"
    } else if score >= -10 {
        "Evenly matched"
    } else if score > -60 {
        "Losing ground"
    } else {
        "Struggling to find rhythm"
    }
}
