// 매치 분석 모듈 - set-score heuristics and momentum signal
pub mod match_analyzer;
pub mod momentum;

pub use match_analyzer::{analyze, max_sets_for_format, MomentumShift, SetScore, TennisAnalysis};
pub use momentum::{evaluate, MomentumIntensity, MomentumState, MomentumTrend};
