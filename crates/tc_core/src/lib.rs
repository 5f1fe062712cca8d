//! # tc_core - Session Economy & Challenge Settlement Engine
//!
//! Rules engine for the tennis club platform: turns completed matches
//! into XP/HP/token rewards, analyzes set scores into bonus conditions
//! and a momentum signal, and manages token stakes on challenge
//! invitations (escrow on acceptance, refund on decline/cancel/failure,
//! payout on settlement).
//!
//! ## Design
//! - `analysis`, `economy`: pure, deterministic, lock-free — safe to call
//!   from any number of threads
//! - `ledger`, `settlement`: stateful, serialized per player and per
//!   invitation (atomic balance mutations, compare-and-swap status
//!   transitions)
//! - No global state: persistence, session creation, notifications and
//!   time are injected collaborator traits
//! - The engine performs no I/O of its own; it is called from a service
//!   boundary the host application owns

pub mod analysis;
pub mod economy;
pub mod error;
pub mod ledger;
pub mod settlement;

// Re-export the main engine surface
pub use analysis::{
    analyze, evaluate, max_sets_for_format, MomentumIntensity, MomentumShift, MomentumState,
    MomentumTrend, SetScore, TennisAnalysis,
};
pub use economy::{
    split_stake_pool, RewardEngine, RewardRequest, SessionRewardResult, SessionType, SkillTier,
    StakeSplit,
};
pub use error::{EngineError, Result};
pub use ledger::{
    EscrowHold, EscrowLedger, InMemoryTokenLedger, TokenBalance, TokenKind, TokenLedger,
};
pub use settlement::{
    AcceptOutcome, Clock, Invitation, InvitationCategory, InvitationDraft, InvitationStatus,
    InvitationStore, MatchReport, NotificationBus, SessionFactory, SessionSettlement,
    SettlementEngine, SettlementEvent, SystemClock,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SCHEMA_VERSION: u8 = 1;
