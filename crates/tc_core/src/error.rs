use crate::ledger::TokenKind;
use crate::settlement::InvitationStatus;
use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the settlement engine and the token ledger.
///
/// Reward calculation deliberately has no variant here: the reward engine
/// always returns a result and resolves internal faults to its baseline
/// table (see `economy::rewards`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("insufficient {kind} balance for {player_id}: required {required}, available {available}")]
    InsufficientBalance { player_id: String, kind: TokenKind, required: u64, available: u64 },

    #[error("invitation not found: {id}")]
    InvitationNotFound { id: Uuid },

    #[error("invalid transition for invitation {id}: {attempted} while {status}")]
    InvalidStateTransition { id: Uuid, status: InvitationStatus, attempted: &'static str },

    #[error("escrow failure on invitation {id}: {reason} (stake refunded)")]
    EscrowFailure { id: Uuid, reason: String },

    #[error("no escrow hold for invitation {id} and player {player_id}")]
    HoldNotFound { id: Uuid, player_id: String },

    #[error("stake already escrowed for invitation {id} and player {player_id}")]
    HoldConflict { id: Uuid, player_id: String },

    #[error("player {player_id} is not a participant of invitation {id}")]
    NotAParticipant { id: Uuid, player_id: String },
}

impl EngineError {
    /// Whether retrying the same call can ever succeed without other state
    /// changing first.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::InsufficientBalance { .. } => false,
            EngineError::InvitationNotFound { .. } => false,
            EngineError::InvalidStateTransition { .. } => false,
            // The compensating refund already ran; the caller may retry accept.
            EngineError::EscrowFailure { .. } => true,
            EngineError::HoldNotFound { .. } => false,
            EngineError::HoldConflict { .. } => false,
            EngineError::NotAParticipant { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
