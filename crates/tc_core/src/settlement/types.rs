// Challenge invitation records and lifecycle events
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Metadata bag carried by an invitation into its session.
pub type SessionData = serde_json::Map<String, serde_json::Value>;

/// What kind of session an invitation leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationCategory {
    Match,
    SocialPlay,
}

/// Invitation lifecycle states.
///
/// `Pending` is the only non-terminal state: once an invitation leaves it
/// there is no way back, and every terminal state is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
    Canceled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A challenge or social-play invitation between two players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub inviter_id: String,
    /// Open invitations have no invitee until someone accepts
    pub invitee_id: Option<String>,
    pub category: InvitationCategory,
    pub status: InvitationStatus,
    /// Regular-token stake each participant puts up
    pub stakes_tokens: u64,
    pub stakes_premium_tokens: u64,
    pub is_challenge: bool,
    pub session_data: SessionData,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Status with read-time expiry applied: a `Pending` invitation past
    /// its deadline reads as `Expired` even before anyone transitions it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.is_expired(now) {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether any tokens are at stake.
    pub fn has_stakes(&self) -> bool {
        self.is_challenge && (self.stakes_tokens > 0 || self.stakes_premium_tokens > 0)
    }
}

/// Lifecycle notifications published to the bus. Delivery is best-effort;
/// nothing in the engine depends on a consumer seeing these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettlementEvent {
    InvitationCreated { id: Uuid, inviter_id: String },
    InvitationAccepted { id: Uuid, invitee_id: String, session_id: Uuid },
    InvitationDeclined { id: Uuid },
    InvitationCanceled { id: Uuid },
    InvitationExpired { id: Uuid },
    StakeEscrowed { id: Uuid, player_id: String, regular_tokens: u64, premium_tokens: u64 },
    StakeRefunded { id: Uuid, player_id: String, regular_tokens: u64, premium_tokens: u64 },
    SessionSettled { id: Uuid, winner_id: String, winner_payout: u64, rake: u64 },
}
