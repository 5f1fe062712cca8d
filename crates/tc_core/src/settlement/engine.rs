// Invitation lifecycle state machine with escrowed stakes
use crate::analysis::{analyze, evaluate, max_sets_for_format, SetScore};
use crate::economy::constants::SOCIAL_STAKE_CAP;
use crate::economy::{
    split_stake_pool, RewardEngine, RewardRequest, SessionRewardResult, SessionType, SkillTier,
};
use crate::error::{EngineError, Result};
use crate::ledger::{EscrowLedger, TokenKind, TokenLedger};
use crate::settlement::collaborators::{Clock, InvitationStore, NotificationBus, SessionFactory};
use crate::settlement::types::{
    Invitation, InvitationCategory, InvitationStatus, SessionData, SettlementEvent,
};
use chrono::Duration;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Parameters for a new invitation.
#[derive(Debug, Clone)]
pub struct InvitationDraft {
    pub inviter_id: String,
    /// None creates an open invitation anyone may accept
    pub invitee_id: Option<String>,
    pub category: InvitationCategory,
    pub stakes_tokens: u64,
    pub stakes_premium_tokens: u64,
    pub is_challenge: bool,
    pub session_data: SessionData,
    /// How long the invitation stays acceptable
    pub ttl: Duration,
}

impl InvitationDraft {
    /// A plain unstaked invitation with a 24h deadline.
    pub fn new(inviter_id: &str, invitee_id: &str, category: InvitationCategory) -> Self {
        Self {
            inviter_id: inviter_id.to_string(),
            invitee_id: Some(invitee_id.to_string()),
            category,
            stakes_tokens: 0,
            stakes_premium_tokens: 0,
            is_challenge: false,
            session_data: SessionData::new(),
            ttl: Duration::hours(24),
        }
    }

    /// Turn the draft into a staked challenge.
    pub fn with_stakes(mut self, stakes_tokens: u64) -> Self {
        self.stakes_tokens = stakes_tokens;
        self.is_challenge = true;
        self
    }
}

/// Result of a successful accept.
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub invitation: Invitation,
    pub session_id: Uuid,
}

/// Final match facts reported at settlement time. Set scores are given
/// from the winner's perspective.
#[derive(Debug, Clone)]
pub struct MatchReport {
    pub winner_id: String,
    pub winner_level: u32,
    pub loser_level: u32,
    pub winner_skill: Option<SkillTier>,
    pub loser_skill: Option<SkillTier>,
    pub set_scores: Vec<SetScore>,
    pub is_doubles: bool,
    pub duration_minutes: f64,
    /// Zero-HP-impact session variants set this
    pub suppress_hp: bool,
}

/// Everything that moved when a session settled.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettlement {
    pub invitation_id: Uuid,
    pub winner_id: String,
    pub loser_id: String,
    pub rewards: SessionRewardResult,
    /// Regular tokens credited to the winner
    pub winner_payout: u64,
    /// House cut retained from the staked pool
    pub rake: u64,
    /// Social stake above the cap; forfeited, paid to no one
    pub unpaid_remainder: u64,
    pub premium_payout: u64,
    pub premium_rake: u64,
}

/// Orchestrates the invitation lifecycle: stake escrow at creation and
/// acceptance, compensating refunds on every failure path, and reward
/// settlement.
///
/// The engine holds no global state; persistence, session creation,
/// notifications and time all come in through collaborator traits.
/// Notifications are best-effort and never affect correctness.
pub struct SettlementEngine {
    store: Arc<dyn InvitationStore>,
    sessions: Arc<dyn SessionFactory>,
    bus: Arc<dyn NotificationBus>,
    clock: Arc<dyn Clock>,
    escrow: EscrowLedger,
}

impl SettlementEngine {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        sessions: Arc<dyn SessionFactory>,
        bus: Arc<dyn NotificationBus>,
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Self {
        Self { store, sessions, bus, clock, escrow: EscrowLedger::new(ledger) }
    }

    pub fn escrow(&self) -> &EscrowLedger {
        &self.escrow
    }

    /// Create a pending invitation. A staked challenge escrows the
    /// *inviter's* stake immediately; the invitee's matching stake is
    /// escrowed at accept time.
    pub fn create(&self, draft: InvitationDraft) -> Result<Invitation> {
        let now = self.clock.now();
        let invitation = Invitation {
            id: Uuid::new_v4(),
            inviter_id: draft.inviter_id,
            invitee_id: draft.invitee_id,
            category: draft.category,
            status: InvitationStatus::Pending,
            stakes_tokens: draft.stakes_tokens,
            stakes_premium_tokens: draft.stakes_premium_tokens,
            is_challenge: draft.is_challenge,
            session_data: draft.session_data,
            created_at: now,
            expires_at: now + draft.ttl,
        };

        if invitation.has_stakes() {
            self.hold_stake(&invitation, &invitation.inviter_id, "challenge stake (creation)")?;
        }

        if let Err(err) = self.store.insert(invitation.clone()) {
            // Don't leave the inviter's tokens stuck if the store rejects
            if invitation.has_stakes() {
                self.refund_if_held(invitation.id, &invitation.inviter_id, "store rollback")?;
            }
            return Err(err);
        }

        debug!(id = %invitation.id, inviter = %invitation.inviter_id, "invitation created");
        self.bus.publish(&SettlementEvent::InvitationCreated {
            id: invitation.id,
            inviter_id: invitation.inviter_id.clone(),
        });
        Ok(invitation)
    }

    /// Accept a pending invitation as `invitee_id`.
    ///
    /// Order of effects: escrow the invitee's stake, create the session,
    /// then CAS the status. A failure after the debit always refunds
    /// before surfacing, so tokens can never be stranded in escrow.
    pub fn accept(&self, id: Uuid, invitee_id: &str) -> Result<AcceptOutcome> {
        let invitation = self.store.get(id)?;
        self.expire_if_due(&invitation, "accept")?;
        self.ensure_pending(&invitation, "accept")?;

        if invitation.inviter_id == invitee_id {
            return Err(EngineError::NotAParticipant { id, player_id: invitee_id.to_string() });
        }
        if let Some(expected) = &invitation.invitee_id {
            if expected != invitee_id {
                return Err(EngineError::NotAParticipant { id, player_id: invitee_id.to_string() });
            }
        }

        if invitation.has_stakes() {
            self.hold_stake(&invitation, invitee_id, "challenge stake (acceptance)")?;
        }

        let participants = vec![invitation.inviter_id.clone(), invitee_id.to_string()];
        let kind = match invitation.category {
            InvitationCategory::Match => "match",
            InvitationCategory::SocialPlay => "social_play",
        };
        let session_id =
            match self.sessions.create_session(kind, &participants, &invitation.session_data) {
                Ok(session_id) => session_id,
                Err(reason) => {
                    if invitation.has_stakes() {
                        self.refund_if_held(id, invitee_id, "session creation failed")?;
                    }
                    return Err(EngineError::EscrowFailure { id, reason });
                }
            };

        let mut extra = SessionData::new();
        extra.insert("session_id".to_string(), serde_json::json!(session_id));
        extra.insert("accepted_by".to_string(), serde_json::json!(invitee_id));
        match self.store.compare_and_set_status(
            id,
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            &extra,
        ) {
            Ok(updated) => {
                self.bus.publish(&SettlementEvent::InvitationAccepted {
                    id,
                    invitee_id: invitee_id.to_string(),
                    session_id,
                });
                Ok(AcceptOutcome { invitation: updated, session_id })
            }
            Err(err) => {
                // Lost the transition race after the debit; put the money
                // right before reporting it
                if invitation.has_stakes() {
                    self.refund_if_held(id, invitee_id, "lost accept race")?;
                }
                Err(err)
            }
        }
    }

    /// Decline a pending invitation (invitee side). Refunds the inviter's
    /// escrowed stake exactly.
    pub fn decline(&self, id: Uuid, actor_id: &str) -> Result<Invitation> {
        let invitation = self.store.get(id)?;
        self.expire_if_due(&invitation, "decline")?;
        match &invitation.invitee_id {
            Some(invitee) if invitee == actor_id => {}
            _ => return Err(EngineError::NotAParticipant { id, player_id: actor_id.to_string() }),
        }

        let updated = self.store.compare_and_set_status(
            id,
            InvitationStatus::Pending,
            InvitationStatus::Declined,
            &SessionData::new(),
        )?;
        self.refund_if_held(id, &updated.inviter_id, "invitation declined")?;
        self.bus.publish(&SettlementEvent::InvitationDeclined { id });
        Ok(updated)
    }

    /// Cancel a pending invitation (inviter side). Refunds the inviter's
    /// escrowed stake exactly.
    pub fn cancel(&self, id: Uuid, actor_id: &str) -> Result<Invitation> {
        let invitation = self.store.get(id)?;
        self.expire_if_due(&invitation, "cancel")?;
        if invitation.inviter_id != actor_id {
            return Err(EngineError::NotAParticipant { id, player_id: actor_id.to_string() });
        }

        let updated = self.store.compare_and_set_status(
            id,
            InvitationStatus::Pending,
            InvitationStatus::Canceled,
            &SessionData::new(),
        )?;
        self.refund_if_held(id, &updated.inviter_id, "invitation canceled")?;
        self.bus.publish(&SettlementEvent::InvitationCanceled { id });
        Ok(updated)
    }

    /// Re-fetch an invitation, applying (and persisting) read-time expiry.
    /// Observers that missed bus events reconcile through this.
    pub fn refresh(&self, id: Uuid) -> Result<Invitation> {
        let invitation = self.store.get(id)?;
        if invitation.effective_status(self.clock.now()) == InvitationStatus::Expired
            && invitation.status == InvitationStatus::Pending
        {
            match self.store.compare_and_set_status(
                id,
                InvitationStatus::Pending,
                InvitationStatus::Expired,
                &SessionData::new(),
            ) {
                Ok(updated) => {
                    self.refund_if_held(id, &updated.inviter_id, "invitation expired")?;
                    self.bus.publish(&SettlementEvent::InvitationExpired { id });
                    return Ok(updated);
                }
                // Raced with another transition; report what won
                Err(_) => return self.store.get(id),
            }
        }
        Ok(invitation)
    }

    /// Settle an accepted session: run the reward pipeline over the
    /// reported set scores, return the winner's own stake, split the
    /// loser's stake into payout and rake, and credit reward tokens.
    pub fn settle(&self, id: Uuid, report: &MatchReport) -> Result<SessionSettlement> {
        let invitation = self.store.get(id)?;
        if invitation.status != InvitationStatus::Accepted {
            return Err(EngineError::InvalidStateTransition {
                id,
                status: invitation.status,
                attempted: "settle",
            });
        }

        // Open invitations record their acceptor in the session data
        let invitee = invitation
            .invitee_id
            .clone()
            .or_else(|| {
                invitation
                    .session_data
                    .get("accepted_by")
                    .and_then(|v| v.as_str().map(String::from))
            })
            .ok_or_else(|| EngineError::NotAParticipant {
                id,
                player_id: report.winner_id.clone(),
            })?;
        let winner = report.winner_id.clone();
        let loser = if winner == invitation.inviter_id {
            invitee.clone()
        } else if winner == invitee {
            invitation.inviter_id.clone()
        } else {
            return Err(EngineError::NotAParticipant { id, player_id: winner });
        };

        let session_type = match invitation.category {
            InvitationCategory::Match => SessionType::Match,
            InvitationCategory::SocialPlay => SessionType::Social,
        };
        let analysis = analyze(&report.set_scores, max_sets_for_format(report.is_doubles));
        let momentum = evaluate(&report.set_scores, report.set_scores.len(), Some(&analysis));
        let rewards = RewardEngine::calculate(&RewardRequest {
            session_type,
            player_level: report.winner_level,
            opponent_level: report.loser_level,
            is_winner: true,
            stakes_tokens: invitation.stakes_tokens,
            duration_minutes: report.duration_minutes,
            player_skill: report.winner_skill,
            opponent_skill: report.loser_skill,
            suppress_hp: report.suppress_hp,
            analysis: Some(analysis),
            momentum: Some(momentum),
        });

        let ledger = self.escrow.ledger().clone();
        let mut settlement = SessionSettlement {
            invitation_id: id,
            winner_id: winner.clone(),
            loser_id: loser.clone(),
            rewards,
            winner_payout: 0,
            rake: 0,
            unpaid_remainder: 0,
            premium_payout: 0,
            premium_rake: 0,
        };

        if invitation.has_stakes() {
            // The winner's own stake comes straight back; the loser's
            // stake is the pool being split. Missing holds mean the
            // invitation was already settled.
            let loser_hold = self.escrow.take(id, &loser).ok_or_else(|| {
                EngineError::HoldNotFound { id, player_id: loser.clone() }
            })?;
            self.refund_if_held(id, &winner, "stake returned")?;

            let effective_pool = match session_type.economic() {
                SessionType::Social => loser_hold.regular_tokens.min(SOCIAL_STAKE_CAP),
                _ => loser_hold.regular_tokens,
            };
            let split = split_stake_pool(effective_pool);
            let premium_split = split_stake_pool(loser_hold.premium_tokens);

            if split.winner_payout > 0 {
                ledger.credit(&winner, TokenKind::Regular, split.winner_payout, "challenge winnings")?;
            }
            if premium_split.winner_payout > 0 {
                ledger.credit(
                    &winner,
                    TokenKind::Premium,
                    premium_split.winner_payout,
                    "challenge winnings",
                )?;
            }

            settlement.winner_payout = split.winner_payout;
            settlement.rake = split.rake;
            settlement.unpaid_remainder = loser_hold.regular_tokens - effective_pool;
            settlement.premium_payout = premium_split.winner_payout;
            settlement.premium_rake = premium_split.rake;
        } else if settlement.rewards.win_tokens > 0 {
            ledger.credit(&winner, TokenKind::Regular, settlement.rewards.win_tokens, "session reward")?;
            settlement.winner_payout = settlement.rewards.win_tokens;
        }

        if settlement.rewards.lose_tokens > 0 {
            ledger.credit(&loser, TokenKind::Regular, settlement.rewards.lose_tokens, "participation reward")?;
        }

        debug!(%id, winner = %winner, payout = settlement.winner_payout, rake = settlement.rake,
               "session settled");
        self.bus.publish(&SettlementEvent::SessionSettled {
            id,
            winner_id: winner,
            winner_payout: settlement.winner_payout,
            rake: settlement.rake,
        });
        Ok(settlement)
    }

    fn ensure_pending(&self, invitation: &Invitation, attempted: &'static str) -> Result<()> {
        if invitation.status != InvitationStatus::Pending {
            return Err(EngineError::InvalidStateTransition {
                id: invitation.id,
                status: invitation.status,
                attempted,
            });
        }
        Ok(())
    }

    /// Read-time expiry: a pending invitation past its deadline is lazily
    /// transitioned (with the inviter refunded) and the attempted call
    /// fails as an invalid transition.
    fn expire_if_due(&self, invitation: &Invitation, attempted: &'static str) -> Result<()> {
        if invitation.status == InvitationStatus::Pending
            && invitation.is_expired(self.clock.now())
        {
            let expired = self.store.compare_and_set_status(
                invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Expired,
                &SessionData::new(),
            );
            if expired.is_ok() {
                self.refund_if_held(invitation.id, &invitation.inviter_id, "invitation expired")?;
                self.bus.publish(&SettlementEvent::InvitationExpired { id: invitation.id });
            }
            return Err(EngineError::InvalidStateTransition {
                id: invitation.id,
                status: InvitationStatus::Expired,
                attempted,
            });
        }
        Ok(())
    }

    fn hold_stake(&self, invitation: &Invitation, player_id: &str, reason: &str) -> Result<()> {
        self.escrow.hold(
            invitation.id,
            player_id,
            invitation.stakes_tokens,
            invitation.stakes_premium_tokens,
            reason,
        )?;
        self.bus.publish(&SettlementEvent::StakeEscrowed {
            id: invitation.id,
            player_id: player_id.to_string(),
            regular_tokens: invitation.stakes_tokens,
            premium_tokens: invitation.stakes_premium_tokens,
        });
        Ok(())
    }

    fn refund_if_held(&self, id: Uuid, player_id: &str, reason: &str) -> Result<()> {
        if self.escrow.held(id, player_id).is_none() {
            return Ok(());
        }
        let hold = self.escrow.refund(id, player_id, reason)?;
        self.bus.publish(&SettlementEvent::StakeRefunded {
            id,
            player_id: player_id.to_string(),
            regular_tokens: hold.regular_tokens,
            premium_tokens: hold.premium_tokens,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryTokenLedger;
    use crate::settlement::collaborators::{
        InMemoryInvitationStore, InMemorySessionFactory, ManualClock, RecordingNotificationBus,
    };
    use chrono::Utc;

    struct Fixture {
        ledger: Arc<InMemoryTokenLedger>,
        store: Arc<InMemoryInvitationStore>,
        factory: Arc<InMemorySessionFactory>,
        bus: Arc<RecordingNotificationBus>,
        clock: Arc<ManualClock>,
        engine: SettlementEngine,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryTokenLedger::new());
        ledger.credit("alice", TokenKind::Regular, 200, "seed").unwrap();
        ledger.credit("bob", TokenKind::Regular, 200, "seed").unwrap();
        let store = Arc::new(InMemoryInvitationStore::new());
        let factory = Arc::new(InMemorySessionFactory::new());
        let bus = Arc::new(RecordingNotificationBus::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = SettlementEngine::new(
            store.clone(),
            factory.clone(),
            bus.clone(),
            clock.clone(),
            ledger.clone(),
        );
        Fixture { ledger, store, factory, bus, clock, engine }
    }

    fn staked_challenge(fx: &Fixture, stake: u64) -> Invitation {
        fx.engine
            .create(
                InvitationDraft::new("alice", "bob", InvitationCategory::Match).with_stakes(stake),
            )
            .unwrap()
    }

    #[test]
    fn test_create_escrows_inviter_stake() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);

        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 100);
        assert_eq!(fx.engine.escrow().held(invitation.id, "alice").unwrap().regular_tokens, 100);
        // Invitee untouched until acceptance
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 200);
    }

    #[test]
    fn test_create_rejected_when_inviter_cannot_cover_stake() {
        let fx = fixture();
        let result = fx.engine.create(
            InvitationDraft::new("alice", "bob", InvitationCategory::Match).with_stakes(500),
        );
        assert!(matches!(result, Err(EngineError::InsufficientBalance { .. })));
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 200);
    }

    #[test]
    fn test_accept_escrows_invitee_and_creates_session() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);

        let outcome = fx.engine.accept(invitation.id, "bob").unwrap();
        assert_eq!(outcome.invitation.status, InvitationStatus::Accepted);
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 100);
        assert_eq!(fx.factory.created_count(), 1);
        assert_eq!(
            outcome.invitation.session_data["session_id"],
            serde_json::json!(outcome.session_id)
        );
        assert!(fx.bus.events().iter().any(|e| matches!(
            e,
            SettlementEvent::InvitationAccepted { session_id, .. } if *session_id == outcome.session_id
        )));
    }

    #[test]
    fn test_accept_insufficient_invitee_balance() {
        let fx = fixture();
        fx.ledger.debit("bob", TokenKind::Regular, 150, "spent").unwrap();
        let invitation = staked_challenge(&fx, 100);

        let err = fx.engine.accept(invitation.id, "bob").unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));
        // Invitation stays pending, inviter's escrow intact, no session
        assert_eq!(fx.store.get(invitation.id).unwrap().status, InvitationStatus::Pending);
        assert_eq!(fx.engine.escrow().held(invitation.id, "alice").unwrap().regular_tokens, 100);
        assert_eq!(fx.factory.created_count(), 0);
    }

    #[test]
    fn test_accept_expired_fails_and_refunds_inviter() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        fx.clock.advance(Duration::hours(25));

        let err = fx.engine.accept(invitation.id, "bob").unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidStateTransition {
                id: invitation.id,
                status: InvitationStatus::Expired,
                attempted: "accept",
            }
        );
        assert_eq!(fx.store.get(invitation.id).unwrap().status, InvitationStatus::Expired);
        // Inviter made whole, invitee never touched
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 200);
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 200);
    }

    #[test]
    fn test_accept_non_pending_causes_no_balance_mutation() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        fx.engine.decline(invitation.id, "bob").unwrap();
        let before_alice = fx.ledger.balance("alice");
        let before_bob = fx.ledger.balance("bob");

        let err = fx.engine.accept(invitation.id, "bob").unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
        assert_eq!(fx.ledger.balance("alice"), before_alice);
        assert_eq!(fx.ledger.balance("bob"), before_bob);
    }

    #[test]
    fn test_racing_accept_cannot_touch_existing_hold() {
        // A second accept by the same invitee while another is in flight
        // (its stake already escrowed, CAS not yet run) must fail before
        // creating a session and leave the in-flight hold untouched
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        fx.engine.escrow().hold(invitation.id, "bob", 100, 0, "challenge stake").unwrap();

        let err = fx.engine.accept(invitation.id, "bob").unwrap_err();
        assert!(matches!(err, EngineError::HoldConflict { .. }));
        assert_eq!(fx.factory.created_count(), 0);
        assert_eq!(fx.store.get(invitation.id).unwrap().status, InvitationStatus::Pending);
        // Only the one debit happened and the hold still covers it
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 100);
        assert_eq!(fx.engine.escrow().held(invitation.id, "bob").unwrap().regular_tokens, 100);
    }

    #[test]
    fn test_session_failure_refunds_invitee() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        fx.factory.fail_next();

        let err = fx.engine.accept(invitation.id, "bob").unwrap_err();
        assert!(matches!(err, EngineError::EscrowFailure { .. }));
        assert!(err.is_retryable());
        // Compensating refund ran before the error surfaced
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 200);
        assert_eq!(fx.store.get(invitation.id).unwrap().status, InvitationStatus::Pending);

        // The invitation is still acceptable once the backend recovers
        assert!(fx.engine.accept(invitation.id, "bob").is_ok());
    }

    #[test]
    fn test_decline_refunds_exact_original_stake() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 80);
        // Interim unrelated balance movement for the inviter
        fx.ledger.credit("alice", TokenKind::Regular, 33, "daily quiz").unwrap();

        let updated = fx.engine.decline(invitation.id, "bob").unwrap();
        assert_eq!(updated.status, InvitationStatus::Declined);
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 200 - 80 + 33 + 80);
        assert!(fx.bus.events().iter().any(|e| matches!(
            e,
            SettlementEvent::StakeRefunded { regular_tokens: 80, .. }
        )));
    }

    #[test]
    fn test_cancel_only_by_inviter() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 50);

        let err = fx.engine.cancel(invitation.id, "bob").unwrap_err();
        assert!(matches!(err, EngineError::NotAParticipant { .. }));

        let updated = fx.engine.cancel(invitation.id, "alice").unwrap();
        assert_eq!(updated.status, InvitationStatus::Canceled);
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 200);
    }

    #[test]
    fn test_decline_only_by_invitee() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 50);
        let err = fx.engine.decline(invitation.id, "mallory").unwrap_err();
        assert!(matches!(err, EngineError::NotAParticipant { .. }));
    }

    #[test]
    fn test_refresh_applies_expiry_and_refunds() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 60);
        fx.clock.advance(Duration::hours(25));

        let refreshed = fx.engine.refresh(invitation.id).unwrap();
        assert_eq!(refreshed.status, InvitationStatus::Expired);
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 200);
        assert!(fx
            .bus
            .events()
            .iter()
            .any(|e| matches!(e, SettlementEvent::InvitationExpired { .. })));

        // Refreshing a terminal invitation is a no-op
        let again = fx.engine.refresh(invitation.id).unwrap();
        assert_eq!(again.status, InvitationStatus::Expired);
    }

    #[test]
    fn test_settle_competitive_stake_scenario() {
        // Scenario: bob (level 10) beats alice (level 15), stake 100
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        fx.engine.accept(invitation.id, "bob").unwrap();

        let settlement = fx
            .engine
            .settle(
                invitation.id,
                &MatchReport {
                    winner_id: "bob".to_string(),
                    winner_level: 10,
                    loser_level: 15,
                    winner_skill: None,
                    loser_skill: None,
                    set_scores: vec![
                        SetScore::new(6, 4, true),
                        SetScore::new(6, 3, true),
                        SetScore::new(6, 4, true),
                    ],
                    is_doubles: false,
                    duration_minutes: 90.0,
                    suppress_hp: false,
                },
            )
            .unwrap();

        assert!((settlement.rewards.difficulty_multiplier - 1.75).abs() < 1e-9);
        assert_eq!(settlement.winner_payout, 90);
        assert_eq!(settlement.rake, 10);
        // Bob: 200 - 100 stake + 100 returned + 90 winnings
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 290);
        // Alice: 200 - 100 stake + 9 participation (floor(0.3 * 30))
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 109);
    }

    #[test]
    fn test_settle_social_stake_caps_pool() {
        let fx = fixture();
        let invitation = fx
            .engine
            .create(
                InvitationDraft::new("alice", "bob", InvitationCategory::SocialPlay)
                    .with_stakes(30),
            )
            .unwrap();
        fx.engine.accept(invitation.id, "bob").unwrap();

        let settlement = fx
            .engine
            .settle(
                invitation.id,
                &MatchReport {
                    winner_id: "alice".to_string(),
                    winner_level: 8,
                    loser_level: 8,
                    winner_skill: None,
                    loser_skill: None,
                    set_scores: vec![SetScore::new(6, 4, true), SetScore::new(6, 4, true)],
                    is_doubles: true,
                    duration_minutes: 60.0,
                    suppress_hp: false,
                },
            )
            .unwrap();

        assert_eq!(settlement.winner_payout, 18);
        assert_eq!(settlement.rake, 2);
        assert_eq!(settlement.unpaid_remainder, 10);
        // Loser gets no stake tokens, only the participation base
        assert_eq!(settlement.rewards.lose_tokens, 4);
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 200 - 30 + 4);
    }

    #[test]
    fn test_settle_twice_fails_without_double_payout() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        fx.engine.accept(invitation.id, "bob").unwrap();
        let report = MatchReport {
            winner_id: "bob".to_string(),
            winner_level: 10,
            loser_level: 10,
            winner_skill: None,
            loser_skill: None,
            set_scores: vec![SetScore::new(6, 4, true), SetScore::new(6, 4, true)],
            is_doubles: true,
            duration_minutes: 60.0,
            suppress_hp: false,
        };
        fx.engine.settle(invitation.id, &report).unwrap();
        let balance_after_first = fx.ledger.balance("bob");

        let err = fx.engine.settle(invitation.id, &report).unwrap_err();
        assert!(matches!(err, EngineError::HoldNotFound { .. }));
        assert_eq!(fx.ledger.balance("bob"), balance_after_first);
    }

    #[test]
    fn test_settle_requires_accepted_status() {
        let fx = fixture();
        let invitation = staked_challenge(&fx, 100);
        let report = MatchReport {
            winner_id: "bob".to_string(),
            winner_level: 10,
            loser_level: 10,
            winner_skill: None,
            loser_skill: None,
            set_scores: vec![],
            is_doubles: false,
            duration_minutes: 60.0,
            suppress_hp: false,
        };
        let err = fx.engine.settle(invitation.id, &report).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidStateTransition {
                id: invitation.id,
                status: InvitationStatus::Pending,
                attempted: "settle",
            }
        );
    }

    #[test]
    fn test_unstaked_social_play_flat_rewards() {
        let fx = fixture();
        let invitation = fx
            .engine
            .create(InvitationDraft::new("alice", "bob", InvitationCategory::SocialPlay))
            .unwrap();
        fx.engine.accept(invitation.id, "bob").unwrap();

        let settlement = fx
            .engine
            .settle(
                invitation.id,
                &MatchReport {
                    winner_id: "bob".to_string(),
                    winner_level: 5,
                    loser_level: 5,
                    winner_skill: None,
                    loser_skill: None,
                    set_scores: vec![SetScore::new(6, 3, true), SetScore::new(6, 2, true)],
                    is_doubles: true,
                    duration_minutes: 45.0,
                    suppress_hp: true,
                },
            )
            .unwrap();

        // Flat base reward, no stake movement, no rake
        assert_eq!(settlement.winner_payout, 15);
        assert_eq!(settlement.rake, 0);
        assert_eq!(settlement.rewards.win_hp, 0);
        assert_eq!(fx.ledger.balance("bob").regular_tokens, 215);
        assert_eq!(fx.ledger.balance("alice").regular_tokens, 204);
    }

    #[test]
    fn test_open_invitation_records_acceptor() {
        let fx = fixture();
        let mut draft = InvitationDraft::new("alice", "bob", InvitationCategory::SocialPlay);
        draft.invitee_id = None;
        let invitation = fx.engine.create(draft).unwrap();

        let outcome = fx.engine.accept(invitation.id, "bob").unwrap();
        assert_eq!(outcome.invitation.session_data["accepted_by"], "bob");
    }
}
