// Custodial stake holds pending challenge settlement
use crate::error::{EngineError, Result};
use crate::ledger::{TokenKind, TokenLedger};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// One player's escrowed stake for one invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowHold {
    pub regular_tokens: u64,
    pub premium_tokens: u64,
}

impl EscrowHold {
    pub fn is_empty(&self) -> bool {
        self.regular_tokens == 0 && self.premium_tokens == 0
    }
}

/// Custodial ledger of stake holds, keyed by (invitation, player).
///
/// A hold debits the player immediately; the tokens live in escrow until
/// they are refunded (decline / cancel / expiry / failed accept) or
/// consumed by settlement. Refunds always return exactly the held amount,
/// regardless of how the player's balance moved in the interim.
pub struct EscrowLedger {
    ledger: Arc<dyn TokenLedger>,
    holds: Mutex<HashMap<(Uuid, String), EscrowHold>>,
}

impl EscrowLedger {
    pub fn new(ledger: Arc<dyn TokenLedger>) -> Self {
        Self { ledger, holds: Mutex::new(HashMap::new()) }
    }

    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Uuid, String), EscrowHold>> {
        self.holds.lock().expect("escrow lock poisoned")
    }

    /// Debit a player's stake into escrow.
    ///
    /// Both token kinds are taken as one atomic step from the caller's
    /// perspective: if the premium debit fails after the regular debit
    /// succeeded, the regular debit is compensated before the error
    /// surfaces.
    ///
    /// At most one hold may exist per `(invitation, player)` key. The lock
    /// is kept across the check and the debits, so two racing holds for
    /// the same key serialize and the second fails with `HoldConflict`
    /// before touching the ledger. A compensating refund therefore always
    /// returns exactly one caller's stake, never a merged amount.
    pub fn hold(
        &self,
        invitation_id: Uuid,
        player_id: &str,
        regular_tokens: u64,
        premium_tokens: u64,
        reason: &str,
    ) -> Result<()> {
        let mut holds = self.lock();
        let key = (invitation_id, player_id.to_string());
        if holds.contains_key(&key) {
            return Err(EngineError::HoldConflict {
                id: invitation_id,
                player_id: player_id.to_string(),
            });
        }

        if regular_tokens > 0 {
            self.ledger.debit(player_id, TokenKind::Regular, regular_tokens, reason)?;
        }
        if premium_tokens > 0 {
            if let Err(err) = self.ledger.debit(player_id, TokenKind::Premium, premium_tokens, reason)
            {
                if regular_tokens > 0 {
                    self.ledger
                        .credit(player_id, TokenKind::Regular, regular_tokens, "escrow rollback")?;
                }
                return Err(err);
            }
        }

        holds.insert(key, EscrowHold { regular_tokens, premium_tokens });
        debug!(%invitation_id, player_id, regular_tokens, premium_tokens, "stake escrowed");
        Ok(())
    }

    /// Return the exact held amount to the player and drop the hold.
    pub fn refund(&self, invitation_id: Uuid, player_id: &str, reason: &str) -> Result<EscrowHold> {
        let hold = self.take(invitation_id, player_id).ok_or_else(|| {
            EngineError::HoldNotFound { id: invitation_id, player_id: player_id.to_string() }
        })?;
        if hold.regular_tokens > 0 {
            self.ledger.credit(player_id, TokenKind::Regular, hold.regular_tokens, reason)?;
        }
        if hold.premium_tokens > 0 {
            self.ledger.credit(player_id, TokenKind::Premium, hold.premium_tokens, reason)?;
        }
        debug!(%invitation_id, player_id, ?hold, "stake refunded");
        Ok(hold)
    }

    /// Remove and return a hold without crediting anyone. Settlement uses
    /// this to split the consumed stake into payout and rake.
    pub fn take(&self, invitation_id: Uuid, player_id: &str) -> Option<EscrowHold> {
        self.lock().remove(&(invitation_id, player_id.to_string()))
    }

    /// Peek at an active hold.
    pub fn held(&self, invitation_id: Uuid, player_id: &str) -> Option<EscrowHold> {
        self.lock().get(&(invitation_id, player_id.to_string())).copied()
    }
}
