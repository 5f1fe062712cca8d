// In-memory token ledger with atomic per-player mutations
use crate::error::{EngineError, Result};
use crate::ledger::{TokenBalance, TokenKind, TokenLedger};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Mutex-guarded ledger for hosts without external persistence and for
/// tests. Each debit/credit runs under the lock, so two concurrent
/// operations on one player serialize instead of losing an update.
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    accounts: Mutex<HashMap<String, TokenBalance>>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a player balance, replacing whatever was there.
    pub fn set_balance(&self, player_id: &str, balance: TokenBalance) {
        self.lock().insert(player_id.to_string(), balance);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TokenBalance>> {
        self.accounts.lock().expect("ledger lock poisoned")
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance(&self, player_id: &str) -> TokenBalance {
        self.lock().get(player_id).copied().unwrap_or_default()
    }

    fn debit(&self, player_id: &str, kind: TokenKind, amount: u64, reason: &str) -> Result<()> {
        let mut accounts = self.lock();
        let balance = accounts.entry(player_id.to_string()).or_default();
        let available = balance.amount(kind);
        if available < amount {
            return Err(EngineError::InsufficientBalance {
                player_id: player_id.to_string(),
                kind,
                required: amount,
                available,
            });
        }
        *balance.amount_mut(kind) -= amount;
        debug!(player_id, %kind, amount, reason, "ledger debit");
        Ok(())
    }

    fn credit(&self, player_id: &str, kind: TokenKind, amount: u64, reason: &str) -> Result<()> {
        let mut accounts = self.lock();
        let balance = accounts.entry(player_id.to_string()).or_default();
        *balance.amount_mut(kind) = balance.amount(kind).saturating_add(amount);
        balance.lifetime_earned = balance.lifetime_earned.saturating_add(amount);
        debug!(player_id, %kind, amount, reason, "ledger credit");
        Ok(())
    }
}
