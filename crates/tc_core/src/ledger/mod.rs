// Token balances, the ledger seam, and escrow holds
pub mod escrow;
pub mod memory;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use escrow::{EscrowHold, EscrowLedger};
pub use memory::InMemoryTokenLedger;

/// The two token currencies of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Regular,
    Premium,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Regular => write!(f, "regular"),
            TokenKind::Premium => write!(f, "premium"),
        }
    }
}

/// Token holdings of a single player.
///
/// Fields are unsigned, so a balance can never go negative; debits that
/// would overdraw are rejected before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenBalance {
    pub regular_tokens: u64,
    pub premium_tokens: u64,
    /// Total tokens ever credited, across both kinds
    pub lifetime_earned: u64,
}

impl TokenBalance {
    pub fn amount(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Regular => self.regular_tokens,
            TokenKind::Premium => self.premium_tokens,
        }
    }

    fn amount_mut(&mut self, kind: TokenKind) -> &mut u64 {
        match kind {
            TokenKind::Regular => &mut self.regular_tokens,
            TokenKind::Premium => &mut self.premium_tokens,
        }
    }
}

/// Persistence seam for token balances.
///
/// Every debit and credit must be a single atomic read-modify-write per
/// player so concurrent operations on the same balance cannot lose
/// updates. Debits that would overdraw must fail without mutating.
pub trait TokenLedger: Send + Sync {
    fn balance(&self, player_id: &str) -> TokenBalance;

    fn debit(&self, player_id: &str, kind: TokenKind, amount: u64, reason: &str) -> Result<()>;

    fn credit(&self, player_id: &str, kind: TokenKind, amount: u64, reason: &str) -> Result<()>;
}
