//! Token ledger abstraction
//!
//! The ledger is an external collaborator: the governance core only ever
//! issues or burns tokens on it, and reads balances for token-weighted votes.
//! Whoever holds the `TokenLedger` value can mutate it, so handing the value
//! to the core is the ownership transfer.

use crate::identity::Address;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Unknown token: {0}")]
    UnknownToken(Address),

    #[error("Insufficient balance for {holder}: need {needed}, have {available}")]
    InsufficientBalance {
        holder: Address,
        needed: u64,
        available: u64,
    },

    #[error("Supply overflow on {0}")]
    Overflow(Address),
}

/// Token ledger operations used by the governance engine.
pub trait TokenLedger {
    /// Create `amount` new tokens for `recipient`.
    fn issue(&mut self, token: &Address, recipient: &Address, amount: u64) -> LedgerResult<()>;

    /// Destroy `amount` tokens held by `holder`.
    fn burn(&mut self, token: &Address, holder: &Address, amount: u64) -> LedgerResult<()>;

    /// Balance of `holder` (0 for unknown tokens or holders).
    fn balance_of(&self, token: &Address, holder: &Address) -> u64;

    /// Total issued supply of `token`.
    fn total_supply(&self, token: &Address) -> u64;
}
