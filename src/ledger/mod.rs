//! Token ledger collaborator.
//!
//! The ledger is the target of `issueTokens`/`burnTokens` and the weight
//! source for token-weighted votes. Only the governance core holds a mutable
//! handle once the DAO is live.

pub mod memory;
pub mod traits;

pub use memory::InMemoryLedger;
pub use traits::{LedgerError, LedgerResult, TokenLedger};
