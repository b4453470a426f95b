//! In-memory token ledger
//!
//! Backs tests and the `run` command. Tokens must be registered before use.

use super::traits::*;
use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct TokenBook {
    supply: u64,
    balances: BTreeMap<Address, u64>,
}

/// In-memory ledger holding any number of tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    tokens: BTreeMap<Address, TokenBook>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger with the given tokens registered and empty.
    pub fn with_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        let mut ledger = Self::new();
        for token in tokens {
            ledger.register_token(token);
        }
        ledger
    }

    pub fn register_token(&mut self, token: Address) {
        self.tokens.entry(token).or_default();
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Address> {
        self.tokens.keys()
    }

    /// Non-zero balances of `token`.
    pub fn holders(&self, token: &Address) -> impl Iterator<Item = (&Address, u64)> {
        self.tokens
            .get(token)
            .into_iter()
            .flat_map(|book| book.balances.iter().map(|(holder, amount)| (holder, *amount)))
            .filter(|(_, amount)| *amount > 0)
    }

    fn book_mut(&mut self, token: &Address) -> LedgerResult<&mut TokenBook> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| LedgerError::UnknownToken(token.clone()))
    }
}

impl TokenLedger for InMemoryLedger {
    fn issue(&mut self, token: &Address, recipient: &Address, amount: u64) -> LedgerResult<()> {
        let book = self.book_mut(token)?;
        let supply = book
            .supply
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(token.clone()))?;

        // Balance cannot overflow while it is bounded by the supply.
        *book.balances.entry(recipient.clone()).or_default() += amount;
        book.supply = supply;
        Ok(())
    }

    fn burn(&mut self, token: &Address, holder: &Address, amount: u64) -> LedgerResult<()> {
        let book = self.book_mut(token)?;
        let available = book.balances.get(holder).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: holder.clone(),
                needed: amount,
                available,
            });
        }

        book.balances.insert(holder.clone(), available - amount);
        book.supply -= amount;
        Ok(())
    }

    fn balance_of(&self, token: &Address, holder: &Address) -> u64 {
        self.tokens
            .get(token)
            .and_then(|book| book.balances.get(holder))
            .copied()
            .unwrap_or(0)
    }

    fn total_supply(&self, token: &Address) -> u64 {
        self.tokens.get(token).map(|book| book.supply).unwrap_or(0)
    }
}
