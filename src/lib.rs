//! daobase - governance engine for small DAOs
//!
//! Decides, for every privileged action, whether a caller may perform it
//! directly, must belong to a group, or must win a vote, and drives each
//! vote from creation to automatic execution of the underlying action.
//!
//! Key principles:
//! - Single sequential authority: every request runs to completion
//! - All-or-nothing: a failed request never leaves partial state behind
//! - Voting rules are only satisfied by a passed proposal, never a bare call
//! - The token ledger is owned by the core and mutated only after authorization

pub mod audit;
pub mod governance;
pub mod groups;
pub mod identity;
pub mod ledger;
pub mod permissions;
pub mod proposals;
pub mod serialization;
pub mod voting;
