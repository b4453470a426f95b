//! Voting policies and voting instances.
//!
//! - One policy per action: 1P1V over a group, or token-weighted
//! - Quorum + consensus checks, inclusive, evaluated on every ballot
//! - Optional deadline with a configurable expiry action
//! - One ballot per voter per voting

pub mod ballot;
pub mod duration;
pub mod policy;

#[cfg(test)]
mod proptests;

pub use ballot::{Ballot, Choice, Voting, VotingError, VotingState, VotingStats};
pub use duration::parse_duration_to_secs;
pub use policy::{ExpiryAction, PolicyError, VotingPolicy, VotingType};
