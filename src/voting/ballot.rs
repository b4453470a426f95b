//! A single voting instance.
//!
//! State machine: `Open -> Passed | Rejected`. Resolution is evaluated after
//! every ballot, so the vote that first satisfies quorum and consensus
//! finishes the voting on the spot. A voting that has not passed stays open,
//! however lopsided the tally, until its deadline rejects it. Once finished,
//! a voting never reopens and refuses further ballots.
//!
//! Voter identities are kept (unlike an anonymous poll) because
//! de-duplication is keyed by voter address.

use super::policy::{thresholds_met, ExpiryAction, VotingPolicy};
use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ballot rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotingError {
    #[error("{0} has already voted")]
    AlreadyVoted(Address),

    #[error("voting is finished")]
    Finished,

    #[error("voting deadline has elapsed")]
    DeadlineElapsed,

    #[error("{0} has no voting weight")]
    ZeroWeight(Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Yes,
    No,
}

impl From<bool> for Choice {
    fn from(yes: bool) -> Self {
        if yes {
            Choice::Yes
        } else {
            Choice::No
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingState {
    Open,
    Passed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub choice: Choice,
    pub weight: u64,
}

/// Running yes/no weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingStats {
    pub yes: u64,
    pub no: u64,
}

impl VotingStats {
    pub fn cast(&self) -> u64 {
        self.yes.saturating_add(self.no)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voting {
    quorum_percent: u8,
    consensus_percent: u8,
    on_expiry: ExpiryAction,
    /// Eligible weight snapshotted when the voting opened.
    total_weight: u64,
    created_at: u64,
    deadline: Option<u64>,
    ballots: BTreeMap<Address, Ballot>,
    stats: VotingStats,
    state: VotingState,
}

impl Voting {
    /// Open a voting with the proposer's "yes" already counted.
    pub fn open(
        policy: &VotingPolicy,
        total_weight: u64,
        proposer: &Address,
        proposer_weight: u64,
        created_at: u64,
    ) -> Result<Self, VotingError> {
        if proposer_weight == 0 {
            return Err(VotingError::ZeroWeight(proposer.clone()));
        }

        let mut voting = Self {
            quorum_percent: policy.quorum_percent,
            consensus_percent: policy.consensus_percent,
            on_expiry: policy.on_expiry,
            total_weight,
            created_at,
            deadline: policy.deadline(created_at),
            ballots: BTreeMap::new(),
            stats: VotingStats::default(),
            state: VotingState::Open,
        };
        voting.record(proposer, Choice::Yes, proposer_weight);
        Ok(voting)
    }

    /// Whether `voter` could cast a ballot at `now`.
    ///
    /// Checks are ordered: finished, deadline, duplicate.
    pub fn check_accepting(&self, voter: &Address, now: u64) -> Result<(), VotingError> {
        if self.is_finished() {
            return Err(VotingError::Finished);
        }
        if self.is_past_deadline(now) && self.on_expiry == ExpiryAction::Reject {
            return Err(VotingError::DeadlineElapsed);
        }
        if self.ballots.contains_key(voter) {
            return Err(VotingError::AlreadyVoted(voter.clone()));
        }
        Ok(())
    }

    /// Cast a ballot and re-evaluate the outcome.
    pub fn vote(
        &mut self,
        voter: &Address,
        choice: Choice,
        weight: u64,
        now: u64,
    ) -> Result<VotingState, VotingError> {
        self.check_accepting(voter, now)?;
        if weight == 0 {
            return Err(VotingError::ZeroWeight(voter.clone()));
        }
        self.record(voter, choice, weight);
        Ok(self.state)
    }

    /// Reject an open voting whose deadline passed, if its policy says so.
    ///
    /// Returns true if this call finished the voting.
    pub fn expire(&mut self, now: u64) -> bool {
        if self.is_finished()
            || self.on_expiry != ExpiryAction::Reject
            || !self.is_past_deadline(now)
        {
            return false;
        }
        self.state = VotingState::Rejected;
        true
    }

    fn record(&mut self, voter: &Address, choice: Choice, weight: u64) {
        self.ballots.insert(voter.clone(), Ballot { choice, weight });
        match choice {
            Choice::Yes => self.stats.yes = self.stats.yes.saturating_add(weight),
            Choice::No => self.stats.no = self.stats.no.saturating_add(weight),
        }
        self.state = self.resolve();
    }

    /// Only a pass finishes a voting here; rejection comes from `expire`.
    fn resolve(&self) -> VotingState {
        if self.thresholds_met(self.stats.yes, self.stats.cast()) {
            VotingState::Passed
        } else {
            VotingState::Open
        }
    }

    fn thresholds_met(&self, yes: u64, cast: u64) -> bool {
        thresholds_met(
            self.quorum_percent,
            self.consensus_percent,
            yes,
            cast,
            self.total_weight,
        )
    }

    fn is_past_deadline(&self, now: u64) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn is_finished(&self) -> bool {
        self.state != VotingState::Open
    }

    pub fn is_yes(&self) -> bool {
        self.state == VotingState::Passed
    }

    pub fn state(&self) -> VotingState {
        self.state
    }

    pub fn stats(&self) -> VotingStats {
        self.stats
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.ballots.contains_key(voter)
    }

    pub fn ballot(&self, voter: &Address) -> Option<&Ballot> {
        self.ballots.get(voter)
    }

    pub fn voters(&self) -> impl Iterator<Item = &Address> {
        self.ballots.keys()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }
}
