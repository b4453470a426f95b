//! Proposal storage.
//!
//! Proposals live in an append-only sequence: the index is the id, ids are
//! handed out in creation order starting at 0, and nothing is ever removed
//! or reordered. A proposal whose voting has finished stays queryable.

use crate::identity::{ActionId, Address};
use crate::serialization::{from_cbor, SerializationError};
use crate::voting::{Voting, VotingError, VotingPolicy};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub u64);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalError {
    #[error("proposal index {index} out of range (count {count})")]
    IndexOutOfRange { index: u64, count: u64 },

    #[error("proposal {expected} must be inserted next, got {got}")]
    OutOfOrder { expected: ProposalId, got: ProposalId },

    #[error(transparent)]
    Voting(#[from] VotingError),
}

/// A request to perform a voting-gated action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    id: ProposalId,
    action: ActionId,
    /// CBOR-encoded action parameters.
    params: Vec<u8>,
    proposer: Address,
    /// Resource named by the voting rule the proposal was created under.
    target: Address,
    /// Policy in force when the proposal opened; later changes do not apply.
    policy: VotingPolicy,
    voting: Voting,
    created_at: u64,
    executed: bool,
}

impl Proposal {
    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn action(&self) -> &ActionId {
        &self.action
    }

    /// Decode the parameters back into their typed form.
    pub fn decode_params<T: DeserializeOwned>(&self) -> Result<T, SerializationError> {
        from_cbor(&self.params)
    }

    pub fn proposer(&self) -> &Address {
        &self.proposer
    }

    pub fn target(&self) -> &Address {
        &self.target
    }

    pub fn policy(&self) -> &VotingPolicy {
        &self.policy
    }

    pub fn voting(&self) -> &Voting {
        &self.voting
    }

    pub(crate) fn voting_mut(&mut self) -> &mut Voting {
        &mut self.voting
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Whether the gated action has run.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }
}

/// Fields needed to open a proposal.
#[derive(Debug, Clone)]
pub struct NewProposal<'a> {
    pub action: ActionId,
    pub params: Vec<u8>,
    pub policy: &'a VotingPolicy,
    pub proposer: &'a Address,
    pub proposer_weight: u64,
    pub total_weight: u64,
    pub target: Address,
    pub created_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalManager {
    proposals: Vec<Proposal>,
}

impl ProposalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next proposal without storing it.
    ///
    /// The proposer's "yes" is already counted in the returned voting.
    pub fn draft(&self, new: NewProposal<'_>) -> Result<Proposal, ProposalError> {
        let voting = Voting::open(
            new.policy,
            new.total_weight,
            new.proposer,
            new.proposer_weight,
            new.created_at,
        )?;

        Ok(Proposal {
            id: self.next_id(),
            action: new.action,
            params: new.params,
            proposer: new.proposer.clone(),
            target: new.target,
            policy: new.policy.clone(),
            voting,
            created_at: new.created_at,
            executed: false,
        })
    }

    /// Store a draft. It must carry the next id.
    pub fn insert(&mut self, proposal: Proposal) -> Result<ProposalId, ProposalError> {
        let expected = self.next_id();
        if proposal.id != expected {
            return Err(ProposalError::OutOfOrder {
                expected,
                got: proposal.id,
            });
        }
        self.proposals.push(proposal);
        Ok(expected)
    }

    /// Draft and store in one step.
    pub fn create(&mut self, new: NewProposal<'_>) -> Result<ProposalId, ProposalError> {
        let proposal = self.draft(new)?;
        self.insert(proposal)
    }

    pub fn next_id(&self) -> ProposalId {
        ProposalId(self.proposals.len() as u64)
    }

    pub fn count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn get(&self, index: u64) -> Result<&Proposal, ProposalError> {
        self.proposals
            .get(index as usize)
            .ok_or(ProposalError::IndexOutOfRange {
                index,
                count: self.count(),
            })
    }

    pub(crate) fn get_mut(&mut self, index: u64) -> Result<&mut Proposal, ProposalError> {
        let count = self.count();
        self.proposals
            .get_mut(index as usize)
            .ok_or(ProposalError::IndexOutOfRange { index, count })
    }

    pub(crate) fn replace(&mut self, proposal: Proposal) -> Result<(), ProposalError> {
        let slot = self.get_mut(proposal.id.0)?;
        *slot = proposal;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    pub fn open_proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter().filter(|p| !p.voting.is_finished())
    }
}
