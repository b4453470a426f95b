//! Governance errors.
//!
//! Each variant names one specific rejection so callers can assert on the
//! exact reason. A failed call never leaves partial state behind.

use crate::audit::AuditError;
use crate::identity::{ActionId, Address};
use crate::ledger::LedgerError;
use crate::proposals::{ProposalError, ProposalId};
use crate::serialization::SerializationError;
use crate::voting::PolicyError;

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("{caller} has no permission for {action}")]
    NoPermission { action: ActionId, caller: Address },

    #[error("{voter} has already voted on proposal {proposal}")]
    AlreadyVoted { proposal: ProposalId, voter: Address },

    #[error("voting on proposal {0} is finished")]
    VotingFinished(ProposalId),

    #[error("voting deadline of proposal {0} has elapsed")]
    DeadlineElapsed(ProposalId),

    #[error("proposal index {index} out of range (count {count})")]
    IndexOutOfRange { index: u64, count: u64 },

    #[error("no voting policy configured for {0}")]
    PolicyMissing(ActionId),

    #[error("invalid voting policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("{voter} is not eligible to vote on {action}")]
    NotEligible { action: ActionId, voter: Address },

    #[error("token {0} is not managed by this DAO")]
    UnknownToken(Address),

    #[error("DAO was upgraded to {successor}")]
    Retired { successor: Address },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Proposal store error: {0}")]
    Proposal(ProposalError),
}

impl From<ProposalError> for GovernanceError {
    fn from(err: ProposalError) -> Self {
        match err {
            ProposalError::IndexOutOfRange { index, count } => {
                GovernanceError::IndexOutOfRange { index, count }
            }
            other => GovernanceError::Proposal(other),
        }
    }
}
