//! Governance state owned by the core.
//!
//! Everything the engine mutates lives in one struct, handed by reference
//! to the subordinate components instead of living in ambient globals. The
//! whole state snapshots to CBOR for the storage collaborator.

use crate::audit::AuditLog;
use crate::groups::GroupMembership;
use crate::identity::{ActionId, Address};
use crate::ledger::TokenLedger;
use crate::permissions::PermissionRegistry;
use crate::proposals::ProposalManager;
use crate::serialization::{from_cbor, to_cbor, SerializationError};
use crate::voting::{VotingPolicy, VotingType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceState {
    /// Snapshot schema version.
    pub schema_version: u32,
    pub groups: GroupMembership,
    pub permissions: PermissionRegistry,
    pub policies: BTreeMap<ActionId, VotingPolicy>,
    pub proposals: ProposalManager,
    /// Tokens whose ledger the DAO controls.
    pub tokens: BTreeSet<Address>,
    #[serde(default)]
    pub audit: AuditLog,
    /// Set once an upgrade has executed; the core refuses further work.
    #[serde(default)]
    pub successor: Option<Address>,
}

impl GovernanceState {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        to_cbor(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        from_cbor(bytes)
    }

    pub fn manages_token(&self, token: &Address) -> bool {
        self.tokens.contains(token)
    }

    /// Eligible weight under `policy` right now.
    pub fn total_weight<L: TokenLedger>(&self, policy: &VotingPolicy, ledger: &L) -> u64 {
        match &policy.voting_type {
            VotingType::OnePersonOneVote { group } => self.groups.size(group) as u64,
            VotingType::TokenWeighted { token } => ledger.total_supply(token),
        }
    }

    /// Weight of `voter` under `policy` right now (0 = not eligible).
    pub fn voter_weight<L: TokenLedger>(
        &self,
        policy: &VotingPolicy,
        voter: &Address,
        ledger: &L,
    ) -> u64 {
        match &policy.voting_type {
            VotingType::OnePersonOneVote { group } => u64::from(self.groups.is_member(group, voter)),
            VotingType::TokenWeighted { token } => ledger.balance_of(token, voter),
        }
    }
}
