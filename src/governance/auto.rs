//! Auto action caller.
//!
//! A front end with its own identity that submits actions on behalf of a
//! sender. The core decides direct execution from the sender's rules only,
//! so granting rules to the caller never lets a sender skip a vote; the
//! caller's identity matters only for opening proposals.

use super::actions::DaoAction;
use super::clock::Clock;
use super::core::{GovernanceCore, RequestOutcome};
use super::error::GovernanceResult;
use crate::identity::{ActionId, Address, GroupName};
use crate::ledger::TokenLedger;
use crate::voting::VotingPolicy;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoActionCaller {
    identity: Address,
}

impl AutoActionCaller {
    pub fn new(identity: impl Into<Address>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &Address {
        &self.identity
    }

    /// Submit `action` for `sender`: it runs now or becomes a proposal.
    pub fn do_action<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        action: DaoAction,
    ) -> GovernanceResult<RequestOutcome> {
        debug!(agent = %self.identity, sender = %sender, action = %action.id(), "auto action");
        core.request_action_via(&self.identity, sender, action)
    }

    pub fn issue_tokens_auto<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        token: &Address,
        recipient: &Address,
        amount: u64,
    ) -> GovernanceResult<RequestOutcome> {
        self.do_action(
            core,
            sender,
            DaoAction::IssueTokens {
                token: token.clone(),
                recipient: recipient.clone(),
                amount,
            },
        )
    }

    pub fn burn_tokens_auto<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        token: &Address,
        holder: &Address,
        amount: u64,
    ) -> GovernanceResult<RequestOutcome> {
        self.do_action(
            core,
            sender,
            DaoAction::BurnTokens {
                token: token.clone(),
                holder: holder.clone(),
                amount,
            },
        )
    }

    pub fn add_group_member_auto<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        group: &str,
        member: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.do_action(
            core,
            sender,
            DaoAction::AddGroupMember {
                group: GroupName::from(group),
                member: member.clone(),
            },
        )
    }

    pub fn remove_group_member_auto<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        group: &str,
        member: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.do_action(
            core,
            sender,
            DaoAction::RemoveGroupMember {
                group: GroupName::from(group),
                member: member.clone(),
            },
        )
    }

    pub fn upgrade_dao_contract_auto<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        successor: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.do_action(
            core,
            sender,
            DaoAction::UpgradeDaoContract {
                successor: successor.clone(),
            },
        )
    }

    pub fn set_voting_params_auto<L: TokenLedger, C: Clock>(
        &self,
        core: &mut GovernanceCore<L, C>,
        sender: &Address,
        action: &str,
        policy: VotingPolicy,
    ) -> GovernanceResult<RequestOutcome> {
        self.do_action(
            core,
            sender,
            DaoAction::SetVotingPolicy {
                action: ActionId::from(action),
                policy,
            },
        )
    }
}
