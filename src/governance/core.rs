//! The governance core.
//!
//! Every privileged change enters through [`GovernanceCore::request_action`]
//! or [`GovernanceCore::vote`]. Permission is resolved against the registry;
//! direct rules execute at once, voting rules open a proposal whose action
//! runs exactly once, when its voting passes.
//!
//! Requests are processed one at a time by `&mut self`. Each one either
//! completes or leaves no trace: proposals and votes are staged on a copy,
//! the audit entry is prepared before the action runs, and nothing is
//! written back until every fallible step has succeeded.

use super::actions::{DaoAction, ADD_NEW_PROPOSAL};
use super::clock::{Clock, SystemClock};
use super::error::{GovernanceError, GovernanceResult};
use super::state::GovernanceState;
use crate::audit::{AuditLog, Authority};
use crate::identity::{ActionId, Address, GroupName};
use crate::ledger::TokenLedger;
use crate::permissions::{Caller, PermissionRule, VotingContext};
use crate::proposals::{NewProposal, Proposal, ProposalId};
use crate::serialization::to_cbor;
use crate::voting::{Choice, VotingError, VotingPolicy, VotingState};
use serde::Serialize;
use tracing::{debug, info};

/// What happened to an action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The action ran immediately.
    Executed,
    /// A proposal was opened. `state` is `Passed` when the proposer's own
    /// vote was already enough and the action ran.
    ProposalCreated {
        proposal: ProposalId,
        state: VotingState,
    },
}

/// What a ballot did. A ballot never rejects; only an expired deadline does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Pending,
    /// Passed, and the action was executed.
    Passed,
}

pub struct GovernanceCore<L: TokenLedger, C: Clock = SystemClock> {
    state: GovernanceState,
    ledger: L,
    clock: C,
}

impl<L: TokenLedger, C: Clock> GovernanceCore<L, C> {
    /// Assemble a core from seeded or restored state.
    pub fn restore(state: GovernanceState, ledger: L, clock: C) -> Self {
        Self {
            state,
            ledger,
            clock,
        }
    }

    /// Perform `action` on behalf of `caller`, or open a proposal for it.
    pub fn request_action(
        &mut self,
        caller: &Address,
        action: DaoAction,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action_via(caller, caller, action)
    }

    /// Like [`request_action`](Self::request_action), submitted by `agent`
    /// for `proposer`.
    ///
    /// Direct execution is decided by the proposer's rules alone. Opening a
    /// proposal requires both identities to hold `addNewProposal`.
    pub fn request_action_via(
        &mut self,
        agent: &Address,
        proposer: &Address,
        action: DaoAction,
    ) -> GovernanceResult<RequestOutcome> {
        self.ensure_live()?;
        let action_id = action.id();

        if self
            .state
            .permissions
            .is_allowed_directly(&action_id, proposer, &self.state.groups)
        {
            self.execute(
                &action,
                Caller::Account(proposer),
                Authority::Account(proposer.clone()),
            )?;
            info!(action = %action_id, caller = %proposer, "action executed directly");
            return Ok(RequestOutcome::Executed);
        }

        let Some(target) = self.state.permissions.voting_target(&action_id).cloned() else {
            debug!(action = %action_id, caller = %proposer, "no matching rule");
            return Err(GovernanceError::NoPermission {
                action: action_id,
                caller: proposer.clone(),
            });
        };

        let add_new_proposal = ActionId::from(ADD_NEW_PROPOSAL);
        for identity in [agent, proposer] {
            if !self
                .state
                .permissions
                .is_allowed_directly(&add_new_proposal, identity, &self.state.groups)
            {
                debug!(action = %action_id, caller = %identity, "may not open proposals");
                return Err(GovernanceError::NoPermission {
                    action: add_new_proposal,
                    caller: identity.clone(),
                });
            }
        }

        let policy = self
            .state
            .policies
            .get(&action_id)
            .cloned()
            .ok_or_else(|| GovernanceError::PolicyMissing(action_id.clone()))?;

        // A proposal that could never execute is refused up front.
        action.precheck(&self.state)?;

        let proposer_weight = self.state.voter_weight(&policy, proposer, &self.ledger);
        if proposer_weight == 0 {
            return Err(GovernanceError::NotEligible {
                action: action_id,
                voter: proposer.clone(),
            });
        }

        let mut proposal = self.state.proposals.draft(NewProposal {
            action: action_id.clone(),
            params: to_cbor(&action)?,
            policy: &policy,
            proposer,
            proposer_weight,
            total_weight: self.state.total_weight(&policy, &self.ledger),
            target,
            created_at: self.clock.now(),
        })?;

        if proposal.voting().state() == VotingState::Passed {
            self.execute_proposal(&mut proposal, &action)?;
        }

        let state = proposal.voting().state();
        let id = self.state.proposals.insert(proposal)?;
        info!(
            proposal = %id,
            action = %action_id,
            proposer = %proposer,
            state = ?state,
            "proposal created"
        );

        Ok(RequestOutcome::ProposalCreated {
            proposal: id,
            state,
        })
    }

    /// Cast `voter`'s ballot on proposal `index`.
    ///
    /// When the ballot makes the voting pass, the proposal's action runs
    /// before this returns. If it fails, the ballot is discarded too.
    pub fn vote(
        &mut self,
        index: u64,
        voter: &Address,
        choice: Choice,
    ) -> GovernanceResult<VoteOutcome> {
        self.ensure_live()?;
        let now = self.clock.now();
        let mut proposal = self.state.proposals.get(index)?.clone();

        let weight = self
            .state
            .voter_weight(proposal.policy(), voter, &self.ledger);
        let state = proposal
            .voting_mut()
            .vote(voter, choice, weight, now)
            .map_err(|err| voting_error(&proposal, err))?;

        debug!(proposal = %proposal.id(), voter = %voter, choice = ?choice, weight, "vote cast");

        let outcome = if state == VotingState::Passed {
            let action: DaoAction = proposal.decode_params()?;
            self.execute_proposal(&mut proposal, &action)?;
            info!(proposal = %proposal.id(), action = %proposal.action(), "proposal passed");
            VoteOutcome::Passed
        } else {
            VoteOutcome::Pending
        };

        self.state.proposals.replace(proposal)?;
        Ok(outcome)
    }

    /// Reject open votings whose deadline has passed.
    ///
    /// Votings with a `KeepOpen` expiry policy are left alone.
    pub fn close_expired(&mut self) -> GovernanceResult<Vec<ProposalId>> {
        let now = self.clock.now();
        let mut closed = Vec::new();

        for index in 0..self.state.proposals.count() {
            let proposal = self.state.proposals.get_mut(index)?;
            if proposal.voting_mut().expire(now) {
                info!(proposal = %proposal.id(), action = %proposal.action(), "proposal expired");
                closed.push(proposal.id());
            }
        }
        Ok(closed)
    }

    fn execute_proposal(
        &mut self,
        proposal: &mut Proposal,
        action: &DaoAction,
    ) -> GovernanceResult<()> {
        let context = VotingContext::new(
            proposal.id(),
            proposal.action().clone(),
            proposal.target().clone(),
        );
        self.execute(
            action,
            Caller::Voting(&context),
            Authority::Proposal(proposal.id()),
        )?;
        proposal.mark_executed();
        Ok(())
    }

    /// Authorize, check, run and record one action.
    fn execute(
        &mut self,
        action: &DaoAction,
        caller: Caller<'_>,
        authority: Authority,
    ) -> GovernanceResult<()> {
        let action_id = action.id();
        if !self
            .state
            .permissions
            .is_allowed(&action_id, caller, &self.state.groups)
        {
            let caller = match caller {
                Caller::Account(address) => address.clone(),
                Caller::Voting(context) => context.target().clone(),
            };
            return Err(GovernanceError::NoPermission {
                action: action_id,
                caller,
            });
        }

        action.precheck(&self.state)?;
        let entry = self.state.audit.prepare(
            self.clock.now(),
            authority,
            action_id,
            action.describe(),
        )?;
        action.apply(&mut self.state, &mut self.ledger)?;
        self.state.audit.commit(entry)?;
        Ok(())
    }

    fn ensure_live(&self) -> GovernanceResult<()> {
        match &self.state.successor {
            Some(successor) => Err(GovernanceError::Retired {
                successor: successor.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn set_voting_policy(
        &mut self,
        caller: &Address,
        action: &str,
        policy: VotingPolicy,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::SetVotingPolicy {
                action: ActionId::from(action),
                policy,
            },
        )
    }

    pub fn allow_action_by_address(
        &mut self,
        caller: &Address,
        action: &str,
        address: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.allow(caller, action, PermissionRule::by_address(address.clone()))
    }

    pub fn allow_action_by_any_member_of_group(
        &mut self,
        caller: &Address,
        action: &str,
        group: &str,
    ) -> GovernanceResult<RequestOutcome> {
        self.allow(caller, action, PermissionRule::by_group(group))
    }

    pub fn allow_action_by_voting(
        &mut self,
        caller: &Address,
        action: &str,
        target: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.allow(caller, action, PermissionRule::by_voting(target.clone()))
    }

    fn allow(
        &mut self,
        caller: &Address,
        action: &str,
        rule: PermissionRule,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::AllowAction {
                action: ActionId::from(action),
                rule,
            },
        )
    }

    pub fn revoke_action(
        &mut self,
        caller: &Address,
        action: &str,
        rule: PermissionRule,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::RevokeAction {
                action: ActionId::from(action),
                rule,
            },
        )
    }

    pub fn add_group_member(
        &mut self,
        caller: &Address,
        group: &str,
        member: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::AddGroupMember {
                group: GroupName::from(group),
                member: member.clone(),
            },
        )
    }

    pub fn remove_group_member(
        &mut self,
        caller: &Address,
        group: &str,
        member: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::RemoveGroupMember {
                group: GroupName::from(group),
                member: member.clone(),
            },
        )
    }

    pub fn issue_tokens(
        &mut self,
        caller: &Address,
        token: &Address,
        recipient: &Address,
        amount: u64,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::IssueTokens {
                token: token.clone(),
                recipient: recipient.clone(),
                amount,
            },
        )
    }

    pub fn burn_tokens(
        &mut self,
        caller: &Address,
        token: &Address,
        holder: &Address,
        amount: u64,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::BurnTokens {
                token: token.clone(),
                holder: holder.clone(),
                amount,
            },
        )
    }

    pub fn upgrade_dao_contract(
        &mut self,
        caller: &Address,
        successor: &Address,
    ) -> GovernanceResult<RequestOutcome> {
        self.request_action(
            caller,
            DaoAction::UpgradeDaoContract {
                successor: successor.clone(),
            },
        )
    }

    /// Whether `address` could perform `action` directly right now.
    ///
    /// Voting rules never count here.
    pub fn is_can_do_action(&self, address: &Address, action: &str) -> bool {
        self.state.permissions.is_allowed_directly(
            &ActionId::from(action),
            address,
            &self.state.groups,
        )
    }

    pub fn is_group_member(&self, group: &str, address: &Address) -> bool {
        self.state.groups.is_member(&GroupName::from(group), address)
    }

    pub fn is_in_majority(&self, group: &str, address: &Address) -> bool {
        self.state
            .groups
            .is_in_majority(&GroupName::from(group), address)
    }

    /// Whether `address`'s own "yes" would pass a proposal for `action` under
    /// its current policy: group size (or token supply) against the action's
    /// quorum and consensus.
    pub fn is_in_majority_for(&self, action: &str, address: &Address) -> bool {
        let Some(policy) = self.state.policies.get(&ActionId::from(action)) else {
            return false;
        };
        policy.single_vote_decides(
            self.state.voter_weight(policy, address, &self.ledger),
            self.state.total_weight(policy, &self.ledger),
        )
    }

    pub fn proposals_count(&self) -> u64 {
        self.state.proposals.count()
    }

    pub fn proposal_at(&self, index: u64) -> GovernanceResult<&Proposal> {
        Ok(self.state.proposals.get(index)?)
    }

    pub fn voting_policy(&self, action: &str) -> Option<&VotingPolicy> {
        self.state.policies.get(&ActionId::from(action))
    }

    /// Read-only view of the managed ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.state.audit
    }

    pub fn state(&self) -> &GovernanceState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn successor(&self) -> Option<&Address> {
        self.state.successor.as_ref()
    }

    /// Hand the ledger to the successor after an executed upgrade.
    ///
    /// Returns the core unchanged if no upgrade has run.
    pub fn retire(self) -> Result<(Address, L), Self> {
        match self.state.successor.clone() {
            Some(successor) => {
                info!(successor = %successor, "ledger handed to successor");
                Ok((successor, self.ledger))
            }
            None => Err(self),
        }
    }
}

impl<L: TokenLedger + std::fmt::Debug, C: Clock> std::fmt::Debug for GovernanceCore<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceCore")
            .field("proposals", &self.state.proposals.count())
            .field("successor", &self.state.successor)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

fn voting_error(proposal: &Proposal, err: VotingError) -> GovernanceError {
    match err {
        VotingError::AlreadyVoted(voter) => GovernanceError::AlreadyVoted {
            proposal: proposal.id(),
            voter,
        },
        VotingError::Finished => GovernanceError::VotingFinished(proposal.id()),
        VotingError::DeadlineElapsed => GovernanceError::DeadlineElapsed(proposal.id()),
        VotingError::ZeroWeight(voter) => GovernanceError::NotEligible {
            action: proposal.action().clone(),
            voter,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::actions::{ISSUE_TOKENS, MANAGE_GROUPS, UPGRADE_DAO_CONTRACT};
    use crate::governance::bootstrap::GovernanceBuilder;
    use crate::governance::clock::ManualClock;
    use crate::ledger::InMemoryLedger;
    use crate::voting::ExpiryAction;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    fn token() -> Address {
        addr("STDT")
    }

    /// creator manages groups directly; issueTokens needs an Employees vote.
    fn core_with(
        employees: &[&str],
        policy: VotingPolicy,
    ) -> (GovernanceCore<InMemoryLedger, ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000);
        let mut builder = GovernanceBuilder::new(InMemoryLedger::with_tokens([token()]))
            .with_clock(clock.clone())
            .manage_token(token())
            .allow(MANAGE_GROUPS, PermissionRule::by_address("creator"))
            .allow(ISSUE_TOKENS, PermissionRule::by_voting(token()))
            .allow(ADD_NEW_PROPOSAL, PermissionRule::by_group("Employees"))
            .voting_policy(ISSUE_TOKENS, policy);
        for employee in employees {
            builder = builder.group_member("Employees", *employee);
        }
        (builder.build().unwrap(), clock)
    }

    fn issue(amount: u64) -> DaoAction {
        DaoAction::IssueTokens {
            token: token(),
            recipient: addr("employee1"),
            amount,
        }
    }

    #[test]
    fn test_direct_execution() {
        let (mut core, _) = core_with(&["employee1"], VotingPolicy::one_person_one_vote("Employees", 51, 51));
        let outcome = core
            .add_group_member(&addr("creator"), "Employees", &addr("employee2"))
            .unwrap();
        assert_eq!(outcome, RequestOutcome::Executed);
        assert!(core.is_group_member("Employees", &addr("employee2")));
        assert_eq!(core.audit_log().len(), 1);
        assert_eq!(core.proposals_count(), 0);
    }

    #[test]
    fn test_no_rule_is_no_permission() {
        let (mut core, _) = core_with(&["employee1"], VotingPolicy::one_person_one_vote("Employees", 51, 51));
        let err = core
            .upgrade_dao_contract(&addr("creator"), &addr("dao-v2"))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NoPermission { .. }));
        assert!(core.audit_log().is_empty());
    }

    #[test]
    fn test_proposal_then_pass() {
        let (mut core, _) = core_with(
            &["employee1", "employee2", "employee3"],
            VotingPolicy::one_person_one_vote("Employees", 51, 51),
        );

        let outcome = core.request_action(&addr("employee1"), issue(1000)).unwrap();
        assert_eq!(
            outcome,
            RequestOutcome::ProposalCreated {
                proposal: ProposalId(0),
                state: VotingState::Open
            }
        );
        assert_eq!(core.ledger().balance_of(&token(), &addr("employee1")), 0);

        let outcome = core.vote(0, &addr("employee2"), Choice::Yes).unwrap();
        assert_eq!(outcome, VoteOutcome::Passed);
        assert_eq!(core.ledger().balance_of(&token(), &addr("employee1")), 1000);
        assert!(core.proposal_at(0).unwrap().is_executed());

        let entry = &core.audit_log().entries()[0];
        assert_eq!(entry.authority, Authority::Proposal(ProposalId(0)));
    }

    #[test]
    fn test_vote_error_order() {
        let (mut core, clock) = core_with(
            &["employee1", "employee2", "employee3"],
            VotingPolicy::one_person_one_vote("Employees", 51, 51)
                .with_duration(60, ExpiryAction::Reject),
        );
        core.request_action(&addr("employee1"), issue(10)).unwrap();

        assert!(matches!(
            core.vote(5, &addr("employee2"), Choice::Yes),
            Err(GovernanceError::IndexOutOfRange { index: 5, count: 1 })
        ));
        assert!(matches!(
            core.vote(0, &addr("employee1"), Choice::Yes),
            Err(GovernanceError::AlreadyVoted { .. })
        ));
        assert!(matches!(
            core.vote(0, &addr("outsider"), Choice::Yes),
            Err(GovernanceError::NotEligible { .. })
        ));

        clock.advance(60);
        // Deadline beats the duplicate check.
        assert!(matches!(
            core.vote(0, &addr("employee1"), Choice::Yes),
            Err(GovernanceError::DeadlineElapsed(ProposalId(0)))
        ));

        assert_eq!(core.close_expired().unwrap(), vec![ProposalId(0)]);
        assert!(matches!(
            core.vote(0, &addr("employee2"), Choice::Yes),
            Err(GovernanceError::VotingFinished(ProposalId(0)))
        ));
        assert!(core.close_expired().unwrap().is_empty());
    }

    #[test]
    fn test_keep_open_ignores_deadline() {
        let (mut core, clock) = core_with(
            &["employee1", "employee2", "employee3"],
            VotingPolicy::one_person_one_vote("Employees", 51, 51)
                .with_duration(60, ExpiryAction::KeepOpen),
        );
        core.request_action(&addr("employee1"), issue(10)).unwrap();
        clock.advance(3_600);

        assert!(core.close_expired().unwrap().is_empty());
        assert_eq!(
            core.vote(0, &addr("employee2"), Choice::Yes).unwrap(),
            VoteOutcome::Passed
        );
    }

    #[test]
    fn test_majority_follows_action_policy() {
        let (mut core, _) = core_with(
            &["employee1", "employee2", "employee3"],
            VotingPolicy::one_person_one_vote("Employees", 51, 51),
        );
        assert!(!core.is_in_majority("Employees", &addr("employee1")));
        assert!(!core.is_in_majority_for(ISSUE_TOKENS, &addr("employee1")));
        assert!(!core.is_in_majority_for(UPGRADE_DAO_CONTRACT, &addr("employee1")));

        core.set_voting_policy(
            &addr("creator"),
            ISSUE_TOKENS,
            VotingPolicy::one_person_one_vote("Employees", 30, 51),
        )
        .unwrap();
        assert!(core.is_in_majority_for(ISSUE_TOKENS, &addr("employee1")));
        assert!(!core.is_in_majority_for(ISSUE_TOKENS, &addr("outsider")));
    }

    #[test]
    fn test_seed_vote_can_pass_immediately() {
        let (mut core, _) = core_with(&["employee1"], VotingPolicy::one_person_one_vote("Employees", 51, 51));
        let outcome = core.request_action(&addr("employee1"), issue(5)).unwrap();
        assert_eq!(
            outcome,
            RequestOutcome::ProposalCreated {
                proposal: ProposalId(0),
                state: VotingState::Passed
            }
        );
        assert_eq!(core.ledger().balance_of(&token(), &addr("employee1")), 5);
    }

    #[test]
    fn test_failed_execution_discards_vote() {
        let (mut core, _) = core_with(
            &["employee1", "employee2"],
            VotingPolicy::one_person_one_vote("Employees", 100, 100),
        );
        core.request_action(&addr("employee1"), issue(10)).unwrap();

        // Pull the voting rule before the deciding ballot.
        core.revoke_action(&addr("creator"), ISSUE_TOKENS, PermissionRule::by_voting(token()))
            .unwrap();

        let err = core.vote(0, &addr("employee2"), Choice::Yes).unwrap_err();
        assert!(matches!(err, GovernanceError::NoPermission { .. }));

        let proposal = core.proposal_at(0).unwrap();
        assert!(!proposal.voting().has_voted(&addr("employee2")));
        assert!(!proposal.is_executed());
        assert_eq!(core.ledger().total_supply(&token()), 0);
    }

    #[test]
    fn test_missing_policy() {
        let mut core = GovernanceBuilder::new(InMemoryLedger::with_tokens([token()]))
            .with_clock(ManualClock::new(0))
            .manage_token(token())
            .allow(ISSUE_TOKENS, PermissionRule::by_voting(token()))
            .allow(ADD_NEW_PROPOSAL, PermissionRule::by_address("employee1"))
            .build()
            .unwrap();

        assert!(matches!(
            core.request_action(&addr("employee1"), issue(1)),
            Err(GovernanceError::PolicyMissing(_))
        ));
        assert_eq!(core.proposals_count(), 0);
    }

    #[test]
    fn test_retire_hands_over_ledger() {
        let mut core = GovernanceBuilder::new(InMemoryLedger::with_tokens([token()]))
            .with_clock(ManualClock::new(0))
            .manage_token(token())
            .allow(UPGRADE_DAO_CONTRACT, PermissionRule::by_address("creator"))
            .allow(ISSUE_TOKENS, PermissionRule::by_address("creator"))
            .build()
            .unwrap();
        core.issue_tokens(&addr("creator"), &token(), &addr("creator"), 7)
            .unwrap();

        let mut core = core.retire().unwrap_err();
        core.upgrade_dao_contract(&addr("creator"), &addr("dao-v2"))
            .unwrap();
        assert_eq!(core.successor(), Some(&addr("dao-v2")));
        assert!(matches!(
            core.issue_tokens(&addr("creator"), &token(), &addr("creator"), 1),
            Err(GovernanceError::Retired { .. })
        ));

        let (successor, ledger) = core.retire().unwrap();
        assert_eq!(successor, addr("dao-v2"));
        assert_eq!(ledger.balance_of(&token(), &addr("creator")), 7);
    }
}
