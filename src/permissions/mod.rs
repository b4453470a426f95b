//! Permission registry.
//!
//! Maps an action key to the set of rules that authorize it. Satisfying any
//! one rule grants permission. Rules are only ever added or removed
//! explicitly.
//!
//! Voting rules are special: they can only be satisfied from a
//! `VotingContext`, which nothing outside this crate can build. The
//! governance core creates one for a proposal whose voting has passed, right
//! before executing it. A bare call from an account never matches a voting
//! rule.

use crate::groups::GroupMembership;
use crate::identity::{ActionId, Address, GroupName};
use crate::proposals::ProposalId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single authorization rule for an action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum PermissionRule {
    /// Exactly this address.
    #[serde(rename = "address")]
    ByAddress { address: Address },
    /// Any current member of the group.
    #[serde(rename = "group")]
    ByAnyGroupMember { group: GroupName },
    /// A passed vote acting on `target` (the resource the vote controls).
    #[serde(rename = "voting")]
    ByVoting { target: Address },
}

impl PermissionRule {
    pub fn by_address(address: impl Into<Address>) -> Self {
        Self::ByAddress {
            address: address.into(),
        }
    }

    pub fn by_group(group: impl Into<GroupName>) -> Self {
        Self::ByAnyGroupMember {
            group: group.into(),
        }
    }

    pub fn by_voting(target: impl Into<Address>) -> Self {
        Self::ByVoting {
            target: target.into(),
        }
    }

    pub fn is_voting(&self) -> bool {
        matches!(self, Self::ByVoting { .. })
    }
}

/// Proof that a proposal for `action` has passed its vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingContext {
    pub(crate) proposal: ProposalId,
    pub(crate) action: ActionId,
    pub(crate) target: Address,
}

impl VotingContext {
    pub(crate) fn new(proposal: ProposalId, action: ActionId, target: Address) -> Self {
        Self {
            proposal,
            action,
            target,
        }
    }

    pub fn proposal(&self) -> ProposalId {
        self.proposal
    }

    pub fn action(&self) -> &ActionId {
        &self.action
    }

    pub fn target(&self) -> &Address {
        &self.target
    }
}

/// Who is asking.
#[derive(Debug, Clone, Copy)]
pub enum Caller<'a> {
    Account(&'a Address),
    Voting(&'a VotingContext),
}

/// Action key -> rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRegistry {
    rules: BTreeMap<ActionId, BTreeSet<PermissionRule>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` for `action`. Returns false if it was already present.
    pub fn allow(&mut self, action: &ActionId, rule: PermissionRule) -> bool {
        self.rules.entry(action.clone()).or_default().insert(rule)
    }

    /// Remove `rule` from `action`. Returns false if it was not present.
    pub fn revoke(&mut self, action: &ActionId, rule: &PermissionRule) -> bool {
        let Some(rules) = self.rules.get_mut(action) else {
            return false;
        };
        let removed = rules.remove(rule);
        if rules.is_empty() {
            self.rules.remove(action);
        }
        removed
    }

    pub fn rules_for(&self, action: &ActionId) -> impl Iterator<Item = &PermissionRule> {
        self.rules.get(action).into_iter().flatten()
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionId> {
        self.rules.keys()
    }

    /// Evaluate every rule for `action` against `caller`.
    pub fn is_allowed(&self, action: &ActionId, caller: Caller<'_>, groups: &GroupMembership) -> bool {
        self.rules_for(action)
            .any(|rule| rule_matches(rule, action, caller, groups))
    }

    /// Address or group rules only.
    pub fn is_allowed_directly(
        &self,
        action: &ActionId,
        address: &Address,
        groups: &GroupMembership,
    ) -> bool {
        self.is_allowed(action, Caller::Account(address), groups)
    }

    pub fn requires_voting(&self, action: &ActionId) -> bool {
        self.rules_for(action).any(PermissionRule::is_voting)
    }

    /// Target of the first voting rule for `action`.
    pub fn voting_target(&self, action: &ActionId) -> Option<&Address> {
        self.rules_for(action).find_map(|rule| match rule {
            PermissionRule::ByVoting { target } => Some(target),
            _ => None,
        })
    }
}

fn rule_matches(
    rule: &PermissionRule,
    action: &ActionId,
    caller: Caller<'_>,
    groups: &GroupMembership,
) -> bool {
    match (rule, caller) {
        (PermissionRule::ByAddress { address }, Caller::Account(who)) => address == who,
        (PermissionRule::ByAnyGroupMember { group }, Caller::Account(who)) => {
            groups.is_member(group, who)
        }
        (PermissionRule::ByVoting { target }, Caller::Voting(ctx)) => {
            &ctx.action == action && &ctx.target == target
        }
        _ => false,
    }
}
