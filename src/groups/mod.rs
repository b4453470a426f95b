//! Group membership.
//!
//! Named groups of addresses used by `ByAnyGroupMember` permission rules and
//! by one-person-one-vote policies. Groups come into existence with their
//! first member; mutation is only reachable through the governance core,
//! which gates it behind the `manageGroups` action.

use crate::identity::{Address, GroupName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Named groups and their members.
///
/// A member set never holds duplicates: adding an existing member is a
/// no-op rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    groups: BTreeMap<GroupName, BTreeSet<Address>>,
}

impl GroupMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `member` to `group`. Returns false if it was already a member.
    pub fn add_member(&mut self, group: &GroupName, member: &Address) -> bool {
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(member.clone())
    }

    /// Remove `member` from `group`. Returns false if it was not a member.
    ///
    /// A group emptied by this call is dropped.
    pub fn remove_member(&mut self, group: &GroupName, member: &Address) -> bool {
        let Some(members) = self.groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(member);
        if members.is_empty() {
            self.groups.remove(group);
        }
        removed
    }

    pub fn is_member(&self, group: &GroupName, member: &Address) -> bool {
        self.groups
            .get(group)
            .map(|members| members.contains(member))
            .unwrap_or(false)
    }

    /// Number of members (0 for an unknown group).
    pub fn size(&self, group: &GroupName) -> usize {
        self.groups.get(group).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn members(&self, group: &GroupName) -> impl Iterator<Item = &Address> {
        self.groups.get(group).into_iter().flatten()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.keys()
    }

    /// Whether a single vote from `member` is a strict majority of `group`.
    ///
    /// A sole member holds 1/1; with two members each holds 1/2, which is
    /// not a strict majority. Non-members never are.
    pub fn is_in_majority(&self, group: &GroupName, member: &Address) -> bool {
        self.is_member(group, member) && 2 > self.size(group)
    }
}
