//! One-time seeding of a new DAO.
//!
//! Rules gate every change after the DAO is live, including changes to the
//! rules themselves, so the first rules, groups and policies have to be
//! written before any gate exists. The builder is that phase; `build` ends
//! it and takes ownership of the ledger.

use super::clock::{Clock, SystemClock};
use super::core::GovernanceCore;
use super::error::GovernanceResult;
use super::state::GovernanceState;
use crate::identity::{ActionId, Address, GroupName};
use crate::ledger::TokenLedger;
use crate::permissions::PermissionRule;
use crate::voting::VotingPolicy;
use tracing::{info, warn};

pub struct GovernanceBuilder<L: TokenLedger, C: Clock = SystemClock> {
    state: GovernanceState,
    ledger: L,
    clock: C,
}

impl<L: TokenLedger> GovernanceBuilder<L, SystemClock> {
    pub fn new(ledger: L) -> Self {
        Self {
            state: GovernanceState::new(),
            ledger,
            clock: SystemClock,
        }
    }
}

impl<L: TokenLedger, C: Clock> GovernanceBuilder<L, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> GovernanceBuilder<L, C2> {
        GovernanceBuilder {
            state: self.state,
            ledger: self.ledger,
            clock,
        }
    }

    /// Put `token` under the DAO's control.
    pub fn manage_token(mut self, token: impl Into<Address>) -> Self {
        self.state.tokens.insert(token.into());
        self
    }

    pub fn group_member(mut self, group: impl Into<GroupName>, member: impl Into<Address>) -> Self {
        self.state
            .groups
            .add_member(&group.into(), &member.into());
        self
    }

    pub fn allow(mut self, action: impl Into<ActionId>, rule: PermissionRule) -> Self {
        self.state.permissions.allow(&action.into(), rule);
        self
    }

    pub fn voting_policy(mut self, action: impl Into<ActionId>, policy: VotingPolicy) -> Self {
        self.state.policies.insert(action.into(), policy);
        self
    }

    /// Finish seeding and hand the ledger to the core.
    pub fn build(self) -> GovernanceResult<GovernanceCore<L, C>> {
        for (action, policy) in &self.state.policies {
            policy.validate()?;
            if !self.state.permissions.requires_voting(action) {
                warn!(action = %action, "voting policy set for an action with no voting rule");
            }
        }

        for action in self.state.permissions.actions() {
            if self.state.permissions.requires_voting(action)
                && !self.state.policies.contains_key(action)
            {
                warn!(action = %action, "voting rule without a voting policy");
            }
        }

        info!(
            groups = self.state.groups.groups().count(),
            actions = self.state.permissions.actions().count(),
            policies = self.state.policies.len(),
            tokens = self.state.tokens.len(),
            "DAO bootstrapped"
        );

        Ok(GovernanceCore::restore(self.state, self.ledger, self.clock))
    }
}
