//! Governed actions and their executors.
//!
//! Rules and policies are keyed by `ActionId`, so any key can be configured.
//! The actions the engine can actually *run* form the closed `DaoAction`
//! enum; each variant maps to one key and one typed executor.

use super::error::{GovernanceError, GovernanceResult};
use super::state::GovernanceState;
use crate::identity::{ActionId, Address, GroupName};
use crate::ledger::TokenLedger;
use crate::permissions::PermissionRule;
use crate::voting::VotingPolicy;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const ISSUE_TOKENS: &str = "issueTokens";
pub const BURN_TOKENS: &str = "burnTokens";
pub const MANAGE_GROUPS: &str = "manageGroups";
pub const ADD_NEW_PROPOSAL: &str = "addNewProposal";
pub const UPGRADE_DAO_CONTRACT: &str = "upgradeDaoContract";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaoAction {
    IssueTokens {
        token: Address,
        recipient: Address,
        amount: u64,
    },
    BurnTokens {
        token: Address,
        holder: Address,
        amount: u64,
    },
    AddGroupMember {
        group: GroupName,
        member: Address,
    },
    RemoveGroupMember {
        group: GroupName,
        member: Address,
    },
    /// Permission changes are gated like group management.
    AllowAction {
        action: ActionId,
        rule: PermissionRule,
    },
    RevokeAction {
        action: ActionId,
        rule: PermissionRule,
    },
    SetVotingPolicy {
        action: ActionId,
        policy: VotingPolicy,
    },
    /// Hand the DAO's collaborators over to `successor`.
    UpgradeDaoContract {
        successor: Address,
    },
}

impl DaoAction {
    /// Permission key guarding this action.
    pub fn id(&self) -> ActionId {
        let key = match self {
            DaoAction::IssueTokens { .. } => ISSUE_TOKENS,
            DaoAction::BurnTokens { .. } => BURN_TOKENS,
            DaoAction::AddGroupMember { .. }
            | DaoAction::RemoveGroupMember { .. }
            | DaoAction::AllowAction { .. }
            | DaoAction::RevokeAction { .. }
            | DaoAction::SetVotingPolicy { .. } => MANAGE_GROUPS,
            DaoAction::UpgradeDaoContract { .. } => UPGRADE_DAO_CONTRACT,
        };
        ActionId::from(key)
    }

    pub fn describe(&self) -> String {
        match self {
            DaoAction::IssueTokens {
                token,
                recipient,
                amount,
            } => format!("issue {} {} to {}", amount, token, recipient),
            DaoAction::BurnTokens {
                token,
                holder,
                amount,
            } => format!("burn {} {} from {}", amount, token, holder),
            DaoAction::AddGroupMember { group, member } => {
                format!("add {} to group {}", member, group)
            }
            DaoAction::RemoveGroupMember { group, member } => {
                format!("remove {} from group {}", member, group)
            }
            DaoAction::AllowAction { action, rule } => format!("allow {} {:?}", action, rule),
            DaoAction::RevokeAction { action, rule } => format!("revoke {} {:?}", action, rule),
            DaoAction::SetVotingPolicy { action, policy } => format!(
                "set voting policy for {} ({:?}, quorum {}%, consensus {}%)",
                action, policy.voting_type, policy.quorum_percent, policy.consensus_percent
            ),
            DaoAction::UpgradeDaoContract { successor } => {
                format!("upgrade DAO to {}", successor)
            }
        }
    }

    /// Check everything that could make `apply` fail, without mutating.
    pub(crate) fn precheck(&self, state: &GovernanceState) -> GovernanceResult<()> {
        match self {
            DaoAction::IssueTokens { token, .. } | DaoAction::BurnTokens { token, .. } => {
                if !state.manages_token(token) {
                    return Err(GovernanceError::UnknownToken(token.clone()));
                }
            }
            DaoAction::SetVotingPolicy { policy, .. } => policy.validate()?,
            _ => {}
        }
        Ok(())
    }

    /// Run the action. Callers must have authorized it and run `precheck`.
    ///
    /// Only the ledger calls can still fail here, and they fail before
    /// touching anything.
    pub(crate) fn apply<L: TokenLedger>(
        &self,
        state: &mut GovernanceState,
        ledger: &mut L,
    ) -> GovernanceResult<()> {
        match self {
            DaoAction::IssueTokens {
                token,
                recipient,
                amount,
            } => {
                ledger.issue(token, recipient, *amount)?;
                info!(token = %token, recipient = %recipient, amount, "tokens issued");
            }
            DaoAction::BurnTokens {
                token,
                holder,
                amount,
            } => {
                ledger.burn(token, holder, *amount)?;
                info!(token = %token, holder = %holder, amount, "tokens burned");
            }
            DaoAction::AddGroupMember { group, member } => {
                let added = state.groups.add_member(group, member);
                info!(group = %group, member = %member, added, "group member added");
            }
            DaoAction::RemoveGroupMember { group, member } => {
                let removed = state.groups.remove_member(group, member);
                info!(group = %group, member = %member, removed, "group member removed");
            }
            DaoAction::AllowAction { action, rule } => {
                let added = state.permissions.allow(action, rule.clone());
                info!(action = %action, rule = ?rule, added, "permission rule added");
            }
            DaoAction::RevokeAction { action, rule } => {
                let removed = state.permissions.revoke(action, rule);
                info!(action = %action, rule = ?rule, removed, "permission rule revoked");
            }
            DaoAction::SetVotingPolicy { action, policy } => {
                state.policies.insert(action.clone(), policy.clone());
                info!(action = %action, policy = ?policy, "voting policy set");
            }
            DaoAction::UpgradeDaoContract { successor } => {
                state.successor = Some(successor.clone());
                info!(successor = %successor, "DAO upgraded");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::serialization::{from_cbor, to_cbor};

    fn token() -> Address {
        Address::from("STDT")
    }

    fn state() -> GovernanceState {
        let mut state = GovernanceState::new();
        state.tokens.insert(token());
        state
    }

    #[test]
    fn test_action_keys() {
        let issue = DaoAction::IssueTokens {
            token: token(),
            recipient: Address::from("employee1"),
            amount: 1000,
        };
        assert_eq!(issue.id(), ActionId::from(ISSUE_TOKENS));

        let add = DaoAction::AddGroupMember {
            group: GroupName::from("Employees"),
            member: Address::from("employee1"),
        };
        assert_eq!(add.id(), ActionId::from(MANAGE_GROUPS));

        let allow = DaoAction::AllowAction {
            action: ActionId::from(ISSUE_TOKENS),
            rule: PermissionRule::by_voting("STDT"),
        };
        assert_eq!(allow.id(), ActionId::from(MANAGE_GROUPS));

        let upgrade = DaoAction::UpgradeDaoContract {
            successor: Address::from("dao-v2"),
        };
        assert_eq!(upgrade.id(), ActionId::from(UPGRADE_DAO_CONTRACT));
    }

    #[test]
    fn test_params_survive_cbor() {
        let action = DaoAction::SetVotingPolicy {
            action: ActionId::from(ISSUE_TOKENS),
            policy: VotingPolicy::token_weighted("STDT", 50, 60),
        };
        let bytes = to_cbor(&action).unwrap();
        let decoded: DaoAction = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn test_precheck_unknown_token() {
        let action = DaoAction::IssueTokens {
            token: Address::from("OTHER"),
            recipient: Address::from("a"),
            amount: 1,
        };
        assert!(matches!(
            action.precheck(&state()),
            Err(GovernanceError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_precheck_invalid_policy() {
        let action = DaoAction::SetVotingPolicy {
            action: ActionId::from(ISSUE_TOKENS),
            policy: VotingPolicy::one_person_one_vote("Employees", 150, 51),
        };
        assert!(matches!(
            action.precheck(&state()),
            Err(GovernanceError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_apply_issue_and_group_changes() {
        let mut state = state();
        let mut ledger = InMemoryLedger::with_tokens([token()]);
        let employee = Address::from("employee1");

        DaoAction::IssueTokens {
            token: token(),
            recipient: employee.clone(),
            amount: 1000,
        }
        .apply(&mut state, &mut ledger)
        .unwrap();
        assert_eq!(ledger.balance_of(&token(), &employee), 1000);

        DaoAction::AddGroupMember {
            group: GroupName::from("Employees"),
            member: employee.clone(),
        }
        .apply(&mut state, &mut ledger)
        .unwrap();
        assert!(state.groups.is_member(&GroupName::from("Employees"), &employee));

        DaoAction::UpgradeDaoContract {
            successor: Address::from("dao-v2"),
        }
        .apply(&mut state, &mut ledger)
        .unwrap();
        assert_eq!(state.successor, Some(Address::from("dao-v2")));
    }

    #[test]
    fn test_action_toml_shape() {
        let action: DaoAction = toml::from_str(
            r#"
            kind = "issue_tokens"
            token = "STDT"
            recipient = "employee1"
            amount = 1000
            "#,
        )
        .unwrap();
        assert_eq!(action.id(), ActionId::from(ISSUE_TOKENS));
    }
}
