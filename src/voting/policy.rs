//! Per-action voting configuration.

use crate::identity::{Address, GroupName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: u8 },
}

/// How ballots are weighted, and who may cast them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VotingType {
    /// Weight 1 per member of `group`.
    OnePersonOneVote { group: GroupName },
    /// Weight equal to the voter's balance of `token`.
    TokenWeighted { token: Address },
}

/// What happens once a deadline passes without a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryAction {
    /// Late votes are refused and the expiry sweep rejects the proposal.
    #[default]
    Reject,
    /// The deadline is informational only; the voting stays open.
    KeepOpen,
}

/// Voting configuration attached to one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPolicy {
    pub voting_type: VotingType,

    /// Share of eligible weight that must participate (0-100).
    pub quorum_percent: u8,

    /// Share of cast weight that must be "yes" (0-100).
    pub consensus_percent: u8,

    /// Voting period in seconds, 0 = no deadline.
    #[serde(default)]
    pub duration_secs: u64,

    #[serde(default)]
    pub on_expiry: ExpiryAction,
}

impl VotingPolicy {
    pub fn one_person_one_vote(group: impl Into<GroupName>, quorum: u8, consensus: u8) -> Self {
        Self {
            voting_type: VotingType::OnePersonOneVote {
                group: group.into(),
            },
            quorum_percent: quorum,
            consensus_percent: consensus,
            duration_secs: 0,
            on_expiry: ExpiryAction::default(),
        }
    }

    pub fn token_weighted(token: impl Into<Address>, quorum: u8, consensus: u8) -> Self {
        Self {
            voting_type: VotingType::TokenWeighted {
                token: token.into(),
            },
            quorum_percent: quorum,
            consensus_percent: consensus,
            duration_secs: 0,
            on_expiry: ExpiryAction::default(),
        }
    }

    pub fn with_duration(mut self, duration_secs: u64, on_expiry: ExpiryAction) -> Self {
        self.duration_secs = duration_secs;
        self.on_expiry = on_expiry;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.quorum_percent > 100 {
            return Err(PolicyError::PercentOutOfRange {
                field: "quorum_percent",
                value: self.quorum_percent,
            });
        }
        if self.consensus_percent > 100 {
            return Err(PolicyError::PercentOutOfRange {
                field: "consensus_percent",
                value: self.consensus_percent,
            });
        }
        Ok(())
    }

    /// Deadline for a voting opened at `created_at`, if the policy has one.
    pub fn deadline(&self, created_at: u64) -> Option<u64> {
        (self.duration_secs > 0).then(|| created_at.saturating_add(self.duration_secs))
    }

    /// Whether a lone "yes" of `weight` out of `total` eligible passes on its own.
    pub fn single_vote_decides(&self, weight: u64, total: u64) -> bool {
        weight > 0
            && thresholds_met(
                self.quorum_percent,
                self.consensus_percent,
                weight,
                weight,
                total,
            )
    }
}

/// Inclusive quorum and consensus check, in `u128` so no weight overflows.
pub fn thresholds_met(
    quorum_percent: u8,
    consensus_percent: u8,
    yes: u64,
    cast: u64,
    total: u64,
) -> bool {
    let quorum = cast as u128 * 100 >= quorum_percent as u128 * total as u128;
    let consensus = cast > 0 && yes as u128 * 100 >= consensus_percent as u128 * cast as u128;
    quorum && consensus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bounds() {
        assert!(VotingPolicy::one_person_one_vote("Employees", 51, 51).validate().is_ok());
        assert!(VotingPolicy::one_person_one_vote("Employees", 0, 100).validate().is_ok());

        let err = VotingPolicy::one_person_one_vote("Employees", 101, 51)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::PercentOutOfRange {
                field: "quorum_percent",
                value: 101
            }
        );

        assert!(VotingPolicy::token_weighted("token", 51, 200).validate().is_err());
    }

    #[test]
    fn test_single_vote_decides() {
        let policy = VotingPolicy::one_person_one_vote("Employees", 51, 51);
        assert!(policy.single_vote_decides(1, 1));
        assert!(!policy.single_vote_decides(1, 2));
        assert!(!policy.single_vote_decides(0, 1));

        // A lower quorum lets one of three decide.
        let policy = VotingPolicy::one_person_one_vote("Employees", 30, 51);
        assert!(policy.single_vote_decides(1, 3));

        let weighted = VotingPolicy::token_weighted("token", 50, 60);
        assert!(weighted.single_vote_decides(1_400, 2_800));
        assert!(!weighted.single_vote_decides(1_399, 2_800));
    }

    #[test]
    fn test_deadline() {
        let policy = VotingPolicy::one_person_one_vote("Employees", 51, 51);
        assert_eq!(policy.deadline(1_000), None);

        let policy = policy.with_duration(3_600, ExpiryAction::Reject);
        assert_eq!(policy.deadline(1_000), Some(4_600));
    }

    #[test]
    fn test_policy_toml_defaults() {
        let policy: VotingPolicy = toml::from_str(
            r#"
            quorum_percent = 51
            consensus_percent = 51
            voting_type = { type = "one_person_one_vote", group = "Employees" }
            "#,
        )
        .unwrap();

        assert_eq!(policy, VotingPolicy::one_person_one_vote("Employees", 51, 51));
        assert_eq!(policy.on_expiry, ExpiryAction::Reject);
    }
}
