//! Property-based tests for the voting state machine
//!
//! Tests for:
//! - Tally monotonicity: yes and no weight never decrease
//! - Finished monotonicity: once finished, always finished with the same result
//! - De-duplication: a second ballot from the same voter is always refused
//! - Resolution: a passed voting always satisfies both thresholds

use super::ballot::{Choice, Voting, VotingError, VotingState};
use super::policy::VotingPolicy;
use crate::identity::Address;
use proptest::prelude::*;

fn voter(index: usize) -> Address {
    Address::new(format!("voter-{}", index))
}

fn arb_policy() -> impl Strategy<Value = VotingPolicy> {
    (0u8..=100, 0u8..=100).prop_map(|(quorum, consensus)| {
        VotingPolicy::one_person_one_vote("Employees", quorum, consensus)
    })
}

fn arb_ballots() -> impl Strategy<Value = Vec<(usize, bool, u64)>> {
    prop::collection::vec((0usize..12, any::<bool>(), 1u64..1_000), 0..40)
}

proptest! {
    /// Property: tallies are non-decreasing and finished never reverts
    #[test]
    fn tallies_and_finished_are_monotonic(
        policy in arb_policy(),
        total in 1u64..20_000,
        ballots in arb_ballots(),
    ) {
        let mut voting = Voting::open(&policy, total, &voter(100), 1, 0).unwrap();
        let mut previous = voting.stats();
        let mut previous_state = voting.state();

        for (index, yes, weight) in ballots {
            let _ = voting.vote(&voter(index), Choice::from(yes), weight, 0);
            let stats = voting.stats();

            prop_assert!(stats.yes >= previous.yes);
            prop_assert!(stats.no >= previous.no);
            if previous_state != VotingState::Open {
                prop_assert_eq!(voting.state(), previous_state, "finished voting changed state");
                prop_assert_eq!(stats, previous, "finished voting changed tallies");
            }

            previous = stats;
            previous_state = voting.state();
        }
    }

    /// Property: the same voter can never be counted twice
    #[test]
    fn second_ballot_is_always_refused(
        total in 50u64..1_000,
        first in any::<bool>(),
        second in any::<bool>(),
    ) {
        // 100% quorum keeps the voting open after one extra ballot.
        let policy = VotingPolicy::one_person_one_vote("Employees", 100, 1);
        let mut voting = Voting::open(&policy, total, &voter(100), 1, 0).unwrap();

        voting.vote(&voter(1), Choice::from(first), 1, 0).unwrap();
        let before = voting.stats();

        let result = voting.vote(&voter(1), Choice::from(second), 1, 0);
        prop_assert_eq!(result, Err(VotingError::AlreadyVoted(voter(1))));
        prop_assert_eq!(voting.stats(), before);
    }

    /// Property: passing implies inclusive quorum and consensus
    #[test]
    fn passed_implies_thresholds(
        policy in arb_policy(),
        total in 1u64..5_000,
        ballots in arb_ballots(),
    ) {
        let mut voting = Voting::open(&policy, total, &voter(100), 1, 0).unwrap();
        for (index, yes, weight) in ballots {
            let _ = voting.vote(&voter(index), Choice::from(yes), weight, 0);
        }

        if voting.is_yes() {
            let stats = voting.stats();
            let cast = stats.cast() as u128;
            prop_assert!(cast * 100 >= policy.quorum_percent as u128 * total as u128);
            prop_assert!(stats.yes as u128 * 100 >= policy.consensus_percent as u128 * cast);
        }
    }

    /// Property: exactly one ballot moves the voting to Passed
    #[test]
    fn pass_transition_happens_once(
        policy in arb_policy(),
        total in 1u64..200,
        ballots in arb_ballots(),
    ) {
        let mut voting = Voting::open(&policy, total, &voter(100), 1, 0).unwrap();
        let mut transitions = usize::from(voting.is_yes());

        for (index, yes, weight) in ballots {
            let was_open = !voting.is_finished();
            if let Ok(VotingState::Passed) = voting.vote(&voter(index), Choice::from(yes), weight, 0) {
                prop_assert!(was_open);
                transitions += 1;
            }
        }

        prop_assert!(transitions <= 1);
        prop_assert_eq!(transitions == 1, voting.is_yes());
    }
}
