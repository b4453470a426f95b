//! Governance engine.
//!
//! - `core`: permission resolution, proposals, votes and execution
//! - `actions`: the executable actions and their permission keys
//! - `bootstrap`: the one-time seeding phase
//! - `auto`: the auto action caller front end
//! - `state`: everything the core owns, snapshot-able
//! - `clock`: time source

pub mod actions;
pub mod auto;
pub mod bootstrap;
pub mod clock;
pub mod core;
pub mod error;
pub mod state;

pub use actions::{
    DaoAction, ADD_NEW_PROPOSAL, BURN_TOKENS, ISSUE_TOKENS, MANAGE_GROUPS, UPGRADE_DAO_CONTRACT,
};
pub use auto::AutoActionCaller;
pub use bootstrap::GovernanceBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use self::core::{GovernanceCore, RequestOutcome, VoteOutcome};
pub use error::{GovernanceError, GovernanceResult};
pub use state::GovernanceState;
