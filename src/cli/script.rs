//! Request scripts for the `run` command.
//!
//! A script is an ordered list of steps replayed against one freshly
//! bootstrapped DAO, in file order.

use daobase::governance::DaoAction;
use daobase::identity::Address;
use daobase::voting::Choice;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptStep {
    /// `caller` requests `action`, optionally submitted through an auto
    /// action caller identity `via`.
    Request {
        caller: Address,
        via: Option<Address>,
        action: DaoAction,
    },
    Vote {
        proposal: u64,
        voter: Address,
        choice: Choice,
    },
    /// Move the script clock forward, e.g. "3days".
    Advance { duration: String },
    CloseExpired,
}

impl ScriptStep {
    pub fn describe(&self) -> String {
        match self {
            ScriptStep::Request {
                caller,
                via: Some(via),
                action,
            } => format!("{} requests {} via {}", caller, action.describe(), via),
            ScriptStep::Request { caller, action, .. } => {
                format!("{} requests {}", caller, action.describe())
            }
            ScriptStep::Vote {
                proposal,
                voter,
                choice,
            } => format!("{} votes {:?} on #{}", voter, choice, proposal),
            ScriptStep::Advance { duration } => format!("advance clock by {}", duration),
            ScriptStep::CloseExpired => "close expired proposals".to_string(),
        }
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read script '{}': {}", path.display(), e))?;

        let script: Script = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse script '{}': {}", path.display(), e))?;

        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script: Script = toml::from_str(
            r#"
            [[steps]]
            kind = "request"
            caller = "employee1"
            via = "aac"
            action = { kind = "issue_tokens", token = "STDT", recipient = "employee1", amount = 1000 }

            [[steps]]
            kind = "vote"
            proposal = 0
            voter = "employee2"
            choice = "yes"

            [[steps]]
            kind = "advance"
            duration = "2days"

            [[steps]]
            kind = "close_expired"
            "#,
        )
        .unwrap();

        assert_eq!(script.steps.len(), 4);
        assert!(matches!(
            &script.steps[0],
            ScriptStep::Request { via: Some(via), .. } if via == &Address::from("aac")
        ));
        assert_eq!(
            script.steps[1],
            ScriptStep::Vote {
                proposal: 0,
                voter: Address::from("employee2"),
                choice: Choice::Yes,
            }
        );
        assert_eq!(script.steps[3], ScriptStep::CloseExpired);
        assert_eq!(script.steps[3].describe(), "close expired proposals");
    }

    #[test]
    fn test_empty_script() {
        let script: Script = toml::from_str("").unwrap();
        assert!(script.steps.is_empty());
    }
}
