//! DAO configuration file handling
//!
//! The config describes the one-time bootstrap of a DAO: managed tokens,
//! groups, permission rules, voting policies and initial balances. It is read
//! once by `check` and `run` and fed to `GovernanceBuilder`. After bootstrap
//! every change goes through gated actions; the file is never written back.

use daobase::governance::GovernanceBuilder;
use daobase::identity::{ActionId, Address, GroupName};
use daobase::ledger::{InMemoryLedger, TokenLedger};
use daobase::permissions::PermissionRule;
use daobase::voting::{parse_duration_to_secs, ExpiryAction, VotingPolicy, VotingType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoConfig {
    pub dao: DaoSection,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,

    #[serde(default)]
    pub policies: Vec<PolicyConfig>,

    /// Minted before the ledger is handed to the DAO.
    #[serde(default)]
    pub balances: Vec<BalanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoSection {
    pub name: String,

    /// Tokens the DAO controls.
    #[serde(default)]
    pub tokens: Vec<Address>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: GroupName,
    #[serde(default)]
    pub members: Vec<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    pub action: ActionId,
    pub rule: PermissionRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub action: ActionId,
    pub voting_type: VotingType,
    pub quorum_percent: u8,
    pub consensus_percent: u8,

    /// Human-readable voting period ("3days", "12h"); absent or "none" means
    /// no deadline.
    pub duration: Option<String>,

    #[serde(default)]
    pub on_expiry: ExpiryAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub token: Address,
    pub holder: Address,
    pub amount: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl PolicyConfig {
    pub fn to_policy(&self) -> Result<VotingPolicy, Box<dyn std::error::Error>> {
        let duration_secs = match &self.duration {
            Some(duration) => parse_duration_to_secs(duration).map_err(|e| {
                format!("Invalid duration for policy '{}': {}", self.action, e)
            })?,
            None => 0,
        };

        Ok(VotingPolicy {
            voting_type: self.voting_type.clone(),
            quorum_percent: self.quorum_percent,
            consensus_percent: self.consensus_percent,
            duration_secs,
            on_expiry: self.on_expiry,
        })
    }
}

impl DaoConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: DaoConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Seed a builder over a fresh in-memory ledger.
    ///
    /// Initial balances are minted here, while the ledger is still ours.
    pub fn builder(&self) -> Result<GovernanceBuilder<InMemoryLedger>, Box<dyn std::error::Error>> {
        let mut ledger = InMemoryLedger::with_tokens(self.dao.tokens.iter().cloned());
        for balance in &self.balances {
            ledger
                .issue(&balance.token, &balance.holder, balance.amount)
                .map_err(|e| {
                    format!(
                        "Failed to mint initial balance for {}: {}",
                        balance.holder, e
                    )
                })?;
        }

        let mut builder = GovernanceBuilder::new(ledger);
        for token in &self.dao.tokens {
            builder = builder.manage_token(token.clone());
        }
        for group in &self.groups {
            for member in &group.members {
                builder = builder.group_member(group.name.clone(), member.clone());
            }
        }
        for permission in &self.permissions {
            builder = builder.allow(permission.action.clone(), permission.rule.clone());
        }
        for policy in &self.policies {
            builder = builder.voting_policy(policy.action.clone(), policy.to_policy()?);
        }

        Ok(builder)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(name: &str) -> String {
        format!(
            r#"# DAO bootstrap configuration
#
# Everything here is applied ONCE, before the DAO goes live. After that,
# groups, rules and policies change only through gated actions
# (manageGroups), usually by vote.

[dao]
name = "{name}"
# Tokens under the DAO's control
tokens = ["STDT"]

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/daobase/daobase.log"

[[groups]]
name = "Employees"
members = ["creator", "employee1", "employee2"]

# Rules: by = "address" | "group" | "voting". Any matching rule grants the
# action. A voting rule is only satisfied by a passed proposal.
[[permissions]]
action = "manageGroups"
rule = {{ by = "address", address = "creator" }}

[[permissions]]
action = "addNewProposal"
rule = {{ by = "group", group = "Employees" }}

[[permissions]]
action = "issueTokens"
rule = {{ by = "voting", target = "STDT" }}

[[permissions]]
action = "upgradeDaoContract"
rule = {{ by = "voting", target = "STDT" }}

# Every action with a voting rule needs a policy.
[[policies]]
action = "issueTokens"
voting_type = {{ type = "one_person_one_vote", group = "Employees" }}
quorum_percent = 51
consensus_percent = 51
duration = "7days"
# on_expiry: "reject" (default) or "keep_open"
on_expiry = "reject"

[[policies]]
action = "upgradeDaoContract"
voting_type = {{ type = "token_weighted", token = "STDT" }}
quorum_percent = 51
consensus_percent = 66

[[balances]]
token = "STDT"
holder = "creator"
amount = 1000
"#,
            name = name
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(name);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default config file path
///
/// ~/.config/daobase/config.toml on Linux.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daobase")
        .join("config.toml")
}

/// Resolve an optional `--config` argument.
pub fn resolve_config_path(config: Option<String>) -> PathBuf {
    config.map(PathBuf::from).unwrap_or_else(default_config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daobase::governance::{ADD_NEW_PROPOSAL, ISSUE_TOKENS, MANAGE_GROUPS};
    use tempfile::TempDir;

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        DaoConfig::create_default(&config_path, "Test DAO").unwrap();
        assert!(config_path.exists());

        let config = DaoConfig::load(&config_path).unwrap();
        assert_eq!(config.dao.name, "Test DAO");
        assert_eq!(config.dao.tokens, vec![Address::from("STDT")]);
        assert_eq!(config.groups[0].members.len(), 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_config_bootstraps() {
        let config: DaoConfig = toml::from_str(&DaoConfig::generate_default_toml("x")).unwrap();
        let core = config.builder().unwrap().build().unwrap();

        let creator = Address::from("creator");
        assert!(core.is_can_do_action(&creator, MANAGE_GROUPS));
        assert!(core.is_can_do_action(&creator, ADD_NEW_PROPOSAL));
        assert!(!core.is_can_do_action(&creator, ISSUE_TOKENS));
        assert_eq!(
            core.ledger().balance_of(&Address::from("STDT"), &creator),
            1000
        );

        let policy = core.voting_policy(ISSUE_TOKENS).unwrap();
        assert_eq!(policy.duration_secs, 7 * 24 * 3600);
        assert_eq!(policy.on_expiry, ExpiryAction::Reject);
        assert_eq!(core.voting_policy("upgradeDaoContract").unwrap().duration_secs, 0);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config: DaoConfig = toml::from_str(&DaoConfig::generate_default_toml("Saved")).unwrap();
        config.save(&config_path).unwrap();

        let loaded = DaoConfig::load(&config_path).unwrap();
        assert_eq!(loaded.dao.name, "Saved");
        assert_eq!(loaded.permissions.len(), config.permissions.len());
        assert_eq!(loaded.policies[0].duration.as_deref(), Some("7days"));
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[dao]\nname = \"Minimal\"\n").unwrap();

        let config = DaoConfig::load(&config_path).unwrap();
        assert!(config.dao.tokens.is_empty());
        assert!(config.groups.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(config.builder().unwrap().build().is_ok());
    }

    #[test]
    fn test_invalid_duration_is_reported() {
        let policy = PolicyConfig {
            action: ActionId::from("issueTokens"),
            voting_type: VotingType::OnePersonOneVote {
                group: GroupName::from("Employees"),
            },
            quorum_percent: 51,
            consensus_percent: 51,
            duration: Some("soon".to_string()),
            on_expiry: ExpiryAction::Reject,
        };
        let err = policy.to_policy().unwrap_err();
        assert!(err.to_string().contains("issueTokens"));
    }

    #[test]
    fn test_balance_for_unmanaged_token_fails() {
        let mut config: DaoConfig =
            toml::from_str(&DaoConfig::generate_default_toml("x")).unwrap();
        config.balances.push(BalanceConfig {
            token: Address::from("OTHER"),
            holder: Address::from("creator"),
            amount: 1,
        });
        assert!(config.builder().is_err());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("daobase/config.toml"));
        assert_eq!(
            resolve_config_path(Some("/tmp/dao.toml".to_string())),
            PathBuf::from("/tmp/dao.toml")
        );
    }
}
