use super::config::{resolve_config_path, DaoConfig};
use super::init_logging;
use daobase::ledger::TokenLedger;

/// Load the config, bootstrap the DAO and print what it would start with.
///
/// Bootstrap warnings (voting rules without a policy) go to the log.
pub fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path);
    let config = DaoConfig::load(&config_path)?;
    init_logging(&config.logging)?;

    let core = config.builder()?.build()?;
    let state = core.state();

    println!("✅ {} ({})", config.dao.name, config_path.display());
    println!();

    println!("Tokens:");
    for token in &state.tokens {
        println!("  {} (supply {})", token, core.ledger().total_supply(token));
    }

    println!();
    println!("Groups:");
    for group in state.groups.groups() {
        let members: Vec<String> = state
            .groups
            .members(group)
            .map(|member| member.to_string())
            .collect();
        println!("  {} [{}]", group, members.join(", "));
    }

    println!();
    println!("Permissions:");
    for action in state.permissions.actions() {
        for rule in state.permissions.rules_for(action) {
            println!("  {} <- {:?}", action, rule);
        }
    }

    println!();
    println!("Voting policies:");
    for (action, policy) in &state.policies {
        let deadline = match policy.duration_secs {
            0 => "no deadline".to_string(),
            secs => format!(
                "{} ({:?})",
                humantime::format_duration(std::time::Duration::from_secs(secs)),
                policy.on_expiry
            ),
        };
        println!(
            "  {}: {:?}, quorum {}%, consensus {}%, {}",
            action, policy.voting_type, policy.quorum_percent, policy.consensus_percent, deadline
        );
    }

    Ok(())
}
