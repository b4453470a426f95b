use super::config::{resolve_config_path, DaoConfig};

/// Write a commented default config.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(
    config_path: Option<String>,
    name: String,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    DaoConfig::create_default(&config_path, &name)?;
    println!("📝 Created: {}", config_path.display());
    println!("Edit it, then run `daobase check --config {}`", config_path.display());

    Ok(())
}
