use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub mod check;
pub mod config;
pub mod init;
pub mod run;
pub mod script;
pub mod version;

#[derive(Parser)]
#[command(name = "daobase")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the daobase governance engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default DAO configuration
    Init {
        /// Path to config file (default: ~/.config/daobase/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// DAO name written into the config
        #[arg(long, default_value = "My DAO")]
        name: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Bootstrap the configured DAO and print its rules
    Check {
        /// Path to config file (default: ~/.config/daobase/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Replay a request script against a freshly bootstrapped DAO
    Run {
        /// Path to config file (default: ~/.config/daobase/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Path to the TOML script of request / vote / close_expired steps
        #[arg(long)]
        script: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Write the final state snapshot (CBOR) to this path
        #[arg(long)]
        snapshot: Option<String>,
    },

    /// Display version information
    Version,
}

pub fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init {
            config,
            name,
            force,
        } => init::execute(config, name, force),
        Commands::Check { config } => check::execute(config),
        Commands::Run {
            config,
            script,
            json,
            snapshot,
        } => run::execute(config, script, json, snapshot),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

/// Install the global subscriber from the `[logging]` section.
///
/// `RUST_LOG` overrides the configured level. Returns false when a
/// subscriber was already installed; the earlier one keeps its level and
/// writer, including any log file.
pub fn init_logging(logging: &config::LoggingConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| format!("Invalid log level '{}': {}", logging.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    }
    .is_ok();

    if !installed {
        debug!(
            level = %logging.level,
            file = ?logging.file,
            "subscriber already installed, logging config ignored"
        );
    }
    Ok(installed)
}
