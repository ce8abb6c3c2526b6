//! Komainu - per-request authorization enforcement
//!
//! Command-line companion for checking authorization settings.

use anyhow::Context;
use clap::{Parser, Subcommand};
use komainu::config::AuthorizationConfig;
use komainu::gate::{decide, SwitchKey};
use komainu::telemetry::init_subscriber;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Komainu - inspect and validate authorization settings
#[derive(Parser, Debug)]
#[command(name = "komainu")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "authorization.yaml")]
        config: PathBuf,
    },

    /// Show how a routed action is authorized
    Explain {
        /// Path to configuration file
        #[arg(short, long, default_value = "authorization.yaml")]
        config: PathBuf,

        /// Routed action name
        #[arg(short, long)]
        action: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Validate { config } => {
            let settings = load(&config, args.log_level)?;
            info!("Loaded configuration from {:?}", config);

            println!("Configuration is valid: {}", config.display());
            println!("  identity_attribute:  {}", settings.identity_attribute);
            println!("  service_attribute:   {}", settings.service_attribute);
            println!("  authorization_event: {}", settings.authorization_event);
            println!("  mapped actions:      {}", settings.action_map.len());
        }
        Command::Explain { config, action } => {
            let settings = load(&config, args.log_level)?;
            let resolved = settings
                .action_map
                .resolve(&action)
                .with_context(|| format!("Failed to resolve action '{}'", action))?;
            let skip = decide(&action, SwitchKey::SkipAuthorization, &settings);
            let authorize_model = decide(&action, SwitchKey::AuthorizeModel, &settings);
            debug!(authz.action = %action, skip, authorize_model, "Explained action");

            println!("action:             {}", action);
            println!("authorized as:      {}", resolved);
            println!("skip_authorization: {}", skip);
            println!("authorize_model:    {}", authorize_model);
            println!("outcome:            {}", outcome(skip, authorize_model));
        }
    }

    Ok(())
}

fn load(path: &Path, log_level: Option<String>) -> anyhow::Result<AuthorizationConfig> {
    let mut config = AuthorizationConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {:?}", path))?;

    if let Some(level) = log_level {
        config.logging.level = level;
    }
    init_subscriber(&config.logging)?;

    Ok(config)
}

fn outcome(skip: bool, authorize_model: bool) -> &'static str {
    if skip {
        "skipped"
    } else if authorize_model {
        "default model authorized before the handler"
    } else {
        "handler must authorize or skip"
    }
}
