//! # sso-sync
//!
//! Command-line front end for SSO role discovery and profile conflict
//! resolution.
//!
//! ## Usage
//!
//! ```bash
//! # List every account/role pair the cached SSO token can reach
//! sso-sync --start-url https://corp.awsapps.com/start discover
//!
//! # Preview a profile name
//! sso-sync name --pattern '{account_alias}-{role_name}' \
//!     --account-id 123456789012 --account-alias production --role-name Admin
//!
//! # Dry-run a sync against a snapshot of existing profiles
//! sso-sync --start-url https://corp.awsapps.com/start plan --profiles profiles.json --strategy replace
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sso_profile_sync::config::SyncConfig;
use sso_profile_sync::observability::{init_tracing, LogFormat};
use std::path::PathBuf;
use tracing::debug;

mod cli;

/// AWS SSO role discovery and profile sync
#[derive(Parser)]
#[command(name = "sso-sync", version)]
#[command(
    about = "Discover AWS SSO roles and sync them into named profiles",
    long_about = None,
    after_help = "\
Environment:
  SSO_START_URL, SSO_REGION, PROFILE_NAME_PATTERN, PROFILE_REGION,
  PROFILE_OUTPUT, CONFLICT_STRATEGY, ALIAS_SOURCE, LOG_LEVEL, LOG_FORMAT

Examples:
  sso-sync --start-url https://corp.awsapps.com/start discover --json
  sso-sync name --account-id 123456789012 --account-alias prod --role-name Admin
  sso-sync plan --profiles profiles.json --strategy replace
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SSO portal start URL (overrides SSO_START_URL)
    #[arg(long, global = true)]
    start_url: Option<String>,

    /// Region hosting the SSO portal (overrides SSO_REGION)
    #[arg(long, global = true)]
    sso_region: Option<String>,

    /// Log level: error, warn, info, debug, trace (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: text or json (overrides LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered account/role pairs
    Discover {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Where account aliases come from: account-name or iam
        #[arg(long)]
        alias_source: Option<String>,
    },
    /// Preview the profile name a pattern yields
    Name {
        /// Naming pattern (defaults to PROFILE_NAME_PATTERN)
        #[arg(short, long)]
        pattern: Option<String>,

        #[arg(long)]
        account_id: String,

        #[arg(long, default_value = "")]
        account_name: String,

        /// Defaults to the account id
        #[arg(long, default_value = "")]
        account_alias: String,

        #[arg(long)]
        role_name: String,

        #[arg(long)]
        region: Option<String>,
    },
    /// Detect and resolve conflicts against a profile snapshot
    /// Nothing is written unless --output is given
    Plan {
        /// JSON snapshot of existing profiles and sessions
        #[arg(long, value_name = "FILE")]
        profiles: Option<PathBuf>,

        /// Conflict strategy: replace, skip or prompt (overrides CONFLICT_STRATEGY)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Naming pattern (overrides PROFILE_NAME_PATTERN)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Write the updated snapshot to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();

    let mut config = SyncConfig::from_env().context("Invalid environment configuration")?;
    if let Some(url) = cli.start_url {
        config.sso_start_url = url;
    }
    if let Some(region) = cli.sso_region {
        config.sso_region = region;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_tracing(&config.log_level, LogFormat::parse(&config.log_format))?;
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("BUILD_GIT_HASH"),
        built = env!("BUILD_DATETIME"),
        "sso-sync starting"
    );

    match cli.command {
        Commands::Discover { json, alias_source } => {
            if let Some(source) = alias_source {
                config.alias_source = source.parse()?;
            }
            cli::discover::discover_command(&config, json).await
        }
        Commands::Name {
            pattern,
            account_id,
            account_name,
            account_alias,
            role_name,
            region,
        } => cli::name::name_command(
            pattern.as_deref().unwrap_or(&config.naming_pattern),
            &cli::name::NameArgs {
                account_id,
                account_name,
                account_alias,
                role_name,
                region,
            },
        ),
        Commands::Plan {
            profiles,
            strategy,
            pattern,
            output,
            json,
        } => {
            if let Some(strategy) = strategy {
                config.conflict_strategy = strategy.parse()?;
            }
            if let Some(pattern) = pattern {
                config.naming_pattern = pattern;
            }
            cli::plan::plan_command(&config, profiles.as_deref(), output.as_deref(), json).await
        }
    }
}
