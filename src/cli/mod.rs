//! # CLI Commands
//!
//! One module per `sso-sync` subcommand, plus the wiring they share.

use anyhow::{Context, Result};
use sso_profile_sync::config::{AliasSource, SyncConfig};
use sso_profile_sync::discovery::{
    AccountAliasLookup, AccountNameAliases, AwsSsoPortal, IamAliasLookup, RoleDiscovery, SsoPortal,
};
use sso_profile_sync::token::FileTokenCache;
use std::sync::Arc;
use tracing::debug;

pub mod discover;
pub mod name;
pub mod plan;
pub mod prompt;

/// Discovery over the real SSO portal and the AWS CLI token cache
pub async fn build_discovery(config: &SyncConfig) -> Result<RoleDiscovery> {
    config.validate().context("Invalid configuration")?;

    let portal: Arc<dyn SsoPortal> = Arc::new(
        AwsSsoPortal::from_region(&config.sso_region)
            .await
            .with_page_size(config.page_size)
            .with_request_timeout(config.request_timeout()),
    );
    let tokens = FileTokenCache::default_location().context("Failed to locate the SSO token cache")?;
    debug!(cache_dir = %tokens.cache_dir().display(), "Using SSO token cache");

    let aliases: Arc<dyn AccountAliasLookup> = match config.alias_source {
        AliasSource::AccountName => Arc::new(AccountNameAliases),
        AliasSource::Iam => Arc::new(IamAliasLookup::new(Arc::clone(&portal))),
    };

    Ok(RoleDiscovery::new(portal, Arc::new(tokens), aliases).with_backoff(config.backoff()))
}

/// Print a library error with its remediation hint, then hand it to anyhow
pub fn report_error(err: sso_profile_sync::SyncError) -> anyhow::Error {
    if let Some(hint) = err.remediation() {
        eprintln!("hint: {hint}");
    }
    anyhow::Error::new(err)
}
