//! # Discover Command
//!
//! Lists every account/role pair reachable with the cached SSO token.

use super::{build_discovery, report_error};
use anyhow::{Context, Result};
use sso_profile_sync::config::SyncConfig;

pub async fn discover_command(config: &SyncConfig, json: bool) -> Result<()> {
    let discovery = build_discovery(config).await?;
    let mut roles = discovery
        .discover_with_retry(&config.sso_start_url, &config.sso_region, config.discovery_max_attempts)
        .await
        .map_err(report_error)?;
    roles.sort_by(|a, b| (&a.account_id, &a.role_name).cmp(&(&b.account_id, &b.role_name)));

    if json {
        let rendered = serde_json::to_string_pretty(&roles).context("Failed to serialize roles")?;
        println!("{rendered}");
        return Ok(());
    }

    if roles.is_empty() {
        println!("No roles found for {}.", config.sso_start_url);
        return Ok(());
    }

    println!(
        "\n{:<14} {:<30} {:<24} {:<30}",
        "ACCOUNT ID", "ACCOUNT NAME", "ALIAS", "ROLE"
    );
    println!("{}", "-".repeat(101));
    for role in &roles {
        println!(
            "{:<14} {:<30} {:<24} {:<30}",
            role.account_id,
            role.account_name,
            role.alias(),
            role.role_name
        );
    }
    let mut accounts: Vec<&str> = roles.iter().map(|r| r.account_id.as_str()).collect();
    accounts.dedup();
    println!("\n{} role(s) across {} account(s)", roles.len(), accounts.len());

    Ok(())
}
