//! # Name Command
//!
//! Renders a naming pattern for explicit values, without touching SSO.

use anyhow::{Context, Result};
use sso_profile_sync::naming::{NameInputs, NamingPattern};

#[derive(Debug)]
pub struct NameArgs {
    pub account_id: String,
    pub account_name: String,
    pub account_alias: String,
    pub role_name: String,
    pub region: Option<String>,
}

pub fn name_command(pattern: &str, args: &NameArgs) -> Result<()> {
    let pattern = NamingPattern::compile(pattern).context("Invalid naming pattern")?;
    let alias = if args.account_alias.is_empty() {
        &args.account_id
    } else {
        &args.account_alias
    };
    let name = pattern
        .generate(&NameInputs {
            account_id: &args.account_id,
            account_name: &args.account_name,
            account_alias: alias,
            role_name: &args.role_name,
            region: args.region.as_deref(),
        })
        .context("Failed to generate profile name")?;
    println!("{name}");
    Ok(())
}
