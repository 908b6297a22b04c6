//! # Plan Command
//!
//! Runs discovery, detection and resolution against a JSON snapshot of the
//! existing profiles. The snapshot on disk is never modified; `--output`
//! writes the updated snapshot to a separate file.

use super::prompt::TerminalPrompt;
use super::{build_discovery, report_error};
use anyhow::{Context, Result};
use sso_profile_sync::config::SyncConfig;
use sso_profile_sync::conflict::ResolutionStrategy;
use sso_profile_sync::store::MemoryProfileStore;
use sso_profile_sync::workflow::{SyncOptions, SyncWorkflow};
use std::path::Path;

pub async fn plan_command(
    config: &SyncConfig,
    profiles: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut store = match profiles {
        Some(path) => MemoryProfileStore::load(path)
            .with_context(|| format!("Failed to load profile snapshot {}", path.display()))?,
        None => MemoryProfileStore::new(),
    };

    let options = SyncOptions {
        start_url: config.sso_start_url.clone(),
        sso_region: config.sso_region.clone(),
        pattern: config.pattern().context("Invalid naming pattern")?,
        template: config.template(),
        strategy: config.conflict_strategy,
        max_attempts: config.discovery_max_attempts,
        dry_run: output.is_none(),
    };

    let mut workflow = SyncWorkflow::new(build_discovery(config).await?);
    if config.conflict_strategy == ResolutionStrategy::Prompt {
        workflow = workflow.with_prompt(Box::new(TerminalPrompt));
    }
    let outcome = workflow.run(&mut store, &options).await.map_err(report_error)?;

    if json {
        let rendered = serde_json::to_string_pretty(&outcome.report).context("Failed to serialize report")?;
        println!("{rendered}");
    } else {
        println!(
            "Discovered {} role(s), {} conflict(s), {} rejected\n",
            outcome.discovered.len(),
            outcome.conflicts.len(),
            outcome.rejected
        );
        print!("{}", outcome.report);
    }

    if let Some(path) = output {
        let snapshot = store.to_json().context("Failed to serialize profile snapshot")?;
        std::fs::write(path, snapshot)
            .with_context(|| format!("Failed to write profile snapshot {}", path.display()))?;
        eprintln!("Updated snapshot written to {}", path.display());
    } else {
        eprintln!("Dry run: no profiles were written.");
    }

    Ok(())
}
