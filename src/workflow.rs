//! # Sync Workflow
//!
//! One end-to-end run: discover roles, detect conflicts against the store,
//! resolve them, name the remaining roles and (unless dry-run) write the
//! result back to the store.

use crate::conflict::{
    ConflictAction, ConflictDetector, ConflictPrompt, ConflictResolutionResult, ConflictResolver,
    FreshNameResolver, ProfileConflict, ResolutionReport, ResolutionStrategy,
};
use crate::discovery::RoleDiscovery;
use crate::error::Result;
use crate::naming::NamingPattern;
use crate::profile::{DiscoveredRole, ProfileTemplate};
use crate::store::ProfileStore;
use std::collections::BTreeSet;
use tracing::{info, info_span, Instrument};

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub start_url: String,
    pub sso_region: String,
    pub pattern: NamingPattern,
    pub template: ProfileTemplate,
    pub strategy: ResolutionStrategy,
    pub max_attempts: u32,
    /// Compute the result without touching the store
    pub dry_run: bool,
}

/// Outcome of [`SyncWorkflow::run`]
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub discovered: Vec<DiscoveredRole>,
    pub conflicts: Vec<ProfileConflict>,
    /// Roles dropped by conflict detection
    pub rejected: usize,
    pub result: ConflictResolutionResult,
    pub report: ResolutionReport,
    /// Profiles removed from the store because a replacement renamed them
    pub removed: Vec<String>,
    pub dry_run: bool,
}

pub struct SyncWorkflow {
    discovery: RoleDiscovery,
    prompt: Option<Box<dyn ConflictPrompt>>,
}

impl std::fmt::Debug for SyncWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorkflow")
            .field("discovery", &self.discovery)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

impl SyncWorkflow {
    #[must_use]
    pub fn new(discovery: RoleDiscovery) -> Self {
        Self {
            discovery,
            prompt: None,
        }
    }

    /// Hook used by [`ResolutionStrategy::Prompt`]
    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn ConflictPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// # Errors
    ///
    /// - Discovery errors (after retries)
    /// - Conflict resolution errors
    /// - Validation errors for profiles that cannot be named
    /// - Store errors while removing or appending profiles
    pub async fn run(&mut self, store: &mut dyn ProfileStore, options: &SyncOptions) -> Result<SyncOutcome> {
        let span = info_span!(
            "sso.sync",
            start_url = %options.start_url,
            strategy = %options.strategy,
            dry_run = options.dry_run
        );
        async move {
            let discovered = self
                .discovery
                .discover_with_retry(&options.start_url, &options.sso_region, options.max_attempts)
                .await?;

            let detector = ConflictDetector::new(&*store, options.pattern.clone());
            let detection = detector.partition(&discovered);

            let mut resolver = ConflictResolver::new(options.pattern.clone(), options.template.clone())
                .with_taken_names(store.profile_names());
            if let Some(prompt) = self.prompt.take() {
                resolver = resolver.with_prompt(prompt);
            }
            let resolution = resolver.resolve(&detection.conflicts, options.strategy).and_then(|mut result| {
                let mut names = FreshNameResolver::new(store.profile_names());
                for generated in &result.generated_profiles {
                    names.claim(generated.name.as_str());
                }
                result.merge(create_fresh_profiles(&resolver, &mut names, &detection.clean_roles)?);
                Ok(result)
            });
            // Hand the prompt back so the workflow can run again
            self.prompt = resolver.into_prompt();
            let result = resolution?;

            let removed = superseded_names(&result);
            if options.dry_run {
                info!(
                    generated = result.generated_profiles.len(),
                    removed = removed.len(),
                    "Dry run, profile store left untouched"
                );
            } else {
                for name in &removed {
                    store.remove_profile(name)?;
                }
                store.append_profiles(&result.generated_profiles)?;
                info!(
                    written = result.generated_profiles.len(),
                    removed = removed.len(),
                    "Profile store updated"
                );
            }

            let report = ResolutionReport::new(&detection.conflicts, &result, options.strategy);
            Ok(SyncOutcome {
                discovered,
                conflicts: detection.conflicts,
                rejected: detection.rejected,
                result,
                report,
                removed,
                dry_run: options.dry_run,
            })
        }
        .instrument(span)
        .await
    }
}

/// Create actions for roles that collide with nothing
fn create_fresh_profiles(
    resolver: &ConflictResolver,
    names: &mut FreshNameResolver,
    roles: &[DiscoveredRole],
) -> Result<ConflictResolutionResult> {
    let mut result = ConflictResolutionResult::default();
    for role in roles {
        let mut profile = resolver.generate_profile(role)?;
        profile.name = names.resolve(&profile.name);
        result.actions.push(ConflictAction::create(role, &profile.name));
        result.generated_profiles.push(profile);
    }
    Ok(result)
}

/// Replaced profiles whose name is not reused by a generated profile
fn superseded_names(result: &ConflictResolutionResult) -> Vec<String> {
    let generated: BTreeSet<&str> = result.generated_profiles.iter().map(|p| p.name.as_str()).collect();
    let superseded: BTreeSet<&str> = result
        .replacements
        .iter()
        .map(|r| r.old_profile.name.as_str())
        .filter(|name| !generated.contains(name))
        .collect();
    superseded.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{ConflictType, ProfileReplacement};
    use crate::profile::{GeneratedProfile, Profile};

    fn template() -> ProfileTemplate {
        ProfileTemplate {
            region: "us-east-1".to_string(),
            output: None,
            sso_start_url: "https://corp.awsapps.com/start".to_string(),
            sso_region: "us-east-1".to_string(),
            sso_session: None,
        }
    }

    #[test]
    fn test_fresh_profiles_get_unique_names() {
        let resolver = ConflictResolver::new(NamingPattern::compile("{role_name}").unwrap(), template());
        let mut names = FreshNameResolver::new(["Admin"]);
        let roles = [
            DiscoveredRole::new("123456789012", "A", "a", "Admin").unwrap(),
            DiscoveredRole::new("210987654321", "B", "b", "Admin").unwrap(),
        ];
        let result = create_fresh_profiles(&resolver, &mut names, &roles).unwrap();
        let created: Vec<_> = result.generated_profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(created, vec!["Admin_1", "Admin_2"]);
        assert_eq!(result.actions.len(), 2);
    }

    #[test]
    fn test_superseded_names_exclude_reused_names() {
        let role = DiscoveredRole::new("123456789012", "Prod", "prod", "Admin").unwrap();
        let generated = GeneratedProfile::from_role("prod-Admin", &role, &template());
        let conflict = ProfileConflict::new(
            role,
            vec![Profile::new("legacy"), Profile::new("prod-Admin")],
            "prod-Admin",
            ConflictType::SameRole,
        )
        .unwrap();
        let result = ConflictResolutionResult {
            generated_profiles: vec![generated.clone()],
            replacements: conflict
                .existing_profiles
                .iter()
                .map(|old| ProfileReplacement {
                    old_profile: old.clone(),
                    new_profile: generated.clone(),
                })
                .collect(),
            ..ConflictResolutionResult::default()
        };
        assert_eq!(superseded_names(&result), vec!["legacy".to_string()]);
    }
}
