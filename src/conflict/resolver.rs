//! # Conflict Resolution
//!
//! Turns detected conflicts into actions under a [`ResolutionStrategy`].
//! Conflicts are independent: each one yields exactly one action.

use super::fresh_names::FreshNameResolver;
use super::types::{
    ConflictAction, ConflictResolutionResult, ProfileConflict, ProfileReplacement, ResolutionStrategy,
};
use crate::error::{Result, SyncError};
use crate::naming::{NameInputs, NamingPattern};
use crate::profile::{GeneratedProfile, ProfileTemplate};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Decision taken by an operator for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    Replace,
    Skip,
}

/// Hook driven by the interactive layer for [`ResolutionStrategy::Prompt`]
pub trait ConflictPrompt: Send + Sync {
    /// # Errors
    ///
    /// Implementation specific (closed terminal, aborted prompt).
    fn prompt_for_conflict(&self, conflict: &ProfileConflict) -> Result<PromptDecision>;
}

pub struct ConflictResolver {
    pattern: NamingPattern,
    template: ProfileTemplate,
    prompt: Option<Box<dyn ConflictPrompt>>,
    /// Names already present in the profile store
    taken: BTreeSet<String>,
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("pattern", &self.pattern)
            .field("template", &self.template)
            .field("prompt", &self.prompt.is_some())
            .field("taken", &self.taken.len())
            .finish()
    }
}

impl ConflictResolver {
    #[must_use]
    pub fn new(pattern: NamingPattern, template: ProfileTemplate) -> Self {
        Self {
            pattern,
            template,
            prompt: None,
            taken: BTreeSet::new(),
        }
    }

    /// Names in the store a replacement may not take over
    ///
    /// A replacement may still reuse the name of a profile it supersedes.
    #[must_use]
    pub fn with_taken_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taken = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn ConflictPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Give up the installed prompt
    #[must_use]
    pub fn into_prompt(self) -> Option<Box<dyn ConflictPrompt>> {
        self.prompt
    }

    /// Apply `strategy` to every conflict, in input order
    ///
    /// # Errors
    ///
    /// Returns a conflict resolution error if a conflict is malformed, the
    /// Prompt strategy is used without a prompt, or a profile name cannot be
    /// generated for a replacement.
    pub fn resolve(
        &self,
        conflicts: &[ProfileConflict],
        strategy: ResolutionStrategy,
    ) -> Result<ConflictResolutionResult> {
        let mut result = ConflictResolutionResult::default();
        for conflict in conflicts {
            conflict
                .validate()
                .map_err(|e| SyncError::conflict_resolution(e.to_string()))?;
            let decision = match strategy {
                ResolutionStrategy::Replace => PromptDecision::Replace,
                ResolutionStrategy::Skip => PromptDecision::Skip,
                ResolutionStrategy::Prompt => self.ask(conflict)?,
            };
            match decision {
                PromptDecision::Replace => self.replace(conflict, &mut result)?,
                PromptDecision::Skip => Self::skip(conflict, &mut result)?,
            }
        }
        info!(
            strategy = %strategy,
            conflicts = conflicts.len(),
            generated = result.generated_profiles.len(),
            skipped = result.skipped_roles.len(),
            "Conflicts resolved"
        );
        Ok(result)
    }

    /// Profile for a role, with the template region filled in
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name cannot be generated or the
    /// profile is incomplete.
    pub fn generate_profile(&self, role: &crate::profile::DiscoveredRole) -> Result<GeneratedProfile> {
        let name = self
            .pattern
            .generate(&NameInputs {
                account_id: &role.account_id,
                account_name: &role.account_name,
                account_alias: role.alias(),
                role_name: &role.role_name,
                region: Some(&self.template.region),
            })
            .map_err(|e| {
                e.with_context("account_id", role.account_id.as_str())
                    .with_context("role_name", role.role_name.as_str())
            })?;
        let profile = GeneratedProfile::from_role(name, role, &self.template);
        profile.validate()?;
        Ok(profile)
    }

    fn ask(&self, conflict: &ProfileConflict) -> Result<PromptDecision> {
        let prompt = self.prompt.as_ref().ok_or_else(|| {
            SyncError::conflict_resolution("prompt strategy requires an interactive prompt")
                .with_context("account_id", conflict.discovered_role.account_id.as_str())
                .with_context("role_name", conflict.discovered_role.role_name.as_str())
        })?;
        prompt.prompt_for_conflict(conflict)
    }

    fn replace(&self, conflict: &ProfileConflict, result: &mut ConflictResolutionResult) -> Result<()> {
        let old = conflict
            .primary_profile()
            .ok_or_else(|| SyncError::conflict_resolution("conflict has no existing profile"))?;
        let mut generated = self.generate_profile(&conflict.discovered_role).map_err(|e| {
            SyncError::conflict_resolution(format!("cannot generate replacement profile: {e}"))
                .with_context("profile_name", old.name.as_str())
        })?;
        let unique = self.replacement_name(&generated.name, conflict, result);
        if unique != generated.name {
            warn!(
                desired = %generated.name,
                name = %unique,
                role = %conflict.discovered_role,
                "Replacement name already in use, renaming"
            );
            generated.name = unique;
        }

        let action = ConflictAction::replace(conflict, &old.name, &generated.name);
        action.validate()?;
        debug!(old = %old.name, new = %generated.name, "Replacing profile");

        for existing in &conflict.existing_profiles {
            result.replacements.push(ProfileReplacement {
                old_profile: existing.clone(),
                new_profile: generated.clone(),
            });
        }
        result.generated_profiles.push(generated);
        result.actions.push(action);
        Ok(())
    }

    /// `desired`, or the first free `desired_N`
    ///
    /// Names of other generated profiles are always taken. Store names are
    /// taken unless the conflict supersedes that profile.
    fn replacement_name(
        &self,
        desired: &str,
        conflict: &ProfileConflict,
        result: &ConflictResolutionResult,
    ) -> String {
        let superseded: BTreeSet<&str> = conflict.existing_profiles.iter().map(|p| p.name.as_str()).collect();
        let mut names = FreshNameResolver::new(
            self.taken
                .iter()
                .filter(|name| !superseded.contains(name.as_str()))
                .cloned()
                .chain(result.generated_profiles.iter().map(|p| p.name.clone())),
        );
        names.resolve(desired)
    }

    fn skip(conflict: &ProfileConflict, result: &mut ConflictResolutionResult) -> Result<()> {
        let old = conflict
            .primary_profile()
            .ok_or_else(|| SyncError::conflict_resolution("conflict has no existing profile"))?;
        let action = ConflictAction::skip(conflict, &old.name);
        action.validate()?;
        debug!(existing = %old.name, role = %conflict.discovered_role, "Skipping role");

        result.skipped_roles.push(conflict.discovered_role.clone());
        result.actions.push(action);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::types::{ActionType, ConflictType};
    use crate::profile::{DiscoveredRole, Profile};

    fn template() -> ProfileTemplate {
        ProfileTemplate {
            region: "eu-west-1".to_string(),
            output: None,
            sso_start_url: "https://corp.awsapps.com/start".to_string(),
            sso_region: "us-east-1".to_string(),
            sso_session: None,
        }
    }

    fn conflict(existing: &[&str]) -> ProfileConflict {
        ProfileConflict::new(
            DiscoveredRole::new("123456789012", "Production", "production", "Admin").unwrap(),
            existing.iter().map(|n| Profile::new(*n)).collect(),
            "production-Admin",
            ConflictType::SameRole,
        )
        .unwrap()
    }

    #[test]
    fn test_replace_uses_template_region() {
        let resolver = ConflictResolver::new(
            NamingPattern::compile("{account_alias}-{role_name}-{region}").unwrap(),
            template(),
        );
        let result = resolver.resolve(&[conflict(&["old"])], ResolutionStrategy::Replace).unwrap();
        assert_eq!(result.generated_profiles[0].name, "production-Admin-eu-west-1");
        assert_eq!(result.actions[0].old_name.as_deref(), Some("old"));
        assert_eq!(result.actions[0].new_name.as_deref(), Some("production-Admin-eu-west-1"));
    }

    #[test]
    fn test_replace_records_every_superseded_profile() {
        let resolver = ConflictResolver::new(NamingPattern::compile("{account_alias}-{role_name}").unwrap(), template());
        let result = resolver
            .resolve(&[conflict(&["first", "second"])], ResolutionStrategy::Replace)
            .unwrap();
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].old_name.as_deref(), Some("first"));
        let old: Vec<_> = result.replacements.iter().map(|r| r.old_profile.name.as_str()).collect();
        assert_eq!(old, vec!["first", "second"]);
    }

    #[test]
    fn test_replacements_never_share_a_name() {
        let resolver = ConflictResolver::new(NamingPattern::compile("{role_name}").unwrap(), template())
            .with_taken_names(["a", "b"]);
        let result = resolver
            .resolve(&[conflict(&["a"]), conflict(&["b"])], ResolutionStrategy::Replace)
            .unwrap();
        let names: Vec<_> = result.generated_profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Admin", "Admin_1"]);
        assert_eq!(result.actions[1].new_name.as_deref(), Some("Admin_1"));
        assert_eq!(result.replacements[1].new_profile.name, "Admin_1");
    }

    #[test]
    fn test_replacement_keeps_clear_of_unrelated_store_names() {
        let resolver = ConflictResolver::new(
            NamingPattern::compile("{account_alias}-{role_name}-{region}").unwrap(),
            template(),
        )
        .with_taken_names(["old", "production-Admin-eu-west-1"]);
        let result = resolver.resolve(&[conflict(&["old"])], ResolutionStrategy::Replace).unwrap();
        assert_eq!(result.generated_profiles[0].name, "production-Admin-eu-west-1_1");
    }

    #[test]
    fn test_replacement_may_reuse_superseded_name() {
        let resolver = ConflictResolver::new(NamingPattern::compile("{role_name}").unwrap(), template())
            .with_taken_names(["Admin"]);
        let result = resolver.resolve(&[conflict(&["Admin"])], ResolutionStrategy::Replace).unwrap();
        assert_eq!(result.generated_profiles[0].name, "Admin");
    }

    #[test]
    fn test_prompt_without_hook_fails() {
        let resolver = ConflictResolver::new(NamingPattern::compile("{role_name}").unwrap(), template());
        let err = resolver.resolve(&[conflict(&["old"])], ResolutionStrategy::Prompt).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConflictResolution);
    }

    #[test]
    fn test_prompt_decisions_are_applied_per_conflict() {
        struct Alternating(std::sync::atomic::AtomicUsize);
        impl ConflictPrompt for Alternating {
            fn prompt_for_conflict(&self, _conflict: &ProfileConflict) -> Result<PromptDecision> {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(if n % 2 == 0 { PromptDecision::Replace } else { PromptDecision::Skip })
            }
        }

        let resolver = ConflictResolver::new(NamingPattern::compile("{role_name}").unwrap(), template())
            .with_prompt(Box::new(Alternating(std::sync::atomic::AtomicUsize::new(0))));
        let result = resolver
            .resolve(&[conflict(&["a"]), conflict(&["b"])], ResolutionStrategy::Prompt)
            .unwrap();
        assert_eq!(result.count(ActionType::Replace), 1);
        assert_eq!(result.count(ActionType::Skip), 1);
        assert_eq!(result.skipped_roles.len(), 1);
    }
}
