//! # Conflict Detection
//!
//! Compares discovered roles with the existing profile store.
//!
//! The lookup index and the resolved SSO identity of every SSO-backed profile
//! are computed once, when the detector is built, and are read-only after
//! that. Profiles whose SSO configuration cannot be resolved are left out of
//! the identity cache: they can still collide by name but never match a role.

use super::types::{ConflictType, ProfileConflict};
use crate::error::Result;
use crate::naming::{NameInputs, NamingPattern};
use crate::profile::{DiscoveredRole, Profile, ResolvedSsoConfig};
use crate::store::{LookupIndex, ProfileStore};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Condition that decided a conflict's type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationBasis {
    /// A conflicting profile resolves to the role's account and role
    IdentityMatch,
    /// A conflicting profile carries the proposed name
    NameMatch,
    /// Neither condition held; the detector never produces this
    Fallback,
}

/// Roles split by whether they collide with the store
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub conflicts: Vec<ProfileConflict>,
    pub clean_roles: Vec<DiscoveredRole>,
    /// Roles dropped because they failed validation or naming
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct ConflictDetector {
    pattern: NamingPattern,
    /// Store order, used when no index is available
    profiles: Vec<Profile>,
    index: Option<LookupIndex>,
    resolved: HashMap<String, ResolvedSsoConfig>,
}

impl ConflictDetector {
    /// Snapshot the store and pre-resolve every SSO-backed profile
    pub fn new(store: &dyn ProfileStore, pattern: NamingPattern) -> Self {
        let profiles: Vec<Profile> = store.all_profiles().values().cloned().collect();

        let index = match store.build_lookup_index() {
            Ok(index) => Some(index),
            Err(e) => {
                warn!("Profile lookup index unavailable, falling back to linear scans: {}", e);
                None
            }
        };

        let mut resolved = HashMap::new();
        for profile in profiles.iter().filter(|p| p.is_sso_backed()) {
            match store.resolve_sso_config(profile) {
                Ok(config) => {
                    resolved.insert(profile.name.clone(), config);
                }
                Err(e) => {
                    debug!(profile = %profile.name, "Skipping profile with unresolvable SSO config: {}", e);
                }
            }
        }
        info!(
            profiles = profiles.len(),
            resolved = resolved.len(),
            indexed = index.is_some(),
            "Conflict detector ready"
        );

        Self {
            pattern,
            profiles,
            index,
            resolved,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &NamingPattern {
        &self.pattern
    }

    /// Cached identity of an existing profile
    #[must_use]
    pub fn resolved_config(&self, profile_name: &str) -> Option<&ResolvedSsoConfig> {
        self.resolved.get(profile_name)
    }

    /// Name a role would get, with `{region}` left unresolved
    ///
    /// # Errors
    ///
    /// Validation errors from the naming pattern.
    pub fn proposed_name(&self, role: &DiscoveredRole) -> Result<String> {
        self.pattern
            .propose(&NameInputs {
                account_id: &role.account_id,
                account_name: &role.account_name,
                account_alias: role.alias(),
                role_name: &role.role_name,
                region: None,
            })
            .map_err(|e| {
                e.with_context("account_id", role.account_id.as_str())
                    .with_context("role_name", role.role_name.as_str())
            })
    }

    /// Conflicts for a batch of roles; bad roles are logged and skipped
    ///
    /// # Errors
    ///
    /// Per-role failures never fail the batch; the `Result` is kept for
    /// callers composing with `?`.
    pub fn detect(&self, roles: &[DiscoveredRole]) -> Result<Vec<ProfileConflict>> {
        Ok(self.partition(roles).conflicts)
    }

    /// Split roles into conflicts and clean roles, preserving input order
    pub fn partition(&self, roles: &[DiscoveredRole]) -> DetectionOutcome {
        let mut outcome = DetectionOutcome::default();
        for role in roles {
            match self.analyze(role) {
                Ok(Some(conflict)) => outcome.conflicts.push(conflict),
                Ok(None) => outcome.clean_roles.push(role.clone()),
                Err(e) => {
                    warn!(
                        account_id = %role.account_id,
                        role_name = %role.role_name,
                        "Skipping role during conflict detection: {}",
                        e
                    );
                    outcome.rejected += 1;
                }
            }
        }
        info!(
            roles = roles.len(),
            conflicts = outcome.conflicts.len(),
            clean = outcome.clean_roles.len(),
            rejected = outcome.rejected,
            "Conflict detection complete"
        );
        outcome
    }

    /// Conflict for one role, `None` when the role is clean
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed role or a name that cannot
    /// be generated.
    pub fn analyze(&self, role: &DiscoveredRole) -> Result<Option<ProfileConflict>> {
        role.validate()?;
        let proposed = self.proposed_name(role)?;

        let mut seen = HashSet::new();
        let mut conflicting: Vec<Profile> = Vec::new();
        for profile in self.role_matches(role).into_iter().chain(self.name_collision(role, &proposed)) {
            if seen.insert(profile.name.clone()) {
                conflicting.push(profile.clone());
            }
        }

        if conflicting.is_empty() {
            return Ok(None);
        }

        let (conflict_type, basis) = self.classify(role, &proposed, &conflicting);
        if basis == ClassificationBasis::Fallback {
            warn!(
                account_id = %role.account_id,
                role_name = %role.role_name,
                "Conflict matched neither identity nor name, classifying as same-role"
            );
        }
        debug!(
            account_id = %role.account_id,
            role_name = %role.role_name,
            proposed = %proposed,
            conflict_type = %conflict_type,
            existing = conflicting.len(),
            "Conflict detected"
        );

        ProfileConflict::new(role.clone(), conflicting, proposed, conflict_type).map(Some)
    }

    /// Decide the conflict type and the condition that decided it
    ///
    /// Identity matches take priority over name matches.
    #[must_use]
    pub fn classify(
        &self,
        role: &DiscoveredRole,
        proposed_name: &str,
        conflicting: &[Profile],
    ) -> (ConflictType, ClassificationBasis) {
        if conflicting.iter().any(|p| self.resolves_to(p, role)) {
            (ConflictType::SameRole, ClassificationBasis::IdentityMatch)
        } else if conflicting.iter().any(|p| p.name == proposed_name) {
            (ConflictType::SameName, ClassificationBasis::NameMatch)
        } else {
            (ConflictType::SameRole, ClassificationBasis::Fallback)
        }
    }

    fn resolves_to(&self, profile: &Profile, role: &DiscoveredRole) -> bool {
        self.resolved
            .get(&profile.name)
            .is_some_and(|config| config.matches(role))
    }

    /// Existing profiles already pointing at the role's account and role
    fn role_matches(&self, role: &DiscoveredRole) -> Vec<&Profile> {
        let candidates: Vec<&Profile> = match &self.index {
            Some(index) => index.by_account(&role.account_id).collect(),
            None => self.profiles.iter().collect(),
        };
        candidates
            .into_iter()
            .filter(|p| self.resolves_to(p, role))
            .collect()
    }

    /// Existing profile holding the proposed name for a different identity
    fn name_collision(&self, role: &DiscoveredRole, proposed: &str) -> Option<&Profile> {
        let existing = match &self.index {
            Some(index) => index.by_name(proposed),
            None => self.profiles.iter().find(|p| p.name == proposed),
        }?;
        (!self.resolves_to(existing, role)).then_some(existing)
    }
}
