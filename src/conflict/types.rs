//! # Conflict Types
//!
//! Conflicts between discovered roles and existing profiles, the actions
//! taken on them and the auditable result of a resolution run.

use crate::error::{Result, SyncError};
use crate::profile::{DiscoveredRole, GeneratedProfile, Profile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a discovered role conflicts with the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    /// An existing profile already resolves to the same account and role
    SameRole,
    /// The proposed name is taken by a profile for a different account/role
    SameName,
}

impl ConflictType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::SameRole => "same-role",
            ConflictType::SameName => "same-name",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered role that collides with one or more existing profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConflict {
    pub discovered_role: DiscoveredRole,
    pub existing_profiles: Vec<Profile>,
    pub proposed_name: String,
    pub conflict_type: ConflictType,
}

impl ProfileConflict {
    /// # Errors
    ///
    /// Returns a validation error if there is no existing profile or the
    /// proposed name is empty.
    pub fn new(
        discovered_role: DiscoveredRole,
        existing_profiles: Vec<Profile>,
        proposed_name: impl Into<String>,
        conflict_type: ConflictType,
    ) -> Result<Self> {
        let conflict = Self {
            discovered_role,
            existing_profiles,
            proposed_name: proposed_name.into(),
            conflict_type,
        };
        conflict.validate()?;
        Ok(conflict)
    }

    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn validate(&self) -> Result<()> {
        let annotate = |e: SyncError| {
            e.with_context("account_id", self.discovered_role.account_id.as_str())
                .with_context("role_name", self.discovered_role.role_name.as_str())
        };
        if self.existing_profiles.is_empty() {
            return Err(annotate(SyncError::validation(
                "conflict must reference at least one existing profile",
            )));
        }
        if self.proposed_name.trim().is_empty() {
            return Err(annotate(SyncError::validation(
                "conflict proposed name cannot be empty",
            )));
        }
        Ok(())
    }

    /// The existing profile actions refer to
    #[must_use]
    pub fn primary_profile(&self) -> Option<&Profile> {
        self.existing_profiles.first()
    }
}

/// How conflicts are settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    /// Generate a profile for the role, superseding the existing one(s)
    Replace,
    /// Leave the existing profile(s) untouched
    #[default]
    Skip,
    /// Ask an operator per conflict
    Prompt,
}

impl ResolutionStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::Replace => "replace",
            ResolutionStrategy::Skip => "skip",
            ResolutionStrategy::Prompt => "prompt",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(ResolutionStrategy::Replace),
            "skip" => Ok(ResolutionStrategy::Skip),
            "prompt" => Ok(ResolutionStrategy::Prompt),
            other => Err(SyncError::validation(format!(
                "unknown conflict strategy '{other}' (expected replace, skip or prompt)"
            ))),
        }
    }
}

/// What happened to one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Replace,
    Skip,
    Create,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionType::Replace => "replace",
            ActionType::Skip => "skip",
            ActionType::Create => "create",
        })
    }
}

/// One entry of the audit trail
///
/// Create actions come from roles without a conflict and carry no
/// `conflict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictAction {
    pub conflict: Option<ProfileConflict>,
    pub role: DiscoveredRole,
    pub action: ActionType,
    pub new_name: Option<String>,
    pub old_name: Option<String>,
}

impl ConflictAction {
    #[must_use]
    pub fn replace(conflict: &ProfileConflict, old_name: &str, new_name: &str) -> Self {
        Self {
            conflict: Some(conflict.clone()),
            role: conflict.discovered_role.clone(),
            action: ActionType::Replace,
            new_name: Some(new_name.to_string()),
            old_name: Some(old_name.to_string()),
        }
    }

    #[must_use]
    pub fn skip(conflict: &ProfileConflict, old_name: &str) -> Self {
        Self {
            conflict: Some(conflict.clone()),
            role: conflict.discovered_role.clone(),
            action: ActionType::Skip,
            new_name: None,
            old_name: Some(old_name.to_string()),
        }
    }

    #[must_use]
    pub fn create(role: &DiscoveredRole, new_name: &str) -> Self {
        Self {
            conflict: None,
            role: role.clone(),
            action: ActionType::Create,
            new_name: Some(new_name.to_string()),
            old_name: None,
        }
    }

    /// Replace needs both names, Skip the old name, Create the new name
    ///
    /// # Errors
    ///
    /// Returns a conflict resolution error naming the missing field.
    pub fn validate(&self) -> Result<()> {
        let present = |name: &Option<String>| name.as_ref().is_some_and(|n| !n.is_empty());
        let missing = match self.action {
            ActionType::Replace if !present(&self.old_name) => Some("old name"),
            ActionType::Replace | ActionType::Create if !present(&self.new_name) => Some("new name"),
            ActionType::Skip if !present(&self.old_name) => Some("old name"),
            _ => None,
        };
        match missing {
            Some(field) => Err(SyncError::conflict_resolution(format!(
                "{} action requires {field}",
                self.action
            ))
            .with_context("account_id", self.role.account_id.as_str())
            .with_context("role_name", self.role.role_name.as_str())),
            None => Ok(()),
        }
    }
}

/// An existing profile superseded by a generated one, kept for backups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReplacement {
    pub old_profile: Profile,
    pub new_profile: GeneratedProfile,
}

/// Outcome of a resolution run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResolutionResult {
    pub generated_profiles: Vec<GeneratedProfile>,
    pub skipped_roles: Vec<DiscoveredRole>,
    /// Audit trail, in processing order
    pub actions: Vec<ConflictAction>,
    pub replacements: Vec<ProfileReplacement>,
}

impl ConflictResolutionResult {
    #[must_use]
    pub fn count(&self, action: ActionType) -> usize {
        self.actions.iter().filter(|a| a.action == action).count()
    }

    /// Append another result, keeping action order
    pub fn merge(&mut self, other: ConflictResolutionResult) {
        self.generated_profiles.extend(other.generated_profiles);
        self.skipped_roles.extend(other.skipped_roles);
        self.actions.extend(other.actions);
        self.replacements.extend(other.replacements);
    }
}
