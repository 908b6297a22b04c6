//! # Profile Types
//!
//! Data model shared by discovery, conflict detection and resolution:
//! discovered roles, existing profiles and SSO sessions, resolved SSO
//! identities and the profiles generated for the profile store.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Check the 12-digit AWS account id format
#[must_use]
pub fn is_valid_account_id(account_id: &str) -> bool {
    account_id.len() == 12 && account_id.bytes().all(|b| b.is_ascii_digit())
}

/// Validate an account id, annotating the error with the offending value
///
/// # Errors
///
/// Returns a validation error if `account_id` is not exactly 12 ASCII digits.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if is_valid_account_id(account_id) {
        Ok(())
    } else {
        Err(SyncError::validation("account id must be exactly 12 digits")
            .with_context("account_id", account_id))
    }
}

/// An account/role pair reachable through the SSO portal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredRole {
    pub account_id: String,
    pub account_name: String,
    /// Display alias; falls back to the account id
    pub account_alias: String,
    /// Permission set name as exposed by the portal
    pub role_name: String,
}

impl DiscoveredRole {
    /// Build a validated role
    ///
    /// An empty alias defaults to the account id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed account id or an empty
    /// role name.
    pub fn new(
        account_id: impl Into<String>,
        account_name: impl Into<String>,
        account_alias: impl Into<String>,
        role_name: impl Into<String>,
    ) -> Result<Self> {
        let account_id = account_id.into();
        let mut account_alias = account_alias.into();
        if account_alias.is_empty() {
            account_alias.clone_from(&account_id);
        }
        let role = Self {
            account_id,
            account_name: account_name.into(),
            account_alias,
            role_name: role_name.into(),
        };
        role.validate()?;
        Ok(role)
    }

    /// # Errors
    ///
    /// Returns a validation error for a malformed account id or an empty
    /// role name.
    pub fn validate(&self) -> Result<()> {
        validate_account_id(&self.account_id)
            .map_err(|e| e.with_context("role_name", self.role_name.as_str()))?;
        if self.role_name.trim().is_empty() {
            return Err(SyncError::validation("role name cannot be empty")
                .with_context("account_id", self.account_id.as_str()));
        }
        Ok(())
    }

    /// Display alias, or the account id when none was resolved
    #[must_use]
    pub fn alias(&self) -> &str {
        if self.account_alias.is_empty() {
            &self.account_id
        } else {
            &self.account_alias
        }
    }
}

impl fmt::Display for DiscoveredRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.alias(), self.role_name, self.account_id)
    }
}

/// A named SSO session shared by several profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoSession {
    pub name: String,
    pub start_url: String,
    pub region: String,
    #[serde(default)]
    pub registration_scopes: Option<String>,
}

/// An existing entry of the profile store
///
/// A profile is SSO-backed when it carries the inline `sso_*` fields or a
/// reference to an [`SsoSession`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub sso_start_url: Option<String>,
    #[serde(default)]
    pub sso_region: Option<String>,
    #[serde(default)]
    pub sso_account_id: Option<String>,
    #[serde(default)]
    pub sso_role_name: Option<String>,
    #[serde(default)]
    pub sso_session: Option<String>,
    /// Keys this crate does not interpret, preserved for the store writer
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_sso_backed(&self) -> bool {
        self.sso_session.is_some()
            || self.sso_start_url.is_some()
            || self.sso_account_id.is_some()
            || self.sso_role_name.is_some()
    }
}

/// Effective SSO identity of a profile, with session indirection resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSsoConfig {
    pub account_id: String,
    pub role_name: String,
    pub start_url: String,
    pub region: String,
}

impl ResolvedSsoConfig {
    /// True when this identity points at `role`
    #[must_use]
    pub fn matches(&self, role: &DiscoveredRole) -> bool {
        self.account_id == role.account_id && self.role_name == role.role_name
    }
}

/// Values copied into every generated profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTemplate {
    /// Default region of the generated profile (fills `{region}`)
    pub region: String,
    #[serde(default)]
    pub output: Option<String>,
    pub sso_start_url: String,
    pub sso_region: String,
    /// When set, generated profiles reference this session instead of
    /// carrying inline start URL/region
    #[serde(default)]
    pub sso_session: Option<String>,
}

/// A profile produced by a sync run, ready for the profile store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProfile {
    pub name: String,
    pub account_id: String,
    pub account_name: String,
    pub account_alias: String,
    pub role_name: String,
    pub region: String,
    #[serde(default)]
    pub output: Option<String>,
    pub sso_start_url: String,
    pub sso_region: String,
    #[serde(default)]
    pub sso_session: Option<String>,
}

impl GeneratedProfile {
    #[must_use]
    pub fn from_role(name: impl Into<String>, role: &DiscoveredRole, template: &ProfileTemplate) -> Self {
        Self {
            name: name.into(),
            account_id: role.account_id.clone(),
            account_name: role.account_name.clone(),
            account_alias: role.alias().to_string(),
            role_name: role.role_name.clone(),
            region: template.region.clone(),
            output: template.output.clone(),
            sso_start_url: template.sso_start_url.clone(),
            sso_region: template.sso_region.clone(),
            sso_session: template.sso_session.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns a validation error annotated with the profile name when a
    /// required field is empty or the account id is malformed.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(SyncError::validation(message.to_string())
                .with_context("profile_name", self.name.as_str()))
        };
        if self.name.trim().is_empty() {
            return fail("profile name cannot be empty");
        }
        if !is_valid_account_id(&self.account_id) {
            return fail("account id must be exactly 12 digits");
        }
        if self.role_name.trim().is_empty() {
            return fail("role name cannot be empty");
        }
        if self.region.trim().is_empty() {
            return fail("region cannot be empty");
        }
        if self.sso_session.is_none()
            && (self.sso_start_url.trim().is_empty() || self.sso_region.trim().is_empty())
        {
            return fail("profile needs an sso session or an sso start url and region");
        }
        Ok(())
    }

    /// Shape of the `[profile name]` section handed to the store writer
    #[must_use]
    pub fn to_profile(&self) -> Profile {
        let (sso_start_url, sso_region) = if self.sso_session.is_some() {
            (None, None)
        } else {
            (
                Some(self.sso_start_url.clone()),
                Some(self.sso_region.clone()),
            )
        };
        Profile {
            name: self.name.clone(),
            region: Some(self.region.clone()),
            output: self.output.clone(),
            sso_start_url,
            sso_region,
            sso_account_id: Some(self.account_id.clone()),
            sso_role_name: Some(self.role_name.clone()),
            sso_session: self.sso_session.clone(),
            extra: BTreeMap::new(),
        }
    }
}
