//! # Profile Store
//!
//! Contract between the sync pipeline and whatever owns the profile store
//! (normally the AWS CLI config file).
//!
//! Only [`all_profiles`](ProfileStore::all_profiles),
//! [`all_sessions`](ProfileStore::all_sessions) and the two mutating methods
//! are store specific. SSO resolution, role matching and the lookup index are
//! provided methods built on top of them.

use crate::error::{Result, SyncError};
use crate::profile::{GeneratedProfile, Profile, ResolvedSsoConfig, SsoSession};
use std::collections::{BTreeMap, HashMap};

mod memory;

pub use memory::MemoryProfileStore;

/// Store of named connection profiles
pub trait ProfileStore: Send + Sync {
    /// Every profile, keyed by name
    fn all_profiles(&self) -> &BTreeMap<String, Profile>;

    /// Every SSO session, keyed by name
    fn all_sessions(&self) -> &BTreeMap<String, SsoSession>;

    /// Add generated profiles; a profile with an existing name replaces it
    ///
    /// # Errors
    ///
    /// Store specific; file backed stores surface filesystem errors.
    fn append_profiles(&mut self, profiles: &[GeneratedProfile]) -> Result<()>;

    /// Drop a profile superseded by a replacement
    ///
    /// # Errors
    ///
    /// Store specific; file backed stores surface filesystem errors.
    fn remove_profile(&mut self, name: &str) -> Result<Option<Profile>>;

    fn profile_names(&self) -> Vec<String> {
        self.all_profiles().keys().cloned().collect()
    }

    /// Effective SSO identity of `profile`
    ///
    /// # Errors
    ///
    /// See [`resolve_sso_config`].
    fn resolve_sso_config(&self, profile: &Profile) -> Result<ResolvedSsoConfig> {
        resolve_sso_config(profile, self.all_sessions())
    }

    /// True when `profile` resolves to the given account and role
    ///
    /// An empty `region` matches any profile region.
    fn matches_role(&self, profile: &Profile, account_id: &str, role_name: &str, region: &str) -> bool {
        let Ok(resolved) = self.resolve_sso_config(profile) else {
            return false;
        };
        resolved.account_id == account_id
            && resolved.role_name == role_name
            && (region.is_empty() || profile.region.as_deref() == Some(region))
    }

    /// Index the store by profile name and by account id
    ///
    /// # Errors
    ///
    /// The provided implementation never fails; stores with their own index
    /// may.
    fn build_lookup_index(&self) -> Result<LookupIndex> {
        Ok(LookupIndex::build(self.all_profiles().values(), |profile| {
            self.resolve_sso_config(profile)
                .ok()
                .map(|resolved| resolved.account_id)
                .or_else(|| profile.sso_account_id.clone())
        }))
    }
}

/// Resolve a profile's SSO identity
///
/// Session-reference profiles take start URL and region from the referenced
/// session; legacy profiles carry all four values inline.
///
/// # Errors
///
/// Returns a validation error annotated with the profile name when the
/// profile is not SSO-backed, references an unknown session, or lacks one of
/// the required values.
pub fn resolve_sso_config(
    profile: &Profile,
    sessions: &BTreeMap<String, SsoSession>,
) -> Result<ResolvedSsoConfig> {
    let missing = |field: &str| {
        SyncError::validation(format!("profile is missing {field}"))
            .with_context("profile_name", profile.name.as_str())
    };
    let non_empty = |value: &Option<String>| value.as_ref().filter(|v| !v.is_empty()).cloned();

    if !profile.is_sso_backed() {
        return Err(SyncError::validation("profile is not SSO-backed")
            .with_context("profile_name", profile.name.as_str()));
    }

    let account_id = non_empty(&profile.sso_account_id).ok_or_else(|| missing("sso_account_id"))?;
    let role_name = non_empty(&profile.sso_role_name).ok_or_else(|| missing("sso_role_name"))?;

    let (start_url, region) = match &profile.sso_session {
        Some(session_name) => {
            let session = sessions.get(session_name).ok_or_else(|| {
                SyncError::validation("profile references an unknown sso-session")
                    .with_context("profile_name", profile.name.as_str())
                    .with_context("sso_session", session_name.as_str())
            })?;
            (session.start_url.clone(), session.region.clone())
        }
        None => (
            non_empty(&profile.sso_start_url).ok_or_else(|| missing("sso_start_url"))?,
            non_empty(&profile.sso_region).ok_or_else(|| missing("sso_region"))?,
        ),
    };

    Ok(ResolvedSsoConfig {
        account_id,
        role_name,
        start_url,
        region,
    })
}

/// O(1) lookup of existing profiles by name and by account id
#[derive(Debug, Clone, Default)]
pub struct LookupIndex {
    by_name: HashMap<String, Profile>,
    by_account: HashMap<String, Vec<String>>,
}

impl LookupIndex {
    /// Build an index; `account_of` yields the account a profile points at
    pub fn build<'a, I, F>(profiles: I, mut account_of: F) -> Self
    where
        I: IntoIterator<Item = &'a Profile>,
        F: FnMut(&Profile) -> Option<String>,
    {
        let mut index = Self::default();
        for profile in profiles {
            if let Some(account_id) = account_of(profile) {
                index
                    .by_account
                    .entry(account_id)
                    .or_default()
                    .push(profile.name.clone());
            }
            index.by_name.insert(profile.name.clone(), profile.clone());
        }
        index
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Profile> {
        self.by_name.get(name)
    }

    /// Profiles pointing at `account_id`, in store order
    pub fn by_account<'a>(&'a self, account_id: &str) -> impl Iterator<Item = &'a Profile> + 'a {
        self.by_account
            .get(account_id)
            .into_iter()
            .flatten()
            .filter_map(|name| self.by_name.get(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions() -> BTreeMap<String, SsoSession> {
        let mut sessions = BTreeMap::new();
        sessions.insert(
            "corp".to_string(),
            SsoSession {
                name: "corp".to_string(),
                start_url: "https://corp.awsapps.com/start".to_string(),
                region: "eu-west-1".to_string(),
                registration_scopes: None,
            },
        );
        sessions
    }

    fn legacy(name: &str) -> Profile {
        Profile {
            sso_start_url: Some("https://legacy.awsapps.com/start".to_string()),
            sso_region: Some("us-east-1".to_string()),
            sso_account_id: Some("123456789012".to_string()),
            sso_role_name: Some("Admin".to_string()),
            ..Profile::new(name)
        }
    }

    #[test]
    fn test_resolve_legacy_profile() {
        let resolved = resolve_sso_config(&legacy("dev"), &sessions()).unwrap();
        assert_eq!(resolved.start_url, "https://legacy.awsapps.com/start");
        assert_eq!(resolved.region, "us-east-1");
        assert_eq!(resolved.account_id, "123456789012");
        assert_eq!(resolved.role_name, "Admin");
    }

    #[test]
    fn test_resolve_session_profile() {
        let profile = Profile {
            sso_session: Some("corp".to_string()),
            sso_account_id: Some("210987654321".to_string()),
            sso_role_name: Some("ReadOnly".to_string()),
            ..Profile::new("corp-ro")
        };
        let resolved = resolve_sso_config(&profile, &sessions()).unwrap();
        assert_eq!(resolved.start_url, "https://corp.awsapps.com/start");
        assert_eq!(resolved.region, "eu-west-1");
    }

    #[test]
    fn test_resolve_unknown_session_fails() {
        let profile = Profile {
            sso_session: Some("missing".to_string()),
            sso_account_id: Some("210987654321".to_string()),
            sso_role_name: Some("ReadOnly".to_string()),
            ..Profile::new("broken")
        };
        let err = resolve_sso_config(&profile, &sessions()).unwrap_err();
        assert_eq!(err.context().get("profile_name"), Some("broken"));
        assert_eq!(err.context().get("sso_session"), Some("missing"));
    }

    #[test]
    fn test_resolve_non_sso_profile_fails() {
        let profile = Profile {
            region: Some("us-east-1".to_string()),
            ..Profile::new("static-keys")
        };
        assert!(resolve_sso_config(&profile, &sessions()).is_err());
    }

    #[test]
    fn test_resolve_incomplete_legacy_profile_fails() {
        let mut profile = legacy("partial");
        profile.sso_region = None;
        let err = resolve_sso_config(&profile, &sessions()).unwrap_err();
        assert!(err.message().contains("sso_region"));
    }

    #[test]
    fn test_lookup_index() {
        let a = legacy("a");
        let mut b = legacy("b");
        b.sso_account_id = Some("999999999999".to_string());
        let index = LookupIndex::build([&a, &b], |p| p.sso_account_id.clone());

        assert_eq!(index.len(), 2);
        assert_eq!(index.by_name("b").map(|p| p.name.as_str()), Some("b"));
        let names: Vec<_> = index.by_account("123456789012").map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(index.by_account("000000000000").count(), 0);
    }

    fn store() -> MemoryProfileStore {
        let mut store = MemoryProfileStore::new();
        for session in sessions().into_values() {
            store = store.with_session(session);
        }
        store
    }

    #[test]
    fn test_matches_role_legacy_profile() {
        let profile = Profile {
            region: Some("eu-west-1".to_string()),
            ..legacy("dev")
        };
        let store = store().with_profile(profile.clone());
        assert!(store.matches_role(&profile, "123456789012", "Admin", ""));
        assert!(!store.matches_role(&profile, "123456789012", "ReadOnly", ""));
        assert!(!store.matches_role(&profile, "210987654321", "Admin", ""));
    }

    #[test]
    fn test_matches_role_session_profile() {
        let profile = Profile {
            sso_session: Some("corp".to_string()),
            sso_account_id: Some("123456789012".to_string()),
            sso_role_name: Some("Admin".to_string()),
            ..Profile::new("corp-admin")
        };
        let store = store().with_profile(profile.clone());
        assert!(store.matches_role(&profile, "123456789012", "Admin", ""));

        let dangling = Profile {
            sso_session: Some("missing".to_string()),
            ..profile
        };
        assert!(!store.matches_role(&dangling, "123456789012", "Admin", ""));
    }

    #[test]
    fn test_matches_role_region_filter() {
        let profile = Profile {
            region: Some("eu-west-1".to_string()),
            ..legacy("dev")
        };
        let store = store();
        assert!(store.matches_role(&profile, "123456789012", "Admin", "eu-west-1"));
        assert!(!store.matches_role(&profile, "123456789012", "Admin", "us-west-2"));

        let no_region = legacy("dev");
        assert!(store.matches_role(&no_region, "123456789012", "Admin", ""));
        assert!(!store.matches_role(&no_region, "123456789012", "Admin", "eu-west-1"));
    }

    #[test]
    fn test_matches_role_ignores_non_sso_profile() {
        let profile = Profile {
            region: Some("eu-west-1".to_string()),
            ..Profile::new("static-keys")
        };
        assert!(!store().matches_role(&profile, "123456789012", "Admin", ""));
    }
}
