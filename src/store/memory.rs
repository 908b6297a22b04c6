//! # In-Memory Profile Store
//!
//! [`ProfileStore`] backed by ordered maps. Serializes to the JSON snapshot
//! shape accepted by `sso-sync plan --profiles`.

use super::ProfileStore;
use crate::error::{Result, SyncError};
use crate::profile::{GeneratedProfile, Profile, SsoSession};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryProfileStore {
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    sessions: BTreeMap<String, SsoSession>,
}

/// Snapshot layout: lists rather than maps, names live on the entries
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    profiles: Vec<Profile>,
    #[serde(default)]
    sessions: Vec<SsoSession>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.insert_profile(profile);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SsoSession) -> Self {
        self.insert_session(session);
        self
    }

    pub fn insert_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn insert_session(&mut self, session: SsoSession) {
        self.sessions.insert(session.name.clone(), session);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Parse a JSON snapshot (`{"profiles": [...], "sessions": [...]}`)
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed JSON or duplicate names.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| SyncError::validation(format!("invalid profile snapshot: {e}")))?;

        let mut store = Self::new();
        for profile in snapshot.profiles {
            if store.profiles.contains_key(&profile.name) {
                return Err(SyncError::validation("duplicate profile in snapshot")
                    .with_context("profile_name", profile.name.as_str()));
            }
            store.insert_profile(profile);
        }
        for session in snapshot.sessions {
            store.insert_session(session);
        }
        Ok(store)
    }

    /// # Errors
    ///
    /// Returns a filesystem error if the file cannot be read, otherwise see
    /// [`from_json`](Self::from_json).
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SyncError::filesystem("failed to read profile snapshot", e)
                .with_context("path", path.display().to_string())
        })?;
        Self::from_json(&json)
    }

    /// # Errors
    ///
    /// Returns a validation error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = Snapshot {
            profiles: self.profiles.values().cloned().collect(),
            sessions: self.sessions.values().cloned().collect(),
        };
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| SyncError::validation(format!("failed to serialize profiles: {e}")))
    }
}

impl ProfileStore for MemoryProfileStore {
    fn all_profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    fn all_sessions(&self) -> &BTreeMap<String, SsoSession> {
        &self.sessions
    }

    fn append_profiles(&mut self, profiles: &[GeneratedProfile]) -> Result<()> {
        for generated in profiles {
            generated.validate()?;
        }
        for generated in profiles {
            self.insert_profile(generated.to_profile());
        }
        Ok(())
    }

    fn remove_profile(&mut self, name: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.remove(name))
    }
}
