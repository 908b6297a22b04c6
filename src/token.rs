//! # SSO Token Cache
//!
//! Loads the access token that `aws sso login` leaves in the CLI cache
//! directory. Acquiring a token (the browser OIDC flow) is out of scope; a
//! missing or expired token is reported as an authentication error with a
//! re-login hint.

use crate::constants::{SSO_CACHE_DIR, TOKEN_EXPIRY_WARNING_SECS};
use crate::error::{Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// A cached SSO access token
#[derive(Clone)]
pub struct CachedToken {
    pub access_token: Zeroizing<String>,
    pub expires_at: DateTime<Utc>,
    pub start_url: String,
    pub region: String,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("start_url", &self.start_url)
            .field("region", &self.region)
            .finish()
    }
}

impl CachedToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Still valid but inside the warning window
    #[must_use]
    pub fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.expires_at - now <= Duration::seconds(TOKEN_EXPIRY_WARNING_SECS)
    }
}

/// Source of SSO access tokens
pub trait TokenCache: Send + Sync {
    /// # Errors
    ///
    /// Returns an authentication error if no valid token exists for the start
    /// URL and region.
    fn load_token(&self, start_url: &str, region: &str) -> Result<CachedToken>;
}

/// Cache file layout written by the AWS CLI
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    access_token: Option<String>,
    expires_at: Option<String>,
    start_url: Option<String>,
    region: Option<String>,
}

/// Reads `~/.aws/sso/cache/*.json`
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    cache_dir: PathBuf,
}

impl FileTokenCache {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Cache under the current user's home directory
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the home directory is unknown.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SyncError::authentication("cannot locate home directory for the SSO token cache"))?;
        Ok(Self::new(home.join(SSO_CACHE_DIR)))
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// File name the AWS CLI uses for a start URL (or session name)
    #[must_use]
    pub fn cache_key(key: &str) -> String {
        let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, key.as_bytes());
        format!("{}.json", hex::encode(digest.as_ref()))
    }

    fn candidates(&self, start_url: &str) -> Vec<PathBuf> {
        let primary = self.cache_dir.join(Self::cache_key(start_url));
        let mut candidates = vec![primary.clone()];
        // sso-session logins key the file by session name, so scan the rest
        if let Ok(entries) = std::fs::read_dir(&self.cache_dir) {
            let mut others: Vec<PathBuf> = entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json") && *p != primary)
                .collect();
            others.sort();
            candidates.extend(others);
        }
        candidates
    }

    fn read_entry(path: &Path) -> Option<CacheFile> {
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), "Skipping unreadable token cache file: {}", e);
                None
            }
        }
    }
}

impl TokenCache for FileTokenCache {
    fn load_token(&self, start_url: &str, region: &str) -> Result<CachedToken> {
        let auth_error = |message: &str| {
            SyncError::authentication(message.to_string())
                .with_context("start_url", start_url)
                .with_context("sso_region", region)
        };

        let now = Utc::now();
        let mut found_expired = false;
        for path in self.candidates(start_url) {
            let Some(entry) = Self::read_entry(&path) else {
                continue;
            };
            if entry.start_url.as_deref().is_some_and(|url| url != start_url) {
                continue;
            }
            let (Some(access_token), Some(expires_at)) = (entry.access_token, entry.expires_at) else {
                continue;
            };
            let expires_at = match DateTime::parse_from_rfc3339(&expires_at) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!(path = %path.display(), "Token cache entry has an invalid expiresAt: {}", e);
                    continue;
                }
            };

            let token = CachedToken {
                access_token: Zeroizing::new(access_token),
                expires_at,
                start_url: start_url.to_string(),
                region: entry.region.unwrap_or_else(|| region.to_string()),
            };
            if token.is_expired(now) {
                found_expired = true;
                continue;
            }
            if token.expires_soon(now) {
                warn!(
                    start_url,
                    expires_at = %token.expires_at,
                    "SSO token expires in less than {} minutes",
                    TOKEN_EXPIRY_WARNING_SECS / 60
                );
            }
            debug!(path = %path.display(), "Loaded SSO token from cache");
            return Ok(token);
        }

        if found_expired {
            Err(auth_error("cached SSO token has expired"))
        } else {
            Err(auth_error("no cached SSO token found"))
        }
    }
}
