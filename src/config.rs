//! # Sync Configuration
//!
//! Settings loaded from environment variables. Every field has a default
//! except the SSO start URL; the CLI overrides individual fields with flags.

use crate::backoff::ExponentialBackoff;
use crate::conflict::ResolutionStrategy;
use crate::constants::*;
use crate::error::{Result, SyncError};
use crate::naming::NamingPattern;
use crate::profile::ProfileTemplate;
use std::str::FromStr;
use std::time::Duration;

/// Where `{account_alias}` values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasSource {
    /// Account name shown in the SSO portal
    #[default]
    AccountName,
    /// IAM account alias, read with short-lived role credentials
    Iam,
}

impl FromStr for AliasSource {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "account-name" | "account_name" | "name" => Ok(AliasSource::AccountName),
            "iam" => Ok(AliasSource::Iam),
            other => Err(SyncError::validation(format!(
                "unknown alias source '{other}' (expected account-name or iam)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// SSO portal start URL
    pub sso_start_url: String,
    /// Region hosting the SSO portal
    pub sso_region: String,
    /// Optional `sso_session` name generated profiles reference
    pub sso_session: Option<String>,
    /// Profile naming pattern
    pub naming_pattern: String,
    /// Default region written to generated profiles; empty means the SSO region
    pub profile_region: String,
    /// Output format written to generated profiles
    pub profile_output: Option<String>,
    pub conflict_strategy: ResolutionStrategy,
    pub alias_source: AliasSource,
    /// Discovery attempts, first try included
    pub discovery_max_attempts: u32,
    pub page_size: i32,
    /// Per-call timeout (seconds), 0 disables it
    pub request_timeout_secs: u64,
    pub backoff_start_ms: u64,
    pub backoff_max_ms: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sso_start_url: String::new(),
            sso_region: "us-east-1".to_string(),
            sso_session: None,
            naming_pattern: DEFAULT_NAMING_PATTERN.to_string(),
            profile_region: String::new(),
            profile_output: None,
            conflict_strategy: ResolutionStrategy::default(),
            alias_source: AliasSource::default(),
            discovery_max_attempts: DEFAULT_DISCOVERY_MAX_ATTEMPTS,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown conflict strategy or alias
    /// source. Numeric values that fail to parse fall back to their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();
        Ok(Self {
            sso_start_url: env.string("SSO_START_URL", &defaults.sso_start_url),
            sso_region: env.string("SSO_REGION", &defaults.sso_region),
            sso_session: env.optional("SSO_SESSION_NAME"),
            naming_pattern: env.string("PROFILE_NAME_PATTERN", &defaults.naming_pattern),
            profile_region: env.string("PROFILE_REGION", &defaults.profile_region),
            profile_output: env.optional("PROFILE_OUTPUT"),
            conflict_strategy: env
                .optional("CONFLICT_STRATEGY")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(defaults.conflict_strategy),
            alias_source: env
                .optional("ALIAS_SOURCE")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(defaults.alias_source),
            discovery_max_attempts: env.parsed("DISCOVERY_MAX_ATTEMPTS", defaults.discovery_max_attempts),
            page_size: env.parsed("DISCOVERY_PAGE_SIZE", defaults.page_size),
            request_timeout_secs: env.parsed("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            backoff_start_ms: env.parsed("BACKOFF_START_MS", defaults.backoff_start_ms),
            backoff_max_ms: env.parsed("BACKOFF_MAX_MS", defaults.backoff_max_ms),
            log_level: env.string("LOG_LEVEL", &defaults.log_level),
            log_format: env.string("LOG_FORMAT", &defaults.log_format),
        })
    }

    /// # Errors
    ///
    /// Returns a validation error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.sso_start_url.trim().is_empty() {
            return Err(SyncError::validation("SSO start URL is required (SSO_START_URL)"));
        }
        if self.sso_region.trim().is_empty() {
            return Err(SyncError::validation("SSO region is required (SSO_REGION)"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(SyncError::validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            ))
            .with_context("page_size", self.page_size.to_string()));
        }
        if self.discovery_max_attempts == 0 {
            return Err(SyncError::validation("discovery attempts must be at least 1"));
        }
        if self.backoff_start_ms > self.backoff_max_ms {
            return Err(SyncError::validation("backoff start cannot exceed backoff max")
                .with_context("backoff_start_ms", self.backoff_start_ms.to_string())
                .with_context("backoff_max_ms", self.backoff_max_ms.to_string()));
        }
        self.pattern()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a validation error if the naming pattern does not compile.
    pub fn pattern(&self) -> Result<NamingPattern> {
        NamingPattern::compile(&self.naming_pattern)
    }

    /// Profile defaults applied to every generated profile
    #[must_use]
    pub fn template(&self) -> ProfileTemplate {
        let region = if self.profile_region.trim().is_empty() {
            self.sso_region.clone()
        } else {
            self.profile_region.clone()
        };
        ProfileTemplate {
            region,
            output: self.profile_output.clone(),
            sso_start_url: self.sso_start_url.clone(),
            sso_region: self.sso_region.clone(),
            sso_session: self.sso_session.clone(),
        }
    }

    /// Get per-call timeout, `None` when disabled
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.backoff_start_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

/// Typed reads over a variable lookup
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Read variable or return default value
    fn parsed<T: FromStr>(&self, key: &str, default: T) -> T {
        (self.0)(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Read variable as string or return default
    fn string(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    /// Read variable, treating empty values as unset
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SyncConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SyncConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.naming_pattern, "{account_alias}-{role_name}");
        assert_eq!(config.conflict_strategy, ResolutionStrategy::Skip);
        assert_eq!(config.discovery_max_attempts, 3);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_err(), "start URL is required");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SSO_START_URL", "https://corp.awsapps.com/start"),
            ("SSO_REGION", "eu-west-1"),
            ("CONFLICT_STRATEGY", "Replace"),
            ("ALIAS_SOURCE", "iam"),
            ("DISCOVERY_PAGE_SIZE", "50"),
            ("REQUEST_TIMEOUT_SECS", "0"),
        ])
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.conflict_strategy, ResolutionStrategy::Replace);
        assert_eq!(config.alias_source, AliasSource::Iam);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.template().region, "eu-west-1");
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = load(&[("DISCOVERY_MAX_ATTEMPTS", "many")]).unwrap();
        assert_eq!(config.discovery_max_attempts, 3);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(load(&[("CONFLICT_STRATEGY", "merge")]).is_err());
    }

    #[test]
    fn test_validation_bounds() {
        let base = SyncConfig {
            sso_start_url: "https://corp.awsapps.com/start".to_string(),
            ..SyncConfig::default()
        };
        base.validate().unwrap();

        for page_size in [0, 1001] {
            let config = SyncConfig { page_size, ..base.clone() };
            assert!(config.validate().is_err());
        }
        let config = SyncConfig { discovery_max_attempts: 0, ..base.clone() };
        assert!(config.validate().is_err());
        let config = SyncConfig { naming_pattern: "{nope}".to_string(), ..base.clone() };
        assert!(config.validate().is_err());
        let config = SyncConfig { sso_region: " ".to_string(), ..base };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_prefers_profile_region() {
        let config = SyncConfig {
            sso_start_url: "https://corp.awsapps.com/start".to_string(),
            profile_region: "ap-southeast-2".to_string(),
            ..SyncConfig::default()
        };
        let template = config.template();
        assert_eq!(template.region, "ap-southeast-2");
        assert_eq!(template.sso_region, "us-east-1");
    }
}
