//! Common test utilities
//!
//! In-memory fakes for the SSO portal, token cache and alias lookup, plus
//! profile builders shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sso_profile_sync::backoff::ExponentialBackoff;
use sso_profile_sync::discovery::{
    AccountAliasLookup, AccountPage, AccountSummary, RoleCredentials, RoleDiscovery, RolePage, SsoPortal,
};
use sso_profile_sync::error::{Result, SyncError};
use sso_profile_sync::profile::{Profile, ProfileTemplate, SsoSession};
use sso_profile_sync::token::{CachedToken, TokenCache};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const START_URL: &str = "https://corp.awsapps.com/start";
pub const SSO_REGION: &str = "us-east-1";

/// Portal serving fixed accounts and roles in small pages
#[derive(Default)]
pub struct FakePortal {
    pub accounts: Vec<AccountSummary>,
    pub roles: HashMap<String, Vec<String>>,
    pub page_size: usize,
    /// Errors returned by the next `list_accounts` calls, in order
    pub account_failures: Mutex<VecDeque<SyncError>>,
    /// Account whose role listing always fails
    pub failing_account: Option<String>,
    pub list_accounts_calls: AtomicUsize,
    /// When each `list_accounts` call happened (tokio clock)
    pub list_accounts_at: Mutex<Vec<tokio::time::Instant>>,
    pub list_roles_calls: AtomicUsize,
}

impl FakePortal {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    pub fn with_account(mut self, account_id: &str, account_name: &str, roles: &[&str]) -> Self {
        self.accounts.push(AccountSummary {
            account_id: account_id.to_string(),
            account_name: account_name.to_string(),
            email_address: None,
        });
        self.roles
            .insert(account_id.to_string(), roles.iter().map(|r| (*r).to_string()).collect());
        self
    }

    pub fn fail_next_list_accounts(self, err: SyncError) -> Self {
        self.account_failures
            .lock()
            .unwrap()
            .push_back(err);
        self
    }

    pub fn fail_roles_for(mut self, account_id: &str) -> Self {
        self.failing_account = Some(account_id.to_string());
        self
    }

    fn page<T: Clone>(items: &[T], next_token: Option<String>, page_size: usize) -> (Vec<T>, Option<String>) {
        let start: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + page_size).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());
        (items[start..end].to_vec(), next)
    }
}

#[async_trait]
impl SsoPortal for FakePortal {
    async fn list_accounts(&self, _access_token: &str, next_token: Option<String>) -> Result<AccountPage> {
        self.list_accounts_calls.fetch_add(1, Ordering::SeqCst);
        self.list_accounts_at.lock().unwrap().push(tokio::time::Instant::now());
        if let Some(err) = self.account_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let (accounts, next_token) = Self::page(&self.accounts, next_token, self.page_size);
        Ok(AccountPage { accounts, next_token })
    }

    async fn list_account_roles(
        &self,
        _access_token: &str,
        account_id: &str,
        next_token: Option<String>,
    ) -> Result<RolePage> {
        self.list_roles_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_account.as_deref() == Some(account_id) {
            return Err(SyncError::api("AccessDeniedException: not assigned")
                .with_context("account_id", account_id));
        }
        let roles = self.roles.get(account_id).cloned().unwrap_or_default();
        let (role_names, next_token) = Self::page(&roles, next_token, self.page_size);
        Ok(RolePage { role_names, next_token })
    }

    async fn get_role_credentials(
        &self,
        _access_token: &str,
        account_id: &str,
        _role_name: &str,
    ) -> Result<RoleCredentials> {
        Err(SyncError::api("GetRoleCredentials is not supported by the fake portal")
            .with_context("account_id", account_id))
    }
}

/// Token cache holding one token, or none
pub struct StaticTokens {
    pub token: Option<CachedToken>,
}

impl StaticTokens {
    pub fn valid() -> Self {
        Self {
            token: Some(CachedToken {
                access_token: "test-access-token".to_string().into(),
                expires_at: Utc::now() + Duration::hours(8),
                start_url: START_URL.to_string(),
                region: SSO_REGION.to_string(),
            }),
        }
    }

    pub fn missing() -> Self {
        Self { token: None }
    }
}

impl TokenCache for StaticTokens {
    fn load_token(&self, start_url: &str, region: &str) -> Result<CachedToken> {
        self.token
            .clone()
            .filter(|t| t.start_url == start_url)
            .ok_or_else(|| {
                SyncError::authentication("no cached SSO token found")
                    .with_context("start_url", start_url)
                    .with_context("sso_region", region)
            })
    }
}

/// Alias lookup answering from a map; unknown accounts fail
#[derive(Default)]
pub struct MapAliases {
    pub aliases: HashMap<String, Option<String>>,
    pub calls: AtomicUsize,
}

impl MapAliases {
    pub fn with(mut self, account_id: &str, alias: Option<&str>) -> Self {
        self.aliases.insert(account_id.to_string(), alias.map(str::to_string));
        self
    }
}

#[async_trait]
impl AccountAliasLookup for MapAliases {
    async fn lookup_alias(
        &self,
        _access_token: &str,
        account: &AccountSummary,
        _role_names: &[String],
    ) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.aliases
            .get(&account.account_id)
            .cloned()
            .ok_or_else(|| SyncError::api("NoSuchEntity: alias lookup failed"))
    }
}

/// Discovery over fakes with millisecond backoff
pub fn discovery(portal: Arc<FakePortal>, tokens: StaticTokens, aliases: Arc<MapAliases>) -> RoleDiscovery {
    RoleDiscovery::new(portal, Arc::new(tokens), aliases).with_backoff(ExponentialBackoff::new(
        std::time::Duration::from_millis(1),
        std::time::Duration::from_millis(5),
    ))
}

pub fn template() -> ProfileTemplate {
    ProfileTemplate {
        region: "eu-west-1".to_string(),
        output: Some("json".to_string()),
        sso_start_url: START_URL.to_string(),
        sso_region: SSO_REGION.to_string(),
        sso_session: None,
    }
}

/// Legacy profile carrying the SSO settings inline
pub fn legacy_profile(name: &str, account_id: &str, role_name: &str) -> Profile {
    Profile {
        region: Some("eu-west-1".to_string()),
        sso_start_url: Some(START_URL.to_string()),
        sso_region: Some(SSO_REGION.to_string()),
        sso_account_id: Some(account_id.to_string()),
        sso_role_name: Some(role_name.to_string()),
        ..Profile::new(name)
    }
}

/// Profile referencing an `sso_session`
pub fn session_profile(name: &str, session: &str, account_id: &str, role_name: &str) -> Profile {
    Profile {
        region: Some("eu-west-1".to_string()),
        sso_session: Some(session.to_string()),
        sso_account_id: Some(account_id.to_string()),
        sso_role_name: Some(role_name.to_string()),
        ..Profile::new(name)
    }
}

pub fn session(name: &str) -> SsoSession {
    SsoSession {
        name: name.to_string(),
        start_url: START_URL.to_string(),
        region: SSO_REGION.to_string(),
        registration_scopes: None,
    }
}
