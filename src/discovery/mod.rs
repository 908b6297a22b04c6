//! # Role Discovery
//!
//! Enumerates every account/role pair reachable through a cached SSO token.
//!
//! Accounts are paged sequentially; each account's roles are then fetched by
//! its own task. The per-account tasks are joined before anything is
//! returned and the first failing task fails the whole discovery, so a
//! partial role list never escapes.

use crate::backoff::ExponentialBackoff;
use crate::error::{Result, SyncError};
use crate::profile::DiscoveredRole;
use crate::token::TokenCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

pub mod alias;
pub mod portal;

pub use alias::{AccountAliasLookup, AccountNameAliases, IamAliasLookup};
pub use portal::{AccountPage, AccountSummary, AwsSsoPortal, RoleCredentials, RolePage, SsoPortal};

/// Alias cache shared by the per-account tasks of one discovery instance
type AliasCache = Arc<Mutex<HashMap<String, String>>>;

/// Discovers roles for one SSO start URL at a time
pub struct RoleDiscovery {
    portal: Arc<dyn SsoPortal>,
    tokens: Arc<dyn TokenCache>,
    aliases: Arc<dyn AccountAliasLookup>,
    alias_cache: AliasCache,
    backoff: ExponentialBackoff,
}

impl std::fmt::Debug for RoleDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleDiscovery")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl RoleDiscovery {
    #[must_use]
    pub fn new(
        portal: Arc<dyn SsoPortal>,
        tokens: Arc<dyn TokenCache>,
        aliases: Arc<dyn AccountAliasLookup>,
    ) -> Self {
        Self {
            portal,
            tokens,
            aliases,
            alias_cache: Arc::new(Mutex::new(HashMap::new())),
            backoff: ExponentialBackoff::default(),
        }
    }

    /// Override the retry backoff (tests use millisecond delays)
    #[must_use]
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Aliases resolved so far, keyed by account id
    #[must_use]
    pub fn cached_aliases(&self) -> HashMap<String, String> {
        self.alias_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discover every account/role pair visible to the cached token
    ///
    /// # Errors
    ///
    /// - Authentication: no valid token for the start URL/region
    /// - Api/Network: a portal call failed (first failing account wins)
    /// - Validation: the portal returned a malformed account or role
    pub async fn discover(&self, start_url: &str, region: &str) -> Result<Vec<DiscoveredRole>> {
        let span = info_span!("sso.discover", start_url, region);
        async move {
            let token = self.tokens.load_token(start_url, region)?;
            let access_token = Arc::new(token.access_token);

            let accounts = self.list_all_accounts(&access_token).await?;
            info!(accounts = accounts.len(), "Listing roles for each account");

            let mut tasks = JoinSet::new();
            for account in accounts {
                let portal = Arc::clone(&self.portal);
                let aliases = Arc::clone(&self.aliases);
                let cache = Arc::clone(&self.alias_cache);
                let token = Arc::clone(&access_token);
                let account_span = info_span!("sso.account", account_id = %account.account_id);
                tasks.spawn(
                    async move { discover_account(portal.as_ref(), aliases.as_ref(), &cache, &token, account).await }
                        .instrument(account_span),
                );
            }

            let mut roles = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                let outcome = joined.map_err(|e| SyncError::api(format!("account discovery task failed: {e}")))?;
                match outcome {
                    Ok(mut account_roles) => roles.append(&mut account_roles),
                    Err(e) => {
                        // Remaining accounts cannot change the outcome
                        tasks.abort_all();
                        return Err(e);
                    }
                }
            }

            info!(roles = roles.len(), "Role discovery complete");
            Ok(roles)
        }
        .instrument(span)
        .await
    }

    /// [`discover`](Self::discover) with exponential backoff on retryable errors
    ///
    /// # Errors
    ///
    /// Non-retryable errors are returned unchanged on first occurrence; when
    /// `max_attempts` is exhausted the last error is wrapped as an API error.
    pub async fn discover_with_retry(
        &self,
        start_url: &str,
        region: &str,
        max_attempts: u32,
    ) -> Result<Vec<DiscoveredRole>> {
        let max_attempts = max_attempts.max(1);
        let mut backoff = self.backoff.clone();
        backoff.reset();

        let mut attempt = 1;
        loop {
            match self.discover(start_url, region).await {
                Ok(roles) => return Ok(roles),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    return Err(SyncError::retries_exhausted(max_attempts, e)
                        .with_context("start_url", start_url));
                }
                Err(e) => {
                    let delay = backoff.next_backoff();
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Role discovery failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn list_all_accounts(&self, access_token: &str) -> Result<Vec<AccountSummary>> {
        let mut accounts = Vec::new();
        let mut next_token = None;
        loop {
            let page = self.portal.list_accounts(access_token, next_token).await?;
            accounts.extend(page.accounts);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        debug!(count = accounts.len(), "Accounts listed");
        Ok(accounts)
    }
}

/// Roles of one account, with the account alias resolved
async fn discover_account(
    portal: &dyn SsoPortal,
    aliases: &dyn AccountAliasLookup,
    cache: &AliasCache,
    access_token: &str,
    account: AccountSummary,
) -> Result<Vec<DiscoveredRole>> {
    let mut role_names = Vec::new();
    let mut next_token = None;
    loop {
        let page = portal
            .list_account_roles(access_token, &account.account_id, next_token)
            .await?;
        role_names.extend(page.role_names);
        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    if role_names.is_empty() {
        debug!("No roles assigned in account");
        return Ok(Vec::new());
    }

    let alias = resolve_alias(aliases, cache, access_token, &account, &role_names).await;

    role_names
        .into_iter()
        .map(|role_name| {
            DiscoveredRole::new(
                account.account_id.clone(),
                account.account_name.clone(),
                alias.clone(),
                role_name,
            )
        })
        .collect()
}

async fn resolve_alias(
    aliases: &dyn AccountAliasLookup,
    cache: &AliasCache,
    access_token: &str,
    account: &AccountSummary,
    role_names: &[String],
) -> String {
    let cached = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&account.account_id)
        .cloned();
    if let Some(alias) = cached {
        return alias;
    }

    let alias = match aliases.lookup_alias(access_token, account, role_names).await {
        Ok(Some(alias)) if !alias.is_empty() => alias,
        Ok(_) => account.account_id.clone(),
        Err(e) => {
            warn!(
                account_id = %account.account_id,
                "Account alias lookup failed, using account id: {}",
                e
            );
            account.account_id.clone()
        }
    };

    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(account.account_id.clone(), alias.clone());
    alias
}
