//! # Account Alias Lookup
//!
//! Resolves the display alias used for `{account_alias}`.
//!
//! - `AccountNameAliases`: the account name reported by the portal
//! - `IamAliasLookup`: the IAM account alias, read with role credentials
//!   obtained from the portal

use super::portal::{AccountSummary, SsoPortal};
use crate::constants::IAM_SIGNING_REGION;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_iam::config::{BehaviorVersion, Region};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tracing::debug;

/// Source of account display aliases
///
/// `Ok(None)` means the account has no alias; the caller falls back to the
/// account id.
#[async_trait]
pub trait AccountAliasLookup: Send + Sync {
    async fn lookup_alias(
        &self,
        access_token: &str,
        account: &AccountSummary,
        role_names: &[String],
    ) -> Result<Option<String>>;
}

/// Uses the account name shown in the portal as alias
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountNameAliases;

#[async_trait]
impl AccountAliasLookup for AccountNameAliases {
    async fn lookup_alias(
        &self,
        _access_token: &str,
        account: &AccountSummary,
        _role_names: &[String],
    ) -> Result<Option<String>> {
        let name = account.account_name.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }
}

/// Reads the IAM account alias through the first assigned role
pub struct IamAliasLookup {
    portal: Arc<dyn SsoPortal>,
}

impl std::fmt::Debug for IamAliasLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamAliasLookup").finish_non_exhaustive()
    }
}

impl IamAliasLookup {
    #[must_use]
    pub fn new(portal: Arc<dyn SsoPortal>) -> Self {
        Self { portal }
    }
}

#[async_trait]
impl AccountAliasLookup for IamAliasLookup {
    async fn lookup_alias(
        &self,
        access_token: &str,
        account: &AccountSummary,
        role_names: &[String],
    ) -> Result<Option<String>> {
        let Some(role_name) = role_names.first() else {
            return Err(SyncError::api("no role available to read the account alias")
                .with_context("account_id", account.account_id.as_str()));
        };

        let creds = self
            .portal
            .get_role_credentials(access_token, &account.account_id, role_name)
            .await?;
        let expiry = u64::try_from(creds.expiration_ms)
            .ok()
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms));
        let credentials = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.as_str(),
            Some(creds.session_token.to_string()),
            expiry,
            "sso-role-credentials",
        );

        let config = aws_sdk_iam::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(IAM_SIGNING_REGION))
            .credentials_provider(credentials)
            .build();
        let iam = aws_sdk_iam::Client::from_conf(config);

        let output = iam.list_account_aliases().send().await.map_err(|e| {
            super::portal::map_sdk_error("ListAccountAliases", e)
                .with_context("account_id", account.account_id.as_str())
        })?;
        let alias = output.account_aliases().first().cloned();
        debug!(account_id = %account.account_id, alias = ?alias, "IAM account alias resolved");
        Ok(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_account_name_alias() {
        let account = AccountSummary {
            account_id: "123456789012".to_string(),
            account_name: " production ".to_string(),
            email_address: None,
        };
        let alias = AccountNameAliases.lookup_alias("t", &account, &[]).await.unwrap();
        assert_eq!(alias.as_deref(), Some("production"));
    }

    #[tokio::test]
    async fn test_account_name_alias_empty() {
        let account = AccountSummary {
            account_id: "123456789012".to_string(),
            account_name: String::new(),
            email_address: None,
        };
        let alias = AccountNameAliases.lookup_alias("t", &account, &[]).await.unwrap();
        assert!(alias.is_none());
    }
}
