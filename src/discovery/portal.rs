//! # SSO Portal Client
//!
//! Paged access to the IAM Identity Center portal API.
//!
//! [`SsoPortal`] is the seam the discovery engine talks to; [`AwsSsoPortal`]
//! implements it with the official `aws-sdk-sso` client.

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use aws_sdk_sso::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sso::types::AccountInfo;
use aws_sdk_sso::Client as SsoClient;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// An account visible to the access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub account_id: String,
    pub account_name: String,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    pub accounts: Vec<AccountSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RolePage {
    pub role_names: Vec<String>,
    pub next_token: Option<String>,
}

/// Short-lived credentials for one account/role
#[derive(Clone)]
pub struct RoleCredentials {
    pub access_key_id: String,
    pub secret_access_key: zeroize::Zeroizing<String>,
    pub session_token: zeroize::Zeroizing<String>,
    /// Expiry in milliseconds since the epoch
    pub expiration_ms: i64,
}

impl std::fmt::Debug for RoleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &"***")
            .field("expiration_ms", &self.expiration_ms)
            .finish()
    }
}

/// Paged portal operations used by discovery
#[async_trait]
pub trait SsoPortal: Send + Sync {
    /// One page of accounts; `next_token` continues a previous page
    async fn list_accounts(&self, access_token: &str, next_token: Option<String>) -> Result<AccountPage>;

    /// One page of role names assigned in `account_id`
    async fn list_account_roles(
        &self,
        access_token: &str,
        account_id: &str,
        next_token: Option<String>,
    ) -> Result<RolePage>;

    /// Exchange the access token for role credentials
    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials>;
}

/// [`SsoPortal`] over `aws-sdk-sso`
#[derive(Debug, Clone)]
pub struct AwsSsoPortal {
    client: SsoClient,
    page_size: i32,
    request_timeout: Option<Duration>,
}

impl AwsSsoPortal {
    #[must_use]
    pub fn new(client: SsoClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
        }
    }

    /// Build a client for the portal region
    ///
    /// The portal API is authorised by the bearer access token, so no
    /// credential provider is configured.
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .no_credentials()
            .load()
            .await;
        Self::new(SsoClient::new(&sdk_config))
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_elapsed| {
                SyncError::network(format!("{operation} timed out after {}s", limit.as_secs()))
            })?,
            None => fut.await,
        }
    }
}

#[async_trait]
impl SsoPortal for AwsSsoPortal {
    async fn list_accounts(&self, access_token: &str, next_token: Option<String>) -> Result<AccountPage> {
        self.call("ListAccounts", async {
            let output = self
                .client
                .list_accounts()
                .access_token(access_token)
                .max_results(self.page_size)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| map_sdk_error("ListAccounts", e))?;

            let accounts = output
                .account_list()
                .iter()
                .map(account_summary)
                .collect::<Result<Vec<_>>>()?;
            debug!(count = accounts.len(), "ListAccounts page received");

            Ok(AccountPage {
                accounts,
                next_token: output.next_token().map(ToString::to_string),
            })
        })
        .await
    }

    async fn list_account_roles(
        &self,
        access_token: &str,
        account_id: &str,
        next_token: Option<String>,
    ) -> Result<RolePage> {
        self.call("ListAccountRoles", async {
            let output = self
                .client
                .list_account_roles()
                .access_token(access_token)
                .account_id(account_id)
                .max_results(self.page_size)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| map_sdk_error("ListAccountRoles", e).with_context("account_id", account_id))?;

            Ok(RolePage {
                role_names: output
                    .role_list()
                    .iter()
                    .filter_map(|role| role.role_name().map(ToString::to_string))
                    .collect(),
                next_token: output.next_token().map(ToString::to_string),
            })
        })
        .await
    }

    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials> {
        self.call("GetRoleCredentials", async {
            let output = self
                .client
                .get_role_credentials()
                .access_token(access_token)
                .account_id(account_id)
                .role_name(role_name)
                .send()
                .await
                .map_err(|e| {
                    map_sdk_error("GetRoleCredentials", e)
                        .with_context("account_id", account_id)
                        .with_context("role_name", role_name)
                })?;

            let creds = output.role_credentials().ok_or_else(|| {
                SyncError::api("GetRoleCredentials returned no credentials")
                    .with_context("account_id", account_id)
            })?;
            let (Some(access_key_id), Some(secret), Some(session)) = (
                creds.access_key_id(),
                creds.secret_access_key(),
                creds.session_token(),
            ) else {
                return Err(SyncError::api("GetRoleCredentials returned incomplete credentials")
                    .with_context("account_id", account_id));
            };

            Ok(RoleCredentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: zeroize::Zeroizing::new(secret.to_string()),
                session_token: zeroize::Zeroizing::new(session.to_string()),
                expiration_ms: creds.expiration(),
            })
        })
        .await
    }
}

/// Translate an SDK failure into the crate's error kinds
///
/// Transport and timeout failures become network errors, rejected tokens
/// become authentication errors and everything else is an API error whose
/// message carries the service error code.
pub fn map_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> SyncError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            SyncError::network(format!("{operation} failed: {detail}"))
        }
        _ => {
            let code = err.code().unwrap_or("Unknown");
            let message = err.message().unwrap_or_default();
            if code == "UnauthorizedException" {
                SyncError::authentication(format!(
                    "{operation} rejected the access token: {message}"
                ))
            } else {
                SyncError::api(format!("{operation} failed: {code}: {message} ({detail})"))
            }
        }
    }
    .with_context("operation", operation)
}

/// An account listed by the portal; one without an id fails the page
fn account_summary(info: &AccountInfo) -> Result<AccountSummary> {
    let account_id = info.account_id().filter(|id| !id.is_empty()).ok_or_else(|| {
        SyncError::validation("ListAccounts returned an account without an id")
            .with_context("account_name", info.account_name().unwrap_or_default())
    })?;
    Ok(AccountSummary {
        account_id: account_id.to_string(),
        account_name: info.account_name().unwrap_or_default().to_string(),
        email_address: info.email_address().map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use aws_sdk_sso::error::ErrorMetadata;
    use aws_sdk_sso::operation::list_accounts::ListAccountsError;

    fn service_error(code: &str, message: &str) -> SdkError<ListAccountsError, ()> {
        let meta = ErrorMetadata::builder().code(code).message(message).build();
        SdkError::service_error(ListAccountsError::generic(meta), ())
    }

    #[test]
    fn test_timeout_maps_to_network() {
        let err = map_sdk_error("ListAccounts", SdkError::<ListAccountsError, ()>::timeout_error("slow"));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
        assert_eq!(err.context().get("operation"), Some("ListAccounts"));
    }

    #[test]
    fn test_unauthorized_maps_to_authentication() {
        let err = map_sdk_error("ListAccounts", service_error("UnauthorizedException", "Session token not found or invalid"));
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.remediation().is_some());
    }

    #[test]
    fn test_throttling_code_stays_retryable() {
        let err = map_sdk_error("ListAccounts", service_error("TooManyRequestsException", "Rate exceeded"));
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.message().contains("TooManyRequestsException"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_service_errors_are_not_retryable() {
        let err = map_sdk_error("ListAccounts", service_error("ResourceNotFoundException", "no such account"));
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_account_without_id_is_a_validation_error() {
        let info = AccountInfo::builder().account_name("Orphan").build();
        let err = account_summary(&info).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.context().get("account_name"), Some("Orphan"));

        let info = AccountInfo::builder()
            .account_id("123456789012")
            .account_name("Production")
            .build();
        assert_eq!(account_summary(&info).unwrap().account_id, "123456789012");
    }

    #[test]
    fn test_credentials_debug_is_masked() {
        let creds = RoleCredentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string().into(),
            session_token: "token".to_string().into(),
            expiration_ms: 0,
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret\""));
        assert!(!rendered.contains("\"token\""));
        assert!(rendered.contains("ASIAEXAMPLE"));
    }
}
