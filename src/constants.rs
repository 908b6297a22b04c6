//! # Constants
//!
//! Shared constants used throughout the sync pipeline.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default profile name pattern
pub const DEFAULT_NAMING_PATTERN: &str = "{account_alias}-{role_name}";

/// Default page size for `ListAccounts` / `ListAccountRoles`
pub const DEFAULT_PAGE_SIZE: i32 = 100;

/// Largest page size the SSO portal API accepts
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Default number of discovery attempts (first try included)
pub const DEFAULT_DISCOVERY_MAX_ATTEMPTS: u32 = 3;

/// Exponential backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Exponential backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default timeout for a single SSO/IAM API call (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tokens expiring within this window are flagged but still used (seconds)
pub const TOKEN_EXPIRY_WARNING_SECS: i64 = 300;

/// SSO token cache location relative to the home directory
pub const SSO_CACHE_DIR: &str = ".aws/sso/cache";

/// Region used for IAM, which is a global service
pub const IAM_SIGNING_REGION: &str = "us-east-1";

/// Placeholder tokens accepted in a naming pattern
pub const ALLOWED_PLACEHOLDERS: [&str; 5] = [
    "account_id",
    "account_name",
    "account_alias",
    "role_name",
    "region",
];

/// Characters that may not appear in a naming pattern
pub const ILLEGAL_PATTERN_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
