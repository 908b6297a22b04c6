//! # Errors
//!
//! Error type shared by every stage of the sync pipeline.
//!
//! Each variant corresponds to one error kind and carries an ordered set of
//! key/value annotations (account id, role name, pattern, profile name) that
//! are rendered alongside the message for diagnostics.

use std::fmt;
use thiserror::Error;

/// Ordered key/value annotations attached to an error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext(Vec<(String, String)>);

impl ErrorContext {
    /// Add an annotation, replacing an existing value for the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Look up an annotation by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, " [{}]", pairs.join(", "))
    }
}

/// Error kind, independent of the message and annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Api,
    FileSystem,
    Network,
    ConflictResolution,
    Backup,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Api => "api",
            ErrorKind::FileSystem => "filesystem",
            ErrorKind::Network => "network",
            ErrorKind::ConflictResolution => "conflict-resolution",
            ErrorKind::Backup => "backup",
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("validation error: {message}{context}")]
    Validation {
        message: String,
        context: ErrorContext,
    },
    #[error("authentication error: {message}{context}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },
    #[error("api error: {message}{context}")]
    Api {
        message: String,
        context: ErrorContext,
        #[source]
        source: Option<Box<SyncError>>,
    },
    #[error("filesystem error: {message}{context}")]
    FileSystem {
        message: String,
        context: ErrorContext,
        #[source]
        source: Option<std::io::Error>,
    },
    #[error("network error: {message}{context}")]
    Network {
        message: String,
        context: ErrorContext,
    },
    #[error("conflict resolution error: {message}{context}")]
    ConflictResolution {
        message: String,
        context: ErrorContext,
    },
    #[error("backup error: {message}{context}")]
    Backup {
        message: String,
        context: ErrorContext,
    },
}

/// Message fragments that mark an API error as throttling
const THROTTLING_MARKERS: [&str; 6] = [
    "throttl",
    "too many requests",
    "toomanyrequests",
    "rate limit",
    "ratelimit",
    "rate exceeded",
];

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        SyncError::Authentication {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        SyncError::Api {
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        SyncError::Network {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn filesystem(message: impl Into<String>, source: std::io::Error) -> Self {
        SyncError::FileSystem {
            message: message.into(),
            context: ErrorContext::default(),
            source: Some(source),
        }
    }

    pub fn conflict_resolution(message: impl Into<String>) -> Self {
        SyncError::ConflictResolution {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn backup(message: impl Into<String>) -> Self {
        SyncError::Backup {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Wrap an error that exhausted its retries as an API error
    pub fn retries_exhausted(attempts: u32, last: SyncError) -> Self {
        SyncError::Api {
            message: format!("giving up after {attempts} attempt(s): {last}"),
            context: ErrorContext::default(),
            source: Some(Box::new(last)),
        }
    }

    /// Attach a key/value annotation
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().insert(key, value);
        self
    }

    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        match self {
            SyncError::Validation { context, .. }
            | SyncError::Authentication { context, .. }
            | SyncError::Api { context, .. }
            | SyncError::FileSystem { context, .. }
            | SyncError::Network { context, .. }
            | SyncError::ConflictResolution { context, .. }
            | SyncError::Backup { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            SyncError::Validation { context, .. }
            | SyncError::Authentication { context, .. }
            | SyncError::Api { context, .. }
            | SyncError::FileSystem { context, .. }
            | SyncError::Network { context, .. }
            | SyncError::ConflictResolution { context, .. }
            | SyncError::Backup { context, .. } => context,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            SyncError::Validation { message, .. }
            | SyncError::Authentication { message, .. }
            | SyncError::Api { message, .. }
            | SyncError::FileSystem { message, .. }
            | SyncError::Network { message, .. }
            | SyncError::ConflictResolution { message, .. }
            | SyncError::Backup { message, .. } => message,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Validation { .. } => ErrorKind::Validation,
            SyncError::Authentication { .. } => ErrorKind::Authentication,
            SyncError::Api { .. } => ErrorKind::Api,
            SyncError::FileSystem { .. } => ErrorKind::FileSystem,
            SyncError::Network { .. } => ErrorKind::Network,
            SyncError::ConflictResolution { .. } => ErrorKind::ConflictResolution,
            SyncError::Backup { .. } => ErrorKind::Backup,
        }
    }

    /// Network failures and throttled API calls are worth retrying
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network { .. } => true,
            SyncError::Api { message, .. } => {
                let lower = message.to_lowercase();
                THROTTLING_MARKERS.iter().any(|m| lower.contains(m))
            }
            _ => false,
        }
    }

    /// Operator-facing hint for errors that have an obvious fix
    #[must_use]
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            SyncError::Authentication { .. } => Some(
                "run `aws sso login` (or `aws sso login --sso-session <name>`) to refresh the cached token",
            ),
            _ => None,
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
