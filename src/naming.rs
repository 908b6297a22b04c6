//! # Profile Naming
//!
//! Compiles profile name patterns and renders profile names from role and
//! account values.
//!
//! A pattern is literal text interleaved with placeholders from a closed set:
//! `{account_id}`, `{account_name}`, `{account_alias}`, `{role_name}` and
//! `{region}`. Every substituted value is sanitized before substitution and
//! the rendered name is sanitized once more, so the result is always safe to
//! use as a config file section name.
//!
//! ## Usage
//!
//! ```rust
//! use sso_profile_sync::naming::{NameInputs, NamingPattern};
//!
//! let pattern = NamingPattern::compile("{account_alias}-{role_name}").unwrap();
//! let name = pattern
//!     .generate(&NameInputs {
//!         account_id: "123456789012",
//!         account_name: "Production",
//!         account_alias: "production",
//!         role_name: "PowerUserAccess",
//!         region: Some("eu-west-1"),
//!     })
//!     .unwrap();
//! assert_eq!(name, "production-PowerUserAccess");
//! ```

use crate::constants::{ALLOWED_PLACEHOLDERS, ILLEGAL_PATTERN_CHARS};
use crate::error::{Result, SyncError};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, cannot fail to compile
    Regex::new(r"\{([^{}]*)\}").unwrap_or_else(|e| panic!("invalid placeholder regex: {e}"))
});

/// One of the approved placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    AccountId,
    AccountName,
    AccountAlias,
    RoleName,
    Region,
}

impl Placeholder {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "account_id" => Some(Placeholder::AccountId),
            "account_name" => Some(Placeholder::AccountName),
            "account_alias" => Some(Placeholder::AccountAlias),
            "role_name" => Some(Placeholder::RoleName),
            "region" => Some(Placeholder::Region),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::AccountId => "{account_id}",
            Placeholder::AccountName => "{account_name}",
            Placeholder::AccountAlias => "{account_alias}",
            Placeholder::RoleName => "{role_name}",
            Placeholder::Region => "{region}",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Values available for substitution
///
/// Empty strings count as missing. `region` is `None` while the target region
/// is not yet known (conflict detection), in which case `{region}` renders as
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameInputs<'a> {
    pub account_id: &'a str,
    pub account_name: &'a str,
    pub account_alias: &'a str,
    pub role_name: &'a str,
    pub region: Option<&'a str>,
}

/// A validated, immutable naming pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
    source: String,
    segments: Vec<Segment>,
}

impl NamingPattern {
    /// Validate and compile a pattern
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pattern is empty, contains a
    /// character that is illegal in a section name or whitespace, contains an
    /// unknown placeholder or a stray brace, or has no placeholder at all.
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(SyncError::validation("naming pattern cannot be empty"));
        }

        if let Some(c) = pattern
            .chars()
            .find(|c| ILLEGAL_PATTERN_CHARS.contains(c) || c.is_whitespace())
        {
            return Err(SyncError::validation(format!(
                "naming pattern contains illegal character {c:?}"
            ))
            .with_context("pattern", pattern));
        }

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER_RE.captures_iter(pattern) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(pattern[last..whole.start()].to_string()));
            }
            let placeholder = Placeholder::parse(inner.as_str()).ok_or_else(|| {
                SyncError::validation(format!(
                    "unknown placeholder {{{}}}; allowed: {}",
                    inner.as_str(),
                    ALLOWED_PLACEHOLDERS
                        .iter()
                        .map(|p| format!("{{{p}}}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
                .with_context("pattern", pattern)
            })?;
            segments.push(Segment::Placeholder(placeholder));
            last = whole.end();
        }
        if last < pattern.len() {
            segments.push(Segment::Literal(pattern[last..].to_string()));
        }

        let stray_brace = segments.iter().any(|s| match s {
            Segment::Literal(text) => text.contains('{') || text.contains('}'),
            Segment::Placeholder(_) => false,
        });
        if stray_brace {
            return Err(SyncError::validation("naming pattern contains an unmatched brace")
                .with_context("pattern", pattern));
        }

        if !segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(_)))
        {
            return Err(SyncError::validation(
                "naming pattern must contain at least one placeholder",
            )
            .with_context("pattern", pattern));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholders used by the pattern, in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    #[must_use]
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.placeholders().any(|p| p == placeholder)
    }

    /// Render a profile name; every placeholder in the pattern needs a value
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first placeholder without a
    /// value, or if the sanitized result is empty.
    pub fn generate(&self, inputs: &NameInputs<'_>) -> Result<String> {
        self.render(inputs, false)
    }

    /// Render the proposed name used during conflict detection
    ///
    /// Same as [`generate`](Self::generate) except that a missing region is
    /// left out instead of being an error, together with the separator
    /// literal next to it (`{alias}-{role}-{region}` proposes `alias-role`).
    ///
    /// # Errors
    ///
    /// Returns a validation error for any other missing value, or if the
    /// sanitized result is empty.
    pub fn propose(&self, inputs: &NameInputs<'_>) -> Result<String> {
        self.render(inputs, true)
    }

    fn render(&self, inputs: &NameInputs<'_>, defer_region: bool) -> Result<String> {
        // None marks a deferred region
        let mut pieces: Vec<Option<String>> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let piece = match segment {
                Segment::Literal(text) => Some(text.clone()),
                Segment::Placeholder(p) => {
                    let value = match p {
                        Placeholder::AccountId => inputs.account_id,
                        Placeholder::AccountName => inputs.account_name,
                        Placeholder::AccountAlias => inputs.account_alias,
                        Placeholder::RoleName => inputs.role_name,
                        Placeholder::Region => match inputs.region {
                            None if defer_region => {
                                pieces.push(None);
                                continue;
                            }
                            None => "",
                            Some(region) => region,
                        },
                    };
                    if value.is_empty() {
                        return Err(SyncError::validation(format!(
                            "missing value for placeholder {p}"
                        ))
                        .with_context("pattern", self.source.as_str()));
                    }
                    Some(sanitize(value))
                }
            };
            pieces.push(piece);
        }

        // A deferred region takes one adjacent separator with it
        for i in 0..pieces.len() {
            if pieces[i].is_some() || !matches!(self.segments[i], Segment::Placeholder(_)) {
                continue;
            }
            let before = i.checked_sub(1).filter(|&j| pieces[j].is_some() && is_separator(&self.segments[j]));
            let after = Some(i + 1).filter(|&j| j < pieces.len() && is_separator(&self.segments[j]));
            if let Some(j) = before.or(after) {
                pieces[j] = None;
            }
        }

        let name = sanitize(&pieces.into_iter().flatten().collect::<String>());
        if name.is_empty() {
            return Err(SyncError::validation("generated profile name is empty")
                .with_context("pattern", self.source.as_str()));
        }
        Ok(name)
    }
}

fn is_separator(segment: &Segment) -> bool {
    matches!(segment, Segment::Literal(text)
        if !text.is_empty() && text.chars().all(|c| matches!(c, '-' | '_' | '.')))
}

impl fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for NamingPattern {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

/// Compile `pattern` and render a name in one step
///
/// # Errors
///
/// Any error from [`NamingPattern::compile`] or [`NamingPattern::generate`].
pub fn generate_profile_name(pattern: &str, inputs: &NameInputs<'_>) -> Result<String> {
    NamingPattern::compile(pattern)?.generate(inputs)
}

/// Make a value safe for a section name
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, runs of `_` collapse to
/// one and leading/trailing `_` are trimmed.
#[must_use]
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}
