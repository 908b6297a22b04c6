//! # SSO Profile Sync
//!
//! Discovers every account/role pair reachable through an AWS IAM Identity
//! Center (SSO) login and turns them into named CLI profiles, detecting and
//! resolving collisions with the profiles that already exist.
//!
//! ## Pipeline
//!
//! 1. **Discovery** ([`discovery::RoleDiscovery`]): pages accounts, fetches
//!    each account's roles concurrently and resolves account aliases
//! 2. **Detection** ([`conflict::ConflictDetector`]): classifies collisions as
//!    same-role or same-name against a [`store::ProfileStore`]
//! 3. **Resolution** ([`conflict::ConflictResolver`]): replace, skip or prompt
//! 4. **Naming** ([`conflict::FreshNameResolver`]): unique names for roles
//!    without a conflict
//!
//! [`workflow::SyncWorkflow`] wires the steps together.

pub mod backoff;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod naming;
pub mod observability;
pub mod profile;
pub mod store;
pub mod token;
pub mod workflow;

pub use error::{ErrorKind, Result, SyncError};
