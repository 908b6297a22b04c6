//! # Conflicts
//!
//! Detection and resolution of collisions between discovered roles and the
//! existing profile store.

pub mod detector;
pub mod fresh_names;
pub mod report;
pub mod resolver;
pub mod types;

pub use detector::{ClassificationBasis, ConflictDetector, DetectionOutcome};
pub use fresh_names::FreshNameResolver;
pub use report::{NameMapping, ResolutionReport};
pub use resolver::{ConflictPrompt, ConflictResolver, PromptDecision};
pub use types::{
    ActionType, ConflictAction, ConflictResolutionResult, ConflictType, ProfileConflict,
    ProfileReplacement, ResolutionStrategy,
};
