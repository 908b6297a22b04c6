//! # Terminal Prompt
//!
//! [`ConflictPrompt`] reading replace/skip answers from stdin.

use sso_profile_sync::conflict::{ConflictPrompt, PromptDecision, ProfileConflict};
use sso_profile_sync::error::{Result, SyncError};
use std::io::{BufRead, Write};

#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl ConflictPrompt for TerminalPrompt {
    fn prompt_for_conflict(&self, conflict: &ProfileConflict) -> Result<PromptDecision> {
        let existing: Vec<&str> = conflict.existing_profiles.iter().map(|p| p.name.as_str()).collect();
        let stdin = std::io::stdin();
        let mut stderr = std::io::stderr();
        loop {
            write!(
                stderr,
                "{} ({}) conflicts with [{}] as '{}'. Replace or skip? [r/S] ",
                conflict.discovered_role,
                conflict.conflict_type,
                existing.join(", "),
                conflict.proposed_name
            )
            .and_then(|()| stderr.flush())
            .map_err(|e| SyncError::conflict_resolution(format!("cannot write prompt: {e}")))?;

            let mut answer = String::new();
            let read = stdin
                .lock()
                .read_line(&mut answer)
                .map_err(|e| SyncError::conflict_resolution(format!("cannot read answer: {e}")))?;
            if read == 0 {
                return Err(SyncError::conflict_resolution("prompt closed before an answer was given"));
            }
            match answer.trim().to_lowercase().as_str() {
                "r" | "replace" => return Ok(PromptDecision::Replace),
                "" | "s" | "skip" => return Ok(PromptDecision::Skip),
                _ => continue,
            }
        }
    }
}
