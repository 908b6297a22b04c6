//! # Resolution Report
//!
//! Human-readable summary of a resolution run, derived from the conflict list
//! and the [`ConflictResolutionResult`] only.

use super::types::{ActionType, ConflictResolutionResult, ProfileConflict, ResolutionStrategy};
use serde::Serialize;
use std::fmt;

/// One old -> new name mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameMapping {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub total_conflicts: usize,
    pub strategy: ResolutionStrategy,
    pub replaced: usize,
    pub skipped: usize,
    pub created: usize,
    pub mappings: Vec<NameMapping>,
    /// New names of Create actions
    pub created_names: Vec<String>,
    /// `account_id/role_name` of every skipped role
    pub skipped_roles: Vec<String>,
}

impl ResolutionReport {
    #[must_use]
    pub fn new(
        conflicts: &[ProfileConflict],
        result: &ConflictResolutionResult,
        strategy: ResolutionStrategy,
    ) -> Self {
        let mappings = result
            .actions
            .iter()
            .filter(|a| a.action == ActionType::Replace)
            .filter_map(|a| match (&a.old_name, &a.new_name) {
                (Some(old), Some(new)) => Some(NameMapping {
                    old_name: old.clone(),
                    new_name: new.clone(),
                }),
                _ => None,
            })
            .collect();
        let created_names = result
            .actions
            .iter()
            .filter(|a| a.action == ActionType::Create)
            .filter_map(|a| a.new_name.clone())
            .collect();
        let skipped_roles = result
            .skipped_roles
            .iter()
            .map(|r| format!("{}/{}", r.account_id, r.role_name))
            .collect();

        Self {
            total_conflicts: conflicts.len(),
            strategy,
            replaced: result.count(ActionType::Replace),
            skipped: result.count(ActionType::Skip),
            created: result.count(ActionType::Create),
            mappings,
            created_names,
            skipped_roles,
        }
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conflict Resolution Report")?;
        writeln!(f, "{}", "=".repeat(26))?;
        writeln!(f, "{:<20} {}", "Total conflicts:", self.total_conflicts)?;
        writeln!(f, "{:<20} {}", "Strategy:", self.strategy)?;
        writeln!(f, "{:<20} {}", "Replaced:", self.replaced)?;
        writeln!(f, "{:<20} {}", "Skipped:", self.skipped)?;
        writeln!(f, "{:<20} {}", "Created:", self.created)?;

        if !self.mappings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Replacements:")?;
            for mapping in &self.mappings {
                writeln!(f, "  {} -> {}", mapping.old_name, mapping.new_name)?;
            }
        }
        if !self.created_names.is_empty() {
            writeln!(f)?;
            writeln!(f, "New profiles:")?;
            for name in &self.created_names {
                writeln!(f, "  + {name}")?;
            }
        }
        if !self.skipped_roles.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped roles:")?;
            for role in &self.skipped_roles {
                writeln!(f, "  - {role}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::types::{ConflictAction, ConflictType};
    use crate::profile::{DiscoveredRole, Profile};

    #[test]
    fn test_report_counts_and_mappings() {
        let admin = DiscoveredRole::new("123456789012", "Prod", "prod", "Admin").unwrap();
        let read = DiscoveredRole::new("123456789012", "Prod", "prod", "ReadOnly").unwrap();
        let fresh = DiscoveredRole::new("210987654321", "Dev", "dev", "Admin").unwrap();
        let c1 = ProfileConflict::new(admin, vec![Profile::new("old-admin")], "prod-Admin", ConflictType::SameRole)
            .unwrap();
        let c2 = ProfileConflict::new(read.clone(), vec![Profile::new("prod-ReadOnly")], "prod-ReadOnly", ConflictType::SameName)
            .unwrap();

        let result = ConflictResolutionResult {
            skipped_roles: vec![read],
            actions: vec![
                ConflictAction::replace(&c1, "old-admin", "prod-Admin"),
                ConflictAction::skip(&c2, "prod-ReadOnly"),
                ConflictAction::create(&fresh, "dev-Admin"),
            ],
            ..ConflictResolutionResult::default()
        };

        let report = ResolutionReport::new(&[c1, c2], &result, ResolutionStrategy::Replace);
        assert_eq!(report.total_conflicts, 2);
        assert_eq!((report.replaced, report.skipped, report.created), (1, 1, 1));
        assert_eq!(report.mappings[0].old_name, "old-admin");
        assert_eq!(report.skipped_roles, vec!["123456789012/ReadOnly"]);

        let rendered = report.to_string();
        assert!(rendered.contains("old-admin -> prod-Admin"));
        assert!(rendered.contains("+ dev-Admin"));
        assert!(rendered.contains("- 123456789012/ReadOnly"));
    }
}
