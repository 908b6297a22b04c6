//! # Naming Pattern Tests
//!
//! These tests verify:
//! - Pattern validation errors carry the pattern as context
//! - Name generation is deterministic and sanitized
//! - Proposed names leave an unknown region out

use sso_profile_sync::error::ErrorKind;
use sso_profile_sync::naming::{generate_profile_name, NameInputs, NamingPattern, Placeholder};

fn inputs<'a>(region: Option<&'a str>) -> NameInputs<'a> {
    NameInputs {
        account_id: "123456789012",
        account_name: "Production Workloads",
        account_alias: "production",
        role_name: "PowerUserAccess",
        region,
    }
}

#[test]
fn test_generation_is_deterministic() {
    let patterns = [
        "{account_alias}-{role_name}",
        "{account_id}_{role_name}",
        "{account_name}.{role_name}.{region}",
        "sso-{account_alias}-{role_name}-{region}",
    ];
    for source in patterns {
        let pattern = NamingPattern::compile(source).unwrap();
        let first = pattern.generate(&inputs(Some("eu-west-1"))).unwrap();
        let second = pattern.generate(&inputs(Some("eu-west-1"))).unwrap();
        assert_eq!(first, second, "pattern {source}");
    }
}

#[test]
fn test_generated_names_are_sanitized() {
    let name = generate_profile_name("{account_name}-{role_name}", &inputs(None)).unwrap();
    assert_eq!(name, "Production_Workloads-PowerUserAccess");
}

#[test]
fn test_region_placeholder() {
    let pattern = NamingPattern::compile("{account_alias}-{role_name}-{region}").unwrap();
    assert!(pattern.uses(Placeholder::Region));
    assert_eq!(
        pattern.generate(&inputs(Some("us-east-1"))).unwrap(),
        "production-PowerUserAccess-us-east-1"
    );

    let err = pattern.generate(&inputs(None)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().contains("{region}"));

    assert!(pattern.propose(&inputs(None)).is_ok());
}

#[test]
fn test_invalid_patterns_are_rejected_with_context() {
    for source in ["{account_alias}-{team}", "{account_alias}/{role_name}", "{role_name", "static-name"] {
        let err = NamingPattern::compile(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "pattern {source}");
        assert_eq!(err.context().get("pattern"), Some(source));
    }
    assert!(NamingPattern::compile("").is_err());
}

#[test]
fn test_pattern_round_trips_through_display() {
    let pattern: NamingPattern = "{account_id}-{role_name}".parse().unwrap();
    assert_eq!(pattern.to_string(), "{account_id}-{role_name}");
    let placeholders: Vec<_> = pattern.placeholders().collect();
    assert_eq!(placeholders, vec![Placeholder::AccountId, Placeholder::RoleName]);
}
