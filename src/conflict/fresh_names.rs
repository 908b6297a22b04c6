//! # Fresh Names
//!
//! Keeps profile names unique across one generation run. Names already in
//! the store, and names handed out by the conflict resolver, are claimed up
//! front; later requests for a claimed name get a `_N` suffix.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct FreshNameResolver {
    claimed: HashSet<String>,
    /// Next suffix to try, per base name
    counters: HashMap<String, usize>,
}

impl FreshNameResolver {
    /// Seed the resolver with names that are already taken
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            claimed: existing.into_iter().map(Into::into).collect(),
            counters: HashMap::new(),
        }
    }

    /// Mark a name as taken without resolving it
    ///
    /// Returns `false` if the name was already claimed.
    pub fn claim(&mut self, name: impl Into<String>) -> bool {
        self.claimed.insert(name.into())
    }

    #[must_use]
    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }

    /// Claim `desired`, or the first free `desired_N`
    pub fn resolve(&mut self, desired: &str) -> String {
        if self.claimed.insert(desired.to_string()) {
            return desired.to_string();
        }

        let counter = self.counters.entry(desired.to_string()).or_insert(1);
        loop {
            let candidate = format!("{desired}_{counter}");
            *counter += 1;
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_names_get_suffixes() {
        let mut resolver = FreshNameResolver::default();
        let names: Vec<_> = ["a", "a", "a"].iter().map(|n| resolver.resolve(n)).collect();
        assert_eq!(names, vec!["a", "a_1", "a_2"]);
    }

    #[test]
    fn test_existing_names_are_respected() {
        let mut resolver = FreshNameResolver::new(["dev-Admin", "dev-Admin_1"]);
        assert_eq!(resolver.resolve("dev-Admin"), "dev-Admin_2");
        assert_eq!(resolver.resolve("prod-Admin"), "prod-Admin");
    }

    #[test]
    fn test_claimed_names_are_skipped() {
        let mut resolver = FreshNameResolver::default();
        assert!(resolver.claim("x"));
        assert!(!resolver.claim("x"));
        assert!(resolver.is_claimed("x"));
        resolver.claim("x_1");
        assert_eq!(resolver.resolve("x"), "x_2");
        assert_eq!(resolver.resolve("x"), "x_3");
    }
}
