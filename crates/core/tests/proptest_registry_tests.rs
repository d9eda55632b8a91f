//! Property-based tests for registry construction and platform queries.
//!
//! - Filtering: a platform query returns exactly the matching and
//!   unconstrained descriptors, in registration order
//! - Duplicates: any repeated base key is rejected
//! - Overrides: applying the same override twice equals applying it once

use proptest::prelude::*;
use rigging_core::{DependencyOverride, DependencyRegistry, Error, RuntimeDependency};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}".prop_map(String::from)
}

fn platform_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("any".to_string())),
        Just(Some("platform-agnostic".to_string())),
        Just(Some("linux-x64".to_string())),
        Just(Some("linux-arm64".to_string())),
        Just(Some("osx-arm64".to_string())),
        Just(Some("win-x64".to_string())),
    ]
}

fn query_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("linux-x64".to_string()),
        Just("osx-arm64".to_string()),
        Just("win-x64".to_string()),
        Just("win-arm64".to_string()),
    ]
}

fn dependency_strategy() -> impl Strategy<Value = RuntimeDependency> {
    (
        id_strategy(),
        platform_strategy(),
        proptest::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(id, platform, binary)| {
            let mut dep = RuntimeDependency::new(id);
            dep.platform = platform;
            dep.binary_name = binary;
            dep
        })
}

/// Base sets with unique keys.
fn base_strategy() -> impl Strategy<Value = Vec<RuntimeDependency>> {
    proptest::collection::vec(dependency_strategy(), 0..12).prop_map(|deps| {
        let mut seen = std::collections::HashSet::new();
        deps.into_iter()
            .filter(|dep| seen.insert(dep.key()))
            .collect()
    })
}

fn is_unconstrained(platform: Option<&str>) -> bool {
    platform.is_none_or(|p| p.eq_ignore_ascii_case("any") || p.eq_ignore_ascii_case("platform-agnostic"))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn platform_query_matches_filter(base in base_strategy(), query in query_strategy()) {
        let registry = DependencyRegistry::new(base.clone(), Vec::new()).unwrap();

        let expected: Vec<&RuntimeDependency> = base
            .iter()
            .filter(|dep| is_unconstrained(dep.platform.as_deref()) || dep.platform.as_deref() == Some(query.as_str()))
            .collect();
        let actual = registry.dependencies_for_platform(&query);

        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn repeated_key_is_rejected(base in base_strategy().prop_filter("non-empty", |b| !b.is_empty()), pick in any::<prop::sample::Index>()) {
        let mut with_duplicate = base.clone();
        let original = pick.get(&base).clone();
        with_duplicate.push(original.clone().with_description("copy"));

        let err = DependencyRegistry::new(with_duplicate, Vec::new()).unwrap_err();
        match err {
            Error::DuplicateDependencyKey { key, second_index, .. } => {
                prop_assert_eq!(key, original.key());
                prop_assert_eq!(second_index, base.len());
            }
            other => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn override_is_idempotent(base in base_strategy(), target in dependency_strategy(), binary in "[a-z]{1,8}") {
        let mut patch = DependencyOverride::new(target.id.clone());
        patch.platform = target.platform.clone();
        patch.binary_name = Some(binary);

        let once = DependencyRegistry::new(base.clone(), vec![patch.clone()]).unwrap();
        let twice = DependencyRegistry::new(base, vec![patch.clone(), patch]).unwrap();

        let once: Vec<_> = once.iter().cloned().collect();
        let twice: Vec<_> = twice.iter().cloned().collect();
        prop_assert_eq!(once, twice);
    }
}
