//! Property-based tests for image reference handling.
//!
//! These tests use proptest to generate references and verify that parsing,
//! normalization and path generation hold their invariants for all inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::reference::{normalize_registry, sanitize_registry_for_path, ImageReference};
    use crate::strategy::{Flat, PathStrategy, PrefixSourceRegistry};
    use proptest::prelude::*;

    fn registry() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{1,7}\\.(io|com|local)(:[0-9]{2,4})?"
            .prop_filter("docker.io expands single-component names", |r| r != "docker.io")
    }

    fn repository() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,8}(/[a-z0-9]{1,8}){0,2}"
    }

    fn identifier() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            "[A-Za-z0-9_][A-Za-z0-9_.-]{0,20}".prop_map(|tag| Some(format!(":{}", tag))),
            "[a-f0-9]{64}".prop_map(|hex| Some(format!("@sha256:{}", hex))),
        ]
    }

    fn reference_text() -> impl Strategy<Value = String> {
        (registry(), repository(), identifier()).prop_map(|(registry, repository, id)| {
            format!("{}/{}{}", registry, repository, id.unwrap_or_default())
        })
    }

    // ============================================================================
    // ImageReference::parse property tests
    // ============================================================================

    proptest! {
        /// Property: a fully qualified reference renders back to its input
        #[test]
        fn parse_display_is_identity_for_qualified_references(text in reference_text()) {
            let reference = ImageReference::parse(&text).unwrap();
            prop_assert_eq!(reference.to_string(), text);
        }

        /// Property: parsing the rendered form of any accepted input is stable
        #[test]
        fn parse_of_display_is_stable(input in "[a-zA-Z0-9./:@_-]{0,40}") {
            if let Ok(reference) = ImageReference::parse(&input) {
                let reparsed = ImageReference::parse(&reference.to_string());
                prop_assert_eq!(reparsed, Ok(reference));
            }
        }

        /// Property: parse never yields both a tag and a digest
        #[test]
        fn parse_never_yields_tag_and_digest(input in "[a-z0-9./:@_-]{0,80}") {
            if let Ok(reference) = ImageReference::parse(&input) {
                prop_assert!(reference.tag().is_none() || reference.digest().is_none());
            }
        }

        /// Property: with_default_tag always leaves an identifier and is idempotent
        #[test]
        fn default_tag_is_idempotent(text in reference_text()) {
            let once = ImageReference::parse(&text).unwrap().with_default_tag();
            prop_assert!(once.tag().is_some() || once.digest().is_some());
            prop_assert_eq!(once.clone().with_default_tag(), once);
        }
    }

    // ============================================================================
    // Registry normalization property tests
    // ============================================================================

    proptest! {
        /// Property: normalize_registry is idempotent
        #[test]
        fn normalize_registry_is_idempotent(input in "(https?://)?[a-zA-Z0-9.:-]{0,30}/{0,2}") {
            let once = normalize_registry(&input);
            prop_assert_eq!(normalize_registry(&once), once);
        }

        /// Property: sanitized registries are a single path component without dots or colons
        #[test]
        fn sanitized_registry_is_path_safe(input in registry()) {
            let sanitized = sanitize_registry_for_path(&input);
            prop_assert!(!sanitized.contains('.'));
            prop_assert!(!sanitized.contains(':'));
            prop_assert!(!sanitized.contains('/'));
        }
    }

    // ============================================================================
    // Path strategy property tests
    // ============================================================================

    proptest! {
        /// Property: the default strategy keeps the full source repository as suffix
        #[test]
        fn prefix_strategy_keeps_repository(text in reference_text()) {
            let reference = ImageReference::parse(&text).unwrap();
            let path = PrefixSourceRegistry.generate_path(&reference, None);
            let suffix = format!("/{}", reference.repository());
            prop_assert!(path.ends_with(&suffix));
            prop_assert!(!path.starts_with('/'));
        }

        /// Property: path generation is deterministic
        #[test]
        fn strategies_are_deterministic(text in reference_text(), prefix in proptest::option::of("[a-z]{1,8}")) {
            let reference = ImageReference::parse(&text).unwrap();
            for strategy in [&PrefixSourceRegistry as &dyn PathStrategy, &Flat] {
                prop_assert_eq!(
                    strategy.generate_path(&reference, prefix.as_deref()),
                    strategy.generate_path(&reference, prefix.as_deref())
                );
            }
        }

        /// Property: the flat strategy never nests below the prefix
        #[test]
        fn flat_strategy_is_one_level_deep(text in reference_text(), prefix in "[a-z]{1,8}") {
            let reference = ImageReference::parse(&text).unwrap();
            let path = Flat.generate_path(&reference, Some(&prefix));
            prop_assert_eq!(path.matches('/').count(), 1);
        }
    }
}
