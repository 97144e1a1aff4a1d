//! Property-based tests for normalization and resolution.

use std::path::Path;

use proptest::prelude::*;
use templar_render::{normalize, similarity, CandidatePackage, Resolver};

// ============================================================================
// Strategies
// ============================================================================

// Text biased towards the characters normalization cares about.
fn messy_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("\n".to_string()),
            Just("\r\n".to_string()),
            Just("\r".to_string()),
            Just("\t".to_string()),
            Just("  ".to_string()),
            "[a-z<>/{}]{1,6}",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

fn package_name() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

// ============================================================================
// Normalizer
// ============================================================================

proptest! {
    #[test]
    fn normalize_is_idempotent(text in messy_text()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_is_idempotent_on_any_string(text in any::<String>()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalized_text_has_canonical_shape(text in messy_text()) {
        let out = normalize(&text);
        prop_assert!(!out.contains('\r'));
        prop_assert!(!out.contains("\n\n\n"));
        prop_assert!(!out.starts_with('\n'));
        prop_assert!(!out.ends_with('\n'));
        for line in out.lines() {
            prop_assert_eq!(line.trim_end(), line);
            prop_assert!(!line.starts_with('\t'));
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

proptest! {
    #[test]
    fn exact_name_scores_one(name in package_name()) {
        prop_assert_eq!(similarity(&name, &name), 1.0);
    }

    #[test]
    fn resolution_is_deterministic(
        names in prop::collection::vec(package_name(), 1..8),
        ext in "[a-z]{1,5}",
    ) {
        let packages: Vec<_> = names
            .iter()
            .map(|n| CandidatePackage::new(n.as_str(), "", &["template"]))
            .collect();
        let resolver = Resolver::new(packages, |_: &str| true);
        let filename = format!("view.{ext}");

        let first = resolver.resolve(Some(Path::new(&filename))).unwrap();
        for _ in 0..3 {
            prop_assert_eq!(&resolver.resolve(Some(Path::new(&filename))).unwrap(), &first);
        }
    }

    #[test]
    fn matching_extension_wins_over_others(
        names in prop::collection::vec("[a-z]{2,8}", 0..6),
        target in "[a-z]{2,8}",
    ) {
        // Registered first, so a tie with a superstring name keeps it on top.
        let mut packages = vec![CandidatePackage::new(target.as_str(), "", &["template"])];
        packages.extend(
            names
                .iter()
                .filter(|n| **n != target)
                .map(|n| CandidatePackage::new(n.as_str(), "", &["template"])),
        );

        // An unknown extension yields one term, equal to the target's name.
        prop_assume!(templar_render::mime_type(&target).is_none());
        let resolver = Resolver::new(packages, |_: &str| true);
        let filename = format!("page.{target}");
        prop_assert_eq!(
            resolver.resolve(Some(Path::new(&filename))).unwrap(),
            Some(target.clone())
        );
    }
}
