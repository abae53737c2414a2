//! Property-based tests for settings merge and rendering.
//!
//! These tests use proptest to generate random documents and verify that
//! the layering invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::settings::{CanonicalConfig, SettingValue};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Dotted keys drawn from a small alphabet so generated layers overlap.
    fn key_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 1..=3)
            .prop_map(|segments| segments.join("."))
    }

    fn scalar_strategy() -> impl Strategy<Value = SettingValue> {
        prop_oneof![
            "[a-z0-9]{0,8}".prop_map(SettingValue::String),
            any::<bool>().prop_map(SettingValue::Bool),
            any::<i64>().prop_map(SettingValue::Integer),
        ]
    }

    /// A document whose leaves all sit at depth 3, so any two generated
    /// documents agree on shape and can always be merged.
    fn uniform_document() -> impl Strategy<Value = BTreeMap<String, SettingValue>> {
        let leaf_key = prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 3)
            .prop_map(|segments| segments.join("."));
        prop::collection::btree_map(leaf_key, scalar_strategy(), 0..8)
    }

    fn build(entries: &BTreeMap<String, SettingValue>) -> CanonicalConfig {
        CanonicalConfig::from_entries(entries.iter().map(|(k, v)| (k.as_str(), v.clone())))
            .expect("uniform documents are well-formed")
    }

    proptest! {
        /// Property: the last layer defining a key decides its value
        #[test]
        fn merge_precedence(
            defaults in uniform_document(),
            association in uniform_document(),
            user in uniform_document(),
        ) {
            let mut merged = build(&defaults);
            merged.merge_with(&[&build(&association), &build(&user)]).unwrap();

            let keys = defaults.keys().chain(association.keys()).chain(user.keys());
            for key in keys {
                let expected = user
                    .get(key)
                    .or_else(|| association.get(key))
                    .or_else(|| defaults.get(key));
                prop_assert_eq!(merged.get(key), expected, "key {}", key);
            }
        }

        /// Property: merging never drops keys from either side
        #[test]
        fn merge_is_deep_union(left in uniform_document(), right in uniform_document()) {
            let mut merged = build(&left);
            merged.merge_with(&[&build(&right)]).unwrap();

            let mut expected: Vec<String> = left.keys().chain(right.keys()).cloned().collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(merged.leaf_paths(), expected);
        }

        /// Property: rendering does not depend on insertion order
        #[test]
        fn render_is_order_independent(entries in uniform_document()) {
            let forward = build(&entries);
            let reversed = CanonicalConfig::from_entries(
                entries.iter().rev().map(|(k, v)| (k.as_str(), v.clone())),
            )
            .unwrap();
            prop_assert_eq!(forward.render().unwrap(), reversed.render().unwrap());
        }

        /// Property: a rendered document parses back to itself
        #[test]
        fn render_round_trips(entries in uniform_document()) {
            let cfg = build(&entries);
            let rendered = String::from_utf8(cfg.render().unwrap()).unwrap();
            prop_assert_eq!(CanonicalConfig::from_yaml_str(&rendered).unwrap(), cfg);
        }

        /// Property: parsing arbitrary dotted keys never panics
        #[test]
        fn parse_never_panics(keys in prop::collection::vec(key_strategy(), 0..6)) {
            let yaml: String = keys.iter().map(|k| format!("{}: 1\n", k)).collect();
            let _ = CanonicalConfig::from_yaml_str(&yaml);
        }
    }
}
