//! Property-based tests for manifest serialization and content digests.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeMap;
    use std::fs;

    use proptest::prelude::*;
    use serde_yaml::{Mapping, Value};

    use crate::digest::Digester;
    use crate::manifest::Manifest;
    use crate::plugins::registry::PluginRegistry;

    fn entry(format: &str, repos: &str, revision: Option<&str>) -> Value {
        let mut map = Mapping::new();
        map.insert("format".into(), format.into());
        map.insert("repos".into(), repos.into());
        if let Some(revision) = revision {
            map.insert("revision".into(), revision.into());
        }
        Value::Mapping(map)
    }

    prop_compose! {
        fn arb_manifest()(
            repositories in prop::collection::btree_map(
                "[a-z][a-z0-9_]{0,8}",
                (
                    prop::sample::select(vec!["git", "hg", "svn", "tar", "path"]),
                    "/[a-z]{1,6}(/[a-z0-9.]{1,6}){0,3}",
                    prop::option::of("[0-9a-f]{7,12}|HEAD"),
                ),
                1..6,
            ),
            pick in prop::collection::vec(any::<bool>(), 6),
        ) -> Manifest {
            let names: Vec<String> = repositories.keys().cloned().collect();
            let mut repos = Mapping::new();
            for (name, (format, url, revision)) in &repositories {
                repos.insert(name.as_str().into(), entry(format, url, revision.as_deref()));
            }
            let subset: Vec<Value> = names
                .iter()
                .zip(pick.iter())
                .filter(|(_, keep)| **keep)
                .map(|(name, _)| name.as_str().into())
                .collect();

            let mut configurations = Mapping::new();
            configurations.insert(
                "default".into(),
                Value::Sequence(names.iter().map(|n| n.as_str().into()).collect()),
            );
            configurations.insert("subset".into(), Value::Sequence(subset));

            let mut document = Mapping::new();
            document.insert("configurations".into(), Value::Mapping(configurations));
            document.insert("repositories".into(), Value::Mapping(repos));
            Manifest::from_value(Value::Mapping(document))
        }
    }

    proptest! {
        /// Property: dumping then parsing a manifest gives the same manifest
        #[test]
        fn dump_is_a_fixed_point(manifest in arb_manifest()) {
            let first = manifest.to_yaml_string().unwrap();
            let reparsed = Manifest::parse(&first, "dump").unwrap();
            prop_assert_eq!(&reparsed, &manifest);
            prop_assert_eq!(reparsed.to_yaml_string().unwrap(), first);
        }

        /// Property: generated manifests validate and keep declaration order
        #[test]
        fn configurations_keep_declaration_order(manifest in arb_manifest()) {
            manifest.validate(&PluginRegistry::with_builtins()).unwrap();
            let names = manifest.configuration("default").unwrap();
            let mut sorted = names.clone();
            sorted.sort();
            // keys come from a BTreeMap, so declaration order is sorted order
            prop_assert_eq!(names, sorted);
        }

        /// Property: overriding revisions only touches the named entries
        #[test]
        fn with_revisions_is_local(manifest in arb_manifest(), revision in "[0-9a-f]{40}") {
            let names = manifest.configuration("default").unwrap();
            let target = names[0].clone();
            let pinned = manifest.with_revisions(&[(target.as_str(), revision.as_str())]);

            let overridden = pinned.descriptor(&target).unwrap();
            prop_assert_eq!(overridden.revision(), revision.as_str());
            for name in names.iter().skip(1) {
                prop_assert_eq!(
                    pinned.descriptor(name).unwrap(),
                    manifest.descriptor(name).unwrap()
                );
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Property: the digest of a tree does not depend on creation order
        #[test]
        fn digest_ignores_creation_order(
            files in prop::collection::btree_map("[a-z]{1,6}", "[a-z ]{0,20}", 1..8),
        ) {
            let forward = tempfile::TempDir::new().unwrap();
            let backward = tempfile::TempDir::new().unwrap();
            let files: BTreeMap<String, String> = files;
            for (name, content) in &files {
                fs::write(forward.path().join(name), content).unwrap();
            }
            for (name, content) in files.iter().rev() {
                fs::write(backward.path().join(name), content).unwrap();
            }

            let digester = Digester::new().digest_content(true);
            let (a, _) = digester.digest_paths(forward.path(), &["."]).unwrap();
            let (b, _) = digester.digest_paths(backward.path(), &["."]).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
