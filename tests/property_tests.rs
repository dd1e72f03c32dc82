//! Property-based tests for classification and lineage reconstruction.
//!
//! These tests use proptest to verify invariants hold across randomly
//! generated commit graphs backed by the in-memory store.

use std::collections::HashSet;

use proptest::prelude::*;

use dredge::core::object::{Object, RootSet};
use dredge::core::types::Oid;
use dredge::git::{MemoryStore, ObjectReader};
use dredge::scan::{classify, dangling_heads, reconstruct};

/// Shape of a random commit graph: for each commit, the indices of its
/// parents among earlier commits, plus which commits are rooted.
#[derive(Debug, Clone)]
struct GraphSpec {
    parent_picks: Vec<Vec<prop::sample::Index>>,
    root_picks: Vec<prop::sample::Index>,
}

fn graph_spec() -> impl Strategy<Value = GraphSpec> {
    (2usize..15).prop_flat_map(|n| {
        (
            prop::collection::vec(
                prop::collection::vec(any::<prop::sample::Index>(), 0..3),
                n,
            ),
            prop::collection::vec(any::<prop::sample::Index>(), 1..4),
        )
            .prop_map(|(parent_picks, root_picks)| GraphSpec {
                parent_picks,
                root_picks,
            })
    })
}

/// Materialize a spec into a store with one blob/tree per commit.
fn build(spec: &GraphSpec) -> (MemoryStore, Vec<Oid>, RootSet) {
    let mut store = MemoryStore::new();
    let mut commits: Vec<Oid> = Vec::new();

    for (i, picks) in spec.parent_picks.iter().enumerate() {
        let blob = store.add_blob(format!("content {i}").as_bytes());
        let tree = store.add_tree(&[("file.txt", blob)]);

        let mut parents: Vec<Oid> = Vec::new();
        if i > 0 {
            for pick in picks {
                let parent = commits[pick.index(i)].clone();
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        commits.push(store.add_commit(&parents, tree, &format!("commit {i}"), i as i64 * 60));
    }

    let roots = RootSet::from_ids(
        spec.root_picks
            .iter()
            .map(|pick| commits[pick.index(commits.len())].clone()),
    );
    (store, commits, roots)
}

proptest! {
    /// Reachable and dangling always partition the store exactly.
    #[test]
    fn classification_partitions_the_store(spec in graph_spec()) {
        let (store, _, roots) = build(&spec);
        let all = store.all_ids();
        let cls = classify(&store, &all, &roots).unwrap();

        prop_assert_eq!(cls.reachable.len() + cls.dangling.len(), all.len());
        for (oid, _) in &all {
            prop_assert!(cls.reachable.contains(oid) ^ cls.dangling.contains(oid));
        }
    }

    /// Every rooted commit is reachable.
    #[test]
    fn roots_are_never_dangling(spec in graph_spec()) {
        let (store, _, roots) = build(&spec);
        let cls = classify(&store, &store.all_ids(), &roots).unwrap();
        for oid in roots.iter() {
            prop_assert!(cls.reachable.contains(oid));
        }
    }

    /// The reachable set is closed: every stored child of a reachable
    /// commit or tree is itself reachable.
    #[test]
    fn reachable_set_is_closed(spec in graph_spec()) {
        let (store, _, roots) = build(&spec);
        let cls = classify(&store, &store.all_ids(), &roots).unwrap();

        for oid in &cls.reachable {
            match store.try_read(oid).unwrap() {
                Some(Object::Commit(commit)) => {
                    prop_assert!(cls.reachable.contains(&commit.tree));
                    for parent in &commit.parents {
                        prop_assert!(cls.reachable.contains(parent));
                    }
                }
                Some(Object::Tree(tree)) => {
                    for entry in &tree.entries {
                        prop_assert!(cls.reachable.contains(&entry.oid));
                    }
                }
                _ => {}
            }
        }
    }

    /// Lineages never leak live history and never duplicate objects.
    #[test]
    fn lineages_are_deduplicated_and_disjoint_from_live(spec in graph_spec()) {
        let (store, _, roots) = build(&spec);
        let cls = classify(&store, &store.all_ids(), &roots).unwrap();
        let heads = dangling_heads(&store, &cls.dangling_commits).unwrap();

        for head in &heads {
            let lineage = reconstruct(&store, head, &cls.reachable).unwrap();
            prop_assert!(!lineage.truncated);

            let mut seen = HashSet::new();
            for node in &lineage.commits {
                prop_assert!(seen.insert(node.oid.clone()), "duplicate commit in lineage");
                prop_assert!(!cls.reachable.contains(&node.oid));
            }
            let mut blob_ids = HashSet::new();
            for blob in &lineage.blobs {
                prop_assert!(blob_ids.insert(blob.oid.clone()), "duplicate blob in lineage");
                prop_assert!(!cls.reachable.contains(&blob.oid));
            }
        }
    }

    /// No dangling head is the parent of another dangling commit.
    #[test]
    fn heads_are_tips_of_dangling_history(spec in graph_spec()) {
        let (store, _, roots) = build(&spec);
        let cls = classify(&store, &store.all_ids(), &roots).unwrap();
        let heads = dangling_heads(&store, &cls.dangling_commits).unwrap();

        for oid in &cls.dangling_commits {
            if let Some(Object::Commit(commit)) = store.try_read(oid).unwrap() {
                for parent in &commit.parents {
                    prop_assert!(!heads.contains(parent));
                }
            }
        }
    }
}

/// Strategy for generating valid hex OIDs.
fn valid_oid_string() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
        ]),
        40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    /// Any valid hex oid round-trips through serde.
    #[test]
    fn oid_serde_roundtrip(hex in valid_oid_string()) {
        let oid = Oid::new(&hex).unwrap();
        let json = serde_json::to_string(&oid).unwrap();
        let parsed: Oid = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(oid, parsed);
    }

    /// Uppercase input normalizes to the same oid.
    #[test]
    fn oid_is_case_insensitive(hex in valid_oid_string()) {
        let lower = Oid::new(&hex).unwrap();
        let upper = Oid::new(hex.to_ascii_uppercase()).unwrap();
        prop_assert_eq!(lower, upper);
    }
}
