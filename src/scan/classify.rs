//! scan::classify
//!
//! Reachability classification: partition every stored object into
//! reachable and dangling sets.
//!
//! # Algorithm
//!
//! A single breadth-first traversal starting from every root id, following
//! commit-parent, commit-tree, tree-entry, and tag-target links. Every
//! visited id present in the store is marked reachable; everything else in
//! the store is dangling.
//!
//! # Invariants
//!
//! - `reachable` and `dangling` are disjoint and their union is exactly the
//!   stored id set
//! - A referenced child absent from the store is a dead edge, not an error
//!   (history may have been partially pruned)
//! - Each object is read at most once (the visited set memoizes)
//! - The result is deterministic for identical store state

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::core::object::{EntryKind, Object, ObjectKind, RootSet};
use crate::core::types::Oid;
use crate::git::{GitError, ObjectReader};

/// The reachable/dangling partition of a store.
#[derive(Debug, Default)]
pub struct Classification {
    /// Ids reachable from the root set (and present in the store).
    pub reachable: HashSet<Oid>,
    /// Ids present in the store but unreachable from any root.
    pub dangling: HashSet<Oid>,
    /// The commit-typed subset of `dangling`, ordered for determinism.
    pub dangling_commits: BTreeSet<Oid>,
}

impl Classification {
    /// Whether nothing dangles.
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
    }
}

/// Partition `all_ids` into reachable and dangling sets.
///
/// `roots` must be the snapshot captured at scan start; it is never
/// re-queried here.
///
/// # Errors
///
/// Only internal store failures propagate. Missing children are dead edges
/// and corrupt objects are treated as leaves (present, but contributing no
/// edges).
pub fn classify(
    store: &dyn ObjectReader,
    all_ids: &[(Oid, ObjectKind)],
    roots: &RootSet,
) -> Result<Classification, GitError> {
    let kinds: HashMap<&Oid, ObjectKind> =
        all_ids.iter().map(|(oid, kind)| (oid, *kind)).collect();

    let mut visited: HashSet<Oid> = HashSet::new();
    let mut reachable: HashSet<Oid> = HashSet::new();
    let mut queue: VecDeque<Oid> = roots.iter().cloned().collect();

    while let Some(oid) = queue.pop_front() {
        if !visited.insert(oid.clone()) {
            continue;
        }

        let object = match store.try_read(&oid) {
            Ok(Some(object)) => object,
            // Dead edge: a root or child already pruned from the store.
            Ok(None) => continue,
            // Corrupt objects exist in the store but cannot be walked.
            Err(GitError::Corrupt { .. }) => {
                if kinds.contains_key(&oid) {
                    reachable.insert(oid);
                }
                continue;
            }
            Err(err) => return Err(err),
        };

        reachable.insert(oid);

        match object {
            Object::Commit(commit) => {
                queue.push_back(commit.tree);
                queue.extend(commit.parents);
            }
            Object::Tree(tree) => {
                for entry in tree.entries {
                    // Submodule entries point outside this store.
                    if entry.kind != EntryKind::Commit {
                        queue.push_back(entry.oid);
                    }
                }
            }
            Object::Blob(_) => {}
            Object::Tag { target, .. } => queue.push_back(target),
        }
    }

    let mut dangling = HashSet::new();
    let mut dangling_commits = BTreeSet::new();
    for (oid, kind) in all_ids {
        if !reachable.contains(oid) {
            dangling.insert(oid.clone());
            if *kind == ObjectKind::Commit {
                dangling_commits.insert(oid.clone());
            }
        }
    }

    Ok(Classification {
        reachable,
        dangling,
        dangling_commits,
    })
}
