//! scan::lineage
//!
//! Lineage reconstruction: assemble the full accessible content graph of a
//! dangling commit.
//!
//! # Algorithm
//!
//! Starting at a dangling head commit, walk parent links; for each visited
//! commit, also walk its tree to enumerate blob and tree descendants. The
//! walk stops descending into any id the classifier marked reachable (that
//! content belongs to live history) and deduplicates objects reachable via
//! multiple paths.
//!
//! Missing objects (already pruned) truncate that branch of the walk
//! silently: the lineage records the truncation instead of failing.
//!
//! # Parallelism
//!
//! Reconstruction of distinct heads is independent; [`reconstruct_all`]
//! fans heads out over a scoped worker pool. Each worker opens its own
//! store handle because a repository handle cannot be shared across
//! threads.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::object::{Commit, EntryKind, Object};
use crate::core::types::Oid;
use crate::git::{Git, GitError, ObjectReader};
use crate::scan::CancelFlag;

/// State of one parent link of a lineage commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "oid")]
pub enum ParentLink {
    /// Parent is dangling too and was walked into this lineage.
    Followed(Oid),
    /// Parent belongs to live history; the walk stopped there.
    Reachable(Oid),
    /// Parent is gone from the store (pruned); this branch is truncated.
    Missing(Oid),
}

/// One commit captured in a lineage.
#[derive(Debug, Clone, Serialize)]
pub struct CommitNode {
    /// The commit id.
    pub oid: Oid,
    /// Author name and email.
    pub author: String,
    /// Author timestamp.
    pub author_time: chrono::DateTime<chrono::Utc>,
    /// First line of the commit message.
    pub summary: String,
    /// Parent links with their walk state.
    pub parents: Vec<ParentLink>,
    /// Root tree id.
    pub tree: Oid,
    /// Whether any branch below this commit was cut short by a missing
    /// parent or missing tree content.
    pub truncated: bool,
}

/// A blob captured from a lineage, with the first path it was seen under.
#[derive(Debug, Clone)]
pub struct BlobRecord {
    /// The blob id.
    pub oid: Oid,
    /// Path within the first tree that referenced it.
    pub path: String,
    /// Raw content bytes as stored.
    pub bytes: Vec<u8>,
}

/// The reconstructed content graph of one dangling head commit.
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    /// Commits in walk order, head first.
    pub commits: Vec<CommitNode>,
    /// Dangling tree ids captured along the way.
    pub trees: Vec<Oid>,
    /// Dangling blobs with their content.
    pub blobs: Vec<BlobRecord>,
    /// Whether any branch of the walk was truncated by a missing object.
    pub truncated: bool,
}

impl Lineage {
    /// The head commit node, if the head itself could be read.
    pub fn head(&self) -> Option<&CommitNode> {
        self.commits.first()
    }
}

/// Reconstruct the lineage of one dangling head commit.
///
/// `reachable` is the classifier's live set; the walk never descends into
/// it. Missing objects truncate branches rather than erroring.
pub fn reconstruct(
    store: &dyn ObjectReader,
    head: &Oid,
    reachable: &HashSet<Oid>,
) -> Result<Lineage, GitError> {
    let mut lineage = Lineage::default();
    let mut visited_commits: HashSet<Oid> = HashSet::new();
    let mut visited_trees: HashSet<Oid> = HashSet::new();
    let mut visited_blobs: HashSet<Oid> = HashSet::new();
    let mut queue: VecDeque<Oid> = VecDeque::from([head.clone()]);

    while let Some(oid) = queue.pop_front() {
        if reachable.contains(&oid) || !visited_commits.insert(oid.clone()) {
            continue;
        }

        let commit = match read_commit(store, &oid)? {
            Some(commit) => commit,
            None => {
                // The head itself can vanish between classification and
                // reconstruction if a GC runs concurrently.
                lineage.truncated = true;
                continue;
            }
        };

        let mut node_truncated = false;
        let mut parents = Vec::with_capacity(commit.parents.len());
        for parent in &commit.parents {
            if reachable.contains(parent) {
                parents.push(ParentLink::Reachable(parent.clone()));
            } else {
                match store.try_read(parent) {
                    Ok(Some(_)) => {
                        parents.push(ParentLink::Followed(parent.clone()));
                        queue.push_back(parent.clone());
                    }
                    Ok(None) => {
                        parents.push(ParentLink::Missing(parent.clone()));
                        node_truncated = true;
                    }
                    Err(GitError::Corrupt { .. }) => {
                        parents.push(ParentLink::Missing(parent.clone()));
                        node_truncated = true;
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        let tree_truncated = walk_tree(
            store,
            &commit.tree,
            reachable,
            &mut visited_trees,
            &mut visited_blobs,
            &mut lineage,
        )?;

        let truncated = node_truncated || tree_truncated;
        let summary = commit.summary().to_string();
        lineage.truncated |= truncated;
        lineage.commits.push(CommitNode {
            oid: commit.oid,
            author: commit.author,
            author_time: commit.author_time,
            summary,
            parents,
            tree: commit.tree,
            truncated,
        });
    }

    Ok(lineage)
}

/// Read a commit, treating absence and corruption as `None`.
fn read_commit(store: &dyn ObjectReader, oid: &Oid) -> Result<Option<Commit>, GitError> {
    match store.try_read(oid) {
        Ok(Some(Object::Commit(commit))) => Ok(Some(commit)),
        Ok(Some(_)) | Ok(None) => Ok(None),
        Err(GitError::Corrupt { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Walk a tree, capturing dangling trees and blobs. Returns whether any
/// referenced object was missing.
fn walk_tree(
    store: &dyn ObjectReader,
    root: &Oid,
    reachable: &HashSet<Oid>,
    visited_trees: &mut HashSet<Oid>,
    visited_blobs: &mut HashSet<Oid>,
    lineage: &mut Lineage,
) -> Result<bool, GitError> {
    let mut truncated = false;
    let mut queue: VecDeque<(Oid, String)> = VecDeque::from([(root.clone(), String::new())]);

    while let Some((oid, prefix)) = queue.pop_front() {
        if reachable.contains(&oid) || !visited_trees.insert(oid.clone()) {
            continue;
        }

        let tree = match store.try_read(&oid) {
            Ok(Some(Object::Tree(tree))) => tree,
            Ok(Some(_)) | Ok(None) => {
                truncated = true;
                continue;
            }
            Err(GitError::Corrupt { .. }) => {
                truncated = true;
                continue;
            }
            Err(err) => return Err(err),
        };

        lineage.trees.push(tree.oid.clone());

        for entry in tree.entries {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };
            match entry.kind {
                EntryKind::Tree => queue.push_back((entry.oid, path)),
                EntryKind::Commit => {} // submodule pointer, out of scope
                EntryKind::Blob => {
                    if reachable.contains(&entry.oid) || !visited_blobs.insert(entry.oid.clone()) {
                        continue;
                    }
                    match store.try_read(&entry.oid) {
                        Ok(Some(Object::Blob(blob))) => {
                            lineage.blobs.push(BlobRecord {
                                oid: blob.oid,
                                path,
                                bytes: blob.bytes,
                            });
                        }
                        Ok(Some(_)) | Ok(None) => truncated = true,
                        Err(GitError::Corrupt { .. }) => truncated = true,
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }

    Ok(truncated)
}

/// Find the dangling head commits: dangling commits that are not a parent
/// of any other dangling commit. Each corresponds to the tip of an erased
/// branch or force-pushed segment.
///
/// Commits whose object cannot be read any more are reported as heads so
/// the failure stays visible in the report.
pub fn dangling_heads(
    store: &dyn ObjectReader,
    dangling_commits: &BTreeSet<Oid>,
) -> Result<BTreeSet<Oid>, GitError> {
    let mut interior: HashSet<Oid> = HashSet::new();
    for oid in dangling_commits {
        if let Some(commit) = read_commit(store, oid)? {
            for parent in commit.parents {
                if dangling_commits.contains(&parent) {
                    interior.insert(parent);
                }
            }
        }
    }
    Ok(dangling_commits
        .iter()
        .filter(|oid| !interior.contains(*oid))
        .cloned()
        .collect())
}

/// What the worker pool produced: one lineage per head it could walk, plus
/// the heads it could not.
#[derive(Debug, Default)]
pub struct Reconstruction {
    /// Successfully walked lineages, keyed by head.
    pub lineages: HashMap<Oid, Lineage>,
    /// Heads whose walk hit an isolated store error, with the error. The
    /// aggregator still emits a stub report for each; the runner logs them.
    pub failures: Vec<(Oid, GitError)>,
}

/// Reconstruct lineages for every head, fanned out over a worker pool.
///
/// Each worker reopens the store at `git_dir`. Heads whose reconstruction
/// fails with an isolated store error are collected into
/// [`Reconstruction::failures`] rather than aborting the scan; only
/// repository-level failures propagate.
pub fn reconstruct_all(
    git_dir: &Path,
    heads: &BTreeSet<Oid>,
    reachable: &HashSet<Oid>,
    workers: usize,
    cancel: &CancelFlag,
) -> Result<Reconstruction, GitError> {
    let workers = workers.clamp(1, heads.len().max(1));
    let queue: Mutex<Vec<Oid>> = Mutex::new(heads.iter().cloned().collect());
    let results: Mutex<HashMap<Oid, Lineage>> = Mutex::new(HashMap::new());
    let failures: Mutex<Vec<(Oid, GitError)>> = Mutex::new(Vec::new());
    let fatal: Mutex<Option<GitError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let git = match Git::open(git_dir) {
                    Ok(git) => git,
                    Err(err) => {
                        let mut slot = fatal.lock().expect("fatal slot poisoned");
                        slot.get_or_insert(err);
                        return;
                    }
                };
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let head = {
                        let mut q = queue.lock().expect("work queue poisoned");
                        match q.pop() {
                            Some(head) => head,
                            None => return,
                        }
                    };
                    match reconstruct(&git, &head, reachable) {
                        Ok(lineage) => {
                            let mut map = results.lock().expect("result map poisoned");
                            map.insert(head, lineage);
                        }
                        // Isolated failure: record it against the head so
                        // the runner can log it, rather than aborting the
                        // scan.
                        Err(err) => {
                            let mut list = failures.lock().expect("failure list poisoned");
                            list.push((head, err));
                        }
                    }
                }
            });
        }
    });

    if let Some(err) = fatal.into_inner().expect("fatal slot poisoned") {
        return Err(err);
    }
    Ok(Reconstruction {
        lineages: results.into_inner().expect("result map poisoned"),
        failures: failures.into_inner().expect("failure list poisoned"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MemoryStore;

    #[test]
    fn reconstruct_captures_commits_trees_blobs() {
        let mut store = MemoryStore::new();
        let secret = store.add_blob(b"SECRET=xyz");
        let tree = store.add_tree(&[("config", secret.clone())]);
        let head = store.add_commit(&[], tree.clone(), "oops\n\ndetails", 100);

        let lineage = reconstruct(&store, &head, &HashSet::new()).unwrap();

        assert_eq!(lineage.commits.len(), 1);
        assert_eq!(lineage.commits[0].summary, "oops");
        assert_eq!(lineage.trees, vec![tree]);
        assert_eq!(lineage.blobs.len(), 1);
        assert_eq!(lineage.blobs[0].path, "config");
        assert_eq!(lineage.blobs[0].bytes, b"SECRET=xyz");
        assert!(!lineage.truncated);
    }

    #[test]
    fn stops_at_reachable_history() {
        let mut store = MemoryStore::new();
        let live_blob = store.add_blob(b"live");
        let live_tree = store.add_tree(&[("f", live_blob.clone())]);
        let live = store.add_commit(&[], live_tree.clone(), "live", 100);

        let secret = store.add_blob(b"SECRET=xyz");
        let tree = store.add_tree(&[("config", secret)]);
        let head = store.add_commit(&[live.clone()], tree, "dangling", 200);

        let reachable: HashSet<Oid> =
            [live.clone(), live_tree, live_blob].into_iter().collect();
        let lineage = reconstruct(&store, &head, &reachable).unwrap();

        assert_eq!(lineage.commits.len(), 1);
        assert_eq!(
            lineage.commits[0].parents,
            vec![ParentLink::Reachable(live)]
        );
        assert!(!lineage.truncated);
    }

    #[test]
    fn missing_parent_marks_branch_truncated() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(b"x");
        let tree = store.add_tree(&[("f", blob)]);
        let parent = store.add_commit(&[], tree.clone(), "old", 10);
        let head = store.add_commit(&[parent.clone()], tree, "new", 20);
        store.remove(&parent);

        let lineage = reconstruct(&store, &head, &HashSet::new()).unwrap();

        assert!(lineage.truncated);
        assert_eq!(lineage.commits.len(), 1);
        assert_eq!(
            lineage.commits[0].parents,
            vec![ParentLink::Missing(parent)]
        );
        assert!(lineage.commits[0].truncated);
    }

    #[test]
    fn deduplicates_shared_subtrees() {
        let mut store = MemoryStore::new();
        let shared = store.add_blob(b"shared");
        let tree_a = store.add_tree(&[("a", shared.clone())]);
        let tree_b = store.add_tree(&[("b", shared.clone())]);
        let first = store.add_commit(&[], tree_a, "first", 10);
        let head = store.add_commit(&[first], tree_b, "second", 20);

        let lineage = reconstruct(&store, &head, &HashSet::new()).unwrap();

        assert_eq!(lineage.commits.len(), 2);
        let shared_count = lineage.blobs.iter().filter(|b| b.oid == shared).count();
        assert_eq!(shared_count, 1);
    }

    #[test]
    fn nested_tree_paths_are_joined() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(b"deep");
        let inner = store.add_tree(&[("file.txt", blob)]);
        let outer = store.add_tree(&[("dir", inner)]);
        let head = store.add_commit(&[], outer, "nested", 10);

        let lineage = reconstruct(&store, &head, &HashSet::new()).unwrap();
        assert_eq!(lineage.blobs[0].path, "dir/file.txt");
    }

    #[test]
    fn heads_exclude_interior_commits() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(b"x");
        let tree = store.add_tree(&[("f", blob)]);
        let a = store.add_commit(&[], tree.clone(), "a", 10);
        let b = store.add_commit(&[a.clone()], tree.clone(), "b", 20);
        let c = store.add_commit(&[b.clone()], tree, "c", 30);

        let dangling: BTreeSet<Oid> = [a, b, c.clone()].into_iter().collect();
        let heads = dangling_heads(&store, &dangling).unwrap();

        assert_eq!(heads.iter().collect::<Vec<_>>(), vec![&c]);
    }

    #[test]
    fn two_erased_branches_yield_two_heads() {
        let mut store = MemoryStore::new();
        let blob = store.add_blob(b"x");
        let tree = store.add_tree(&[("f", blob)]);
        let base = store.add_commit(&[], tree.clone(), "base", 10);
        let left = store.add_commit(&[base.clone()], tree.clone(), "left", 20);
        let right = store.add_commit(&[base.clone()], tree, "right", 30);

        let dangling: BTreeSet<Oid> =
            [base, left.clone(), right.clone()].into_iter().collect();
        let heads = dangling_heads(&store, &dangling).unwrap();

        let expected: BTreeSet<Oid> = [left, right].into_iter().collect();
        assert_eq!(heads, expected);
    }
}
