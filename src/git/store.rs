//! git::store
//!
//! The `ObjectReader` seam and an in-memory store for deterministic tests.
//!
//! # Design
//!
//! The classifier and lineage reconstructor only need one capability from
//! the store: read an object by id. Putting that behind a trait keeps the
//! graph logic independently testable against synthetic stores, the same
//! way the activity correlator is testable against [`crate::forge::mock`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::interface::{Git, GitError};
use crate::core::object::{Blob, Commit, EntryKind, Object, ObjectKind, Tree, TreeEntry};
use crate::core::types::Oid;

/// Read access to a content-addressed object store.
pub trait ObjectReader {
    /// Read and parse one object.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the id is absent
    /// - [`GitError::Corrupt`] if the bytes do not parse as the declared type
    fn read(&self, oid: &Oid) -> Result<Object, GitError>;

    /// Read an object, mapping absence to `None`.
    ///
    /// Traversals use this to treat pruned children as dead edges rather
    /// than errors.
    fn try_read(&self, oid: &Oid) -> Result<Option<Object>, GitError> {
        match self.read(oid) {
            Ok(object) => Ok(Some(object)),
            Err(GitError::ObjectNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl ObjectReader for Git {
    fn read(&self, oid: &Oid) -> Result<Object, GitError> {
        self.read_object(oid)
    }
}

/// In-memory object store for deterministic testing.
///
/// Build a synthetic object graph with the `add_*` helpers, then run the
/// classifier or reconstructor against it.
///
/// # Example
///
/// ```
/// use dredge::git::{MemoryStore, ObjectReader};
/// use dredge::core::types::Oid;
///
/// let mut store = MemoryStore::new();
/// let blob = store.add_blob(b"SECRET=xyz");
/// let tree = store.add_tree(&[("config", blob.clone())]);
/// let commit = store.add_commit(&[], tree, "initial", 1_700_000_000);
///
/// assert!(store.read(&commit).is_ok());
/// assert!(store.read(&Oid::zero()).is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    objects: HashMap<Oid, Object>,
    next_id: u64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh synthetic oid.
    fn mint_oid(&mut self) -> Oid {
        self.next_id += 1;
        Oid::new(format!("{:040x}", self.next_id)).expect("synthetic oid is valid hex")
    }

    /// Insert a pre-built object under its own id.
    pub fn insert(&mut self, object: Object) {
        self.objects.insert(object.oid().clone(), object);
    }

    /// Remove an object, simulating garbage collection. Returns whether it
    /// was present.
    pub fn remove(&mut self, oid: &Oid) -> bool {
        self.objects.remove(oid).is_some()
    }

    /// Add a blob with the given bytes, returning its id.
    pub fn add_blob(&mut self, bytes: &[u8]) -> Oid {
        let oid = self.mint_oid();
        self.insert(Object::Blob(Blob {
            oid: oid.clone(),
            bytes: bytes.to_vec(),
        }));
        oid
    }

    /// Add a tree with named blob/tree entries, returning its id.
    ///
    /// Entry kinds are inferred from what the referenced id resolves to at
    /// insertion time (defaulting to blob for unknown ids).
    pub fn add_tree(&mut self, entries: &[(&str, Oid)]) -> Oid {
        let oid = self.mint_oid();
        let entries = entries
            .iter()
            .map(|(name, child)| {
                let kind = match self.objects.get(child).map(Object::kind) {
                    Some(ObjectKind::Tree) => EntryKind::Tree,
                    Some(ObjectKind::Commit) => EntryKind::Commit,
                    _ => EntryKind::Blob,
                };
                let mode = match kind {
                    EntryKind::Tree => 0o40000,
                    EntryKind::Commit => 0o160000,
                    EntryKind::Blob => 0o100644,
                };
                TreeEntry {
                    name: (*name).to_string(),
                    oid: child.clone(),
                    mode,
                    kind,
                }
            })
            .collect();
        self.insert(Object::Tree(Tree {
            oid: oid.clone(),
            entries,
        }));
        oid
    }

    /// Add a commit, returning its id.
    pub fn add_commit(
        &mut self,
        parents: &[Oid],
        tree: Oid,
        message: &str,
        author_secs: i64,
    ) -> Oid {
        let oid = self.mint_oid();
        self.insert(Object::Commit(Commit {
            oid: oid.clone(),
            parents: parents.to_vec(),
            tree,
            author: "Test Author <test@example.com>".to_string(),
            author_time: timestamp(author_secs),
            message: message.to_string(),
        }));
        oid
    }

    /// Add an annotated tag pointing at `target`, returning the tag id.
    pub fn add_tag(&mut self, target: Oid) -> Oid {
        let oid = self.mint_oid();
        self.insert(Object::Tag {
            oid: oid.clone(),
            target,
        });
        oid
    }

    /// Every stored id with its kind, in unspecified order.
    pub fn all_ids(&self) -> Vec<(Oid, ObjectKind)> {
        self.objects
            .iter()
            .map(|(oid, object)| (oid.clone(), object.kind()))
            .collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectReader for MemoryStore {
    fn read(&self, oid: &Oid) -> Result<Object, GitError> {
        self.objects
            .get(oid)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound {
                oid: oid.to_string(),
            })
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
