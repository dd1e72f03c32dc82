//! core::object
//!
//! The object model for content-addressed store entries, and the root set
//! captured at the start of a scan.
//!
//! # Object kinds
//!
//! The store holds four kinds of objects. Commits, trees, and blobs carry
//! the content this tool recovers; annotated tags are followed only so their
//! targets count as reachable.
//!
//! # Root set
//!
//! [`RootSet`] is an immutable snapshot of every id directly named by a ref
//! (branch tips, tag tips, remote tips, HEAD) or by a reflog entry. It is
//! captured exactly once per scan: re-reading refs mid-traversal would let a
//! concurrent push corrupt the reachable/dangling partition.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Oid;

/// Object type tag as stored in the object database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
        };
        write!(f, "{s}")
    }
}

/// A parsed commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// This commit's id.
    pub oid: Oid,
    /// Parent commit ids, in recorded order.
    pub parents: Vec<Oid>,
    /// Root tree id.
    pub tree: Oid,
    /// Author name and email, as recorded.
    pub author: String,
    /// Author timestamp.
    pub author_time: DateTime<Utc>,
    /// Full commit message.
    pub message: String,
}

impl Commit {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Kind of a single tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A nested tree (directory).
    Tree,
    /// A blob (file contents).
    Blob,
    /// A submodule pointer. Never descended into: the referenced commit
    /// lives in a different repository.
    Commit,
}

/// One entry of a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry name within the tree.
    pub name: String,
    /// Id of the referenced object.
    pub oid: Oid,
    /// Raw file mode bits (e.g. 0o100644).
    pub mode: u32,
    /// Discriminates how the entry is traversed.
    pub kind: EntryKind,
}

/// A parsed tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    /// This tree's id.
    pub oid: Oid,
    /// Entries in recorded order.
    pub entries: Vec<TreeEntry>,
}

/// A blob object: raw bytes, no interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// This blob's id.
    pub oid: Oid,
    /// Raw content bytes.
    pub bytes: Vec<u8>,
}

/// A parsed object, discriminated by the store's type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Commit(Commit),
    Tree(Tree),
    Blob(Blob),
    /// An annotated tag; only the target matters for reachability.
    Tag {
        /// The tag object's own id.
        oid: Oid,
        /// The tagged object's id.
        target: Oid,
    },
}

impl Object {
    /// The object's own id.
    pub fn oid(&self) -> &Oid {
        match self {
            Object::Commit(c) => &c.oid,
            Object::Tree(t) => &t.oid,
            Object::Blob(b) => &b.oid,
            Object::Tag { oid, .. } => oid,
        }
    }

    /// The object's kind tag.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Commit(_) => ObjectKind::Commit,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tag { .. } => ObjectKind::Tag,
        }
    }
}

/// Snapshot of every id directly reachable from a ref or reflog entry.
///
/// Captured once per scan via [`crate::git::Git::list_roots`] and passed by
/// reference through the whole classification; never re-queried.
#[derive(Debug, Clone, Default)]
pub struct RootSet {
    ids: HashSet<Oid>,
}

impl RootSet {
    /// Create an empty root set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root set from an id collection.
    pub fn from_ids(ids: impl IntoIterator<Item = Oid>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Record an id as a root. Zero ids (null refs) are ignored.
    pub fn insert(&mut self, oid: Oid) {
        if !oid.is_zero() {
            self.ids.insert(oid);
        }
    }

    /// Whether the id is a root.
    pub fn contains(&self, oid: &Oid) -> bool {
        self.ids.contains(oid)
    }

    /// Number of distinct roots.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the snapshot holds no roots at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate over the root ids.
    pub fn iter(&self) -> impl Iterator<Item = &Oid> {
        self.ids.iter()
    }
}
