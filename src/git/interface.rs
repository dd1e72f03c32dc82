//! git::interface
//!
//! Object store access implementation using git2.
//!
//! This module provides the **single doorway** to the local object store.
//! All store interactions flow through this interface, which provides
//! structured results and normalizes errors into typed failure categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to interact with a repository.
//! No other module should import `git2` directly. This ensures:
//!
//! - Consistent error handling across all store operations
//! - Strong type guarantees at the boundary
//! - A read-only surface: no ref or object mutation API is exposed
//!
//! # Error Handling
//!
//! Store errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: the path cannot be opened as a repository (fatal)
//! - [`GitError::ObjectNotFound`]: a requested object is absent from the store
//! - [`GitError::Corrupt`]: stored bytes do not parse as the declared type
//!
//! Only `NotARepo` aborts a scan; the other variants isolate to the object
//! or lineage branch they occur on.
//!
//! # Example
//!
//! ```ignore
//! use dredge::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let all = git.list_all_object_ids()?;
//! let roots = git.list_roots()?;
//! println!("{} objects, {} roots", all.len(), roots.len());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::object::{Blob, Commit, EntryKind, Object, ObjectKind, RootSet, Tree, TreeEntry};
use crate::core::types::{Oid, TypeError};

/// Errors from object store operations.
///
/// The categorization enables proper error handling at higher layers:
/// the scan treats `ObjectNotFound` as a dead edge and `Corrupt` as a
/// truncation point, while `NotARepo` aborts before any traversal.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path cannot be opened as a Git repository. Fatal.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Object not found in the store.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Stored bytes do not parse as a well-formed object of the declared type.
    #[error("corrupt object {oid}: {message}")]
    Corrupt {
        /// The OID of the corrupt object
        oid: String,
        /// Description of the parse failure
        message: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with object context.
    fn from_git2(err: git2::Error, oid: &Oid) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: oid.to_string(),
            },
            git2::ErrorCode::Invalid => GitError::Corrupt {
                oid: oid.to_string(),
                message: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::InvalidOid {
            oid: err.to_string(),
        }
    }
}

/// Convert a git2 oid into the domain type.
fn oid_from_git2(oid: git2::Oid) -> Oid {
    // git2 oids are always well-formed hex
    Oid::new(oid.to_string()).expect("git2 produced a non-hex oid")
}

/// Convert a domain oid into the git2 type.
fn oid_to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|_| GitError::InvalidOid {
        oid: oid.to_string(),
    })
}

/// The single interface to the local object store.
///
/// Wraps a `git2::Repository` and exposes exactly the read operations the
/// scan needs: enumerate all object ids, read one object, snapshot the
/// root set, and look up remote URLs.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open the repository at the given path.
    ///
    /// Accepts a worktree root, a `.git` directory, or a bare repository.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::NotARepo`] if the path is not inside a repository.
    /// This is the only fatal error in the taxonomy.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// The repository's `.git` directory.
    ///
    /// Worker threads reopen the store through this path, since a repository
    /// handle cannot be shared across threads.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Enumerate every object id in the store, loose and packed, with its
    /// type tag. No reachability interpretation is applied.
    ///
    /// The enumeration is finite and restartable; objects whose header
    /// cannot be read are skipped rather than failing the listing.
    pub fn list_all_object_ids(&self) -> Result<Vec<(Oid, ObjectKind)>, GitError> {
        let odb = self.repo.odb()?;
        let mut ids = Vec::new();

        odb.foreach(|goid| {
            if let Ok((_, object_type)) = odb.read_header(*goid) {
                if let Some(kind) = object_kind(object_type) {
                    ids.push((oid_from_git2(*goid), kind));
                }
            }
            true
        })?;

        Ok(ids)
    }

    /// Read and parse one object from the store.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the id is absent from the store
    /// - [`GitError::Corrupt`] if the bytes do not parse as the declared type
    pub fn read_object(&self, oid: &Oid) -> Result<Object, GitError> {
        let goid = oid_to_git2(oid)?;
        let odb = self.repo.odb()?;
        let (_, object_type) = odb
            .read_header(goid)
            .map_err(|e| GitError::from_git2(e, oid))?;

        match object_type {
            git2::ObjectType::Commit => self.read_commit(oid, goid).map(Object::Commit),
            git2::ObjectType::Tree => self.read_tree(oid, goid).map(Object::Tree),
            git2::ObjectType::Blob => self.read_blob(oid, goid).map(Object::Blob),
            git2::ObjectType::Tag => {
                let tag = self.repo.find_tag(goid).map_err(|e| corrupt(oid, e))?;
                Ok(Object::Tag {
                    oid: oid.clone(),
                    target: oid_from_git2(tag.target_id()),
                })
            }
            other => Err(GitError::Corrupt {
                oid: oid.to_string(),
                message: format!("unexpected object type {other:?}"),
            }),
        }
    }

    fn read_commit(&self, oid: &Oid, goid: git2::Oid) -> Result<Commit, GitError> {
        let commit = self.repo.find_commit(goid).map_err(|e| corrupt(oid, e))?;

        let author_sig = commit.author();
        let author = match (author_sig.name(), author_sig.email()) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name.to_string(),
            _ => String::from_utf8_lossy(author_sig.name_bytes()).into_owned(),
        };
        let author_time =
            chrono::DateTime::from_timestamp(author_sig.when().seconds(), 0).unwrap_or_default();

        Ok(Commit {
            oid: oid.clone(),
            parents: commit.parent_ids().map(oid_from_git2).collect(),
            tree: oid_from_git2(commit.tree_id()),
            author,
            author_time,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        })
    }

    fn read_tree(&self, oid: &Oid, goid: git2::Oid) -> Result<Tree, GitError> {
        let tree = self.repo.find_tree(goid).map_err(|e| corrupt(oid, e))?;

        let mut entries = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let kind = match entry.kind() {
                Some(git2::ObjectType::Tree) => EntryKind::Tree,
                Some(git2::ObjectType::Blob) => EntryKind::Blob,
                // Submodule pointers report as commits
                Some(git2::ObjectType::Commit) => EntryKind::Commit,
                _ => {
                    // Fall back to the mode bits for odd entries
                    if entry.filemode() == 0o160000 {
                        EntryKind::Commit
                    } else if entry.filemode() == 0o40000 {
                        EntryKind::Tree
                    } else {
                        EntryKind::Blob
                    }
                }
            };
            entries.push(TreeEntry {
                name: String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                oid: oid_from_git2(entry.id()),
                mode: entry.filemode() as u32,
                kind,
            });
        }

        Ok(Tree {
            oid: oid.clone(),
            entries,
        })
    }

    fn read_blob(&self, oid: &Oid, goid: git2::Oid) -> Result<Blob, GitError> {
        let blob = self.repo.find_blob(goid).map_err(|e| corrupt(oid, e))?;
        Ok(Blob {
            oid: oid.clone(),
            bytes: blob.content().to_vec(),
        })
    }

    /// Snapshot the root set: every id named by a ref tip or reflog entry.
    ///
    /// Covers all refs under `refs/` (branches, tags, remotes, notes),
    /// HEAD, and every old/new id recorded in each surviving reflog.
    /// Annotated tag refs contribute the tag object id; the classifier
    /// peels it to the target during traversal.
    ///
    /// Called exactly once per scan. The returned snapshot is stable even
    /// if the underlying store is concurrently mutated.
    pub fn list_roots(&self) -> Result<RootSet, GitError> {
        let mut roots = RootSet::new();
        let mut ref_names: Vec<String> = vec!["HEAD".to_string()];

        for reference in self.repo.references()? {
            let reference = match reference {
                Ok(r) => r,
                Err(_) => continue,
            };
            if let Some(target) = reference.target() {
                roots.insert(oid_from_git2(target));
            } else if let Ok(resolved) = reference.resolve() {
                if let Some(target) = resolved.target() {
                    roots.insert(oid_from_git2(target));
                }
            }
            if let Some(name) = reference.name() {
                ref_names.push(name.to_string());
            }
        }

        // HEAD itself (may be detached or unborn)
        if let Ok(head) = self.repo.head() {
            if let Some(target) = head.target() {
                roots.insert(oid_from_git2(target));
            }
        }

        // Reflog entries: both sides of every recorded transition. A ref
        // deleted together with its reflog leaves nothing here, which is
        // exactly what makes its commits dangling.
        for name in &ref_names {
            let reflog = match self.repo.reflog(name) {
                Ok(r) => r,
                Err(_) => continue,
            };
            for entry in reflog.iter() {
                roots.insert(oid_from_git2(entry.id_old()));
                roots.insert(oid_from_git2(entry.id_new()));
            }
        }

        Ok(roots)
    }

    /// Get the URL of a remote, or `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(|s| s.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Shorthand for a Corrupt error from a git2 parse failure.
fn corrupt(oid: &Oid, err: git2::Error) -> GitError {
    match err.code() {
        git2::ErrorCode::NotFound => GitError::ObjectNotFound {
            oid: oid.to_string(),
        },
        _ => GitError::Corrupt {
            oid: oid.to_string(),
            message: err.message().to_string(),
        },
    }
}

/// Map a git2 object type to the domain kind tag.
fn object_kind(object_type: git2::ObjectType) -> Option<ObjectKind> {
    match object_type {
        git2::ObjectType::Commit => Some(ObjectKind::Commit),
        git2::ObjectType::Tree => Some(ObjectKind::Tree),
        git2::ObjectType::Blob => Some(ObjectKind::Blob),
        git2::ObjectType::Tag => Some(ObjectKind::Tag),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_path_is_not_a_repo() {
        let err = Git::open(Path::new("/nonexistent/definitely/not/a/repo")).unwrap_err();
        assert!(matches!(err, GitError::NotARepo { .. }));
    }

    #[test]
    fn oid_conversion_roundtrip() {
        let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
        let goid = oid_to_git2(&oid).unwrap();
        assert_eq!(oid_from_git2(goid), oid);
    }

    #[test]
    fn object_kind_mapping() {
        assert_eq!(
            object_kind(git2::ObjectType::Commit),
            Some(ObjectKind::Commit)
        );
        assert_eq!(object_kind(git2::ObjectType::Any), None);
    }
}
