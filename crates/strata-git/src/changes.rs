//! Files that disappeared between two revisions.
//!
//! Used to find paths whose blame information went stale after a checkout,
//! pull or rebase moved HEAD.

use std::path::PathBuf;

use git2::{Delta, DiffFindOptions};

use crate::Repository;
use crate::error::{Error, Result};

/// How a path left its old location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The file no longer exists.
    Deleted,
    /// The file exists under a new path.
    Renamed,
}

/// A path that is no longer valid at the newer revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    /// What happened to the file.
    pub kind: ChangeKind,
    /// Path at the older revision.
    pub old_path: PathBuf,
    /// Path at the newer revision, for renames.
    pub new_path: Option<PathBuf>,
}

impl Repository {
    /// List files deleted or renamed between `from` and `to`.
    ///
    /// Deletions come first, then renames, each in diff order.
    ///
    /// # Errors
    /// Returns `RevisionNotFound` if either revision cannot be resolved,
    /// or a git2 error if the diff fails.
    pub fn moved_or_deleted(&self, from: &str, to: &str) -> Result<Vec<PathChange>> {
        let old_tree = self.tree_of(from)?;
        let new_tree = self.tree_of(to)?;

        let mut diff = self
            .inner()
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut deleted = Vec::new();
        let mut renamed = Vec::new();
        for delta in diff.deltas() {
            let old_path = delta.old_file().path().map(PathBuf::from);
            let new_path = delta.new_file().path().map(PathBuf::from);
            match (delta.status(), old_path) {
                (Delta::Deleted, Some(old_path)) => deleted.push(PathChange {
                    kind: ChangeKind::Deleted,
                    old_path,
                    new_path: None,
                }),
                (Delta::Renamed, Some(old_path)) => renamed.push(PathChange {
                    kind: ChangeKind::Renamed,
                    old_path,
                    new_path,
                }),
                _ => {}
            }
        }

        tracing::debug!(
            from,
            to,
            deleted = deleted.len(),
            renamed = renamed.len(),
            "computed stale paths"
        );

        deleted.extend(renamed);
        Ok(deleted)
    }

    fn tree_of(&self, rev: &str) -> Result<git2::Tree<'_>> {
        let oid = self.resolve_commit(rev)?;
        let commit = self
            .inner()
            .find_commit(oid)
            .map_err(|_| Error::RevisionNotFound(rev.into()))?;
        Ok(commit.tree()?)
    }
}
