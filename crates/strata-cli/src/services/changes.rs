//! Changes service: files deleted or renamed between two revisions.

use anyhow::Result;
use serde::Serialize;
use strata_git::{ChangeKind, PathChange, Repository};

/// A path that no longer exists at the newer revision.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeInfo {
    pub kind: &'static str,
    pub old_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

impl From<&PathChange> for ChangeInfo {
    fn from(change: &PathChange) -> Self {
        Self {
            kind: match change.kind {
                ChangeKind::Deleted => "deleted",
                ChangeKind::Renamed => "renamed",
            },
            old_path: change.old_path.display().to_string(),
            new_path: change.new_path.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Changed paths between two revisions.
#[derive(Debug, Clone, Serialize)]
pub struct ChangesReport {
    pub from: String,
    pub to: String,
    pub changes: Vec<ChangeInfo>,
}

/// Service for listing stale paths.
pub struct ChangesService<'a> {
    repo: &'a Repository,
}

impl<'a> ChangesService<'a> {
    /// Create a new changes service.
    pub const fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Deleted files, then renamed files, between `from` and `to`.
    pub fn between(&self, from: &str, to: &str) -> Result<ChangesReport> {
        let changes = self.repo.moved_or_deleted(from, to)?;
        Ok(ChangesReport {
            from: from.to_string(),
            to: to.to_string(),
            changes: changes.iter().map(ChangeInfo::from).collect(),
        })
    }
}
