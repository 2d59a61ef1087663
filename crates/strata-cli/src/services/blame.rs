//! Blame service: runs blame for a file and shapes the result for display.
//!
//! The parsed records are turned into serializable DTOs here so the command
//! only decides between text and JSON.

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::Result;
use chrono::DateTime;
use serde::Serialize;
use strata_core::{
    AttributionEntry, BlameGroup, CommitRecord, Config, Line, OutputConfig, blame_entries,
    blame_file,
};
use strata_git::Repository;

/// Commit metadata for display.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub author: String,
    pub author_email: String,
    pub authored_at: i64,
    pub date: String,
    pub committer: String,
    pub summary: String,
    pub boundary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousInfo>,
}

/// Where a commit's lines lived before it.
#[derive(Debug, Clone, Serialize)]
pub struct PreviousInfo {
    pub id: String,
    pub path: String,
}

impl CommitInfo {
    fn new(record: &CommitRecord, output: &OutputConfig) -> Self {
        Self {
            id: record.id.clone(),
            short_id: record.short_id(output.short_id_len).to_string(),
            author: record.author.name.clone(),
            author_email: record.author.email.clone(),
            authored_at: record.authored_at,
            date: format_date(record.authored_at, &output.date_format),
            committer: record.committer.name.clone(),
            summary: record.summary.clone(),
            boundary: record.boundary,
            previous: record.previous.as_ref().map(|p| PreviousInfo {
                id: p.id.clone(),
                path: p.path.clone(),
            }),
        }
    }
}

/// One line of the blamed file.
#[derive(Debug, Clone, Serialize)]
pub struct LineInfo {
    pub number: u32,
    pub text: String,
    /// The line was not valid UTF-8; `text` is a lossy rendering.
    pub binary: bool,
}

/// A run of lines from one commit.
#[derive(Debug, Clone, Serialize)]
pub struct GroupInfo {
    pub commit: String,
    pub path: String,
    pub start: u32,
    pub count: u32,
    pub orig_start: u32,
    pub lines: Vec<LineInfo>,
}

impl GroupInfo {
    fn new(group: &BlameGroup) -> Self {
        let lines = group
            .final_range
            .lines()
            .zip(&group.lines)
            .map(|(number, line)| LineInfo {
                number,
                text: line.to_string_lossy().into_owned(),
                binary: matches!(line, Line::Binary(_)),
            })
            .collect();

        Self {
            commit: group.commit.id.clone(),
            path: group.path.clone(),
            start: group.final_range.start,
            count: group.final_range.count,
            orig_start: group.orig_range.start,
            lines,
        }
    }
}

/// Complete blame of one file.
#[derive(Debug, Clone, Serialize)]
pub struct BlameReport {
    pub path: String,
    pub rev: String,
    pub line_count: usize,
    pub commits: Vec<CommitInfo>,
    pub groups: Vec<GroupInfo>,
}

impl BlameReport {
    /// Commits keyed by full id.
    pub fn commits_by_id(&self) -> HashMap<&str, &CommitInfo> {
        self.commits.iter().map(|c| (c.id.as_str(), c)).collect()
    }

    /// Number of lines that were not valid UTF-8.
    pub fn binary_lines(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| &g.lines)
            .filter(|l| l.binary)
            .count()
    }
}

/// One incremental blame entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub commit: CommitInfo,
    pub start: u32,
    pub count: u32,
    pub orig_path: String,
    pub orig_start: u32,
}

impl EntryInfo {
    fn new(entry: &AttributionEntry, output: &OutputConfig) -> Self {
        Self {
            commit: CommitInfo::new(&entry.commit, output),
            start: entry.final_range.start,
            count: entry.final_range.count,
            orig_path: entry.orig_path.clone(),
            orig_start: entry.orig_range.start,
        }
    }
}

/// Service for blaming files.
pub struct BlameService<'a> {
    repo: &'a Repository,
    config: &'a Config,
}

impl<'a> BlameService<'a> {
    /// Create a new blame service.
    pub const fn new(repo: &'a Repository, config: &'a Config) -> Self {
        Self { repo, config }
    }

    /// Blame `path` at `rev` with line contents.
    pub fn report(&self, rev: &str, path: &str) -> Result<BlameReport> {
        let blame = blame_file(self.repo, rev, path, &self.config.blame)?;
        let output = &self.config.output;

        Ok(BlameReport {
            path: path.to_string(),
            rev: rev.to_string(),
            line_count: blame.line_count(),
            commits: blame
                .commits()
                .iter()
                .map(|c| CommitInfo::new(c, output))
                .collect(),
            groups: blame.groups.iter().map(GroupInfo::new).collect(),
        })
    }

    /// Blame `path` at `rev` lazily, in the order git finds the owners.
    pub fn entries(
        &self,
        rev: &str,
        path: &str,
    ) -> Result<impl Iterator<Item = Result<EntryInfo>> + 'a> {
        let config: &'a Config = self.config;
        let entries = blame_entries(self.repo, rev, path, &config.blame)?;
        let output = &config.output;
        Ok(entries.map(move |entry| Ok(EntryInfo::new(&entry?, output))))
    }
}

/// Render an epoch timestamp in UTC with a `chrono` format string.
///
/// Falls back to RFC 3339 if the format string is invalid.
pub fn format_date(timestamp: i64, format: &str) -> String {
    let Some(date) = DateTime::from_timestamp(timestamp, 0) else {
        return timestamp.to_string();
    };

    let mut out = String::new();
    if write!(out, "{}", date.format(format)).is_err() {
        return date.to_rfc3339();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_core::{LineRange, Previous, Signature};

    fn record() -> CommitRecord {
        CommitRecord {
            id: "0123456789abcdef0123456789abcdef01234567".to_string(),
            author: Signature {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
            authored_at: 1_700_000_000,
            committer: Signature {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            },
            committed_at: 1_700_000_100,
            summary: "Add parser".to_string(),
            boundary: false,
            previous: Some(Previous {
                id: "fedcba9876543210fedcba9876543210fedcba98".to_string(),
                path: "old.rs".to_string(),
            }),
        }
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(1_700_000_000, "%Y-%m-%d"), "2023-11-14");
        assert_eq!(format_date(0, "%Y-%m-%d %H:%M"), "1970-01-01 00:00");
    }

    #[test]
    fn test_format_date_invalid_format_falls_back() {
        assert_eq!(format_date(0, "%Q"), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_commit_info_uses_output_config() {
        let output = OutputConfig {
            date_format: "%d.%m.%Y".to_string(),
            short_id_len: 7,
        };
        let info = CommitInfo::new(&record(), &output);

        assert_eq!(info.short_id, "0123456");
        assert_eq!(info.date, "14.11.2023");
        assert_eq!(info.committer, "Bob");
        assert_eq!(info.previous.as_ref().map(|p| p.path.as_str()), Some("old.rs"));
    }

    #[test]
    fn test_group_info_numbers_lines() {
        let group = BlameGroup {
            commit: Arc::new(record()),
            path: "src/lib.rs".to_string(),
            final_range: LineRange::new(4, 2),
            orig_range: LineRange::new(1, 2),
            lines: vec![
                Line::Text("fn main() {".to_string()),
                Line::Binary(b"\t\xff\xfe".to_vec()),
            ],
        };
        let info = GroupInfo::new(&group);

        assert_eq!(info.lines[0].number, 4);
        assert_eq!(info.lines[1].number, 5);
        assert!(!info.lines[0].binary);
        assert!(info.lines[1].binary);
        assert_eq!(info.orig_start, 1);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_entry_info_serializes() {
        let entry = AttributionEntry {
            commit: Arc::new(record()),
            final_range: LineRange::new(3, 2),
            orig_path: "old.rs".to_string(),
            orig_range: LineRange::new(7, 2),
        };
        let info = EntryInfo::new(&entry, &OutputConfig::default());
        let json = serde_json::to_string(&info).expect("serialization should succeed");

        assert!(json.contains("\"start\":3"));
        assert!(json.contains("\"orig_start\":7"));
        assert!(json.contains("Add parser"));
    }
}
