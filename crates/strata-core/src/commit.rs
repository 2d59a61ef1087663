//! Commit metadata as reported by blame.

use crate::error::Violation;
use crate::porcelain::unquote_path;

/// Name and email of an author or committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address without the surrounding angle brackets.
    pub email: String,
}

/// The commit and path a blamed commit's lines came from before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Previous {
    /// Parent-side commit id.
    pub id: String,
    /// Path of the file in that commit.
    pub path: String,
}

/// Metadata of one commit that owns lines in a blamed file.
///
/// Only the epoch timestamps are kept: `author-tz` and `committer-tz` are
/// read and dropped, so times cannot be shown in the committer's local zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full hex commit id.
    pub id: String,
    /// Who wrote the change.
    pub author: Signature,
    /// Author timestamp, seconds since the Unix epoch.
    pub authored_at: i64,
    /// Who committed the change.
    pub committer: Signature,
    /// Committer timestamp, seconds since the Unix epoch.
    pub committed_at: i64,
    /// First line of the commit message.
    pub summary: String,
    /// Whether git marked this as a boundary (root or range-limited) commit.
    pub boundary: bool,
    /// Where the lines lived before this commit, when git knows.
    pub previous: Option<Previous>,
}

impl CommitRecord {
    /// Abbreviated id, at most `len` characters.
    #[must_use]
    pub fn short_id(&self, len: usize) -> &str {
        self.id.get(..len).unwrap_or(&self.id)
    }
}

/// Staging area for the metadata lines of one blame block.
///
/// Every known tag has its own slot; `filename` is not one of them because
/// it terminates the block and is handled by the parser.
#[derive(Debug, Default)]
pub struct CommitBuilder {
    author: Option<String>,
    author_mail: Option<String>,
    author_time: Option<i64>,
    author_tz: bool,
    committer: Option<String>,
    committer_mail: Option<String>,
    committer_time: Option<i64>,
    committer_tz: bool,
    summary: Option<String>,
    boundary: bool,
    previous: Option<Previous>,
}

impl CommitBuilder {
    /// Start an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one `<tag> <value>` line.
    ///
    /// # Errors
    /// Fails on tags the format does not define, on a tag seen twice, and
    /// on timestamps or `previous` values that do not parse.
    pub fn accept(&mut self, tag: &str, value: &str) -> Result<(), Violation> {
        match tag {
            "author" => fill(&mut self.author, tag, value.to_string()),
            "author-mail" => fill(&mut self.author_mail, tag, strip_brackets(value)),
            "author-time" => fill(&mut self.author_time, tag, parse_time(value)?),
            "author-tz" => mark(&mut self.author_tz, tag),
            "committer" => fill(&mut self.committer, tag, value.to_string()),
            "committer-mail" => fill(&mut self.committer_mail, tag, strip_brackets(value)),
            "committer-time" => fill(&mut self.committer_time, tag, parse_time(value)?),
            "committer-tz" => mark(&mut self.committer_tz, tag),
            "summary" => fill(&mut self.summary, tag, value.to_string()),
            "previous" => fill(&mut self.previous, tag, parse_previous(value)?),
            "boundary" => mark(&mut self.boundary, tag),
            _ => Err(Violation::UnknownTag(tag.into())),
        }
    }

    /// Validate that every required tag arrived and build the record.
    ///
    /// # Errors
    /// Returns `MissingTag` naming the first absent required tag.
    pub fn build(self, id: &str) -> Result<CommitRecord, Violation> {
        Ok(CommitRecord {
            id: id.to_string(),
            author: Signature {
                name: self.author.ok_or(Violation::MissingTag("author"))?,
                email: self.author_mail.ok_or(Violation::MissingTag("author-mail"))?,
            },
            authored_at: self.author_time.ok_or(Violation::MissingTag("author-time"))?,
            committer: Signature {
                name: self.committer.ok_or(Violation::MissingTag("committer"))?,
                email: self
                    .committer_mail
                    .ok_or(Violation::MissingTag("committer-mail"))?,
            },
            committed_at: self
                .committer_time
                .ok_or(Violation::MissingTag("committer-time"))?,
            summary: self.summary.unwrap_or_default(),
            boundary: self.boundary,
            previous: self.previous,
        })
    }
}

fn fill<T>(slot: &mut Option<T>, tag: &str, value: T) -> Result<(), Violation> {
    if slot.is_some() {
        return Err(Violation::DuplicateTag(tag.into()));
    }
    *slot = Some(value);
    Ok(())
}

// Tags whose value is not kept.
fn mark(seen: &mut bool, tag: &str) -> Result<(), Violation> {
    if *seen {
        return Err(Violation::DuplicateTag(tag.into()));
    }
    *seen = true;
    Ok(())
}

fn strip_brackets(value: &str) -> String {
    let value = value.strip_prefix('<').unwrap_or(value);
    value.strip_suffix('>').unwrap_or(value).to_string()
}

fn parse_time(value: &str) -> Result<i64, Violation> {
    value
        .trim()
        .parse()
        .map_err(|_| Violation::InvalidTime(value.into()))
}

/// Parse `<id> <path>` from a `previous` line.
pub(crate) fn parse_previous(value: &str) -> Result<Previous, Violation> {
    let (id, path) = value
        .split_once(' ')
        .ok_or_else(|| Violation::InvalidPrevious(value.into()))?;
    Ok(Previous {
        id: id.to_string(),
        path: unquote_path(path),
    })
}
