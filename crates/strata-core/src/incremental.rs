//! Incremental parsing: `git blame --incremental` output, one entry per header.

use std::io::BufRead;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::CommitCache;
use crate::commit::CommitRecord;
use crate::error::{Result, Violation};
use crate::porcelain::{Header, Porcelain, split_tag, unquote_path};
use crate::range::{LineRange, RangeTracker};

/// Lines of the blamed file attributed to one commit.
#[derive(Debug, Clone)]
pub struct AttributionEntry {
    /// The commit that last changed these lines.
    pub commit: Arc<CommitRecord>,
    /// Where the lines are in the blamed revision.
    pub final_range: LineRange,
    /// Path of the file in `commit`.
    pub orig_path: String,
    /// Where the lines were in `commit`.
    pub orig_range: LineRange,
}

/// Lazy parser over incremental blame output.
///
/// Yields `Some(Ok(_))` per header, `None` once the input ends cleanly, and
/// `Some(Err(_))` once if the input is malformed, after which it is
/// exhausted. Entries come out in stream order.
#[derive(Debug)]
pub struct Incremental<R> {
    porcelain: Porcelain<R>,
    done: bool,
}

impl<R: BufRead> Incremental<R> {
    /// Start parsing `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            porcelain: Porcelain::new(reader),
            done: false,
        }
    }

    /// Ranges yielded so far.
    #[must_use]
    pub const fn coverage(&self) -> &RangeTracker {
        &self.porcelain.coverage
    }

    /// Commits seen so far.
    #[must_use]
    pub const fn commits(&self) -> &CommitCache {
        &self.porcelain.cache
    }

    /// Give back the underlying reader. A line read ahead is lost.
    pub fn into_inner(self) -> R {
        self.porcelain.lines.into_inner()
    }

    fn next_entry(&mut self) -> Result<Option<AttributionEntry>> {
        let Some(header) = self.porcelain.next_header()? else {
            return Ok(None);
        };
        trace!(id = %header.id, final_line = header.final_line, size = ?header.size, "entry");

        let (commit, orig_path) = match self.porcelain.cache.get(&header.id) {
            Some(commit) => (commit, self.read_repeat_filename()?),
            None => self.porcelain.read_commit(&header.id)?,
        };

        let count = self.entry_size(&header)?;
        self.porcelain
            .coverage
            .record(header.final_line, header.orig_line, count);

        Ok(Some(AttributionEntry {
            commit,
            final_range: LineRange::new(header.final_line, count),
            orig_path,
            orig_range: LineRange::new(header.orig_line, count),
        }))
    }

    /// Lines covered by the entry for `header`.
    ///
    /// Git gives every header its own size. When a sized header is instead
    /// followed by size-less continuation headers for the next lines, each
    /// header of that run stands for a single line.
    fn entry_size(&mut self, header: &Header) -> Result<u32> {
        match header.size {
            Some(size) if size > 1 && !self.continues_next(header)? => Ok(size),
            _ => Ok(1),
        }
    }

    fn continues_next(&mut self, header: &Header) -> Result<bool> {
        Ok(self.porcelain.peek_header()?.is_some_and(|next| {
            next.size.is_none()
                && next.id == header.id
                && header.final_line.checked_add(1) == Some(next.final_line)
        }))
    }

    /// After a repeated commit's header only `previous` and then `filename`
    /// may follow.
    fn read_repeat_filename(&mut self) -> Result<String> {
        loop {
            let raw = self.porcelain.expect_line("filename")?;
            let text = raw.lossy();
            match split_tag(&text) {
                ("previous", _) => {}
                ("filename", value) => return Ok(unquote_path(value)),
                _ => return Err(raw.violation(Violation::ExpectedFilename)),
            }
        }
    }
}

impl<R: BufRead> Iterator for Incremental<R> {
    type Item = Result<AttributionEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                debug!(
                    entries = self.porcelain.coverage.final_ranges().len(),
                    commits = self.porcelain.cache.len(),
                    "incremental blame finished"
                );
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for Incremental<R> {}

/// Parse incremental blame output lazily.
pub fn parse_incremental<R: BufRead>(reader: R) -> Incremental<R> {
    Incremental::new(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn metadata(name: &str, path: &str) -> String {
        format!(
            "author {name}\nauthor-mail <{name}@example.com>\nauthor-time 1700000000\n\
author-tz +0000\ncommitter {name}\ncommitter-mail <{name}@example.com>\n\
committer-time 1700000100\ncommitter-tz +0000\nsummary by {name}\nfilename {path}\n"
        )
    }

    fn collect(input: &str) -> Vec<AttributionEntry> {
        parse_incremental(input.as_bytes())
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_git_style_entries() {
        // Git prints entries in the order it resolves them, not file order.
        let input = format!(
            "{B} 1 3 2\n{}{A} 1 1 2\n{}{B} 9 5 1\nprevious {A} f.txt\nfilename f.txt\n",
            metadata("bob", "f.txt"),
            metadata("alice", "f.txt"),
        );
        let entries = collect(&input);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].commit.id, B);
        assert_eq!(entries[0].final_range, LineRange::new(3, 2));
        assert_eq!(entries[1].commit.author.email, "alice@example.com");
        assert_eq!(entries[1].final_range, LineRange::new(1, 2));
        assert_eq!(entries[2].final_range, LineRange::new(5, 1));
        assert_eq!(entries[2].orig_range, LineRange::new(9, 1));
        assert!(Arc::ptr_eq(&entries[0].commit, &entries[2].commit));

        for entry in &entries {
            assert_eq!(entry.final_range.count, entry.orig_range.count);
        }
    }

    #[test]
    fn test_per_line_continuation_headers() {
        let input = format!(
            "{A} 10 10 3\n{}{A} 11 11\nfilename foo.txt\n{A} 12 12\nfilename foo.txt\n",
            metadata("alice", "foo.txt"),
        );
        let entries = collect(&input);

        assert_eq!(entries.len(), 3);
        let starts: Vec<u32> = entries.iter().map(|e| e.final_range.start).collect();
        assert_eq!(starts, vec![10, 11, 12]);
        assert!(entries.iter().all(|e| e.final_range.count == 1));
        assert!(entries.iter().all(|e| e.orig_path == "foo.txt"));
        assert!(Arc::ptr_eq(&entries[0].commit, &entries[2].commit));
    }

    #[test]
    fn test_coverage_after_exhaustion() {
        let input = format!(
            "{A} 1 1 2\n{}{B} 1 3 1\n{}",
            metadata("alice", "f.txt"),
            metadata("bob", "f.txt"),
        );
        let mut parser = parse_incremental(input.as_bytes());
        assert_eq!(parser.by_ref().count(), 2);
        assert_eq!(parser.coverage().validate(), Ok(3));
        assert_eq!(parser.commits().len(), 2);
    }

    #[test]
    fn test_repeated_commit_requires_filename() {
        let input = format!(
            "{A} 1 1 1\n{}{A} 2 2 1\nauthor alice\n",
            metadata("alice", "f.txt")
        );
        let mut parser = parse_incremental(input.as_bytes());

        assert!(parser.next().unwrap().is_ok());
        let err = parser.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                line: 13,
                violation: Violation::ExpectedFilename,
                ..
            }
        ));
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_truncated_metadata() {
        let input = format!("{A} 1 1 1\nauthor alice\n");
        let results: Vec<_> = parse_incremental(input.as_bytes()).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(Error::UnexpectedEof {
                line: 2,
                expected: "commit metadata"
            })
        ));
    }

    #[test]
    fn test_repeated_commit_missing_filename_at_eof() {
        let input = format!("{A} 1 1 1\n{}{A} 2 2 1\n", metadata("alice", "f.txt"));
        let results: Vec<_> = parse_incremental(input.as_bytes()).collect();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(Error::UnexpectedEof {
                expected: "filename",
                ..
            })
        ));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = format!("\n{A} 1 1 1\n{}\n\n", metadata("alice", "f.txt"));
        assert_eq!(collect(&input).len(), 1);
    }

    #[test]
    fn test_early_stop_leaves_rest_unread() {
        let input = format!(
            "{A} 1 1 1\n{}{B} 1 2 1\n{}",
            metadata("alice", "f.txt"),
            metadata("bob", "f.txt"),
        );
        let mut parser = parse_incremental(input.as_bytes());
        let first = parser.next().unwrap().unwrap();
        assert_eq!(first.commit.id, A);

        let rest = parser.into_inner();
        assert!(rest.starts_with(B.as_bytes()));
    }

    #[test]
    fn test_latin1_metadata_is_decoded_lossily() {
        let mut input = format!("{A} 1 1 1\n").into_bytes();
        input.extend_from_slice(b"author Jos\xe9\n");
        input.extend_from_slice(
            metadata("alice", "f.txt")
                .split_once('\n')
                .unwrap()
                .1
                .as_bytes(),
        );

        let entries: Vec<_> = parse_incremental(&input[..])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries[0].commit.author.name, "Jos\u{fffd}");
        assert_eq!(entries[0].orig_path, "f.txt");
    }

    #[test]
    fn test_line_number_overflow_is_violation() {
        let input = format!("{A} 1 4294967295 1\n{}", metadata("alice", "f.txt"));
        let mut parser = parse_incremental(input.as_bytes());
        assert!(matches!(
            parser.next(),
            Some(Err(Error::Protocol {
                line: 1,
                violation: Violation::InvalidHeader,
                ..
            }))
        ));
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_quoted_filename() {
        let input = format!("{A} 1 1 1\n{}", metadata("alice", "\"sp\\303\\244t.rs\""));
        let entries = collect(&input);
        assert_eq!(entries[0].orig_path, "spät.rs");
    }
}
