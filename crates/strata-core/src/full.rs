//! Full-mode parsing: `git blame --porcelain` output with file content.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::commit::CommitRecord;
use crate::error::{Error, Result, Violation};
use crate::porcelain::{Header, Line, Porcelain, RawLine, split_tag, unquote_path};
use crate::range::{LineRange, RangeTracker};

/// Consecutive lines of the file attributed to one commit.
#[derive(Debug, Clone)]
pub struct BlameGroup {
    /// The commit that last changed these lines.
    pub commit: Arc<CommitRecord>,
    /// Path of the file in that commit.
    pub path: String,
    /// Where the lines are in the blamed revision.
    pub final_range: LineRange,
    /// Where the lines were in `commit`.
    pub orig_range: LineRange,
    /// Line contents, in order.
    pub lines: Vec<Line>,
}

/// Result of a full-mode parse.
#[derive(Debug, Clone, Default)]
pub struct FullBlame {
    /// Groups in file order.
    pub groups: Vec<BlameGroup>,
    /// Ranges seen while parsing.
    pub coverage: RangeTracker,
}

impl FullBlame {
    /// Number of file lines parsed.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.groups.iter().map(|g| g.lines.len()).sum()
    }

    /// Distinct commits in order of first appearance.
    #[must_use]
    pub fn commits(&self) -> Vec<Arc<CommitRecord>> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .filter(|g| seen.insert(g.commit.id.as_str()))
            .map(|g| Arc::clone(&g.commit))
            .collect()
    }

    /// Take the groups, dropping the coverage data.
    #[must_use]
    pub fn into_groups(self) -> Vec<BlameGroup> {
        self.groups
    }
}

/// Parse porcelain blame output, content lines included.
///
/// A new group starts at every header that carries a group size and
/// whenever the commit changes; the same commit may therefore own several
/// groups. Content that is not valid UTF-8 is kept as [`Line::Binary`].
///
/// # Errors
/// Returns `Protocol` or `UnexpectedEof` when the input breaks the format,
/// and `Io` when reading fails.
pub fn parse_full<R: BufRead>(reader: R) -> Result<FullBlame> {
    let mut parser = FullParser {
        porcelain: Porcelain::new(reader),
        groups: Vec::new(),
        paths: HashMap::new(),
        run_remaining: 0,
        next_final: 0,
        next_orig: 0,
    };
    parser.run()?;

    let blame = FullBlame {
        groups: parser.groups,
        coverage: parser.porcelain.coverage,
    };
    debug!(
        groups = blame.groups.len(),
        lines = blame.line_count(),
        commits = parser.porcelain.cache.len(),
        "parsed full blame"
    );
    Ok(blame)
}

struct FullParser<R> {
    porcelain: Porcelain<R>,
    groups: Vec<BlameGroup>,
    // Last filename seen per commit; git prints it only with the metadata.
    paths: HashMap<String, String>,
    // Lines of the current sized run not yet read.
    run_remaining: u32,
    next_final: u32,
    next_orig: u32,
}

impl<R: BufRead> FullParser<R> {
    fn run(&mut self) -> Result<()> {
        loop {
            let Some(raw) = self.porcelain.lines.next_line()? else {
                if self.run_remaining > 0 {
                    return Err(Error::UnexpectedEof {
                        line: self.porcelain.lines.number(),
                        expected: "content line",
                    });
                }
                return Ok(());
            };
            if raw.is_blank() {
                continue;
            }

            if let Some(line) = Line::from_raw(&raw) {
                // Content straight after content continues the current run.
                if self.run_remaining == 0 || self.groups.is_empty() {
                    return Err(raw.violation(Violation::UnexpectedContent));
                }
                self.push_line(&raw, line)?;
                continue;
            }

            let header = std::str::from_utf8(&raw.bytes)
                .ok()
                .and_then(Header::parse)
                .ok_or_else(|| raw.violation(Violation::InvalidHeader))?;
            // A sized header opens a run; size-less headers only continue one.
            if header.size.is_some() == (self.run_remaining > 0) {
                return Err(raw.violation(Violation::InvalidHeader));
            }
            self.read_block(&header)?;
        }
    }

    /// Handle everything after a header up to and including its content line.
    fn read_block(&mut self, header: &Header) -> Result<()> {
        trace!(id = %header.id, final_line = header.final_line, size = ?header.size, "block");

        let (commit, path) = match self.porcelain.cache.get(&header.id) {
            Some(commit) => {
                let path = self.read_repeat_filename()?;
                let path = path
                    .or_else(|| self.paths.get(&header.id).cloned())
                    .unwrap_or_default();
                (commit, path)
            }
            None => self.porcelain.read_commit(&header.id)?,
        };
        self.paths.insert(header.id.clone(), path.clone());

        let raw = self.porcelain.expect_line("content line")?;
        let line = Line::from_raw(&raw).ok_or_else(|| raw.violation(Violation::ExpectedContent))?;

        if let Some(size) = header.size {
            self.run_remaining = size;
        }
        self.next_final = header.final_line;
        self.next_orig = header.orig_line;

        let continues_group = header.size.is_none()
            && self.groups.last().is_some_and(|g| {
                g.commit.id == header.id
                    && g.final_range.end() == header.final_line
                    && g.orig_range.end() == header.orig_line
            });
        if !continues_group {
            self.groups.push(BlameGroup {
                commit,
                path,
                final_range: LineRange::new(header.final_line, 0),
                orig_range: LineRange::new(header.orig_line, 0),
                lines: Vec::new(),
            });
        }

        self.push_line(&raw, line)
    }

    /// Skip `previous` and read an optional `filename` after a repeated
    /// commit's header. Any other tag is an error.
    fn read_repeat_filename(&mut self) -> Result<Option<String>> {
        let mut filename = None;
        loop {
            let Some(raw) = self.porcelain.lines.peek_line()? else {
                return Ok(filename);
            };
            if raw.is_content() {
                return Ok(filename);
            }

            let path = {
                let text = raw.lossy();
                let (tag, value) = split_tag(&text);
                match tag {
                    "previous" if filename.is_none() => None,
                    "filename" if filename.is_none() => Some(unquote_path(value)),
                    _ => return Err(raw.violation(Violation::ExpectedFilename)),
                }
            };
            if path.is_some() {
                filename = path;
            }
            self.porcelain.lines.next_line()?;
        }
    }

    fn push_line(&mut self, raw: &RawLine, line: Line) -> Result<()> {
        let (Some(next_final), Some(next_orig)) =
            (self.next_final.checked_add(1), self.next_orig.checked_add(1))
        else {
            return Err(raw.violation(Violation::InvalidHeader));
        };
        let Some(group) = self.groups.last_mut() else {
            return Ok(());
        };
        group.final_range.count += 1;
        group.orig_range.count += 1;
        group.lines.push(line);

        self.porcelain
            .coverage
            .record(self.next_final, self.next_orig, 1);
        self.next_final = next_final;
        self.next_orig = next_orig;
        self.run_remaining = self.run_remaining.saturating_sub(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn metadata(name: &str, time: i64, path: &str) -> String {
        format!(
            "author {name}\nauthor-mail <{name}@example.com>\nauthor-time {time}\n\
author-tz +0000\ncommitter {name}\ncommitter-mail <{name}@example.com>\n\
committer-time {time}\ncommitter-tz +0000\nsummary change by {name}\nfilename {path}\n"
        )
    }

    /// Three-line file: lines 1-2 from A, line 3 from B, as git prints it.
    fn two_commit_fixture() -> String {
        format!(
            "{A} 1 1 2\n{}\tfirst\n{A} 2 2\n\tsecond\n{B} 7 3 1\n{}\tthird\n",
            metadata("alice", 100, "f.txt"),
            metadata("bob", 200, "old.txt"),
        )
    }

    #[test]
    fn test_groups_in_file_order() {
        let blame = parse_full(two_commit_fixture().as_bytes()).unwrap();

        assert_eq!(blame.groups.len(), 2);
        let first = &blame.groups[0];
        assert_eq!(first.commit.id, A);
        assert_eq!(first.commit.author.name, "alice");
        assert_eq!(first.path, "f.txt");
        assert_eq!(first.final_range, LineRange::new(1, 2));
        assert_eq!(
            first.lines,
            vec![Line::Text("first".into()), Line::Text("second".into())]
        );

        let second = &blame.groups[1];
        assert_eq!(second.commit.id, B);
        assert_eq!(second.path, "old.txt");
        assert_eq!(second.final_range, LineRange::new(3, 1));
        assert_eq!(second.orig_range, LineRange::new(7, 1));
        assert_eq!(blame.line_count(), 3);
        assert_eq!(blame.coverage.validate(), Ok(3));
    }

    #[test]
    fn test_repeated_commit_reuses_record() {
        let input = format!(
            "{A} 1 1 1\n{}\tone\n{B} 1 2 1\n{}\ttwo\n{A} 2 3 1\n\tthree\n",
            metadata("alice", 100, "f.txt"),
            metadata("bob", 200, "f.txt"),
        );
        let blame = parse_full(input.as_bytes()).unwrap();

        assert_eq!(blame.groups.len(), 3);
        assert!(Arc::ptr_eq(&blame.groups[0].commit, &blame.groups[2].commit));
        assert_eq!(blame.groups[2].path, "f.txt");
        assert_eq!(blame.commits().len(), 2);
        assert_eq!(blame.coverage.validate(), Ok(3));
    }

    #[test]
    fn test_same_commit_new_run_is_new_group() {
        let input = format!(
            "{A} 1 1 1\n{}\tone\n{A} 5 2 1\n\ttwo\n",
            metadata("alice", 100, "f.txt"),
        );
        let blame = parse_full(input.as_bytes()).unwrap();

        assert_eq!(blame.groups.len(), 2);
        assert_eq!(blame.groups[1].orig_range, LineRange::new(5, 1));
    }

    #[test]
    fn test_sized_header_with_consecutive_content() {
        let input = format!(
            "{A} 10 10 3\n{}\tline1\n\tline2\n\tline3\n",
            metadata("alice", 100, "foo.txt"),
        );
        let blame = parse_full(input.as_bytes()).unwrap();

        assert_eq!(blame.groups.len(), 1);
        assert_eq!(blame.groups[0].final_range, LineRange::new(10, 3));
        assert_eq!(blame.groups[0].lines.len(), 3);
        assert_eq!(blame.groups[0].lines[2], Line::Text("line3".into()));
    }

    #[test]
    fn test_binary_line_kept_verbatim() {
        let mut input = format!("{A} 1 1 2\n{}", metadata("alice", 100, "bin.dat")).into_bytes();
        input.extend_from_slice(b"\t\x89PNG\xff\xfe\n");
        input.extend_from_slice(format!("{A} 2 2\n\tafter\n").as_bytes());

        let blame = parse_full(&input[..]).unwrap();
        let lines = &blame.groups[0].lines;
        assert_eq!(lines[0], Line::Binary(b"\t\x89PNG\xff\xfe".to_vec()));
        assert_eq!(lines[1], Line::Text("after".into()));
    }

    #[test]
    fn test_repeated_commit_with_filename_line() {
        let input = format!(
            "{A} 1 1 1\n{}\tone\n{B} 1 2 1\n{}\ttwo\n{A} 2 3 1\nprevious {B} f.txt\nfilename g.txt\n\tthree\n",
            metadata("alice", 100, "f.txt"),
            metadata("bob", 200, "f.txt"),
        );
        let blame = parse_full(input.as_bytes()).unwrap();
        assert_eq!(blame.groups[2].path, "g.txt");
    }

    #[test]
    fn test_repeated_commit_with_metadata_is_violation() {
        let input = format!(
            "{A} 1 1 1\n{}\tone\n{A} 2 2 1\nauthor alice\n\ttwo\n",
            metadata("alice", 100, "f.txt"),
        );
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                line: 14,
                violation: Violation::ExpectedFilename,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_content_is_violation() {
        let input = format!("{A} 1 1 1\n{}{A} 2 2 1\n", metadata("alice", 100, "f.txt"));
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                violation: Violation::ExpectedContent,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_after_header() {
        let input = format!("{A} 1 1 1\n");
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { line: 1, .. }));
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_truncated_run() {
        let input = format!("{A} 1 1 3\n{}\tone\n", metadata("alice", 100, "f.txt"));
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEof {
                expected: "content line",
                ..
            }
        ));
    }

    #[test]
    fn test_stray_content_is_violation() {
        let err = parse_full(&b"\tnot a header\n"[..]).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                line: 1,
                violation: Violation::UnexpectedContent,
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_header_is_violation() {
        let err = parse_full(&b"hello world\n"[..]).unwrap_err();
        match err {
            Error::Protocol { violation, raw, .. } => {
                assert_eq!(violation, Violation::InvalidHeader);
                assert_eq!(raw, "hello world");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_latin1_metadata_is_decoded_lossily() {
        let mut input = format!("{A} 1 1 1\n").into_bytes();
        input.extend_from_slice(b"author Jos\xe9\n");
        input.extend_from_slice(
            metadata("alice", 100, "f.txt")
                .split_once('\n')
                .unwrap()
                .1
                .as_bytes(),
        );
        input.extend_from_slice(b"\tline\n");

        let blame = parse_full(&input[..]).unwrap();
        assert_eq!(blame.groups[0].commit.author.name, "Jos\u{fffd}");
        assert_eq!(blame.groups[0].lines[0], Line::Text("line".into()));
    }

    #[test]
    fn test_line_number_overflow_is_violation() {
        let input = format!(
            "{A} 1 4294967295 1\n{}\tline\n",
            metadata("alice", 100, "f.txt")
        );
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                line: 1,
                violation: Violation::InvalidHeader,
                ..
            }
        ));
    }

    #[test]
    fn test_last_addressable_line() {
        let input = format!(
            "{A} 1 4294967294 1\n{}\tline\n",
            metadata("alice", 100, "f.txt")
        );
        let blame = parse_full(input.as_bytes()).unwrap();
        assert_eq!(blame.groups[0].final_range, LineRange::new(u32::MAX - 1, 1));
    }

    #[test]
    fn test_sized_header_inside_run_is_violation() {
        let input = format!(
            "{A} 1 1 3\n{}\tone\n{A} 2 2 2\n\ttwo\n",
            metadata("alice", 100, "f.txt")
        );
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                line: 13,
                violation: Violation::InvalidHeader,
                ..
            }
        ));
    }

    #[test]
    fn test_continuation_header_outside_run_is_violation() {
        let input = format!(
            "{A} 1 1 1\n{}\tone\n{A} 2 2\n\ttwo\n",
            metadata("alice", 100, "f.txt")
        );
        let err = parse_full(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                line: 13,
                violation: Violation::InvalidHeader,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        let blame = parse_full(&b""[..]).unwrap();
        assert!(blame.groups.is_empty());
        assert_eq!(blame.coverage.validate(), Ok(0));
    }

    #[test]
    fn test_boundary_commit() {
        let input = format!(
            "{A} 1 1 1\nauthor a\nauthor-mail <a@e.com>\nauthor-time 5\nauthor-tz +0000\n\
committer a\ncommitter-mail <a@e.com>\ncommitter-time 5\ncommitter-tz +0000\n\
summary root\nboundary\nfilename f.txt\n\troot line\n"
        );
        let blame = parse_full(input.as_bytes()).unwrap();
        assert!(blame.groups[0].commit.boundary);
        assert_eq!(blame.groups[0].commit.summary, "root");
    }
}
