//! Low-level pieces of the porcelain blame format shared by both parsers.
//!
//! ```text
//! <id> <orig-line> <final-line> [<group-size>]
//! author <name>
//! author-mail <<email>>
//! author-time <epoch>
//! author-tz <offset>
//! committer <name>
//! committer-mail <<email>>
//! committer-time <epoch>
//! committer-tz <offset>
//! summary <text>
//! boundary
//! previous <id> <path>
//! filename <path>
//! \t<content>            (full mode only)
//! ```
//!
//! Metadata is printed only the first time a commit appears.

use std::borrow::Cow;
use std::io::{self, BufRead};
use std::sync::Arc;

use crate::cache::CommitCache;
use crate::commit::{CommitBuilder, CommitRecord};
use crate::error::{Error, Result, Violation};
use crate::range::RangeTracker;

/// Content of one line of the blamed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Valid UTF-8 text with git's leading tab removed.
    Text(String),
    /// Bytes that are not valid UTF-8, exactly as git printed them
    /// (leading tab included).
    Binary(Vec<u8>),
}

impl Line {
    /// Raw bytes of the line.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// The text, if the line decoded.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Whether the line failed to decode.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Text for display, replacing undecodable bytes.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Interpret a raw line as file content, if it has that shape.
    pub(crate) fn from_raw(raw: &RawLine) -> Option<Self> {
        match std::str::from_utf8(&raw.bytes) {
            Ok(text) => text.strip_prefix('\t').map(|t| Self::Text(t.to_string())),
            Err(_) => Some(Self::Binary(raw.bytes.clone())),
        }
    }
}

/// One newline-terminated line of input, newline removed.
#[derive(Debug, Clone)]
pub(crate) struct RawLine {
    pub number: usize,
    pub bytes: Vec<u8>,
}

impl RawLine {
    pub fn lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn is_blank(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the line carries git's content marker.
    pub fn is_tab_prefixed(&self) -> bool {
        self.bytes.first() == Some(&b'\t')
    }

    /// Whether this looks like file content rather than a header or tag.
    pub fn is_content(&self) -> bool {
        self.is_tab_prefixed() || std::str::from_utf8(&self.bytes).is_err()
    }

    pub fn violation(&self, violation: Violation) -> Error {
        Error::Protocol {
            line: self.number,
            violation,
            raw: self.lossy().into_owned(),
        }
    }
}

/// Splits a byte stream into lines with one line of lookahead.
#[derive(Debug)]
pub(crate) struct LineReader<R> {
    inner: R,
    number: usize,
    peeked: Option<RawLine>,
}

impl<R: BufRead> LineReader<R> {
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            number: 0,
            peeked: None,
        }
    }

    /// Number of the last line pulled from the stream.
    pub const fn number(&self) -> usize {
        self.number
    }

    pub fn next_line(&mut self) -> io::Result<Option<RawLine>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        self.read()
    }

    pub fn peek_line(&mut self) -> io::Result<Option<&RawLine>> {
        if self.peeked.is_none() {
            self.peeked = self.read()?;
        }
        Ok(self.peeked.as_ref())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read(&mut self) -> io::Result<Option<RawLine>> {
        let mut bytes = Vec::new();
        if self.inner.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(None);
        }
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        self.number += 1;
        Ok(Some(RawLine {
            number: self.number,
            bytes,
        }))
    }
}

/// `<id> <orig-line> <final-line> [<group-size>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header {
    pub id: String,
    pub orig_line: u32,
    pub final_line: u32,
    pub size: Option<u32>,
}

impl Header {
    pub fn parse(text: &str) -> Option<Self> {
        let mut fields = text.split(' ');
        let id = fields.next()?;
        if !is_commit_id(id) {
            return None;
        }
        let orig_line = parse_line_number(fields.next()?)?;
        let final_line = parse_line_number(fields.next()?)?;
        let size = match fields.next() {
            Some(size) => Some(parse_line_number(size)?),
            None => None,
        };
        if fields.next().is_some() {
            return None;
        }
        // Every line of the run must stay addressable as a `u32`.
        let count = size.unwrap_or(1);
        orig_line.checked_add(count)?;
        final_line.checked_add(count)?;

        Some(Self {
            id: id.to_string(),
            orig_line,
            final_line,
            size,
        })
    }
}

// SHA-1 or SHA-256 object names.
fn is_commit_id(id: &str) -> bool {
    matches!(id.len(), 40 | 64) && id.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_line_number(field: &str) -> Option<u32> {
    field.parse().ok().filter(|&n| n > 0)
}

/// Split `<tag> <value>`; a bare tag has an empty value.
pub(crate) fn split_tag(text: &str) -> (&str, &str) {
    text.split_once(' ').unwrap_or((text, ""))
}

/// Undo git's C-style path quoting (`"dir/caf\303\251.txt"`).
///
/// Values without surrounding double quotes are returned unchanged.
#[must_use]
pub fn unquote_path(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = Vec::with_capacity(inner.len());
    let mut bytes = inner.bytes().peekable();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'a') => out.push(0x07),
            Some(b'b') => out.push(0x08),
            Some(b't') => out.push(b'\t'),
            Some(b'n') => out.push(b'\n'),
            Some(b'v') => out.push(0x0b),
            Some(b'f') => out.push(0x0c),
            Some(b'r') => out.push(b'\r'),
            Some(d @ b'0'..=b'7') => {
                let mut code = u32::from(d - b'0');
                for _ in 0..2 {
                    match bytes.peek() {
                        Some(&n @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(n - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(code).unwrap_or(u8::MAX));
            }
            Some(other) => out.push(other),
            None => out.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// State shared by the full and incremental parsers: the input, the
/// commit cache and the ranges seen so far.
#[derive(Debug)]
pub(crate) struct Porcelain<R> {
    pub lines: LineReader<R>,
    pub cache: CommitCache,
    pub coverage: RangeTracker,
}

impl<R: BufRead> Porcelain<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineReader::new(reader),
            cache: CommitCache::new(),
            coverage: RangeTracker::new(),
        }
    }

    /// Read the next header, skipping blank lines. `None` at end of input.
    pub fn next_header(&mut self) -> Result<Option<Header>> {
        loop {
            let Some(raw) = self.lines.next_line()? else {
                return Ok(None);
            };
            if raw.is_blank() {
                continue;
            }
            return Self::header_of(&raw).map(Some);
        }
    }

    /// Look at the next header without consuming it.
    ///
    /// Blank lines in front of it are consumed. Returns `None` at end of
    /// input or when the next line is not a header.
    pub fn peek_header(&mut self) -> Result<Option<Header>> {
        loop {
            match self.lines.peek_line()? {
                None => return Ok(None),
                Some(raw) if raw.is_blank() => {}
                Some(raw) => {
                    return Ok(std::str::from_utf8(&raw.bytes)
                        .ok()
                        .and_then(Header::parse));
                }
            }
            self.lines.next_line()?;
        }
    }

    fn header_of(raw: &RawLine) -> Result<Header> {
        std::str::from_utf8(&raw.bytes)
            .ok()
            .and_then(Header::parse)
            .ok_or_else(|| {
                raw.violation(if raw.is_content() {
                    Violation::UnexpectedContent
                } else {
                    Violation::InvalidHeader
                })
            })
    }

    /// Read the metadata of a commit seen for the first time, through its
    /// `filename` line, and cache the record. Returns the record and path.
    ///
    /// Metadata values are decoded lossily; names and summaries are not
    /// guaranteed to be UTF-8.
    pub fn read_commit(&mut self, id: &str) -> Result<(Arc<CommitRecord>, String)> {
        let mut builder = CommitBuilder::new();
        loop {
            let raw = self.expect_line("commit metadata")?;
            if raw.is_tab_prefixed() {
                return Err(raw.violation(Violation::MissingTag("filename")));
            }

            let text = raw.lossy();
            let (tag, value) = split_tag(&text);
            if tag == "filename" {
                let path = unquote_path(value);
                let record = self
                    .cache
                    .get_or_try_insert_with(id, || builder.build(id))
                    .map_err(|v| raw.violation(v))?;
                return Ok((record, path));
            }
            builder.accept(tag, value).map_err(|v| raw.violation(v))?;
        }
    }

    /// Read the next line, treating end of input as a truncated block.
    pub fn expect_line(&mut self, expected: &'static str) -> Result<RawLine> {
        self.lines.next_line()?.ok_or(Error::UnexpectedEof {
            line: self.lines.number(),
            expected,
        })
    }
}
