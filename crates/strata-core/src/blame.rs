//! Blaming files in a repository.
//!
//! Connects the git process from `strata-git` to the parsers. Git's own
//! failures (unknown revision, missing path) are reported as
//! [`Error::Git`] even when they also left the output truncated.

use std::io::{self, Read};

use strata_git::{BlameMode, BlameStream, Repository};
use tracing::debug;

use crate::config::BlameConfig;
use crate::error::{Error, Result};
use crate::full::{FullBlame, parse_full};
use crate::incremental::{AttributionEntry, Incremental};

/// Blame `path` at `rev`, content included.
///
/// # Errors
/// Returns `Git` if git could not run or failed, a protocol error if its
/// output is malformed, and `Coverage` if verification is enabled and the
/// groups do not cover the file exactly once.
pub fn blame_file(
    repo: &Repository,
    rev: &str,
    path: &str,
    config: &BlameConfig,
) -> Result<FullBlame> {
    let mut stream = repo.blame_stream(rev, path, BlameMode::Porcelain, &config.git_options())?;
    let parsed = parse_full(&mut stream);
    settle(stream, parsed.is_err())?;

    let blame = parsed?;
    if config.verify_coverage {
        let lines = blame.coverage.validate()?;
        debug!(path, rev, lines, "coverage verified");
    }
    Ok(blame)
}

/// Blame `path` at `rev` lazily, one entry per incremental header.
///
/// Dropping the iterator before the end stops git.
///
/// # Errors
/// Returns `Git` if git could not be started. Later failures are yielded
/// by the iterator.
pub fn blame_entries(
    repo: &Repository,
    rev: &str,
    path: &str,
    config: &BlameConfig,
) -> Result<BlameEntries> {
    let stream = repo.blame_stream(rev, path, BlameMode::Incremental, &config.git_options())?;
    Ok(BlameEntries {
        parser: Some(Incremental::new(stream)),
        verify_coverage: config.verify_coverage,
    })
}

/// Entries of a running incremental blame.
///
/// After the last entry the git process is waited for; a failed exit or a
/// coverage problem is yielded as a final `Err`.
#[derive(Debug)]
pub struct BlameEntries {
    parser: Option<Incremental<BlameStream>>,
    verify_coverage: bool,
}

impl Iterator for BlameEntries {
    type Item = Result<AttributionEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let parser = self.parser.as_mut()?;
        match parser.next() {
            Some(Ok(entry)) => Some(Ok(entry)),
            Some(Err(err)) => {
                let stream = self.parser.take()?.into_inner();
                Some(Err(settle(stream, true).err().unwrap_or(err)))
            }
            None => {
                let parser = self.parser.take()?;
                let coverage = if self.verify_coverage {
                    parser.coverage().validate().map(drop)
                } else {
                    Ok(())
                };
                if let Err(err) = settle(parser.into_inner(), false) {
                    return Some(Err(err));
                }
                coverage.err().map(|e| Err(e.into()))
            }
        }
    }
}

impl std::iter::FusedIterator for BlameEntries {}

/// Wait for git, reading off whatever it still has to say first when the
/// parser stopped early. A failed exit outranks a failed read.
fn settle(mut stream: BlameStream, drain: bool) -> Result<()> {
    let drained = if drain {
        drain_output(&mut stream)
    } else {
        Ok(())
    };
    stream.finish().map_err(Error::Git)?;
    drained
}

fn drain_output(reader: &mut impl Read) -> Result<()> {
    io::copy(reader, &mut io::sink()).map(drop).map_err(|err| {
        debug!(%err, "failed to drain blame output");
        Error::Io(err)
    })
}
