//! Spawning `git blame` and streaming its porcelain output.
//!
//! The stream owns the child process. Reading it to the end and calling
//! [`BlameStream::finish`] reports the exit status; dropping it early kills
//! and reaps the process instead.

use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::debug;

use crate::Repository;
use crate::error::{Error, Result};

/// Which porcelain variant to ask git for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlameMode {
    /// `--porcelain`: headers, metadata and the content of every line.
    Porcelain,
    /// `--incremental`: headers and metadata only, no content lines.
    Incremental,
}

impl BlameMode {
    const fn flag(self) -> &'static str {
        match self {
            Self::Porcelain => "--porcelain",
            Self::Incremental => "--incremental",
        }
    }
}

/// Options forwarded to `git blame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameOptions {
    /// Program used to run git.
    pub git_binary: String,
    /// Ignore whitespace changes (`-w`).
    pub ignore_whitespace: bool,
    /// Detect lines moved within the file (`-M`).
    pub detect_moves: bool,
    /// Detect lines copied from other files (`-C`).
    pub detect_copies: bool,
    /// Extra arguments placed before the revision.
    pub extra_args: Vec<String>,
}

impl Default for BlameOptions {
    fn default() -> Self {
        Self {
            git_binary: "git".into(),
            ignore_whitespace: false,
            detect_moves: false,
            detect_copies: false,
            extra_args: Vec::new(),
        }
    }
}

impl BlameOptions {
    /// Build the argument list (without the program name).
    #[must_use]
    pub fn args(&self, rev: &str, path: &str, mode: BlameMode) -> Vec<String> {
        let mut args = vec!["blame".to_string(), mode.flag().to_string()];
        if self.ignore_whitespace {
            args.push("-w".into());
        }
        if self.detect_moves {
            args.push("-M".into());
        }
        if self.detect_copies {
            args.push("-C".into());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(rev.into());
        args.push("--".into());
        args.push(path.into());
        args
    }
}

/// Readable porcelain output of a running `git blame`.
pub struct BlameStream {
    command: String,
    reader: BufReader<ChildStdout>,
    child: Child,
    reaped: bool,
}

impl BlameStream {
    /// Spawn `git blame` in `dir`.
    ///
    /// # Errors
    /// Returns `Spawn` if the process cannot be started.
    pub fn spawn(
        dir: &Path,
        rev: &str,
        path: &str,
        mode: BlameMode,
        options: &BlameOptions,
    ) -> Result<Self> {
        let args = options.args(rev, path, mode);
        let command = format!("{} {}", options.git_binary, args.join(" "));
        debug!(%command, dir = %dir.display(), "spawning blame");

        let mut child = Command::new(&options.git_binary)
            .args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Spawn {
                command,
                source: io::Error::other("child stdout was not captured"),
            });
        };

        Ok(Self {
            command,
            reader: BufReader::new(stdout),
            child,
            reaped: false,
        })
    }

    /// The command line this stream was started with.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Wait for the process and report how it exited.
    ///
    /// Call after the output has been consumed. An unconsumed stream may
    /// leave git blocked on a full pipe; drop it instead to kill the process.
    ///
    /// # Errors
    /// Returns `CommandFailed` carrying git's stderr on a non-zero exit.
    pub fn finish(mut self) -> Result<()> {
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            // Lossy: git may print paths in a non-UTF-8 encoding.
            let mut bytes = Vec::new();
            if pipe.read_to_end(&mut bytes).is_ok() {
                stderr = String::from_utf8_lossy(&bytes).trim().to_string();
            }
        }

        let status = self.child.wait().map_err(|source| Error::Spawn {
            command: self.command.clone(),
            source,
        })?;
        self.reaped = true;
        debug!(command = %self.command, %status, "blame finished");

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                command: self.command.clone(),
                code: status.code(),
                stderr,
            })
        }
    }
}

impl Read for BlameStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for BlameStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt);
    }
}

impl Drop for BlameStream {
    fn drop(&mut self) {
        if !self.reaped {
            debug!(command = %self.command, "abandoning blame, killing process");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl std::fmt::Debug for BlameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlameStream")
            .field("command", &self.command)
            .field("pid", &self.child.id())
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Start `git blame` for `path` at `rev`.
    ///
    /// # Errors
    /// Returns `NotARepository` for bare repositories, or `Spawn` if git
    /// cannot be started. Git's own failures surface from
    /// [`BlameStream::finish`].
    pub fn blame_stream(
        &self,
        rev: &str,
        path: &str,
        mode: BlameMode,
        options: &BlameOptions,
    ) -> Result<BlameStream> {
        let workdir = self.workdir().ok_or(Error::NotARepository)?;
        BlameStream::spawn(workdir, rev, path, mode, options)
    }
}
