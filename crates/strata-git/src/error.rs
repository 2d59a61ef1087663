//! Error types for strata-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to git.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Revision could not be resolved.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// The git process could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Command line that was attempted.
        command: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The git process exited unsuccessfully.
    #[error("`{command}` failed ({}): {stderr}", exit_description(.code))]
    CommandFailed {
        /// Command line that was run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    code.map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}"))
}
