//! Error types for strata-core.

use crate::range::CoverageError;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in strata-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A line did not have the shape the parser expected at that point.
    #[error("malformed blame output at line {line}: {violation}: {raw:?}")]
    Protocol {
        /// 1-based line number within the stream.
        line: usize,
        /// What was wrong with the line.
        violation: Violation,
        /// The offending line, lossily decoded.
        raw: String,
    },

    /// The stream ended in the middle of a block.
    #[error("blame output ended after line {line} while expecting {expected}")]
    UnexpectedEof {
        /// Number of the last line read.
        line: usize,
        /// What the parser was waiting for.
        expected: &'static str,
    },

    /// The parsed ranges do not cover the file exactly once.
    #[error("line coverage check failed: {0}")]
    Coverage(#[from] CoverageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] strata_git::Error),
}

impl Error {
    /// Whether this error means git's output broke the porcelain contract.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::UnexpectedEof { .. })
    }
}

/// Ways a single line can violate the porcelain format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Expected `<id> <orig> <final> [<size>]`.
    #[error("invalid header")]
    InvalidHeader,

    /// A metadata tag the format does not define.
    #[error("unknown tag `{0}`")]
    UnknownTag(String),

    /// A metadata tag given twice in one block.
    #[error("duplicate tag `{0}`")]
    DuplicateTag(String),

    /// A required metadata tag never arrived before `filename`.
    #[error("missing tag `{0}`")]
    MissingTag(&'static str),

    /// A `*-time` value that is not a decimal integer.
    #[error("invalid timestamp `{0}`")]
    InvalidTime(String),

    /// A `previous` value that is not `<id> <path>`.
    #[error("invalid previous `{0}`")]
    InvalidPrevious(String),

    /// A repeated commit must be followed by its `filename` line.
    #[error("expected `filename` after repeated commit")]
    ExpectedFilename,

    /// The line after a block's metadata must be file content.
    #[error("expected content line")]
    ExpectedContent,

    /// A content line where a header was expected.
    #[error("unexpected content line")]
    UnexpectedContent,
}
