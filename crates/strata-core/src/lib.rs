//! # strata-core
//!
//! Line attribution for Strata. Parses the porcelain output of
//! `git blame`, in full mode (content included, grouped by commit) and in
//! incremental mode (lazy entries in the order git resolves them), and
//! checks that the reported ranges cover a file exactly once.
//!
//! Commit metadata is parsed once per id and shared between all the
//! groups or entries that refer to it.

mod blame;
mod cache;
mod commit;
mod config;
mod error;
mod full;
mod incremental;
mod porcelain;
mod range;

pub use blame::{BlameEntries, blame_entries, blame_file};
pub use cache::CommitCache;
pub use commit::{CommitBuilder, CommitRecord, Previous, Signature};
pub use config::{BlameConfig, Config, OutputConfig};
pub use error::{Error, Result, Violation};
pub use full::{BlameGroup, FullBlame, parse_full};
pub use incremental::{AttributionEntry, Incremental, parse_incremental};
pub use porcelain::{Line, unquote_path};
pub use range::{CoverageError, LineRange, RangeTracker};
