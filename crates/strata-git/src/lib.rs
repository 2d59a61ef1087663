//! # strata-git
//!
//! Git access layer for Strata. Spawns `git blame` and exposes its output
//! as a scoped byte stream, and answers simple history questions through
//! git2-rs (repository discovery, renamed/deleted paths between revisions).

mod blame;
mod changes;
mod error;
mod repository;

pub use blame::{BlameMode, BlameOptions, BlameStream};
pub use changes::{ChangeKind, PathChange};
pub use error::{Error, Result};
pub use repository::Repository;
