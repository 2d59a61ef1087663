//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub mod blame;
pub mod changes;
pub mod completions;
pub mod utils;

/// Strata - who last touched each line, straight from git blame.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug details to stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the commit that last changed each line of a file.
    #[command(alias = "b")]
    Blame {
        /// File to blame, relative to the current directory.
        path: PathBuf,

        /// Revision to blame at.
        #[arg(short, long, default_value = "HEAD")]
        rev: String,

        /// Stream ranges as git resolves them instead of the full file.
        #[arg(short, long)]
        incremental: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Skip checking that every line was attributed exactly once.
        #[arg(long)]
        no_verify: bool,
    },

    /// List files deleted or renamed between two revisions.
    ///
    /// Blame results cached for these paths are stale.
    Changes {
        /// Older revision.
        #[arg(long, default_value = "HEAD@{1}")]
        from: String,

        /// Newer revision.
        #[arg(long, default_value = "HEAD")]
        to: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}
