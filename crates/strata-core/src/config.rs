//! Configuration management for Strata.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_git::BlameOptions;

use crate::error::Result;

/// Strata configuration loaded from .git/strata/config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// How `git blame` is invoked and checked.
    #[serde(default)]
    pub blame: BlameConfig,

    /// Display settings for the CLI.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Location of the config file inside a repository's git dir.
    #[must_use]
    pub fn path_in(git_dir: &Path) -> PathBuf {
        git_dir.join("strata").join("config.toml")
    }

    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a TOML file, creating its directory if needed.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Blame invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameConfig {
    /// Program used to run git.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Pass `-w` to ignore whitespace-only changes.
    #[serde(default)]
    pub ignore_whitespace: bool,

    /// Pass `-M` to follow lines moved within a file.
    #[serde(default)]
    pub detect_moves: bool,

    /// Pass `-C` to follow lines copied from other files.
    #[serde(default)]
    pub detect_copies: bool,

    /// Extra arguments for `git blame`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,

    /// Check that parsed ranges cover the file exactly once.
    #[serde(default = "default_true")]
    pub verify_coverage: bool,
}

impl Default for BlameConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            ignore_whitespace: false,
            detect_moves: false,
            detect_copies: false,
            extra_args: Vec::new(),
            verify_coverage: true,
        }
    }
}

impl BlameConfig {
    /// Options for the git process.
    #[must_use]
    pub fn git_options(&self) -> BlameOptions {
        BlameOptions {
            git_binary: self.git_binary.clone(),
            ignore_whitespace: self.ignore_whitespace,
            detect_moves: self.detect_moves,
            detect_copies: self.detect_copies,
            extra_args: self.extra_args.clone(),
        }
    }
}

fn default_git_binary() -> String {
    "git".into()
}

const fn default_true() -> bool {
    true
}

/// CLI display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// `chrono` format string for commit dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Number of id characters to show.
    #[serde(default = "default_short_id_len")]
    pub short_id_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            short_id_len: default_short_id_len(),
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".into()
}

const fn default_short_id_len() -> usize {
    8
}
