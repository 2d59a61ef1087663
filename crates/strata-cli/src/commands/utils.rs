use std::env;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use strata_core::Config;
use strata_git::Repository;

/// Helper to open the repository around the current directory.
pub fn open_repo() -> Result<Repository> {
    Repository::open_current().context("Not inside a git repository")
}

/// Helper to open the repo and its strata config.
pub fn open_repo_and_config() -> Result<(Repository, Config)> {
    let repo = open_repo()?;
    let config = Config::load(Config::path_in(repo.git_dir()))
        .context("Failed to load .git/strata/config.toml")?;
    Ok((repo, config))
}

/// Turn a path given on the command line into the `/`-separated path git
/// expects relative to the working tree.
pub fn repo_relative_path(repo: &Repository, path: &Path) -> Result<String> {
    let workdir = repo
        .workdir()
        .context("Cannot blame in a bare repository")?
        .canonicalize()
        .context("Cannot resolve the working tree")?;
    let absolute = resolve(&env::current_dir()?.join(path));

    let relative = absolute
        .strip_prefix(&workdir)
        .with_context(|| format!("{} is outside the repository", path.display()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(
                part.to_str()
                    .with_context(|| format!("{} is not valid UTF-8", path.display()))?,
            );
        }
    }
    Ok(parts.join("/"))
}

// The file may be gone from the working tree but still exist at the
// blamed revision, so fall back to resolving its directory.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map_or_else(|_| path.to_path_buf(), |dir| dir.join(name)),
        _ => path.to_path_buf(),
    }
}
