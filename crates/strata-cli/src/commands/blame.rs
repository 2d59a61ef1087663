//! `strata blame` command - show who last changed each line of a file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::utils::{open_repo_and_config, repo_relative_path};
use crate::output;
use crate::services::{BlameReport, BlameService, EntryInfo};

const AUTHOR_WIDTH: usize = 16;

/// Run the blame command.
pub fn run(path: &Path, rev: &str, incremental: bool, json: bool, no_verify: bool) -> Result<()> {
    let (repo, mut config) = open_repo_and_config()?;
    if no_verify {
        config.blame.verify_coverage = false;
    }

    let path = repo_relative_path(&repo, path)?;
    debug!(%path, rev, incremental, "blaming");

    let service = BlameService::new(&repo, &config);

    if incremental {
        return run_incremental(&service, rev, &path, json);
    }

    let report = service
        .report(rev, &path)
        .with_context(|| format!("Failed to blame {path} at {rev}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_incremental(service: &BlameService<'_>, rev: &str, path: &str, json: bool) -> Result<()> {
    let entries = service
        .entries(rev, path)
        .with_context(|| format!("Failed to blame {path} at {rev}"))?;

    if json {
        let entries: Vec<EntryInfo> = entries
            .collect::<Result<_>>()
            .with_context(|| format!("Failed to blame {path} at {rev}"))?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    // Print as git resolves them; an error ends the listing.
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to blame {path} at {rev}"))?;
        print_entry(&entry);
    }
    Ok(())
}

/// Print the file annotated git-blame style.
fn print_report(report: &BlameReport) {
    let commits = report.commits_by_id();
    let width = report.line_count.to_string().len();

    for group in &report.groups {
        let Some(commit) = commits.get(group.commit.as_str()) else {
            continue;
        };
        let prefix = format!(
            "{} ({} {})",
            output::commit_ref(&commit.short_id, commit.boundary),
            output::author_column(&commit.author, AUTHOR_WIDTH),
            commit.date
        );

        for line in &group.lines {
            let text = if line.binary {
                line.text.strip_prefix('\t').unwrap_or(&line.text)
            } else {
                &line.text
            };
            output::essential(&format!("{prefix} {:>width$} {text}", line.number));
        }
    }

    let binary = report.binary_lines();
    if binary > 0 {
        output::warn(&format!("{binary} line(s) are not valid UTF-8 and were shown lossily"));
    }
}

fn print_entry(entry: &EntryInfo) {
    let range = if entry.count == 1 {
        entry.start.to_string()
    } else {
        format!("{}-{}", entry.start, entry.start + entry.count - 1)
    };

    output::essential(&format!(
        "{} {range:<9} {}:{} {} {}",
        output::commit_ref(&entry.commit.short_id, entry.commit.boundary),
        entry.orig_path,
        entry.orig_start,
        output::author_column(&entry.commit.author, AUTHOR_WIDTH),
        entry.commit.summary
    ));
}
