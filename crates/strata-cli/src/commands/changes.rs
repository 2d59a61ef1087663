//! `strata changes` command - list files whose blame went stale.

use anyhow::Result;
use colored::Colorize;

use super::utils::open_repo;
use crate::output;
use crate::services::{ChangesReport, ChangesService};

/// Run the changes command.
pub fn run(from: &str, to: &str, json: bool) -> Result<()> {
    let repo = open_repo()?;
    let report = ChangesService::new(&repo).between(from, to)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.changes.is_empty() {
        output::info(&format!("No files deleted or renamed between {from} and {to}"));
        return Ok(());
    }
    print_changes(&report);
    Ok(())
}

fn print_changes(report: &ChangesReport) {
    for change in &report.changes {
        let line = match &change.new_path {
            Some(new_path) => format!(
                "{} {} → {}",
                format!("{:<8}", change.kind).blue(),
                change.old_path,
                new_path
            ),
            None => format!(
                "{} {}",
                format!("{:<8}", change.kind).red(),
                change.old_path
            ),
        };
        output::essential(&line);
    }
}
