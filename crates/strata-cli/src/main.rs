//! Strata CLI - line attribution from git blame.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod output;
mod services;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    output::set_quiet(cli.quiet);
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Blame {
            path,
            rev,
            incremental,
            json,
            no_verify,
        } => commands::blame::run(&path, &rev, incremental, json, no_verify),
        Commands::Changes { from, to, json } => commands::changes::run(&from, &to, json),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "strata_cli=debug,strata_core=debug,strata_git=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
