use crate::commands;
use crate::commands::consolidate::ConsolidateOptions;
use crate::commands::migrate::MigrateOptions;
use crate::commands::status::StatusOptions;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "songdex", version, about = "Song-sheet library consolidator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild the canonical song and library index documents
    Consolidate {
        /// Library repo root
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Suppress per-run details on stdout
        #[arg(long)]
        quiet: bool,
    },
    /// Rewrite setlist references from sheet uids to canonical song uids
    MigrateSetlists {
        /// Library repo root
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Suppress per-run details on stdout
        #[arg(long)]
        quiet: bool,
    },
    /// Show resolved paths, configuration, and recognized env overrides
    Status {
        /// Library repo root
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let (report, quiet) = match cli.command {
        Command::Consolidate { repo, quiet } => {
            (commands::consolidate::run(&ConsolidateOptions { repo })?, quiet)
        }
        Command::MigrateSetlists { repo, quiet } => {
            (commands::migrate::run(&MigrateOptions { repo })?, quiet)
        }
        Command::Status { repo } => (commands::status::run(&StatusOptions { repo })?, false),
    };

    commands::print_report(&report, quiet);
    if !report.ok {
        anyhow::bail!("{} completed with issues", report.command);
    }
    Ok(())
}
