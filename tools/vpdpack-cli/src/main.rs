//! VpdPack CLI — Consolidate and repair VideoProc Vlogger projects.
//!
//! Usage:
//!   vpdpack organize <SOURCE> <TARGET>   Organize a project into a clean tree
//!   vpdpack repair <SOURCE>              Fix broken media paths in a project
//!   vpdpack info <SOURCE>                Show project information

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vpdpack",
    about = "Consolidate VideoProc Vlogger projects into portable, organized form",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Organize a project: copy timeline media into a clean tree and
    /// rewrite the document to match
    Organize {
        /// Source project: a .dvp folder or a .vpd file
        source: PathBuf,

        /// Target root directory for the organized project
        target: PathBuf,

        /// Root path to record inside the rewritten document, when the
        /// organized output will later live somewhere else
        #[arg(long)]
        media_root: Option<PathBuf>,

        /// Preview without copying files or writing the document
        #[arg(long)]
        dry_run: bool,

        /// Skip the source container backup
        #[arg(long)]
        no_backup: bool,

        /// Also remove timeline blocks whose reference resolves to nothing
        #[arg(long)]
        prune_unresolved: bool,

        /// Parallel copy workers (defaults to the configured value)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Repair broken media paths by searching a directory tree
    Repair {
        /// Source project: a .dvp folder or a .vpd file
        source: PathBuf,

        /// Root directory to search for missing files (defaults to the
        /// container's parent)
        #[arg(long)]
        search_root: Option<PathBuf>,

        /// Output file path (defaults to overwriting the input)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Preview changes without modifying anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the source container backup
        #[arg(long)]
        no_backup: bool,
    },

    /// Show project information
    Info {
        /// Source project: a .dvp folder or a .vpd file
        source: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    vpdpack_common::logging::init_logging(&vpdpack_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Organize {
            source,
            target,
            media_root,
            dry_run,
            no_backup,
            prune_unresolved,
            workers,
        } => {
            commands::organize::run(
                source,
                target,
                media_root,
                dry_run,
                no_backup,
                prune_unresolved,
                workers,
            )
            .await
        }
        Commands::Repair {
            source,
            search_root,
            output,
            dry_run,
            no_backup,
        } => commands::repair::run(source, search_root, output, dry_run, no_backup),
        Commands::Info { source } => commands::info::run(source),
    }
}
