//! Repair broken media paths in a project document.

use std::path::PathBuf;

use vpdpack_common::AppConfig;
use vpdpack_organize_core::repair::{self, RepairOptions};

pub fn run(
    source: PathBuf,
    search_root: Option<PathBuf>,
    output: Option<PathBuf>,
    dry_run: bool,
    no_backup: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load();

    let options = RepairOptions {
        source,
        search_root,
        output,
        dry_run,
        backup: !no_backup && config.organize.backup,
    };

    println!("Repairing project: {}", options.source.display());
    if options.dry_run {
        println!("  Mode: dry run (no files will be modified)");
    }
    println!();

    let summary = repair::run(&options)?;

    println!("\nSummary:");
    println!("  Total resources: {}", summary.total_resources);
    println!("  Missing: {}", summary.missing);
    if summary.dry_run {
        println!("  Would repair: {}", summary.repaired);
    } else {
        println!("  Repaired: {}", summary.repaired);
    }
    if let Some(ref output) = summary.output_document {
        println!("  Repaired project: {}", output.display());
    }
    if let Some(ref backup) = summary.backup_path {
        println!("  Backup saved: {}", backup.display());
    }

    if !summary.unrepaired.is_empty() {
        println!("\n{} file(s) could not be located:", summary.unrepaired.len());
        for name in &summary.unrepaired {
            println!("  - {name}");
        }
        anyhow::bail!("{} file(s) could not be located", summary.unrepaired.len());
    }

    Ok(())
}
