//! Organize a project into a clean, portable tree.

use std::path::PathBuf;

use vpdpack_common::AppConfig;
use vpdpack_organize_core::pipeline::{self, OrganizeOptions};

pub async fn run(
    source: PathBuf,
    target: PathBuf,
    media_root: Option<PathBuf>,
    dry_run: bool,
    no_backup: bool,
    prune_unresolved: bool,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let config = AppConfig::load();

    let options = OrganizeOptions {
        source,
        target_root: target,
        media_root,
        dry_run,
        backup: !no_backup && config.organize.backup,
        prune_unresolved,
        copy_workers: workers.unwrap_or(config.organize.copy_workers),
    };

    println!("Organizing project: {}", options.source.display());
    println!("  Target: {}", options.target_root.display());
    if let Some(ref media_root) = options.media_root {
        println!("  Media root for document references: {}", media_root.display());
    }
    if options.dry_run {
        println!("  Mode: dry run (no files will be modified)");
    }
    println!();

    let summary = pipeline::run(&options).await?;

    println!("\nSummary:");
    println!("  Total resources: {}", summary.total_resources);
    println!("  Used in timeline: {}", summary.used);
    println!("  Unused: {}", summary.unused);
    println!(
        "  Timeline blocks: {} ({} resolved, {} unresolved)",
        summary.timeline_blocks, summary.resolved_blocks, summary.unresolved_blocks
    );
    println!(
        "  Files copied: {} used, {} unused",
        summary.copied, summary.unused_copied
    );
    if summary.pruned_blocks > 0 {
        println!("  Pruned timeline blocks: {}", summary.pruned_blocks);
    }
    if let Some(ref output) = summary.output_document {
        if summary.dry_run {
            println!("  Would write project: {}", output.display());
        } else {
            println!("  Organized project: {}", output.display());
        }
    }
    if let Some(ref backup) = summary.backup_path {
        println!("  Backup saved: {}", backup.display());
    }

    if summary.error_count() > 0 {
        println!("\n{} file operation(s) failed:", summary.error_count());
        for error in &summary.errors {
            println!("  - {error}");
        }
        anyhow::bail!("{} file operation(s) failed", summary.error_count());
    }

    Ok(())
}
