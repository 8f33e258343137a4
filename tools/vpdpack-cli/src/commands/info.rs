//! Show project information.

use std::path::PathBuf;

use vpdpack_organize_core::{assign_sequence, build_catalog, link_references, walk_timeline};
use vpdpack_project_model::{ProjectContainer, VpdDocument};

pub fn run(source: PathBuf) -> anyhow::Result<()> {
    let container = ProjectContainer::locate(&source)?;
    let doc = VpdDocument::load(&container.document_path)?;

    let mut catalog = build_catalog(&doc);
    let refs = walk_timeline(&doc);
    let report = link_references(&mut catalog, &refs);
    let sequence = assign_sequence(&catalog);

    println!("Project: {}", container.project_name());
    println!("  Document: {}", container.document_path.display());
    println!();

    println!("Resources:");
    for (kind, count) in catalog.counts_by_kind() {
        println!("  {kind}: {count}");
    }
    println!("  Total: {}", catalog.len());
    println!();

    println!("Timeline:");
    println!("  Tracks: {}", doc.timeline_tracks().len());
    println!("  Media blocks: {}", refs.len());
    println!(
        "  References: {} resolved, {} unresolved",
        report.resolved, report.unresolved
    );
    println!();

    println!("Usage:");
    println!("  Used in timeline: {}", sequence.len());
    println!("  Unused: {}", catalog.len() - sequence.len());

    let missing = catalog
        .iter()
        .filter(|r| !r.source_path.exists())
        .count();
    if missing > 0 {
        println!("  Missing source files: {missing} (run `vpdpack repair`)");
    } else {
        println!("  Sources: All present");
    }

    Ok(())
}
