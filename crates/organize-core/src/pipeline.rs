//! Pipeline orchestration.
//!
//! Drives the organize run as a linear phase machine:
//!
//! `Loaded → CataloguedAndWalked → Linked → Sequenced → StructurePrepared
//! → Relocated → Rewritten → Persisted`
//!
//! Dry-run simulates the relocation and persistence phases while still
//! computing and reporting every other phase's results, so a dry run is a
//! faithful preview rather than a truncated run. A failure surfaces the
//! phase it happened in and how many files were already copied; the
//! relocation phase performs partially-committed filesystem work that is
//! not rolled back.

use std::fmt;
use std::path::PathBuf;

use vpdpack_common::{VpdError, VpdResult};
use vpdpack_project_model::{ProjectContainer, VpdDocument};

use crate::catalog::build_catalog;
use crate::linker::{assign_sequence, link_references};
use crate::relocate::{copy_tree, execute_plan, plan_relocation, TargetLayout};
use crate::rewrite::{rewrite_project_info, rewrite_resource_paths, prune_unresolved_blocks, SaveTime};
use crate::timeline::walk_timeline;

/// Options for one organize run.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Source project: a `.dvp` container directory or a bare `.vpd` file.
    pub source: PathBuf,

    /// Root directory the organized project is written under.
    pub target_root: PathBuf,

    /// Root to record inside the rewritten document, when the organized
    /// output will later live at a different absolute location. Defaults
    /// to `target_root`.
    pub media_root: Option<PathBuf>,

    /// Simulate filesystem mutation and document persistence.
    pub dry_run: bool,

    /// Back up the source container before persisting.
    pub backup: bool,

    /// Also remove timeline blocks whose reference resolves to nothing.
    /// Off by default; the editing tool handles dangling references.
    pub prune_unresolved: bool,

    /// Bounded parallelism for the copy phase.
    pub copy_workers: usize,
}

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loaded,
    CataloguedAndWalked,
    Linked,
    Sequenced,
    StructurePrepared,
    Relocated,
    Rewritten,
    Persisted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Loaded => "Loaded",
            Phase::CataloguedAndWalked => "CataloguedAndWalked",
            Phase::Linked => "Linked",
            Phase::Sequenced => "Sequenced",
            Phase::StructurePrepared => "StructurePrepared",
            Phase::Relocated => "Relocated",
            Phase::Rewritten => "Rewritten",
            Phase::Persisted => "Persisted",
        };
        f.write_str(name)
    }
}

/// Terminal pipeline failure: which phase broke and how much filesystem
/// work had already been committed.
#[derive(Debug, thiserror::Error)]
#[error("organize pipeline failed entering phase {phase} after {files_copied} file(s) copied: {source}")]
pub struct PipelineFailure {
    pub phase: Phase,
    pub files_copied: usize,
    #[source]
    pub source: VpdError,
}

/// Accumulated result of one organize run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub dry_run: bool,
    pub total_resources: usize,
    pub used: usize,
    pub unused: usize,
    pub timeline_blocks: usize,
    pub resolved_blocks: usize,
    pub unresolved_blocks: usize,
    pub copied: usize,
    pub unused_copied: usize,
    pub pruned_blocks: usize,
    /// Per-file relocation errors, accumulated rather than fatal.
    pub errors: Vec<String>,
    pub output_document: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Run the full organize pipeline.
pub async fn run(options: &OrganizeOptions) -> Result<RunSummary, PipelineFailure> {
    let mut summary = RunSummary {
        dry_run: options.dry_run,
        ..RunSummary::default()
    };

    // Loaded
    let container = ProjectContainer::locate(&options.source)
        .map_err(|e| fail(Phase::Loaded, 0, e))?;
    let mut doc =
        VpdDocument::load(&container.document_path).map_err(|e| fail(Phase::Loaded, 0, e))?;

    // CataloguedAndWalked
    let mut catalog = build_catalog(&doc);
    let refs = walk_timeline(&doc);
    summary.total_resources = catalog.len();
    summary.timeline_blocks = refs.len();

    if catalog.is_empty() {
        tracing::warn!("No media resources found in project");
        return Ok(summary);
    }

    // Linked
    let report = link_references(&mut catalog, &refs);
    summary.resolved_blocks = report.resolved;
    summary.unresolved_blocks = report.unresolved;

    // Sequenced
    let sequence = assign_sequence(&catalog);
    summary.used = sequence.len();
    summary.unused = catalog.len() - sequence.len();

    // StructurePrepared
    let layout = TargetLayout::new(
        options.target_root.clone(),
        options.media_root.clone(),
        container.project_name(),
    );
    if options.dry_run {
        tracing::info!(
            "[DRY RUN] Would create {} and {}",
            layout.project_dir().display(),
            layout.media_dir().display()
        );
    } else {
        layout
            .ensure_directories()
            .map_err(|e| fail(Phase::StructurePrepared, 0, e))?;
    }

    // Relocated
    let plan = plan_relocation(&catalog, &sequence, &layout);
    if !options.dry_run {
        // Persist the plan before any copy runs so a crash mid-phase can
        // be diagnosed from it.
        if let Err(e) = plan.write_manifest(&layout.media_dir().join("relocation-plan.json")) {
            tracing::warn!("Could not write relocation plan manifest: {e}");
        }
    }
    let outcomes = execute_plan(&plan, options.copy_workers, options.dry_run).await;
    for outcome in &outcomes {
        if outcome.copied {
            if outcome.used {
                summary.copied += 1;
            } else {
                summary.unused_copied += 1;
            }
        }
        if let Some(error) = &outcome.error {
            summary.errors.push(format!("{}: {error}", outcome.uuid));
        }
    }
    tracing::info!(
        "File operations complete: {} copied, {} errors",
        summary.copied + summary.unused_copied,
        summary.error_count()
    );

    // Rewritten
    rewrite_resource_paths(&mut doc, &plan);
    let document_name = container
        .document_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| std::ffi::OsString::from("project.vpd"));
    let output_document = layout.project_dir().join(&document_name);
    rewrite_project_info(&mut doc, &output_document, SaveTime::now());
    if options.prune_unresolved {
        summary.pruned_blocks = prune_unresolved_blocks(&mut doc, &catalog);
    }

    // Persisted
    let files_copied = summary.copied + summary.unused_copied;
    if options.dry_run {
        tracing::info!(
            "[DRY RUN] Would save organized document to: {}",
            output_document.display()
        );
    } else {
        if options.backup {
            summary.backup_path = Some(
                create_backup(&container).map_err(|e| fail(Phase::Persisted, files_copied, e))?,
            );
        }
        doc.save_to(&output_document)
            .map_err(|e| fail(Phase::Persisted, files_copied, e))?;
        copy_sibling_files(&container, &layout);
    }
    summary.output_document = Some(output_document);

    Ok(summary)
}

fn fail(phase: Phase, files_copied: usize, source: VpdError) -> PipelineFailure {
    PipelineFailure {
        phase,
        files_copied,
        source,
    }
}

/// Copy the source container to a timestamped sibling before the new
/// document is written. A backup failure is fatal.
pub(crate) fn create_backup(container: &ProjectContainer) -> VpdResult<PathBuf> {
    let source_dir = container.asset_dir();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let backup_name = format!("{}.backup.{timestamp}.dvp", container.project_name());
    let backup_path = source_dir
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| source_dir.clone())
        .join(backup_name);

    tracing::info!("Creating backup: {}", backup_path.display());
    copy_tree(&source_dir, &backup_path)?;
    Ok(backup_path)
}

/// Carry sibling asset files (thumbnails, user data) into the new
/// container. Individual failures are logged, not fatal.
fn copy_sibling_files(container: &ProjectContainer, layout: &TargetLayout) {
    let siblings = match container.sibling_files() {
        Ok(siblings) => siblings,
        Err(e) => {
            tracing::warn!("Could not list container files: {e}");
            return;
        }
    };

    let target_dir = layout.project_dir();
    let mut copied = 0;
    for file in siblings {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = target_dir.join(name);
        match std::fs::copy(&file, &target) {
            Ok(_) => copied += 1,
            Err(e) => tracing::warn!("Failed to copy {}: {e}", file.display()),
        }
    }
    if copied > 0 {
        tracing::info!("Copied {copied} additional files from source container");
    }
}
