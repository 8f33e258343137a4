//! Target layout planning and bulk file relocation.
//!
//! Planning is pure: every resource gets a `(planned target, document
//! path)` pair derived from its kind, sequence number, and track. The plan
//! is serializable so it can be written out before any copy executes:
//! there is no transactional filesystem, and a crash mid-run should be
//! diagnosable from the persisted plan.
//!
//! Execution copies files through a bounded pool of blocking workers.
//! Workers share only read access to the plan; each worker's side effect
//! is one filesystem copy plus its own result slot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::{stream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use vpdpack_common::{VpdError, VpdResult};
use vpdpack_project_model::{MediaKind, MediaResource};

use crate::catalog::Catalog;
use crate::linker::SequenceTable;

/// Prefix this pipeline writes on organized filenames: four digits, an
/// underscore, a track token, the literal `Track`, an underscore. The
/// strict shape keeps re-runs from accumulating prefixes.
static SEQUENCE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}_[^_]+_Track_").expect("static pattern compiles"));

/// Remove one layer of a previously-applied sequence prefix, if any.
pub fn strip_sequence_prefix(name: &str) -> &str {
    match SEQUENCE_PREFIX.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Make a track title safe for use inside a filename.
fn sanitize_track(track: &str) -> String {
    track
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Build the organized filename for a used resource:
/// `<sequence, 4 digits>_<sanitized track>_<original name, prior prefix stripped>`.
pub fn organized_file_name(sequence: u32, track: &str, original_name: &str) -> String {
    format!(
        "{sequence:04}_{}_{}",
        sanitize_track(track),
        strip_sequence_prefix(original_name)
    )
}

/// Physical and document-recorded locations for an organized project.
///
/// `target_root` is where this run writes files; `media_root` is the root
/// recorded inside the rewritten document. They differ when the organized
/// output will later be moved to another absolute location.
#[derive(Debug, Clone)]
pub struct TargetLayout {
    pub target_root: PathBuf,
    pub media_root: PathBuf,
    pub project_name: String,
}

impl TargetLayout {
    pub fn new(
        target_root: impl Into<PathBuf>,
        media_root: Option<PathBuf>,
        project_name: impl Into<String>,
    ) -> Self {
        let target_root = target_root.into();
        let media_root = media_root.unwrap_or_else(|| target_root.clone());
        Self {
            target_root,
            media_root,
            project_name: project_name.into(),
        }
    }

    /// `<root>/<name>.dvp` — the new project container.
    pub fn project_dir(&self) -> PathBuf {
        self.target_root.join(format!("{}.dvp", self.project_name))
    }

    /// `<root>/<name>_media` — the organized media tree.
    pub fn media_dir(&self) -> PathBuf {
        self.target_root.join(self.media_dir_name())
    }

    fn media_dir_name(&self) -> String {
        format!("{}_media", self.project_name)
    }

    /// Physical directory for used media of `kind`.
    pub fn used_dir(&self, kind: MediaKind) -> PathBuf {
        self.media_dir().join(kind.subdir())
    }

    /// Physical directory for unused media of `kind`.
    pub fn unused_dir(&self, kind: MediaKind) -> PathBuf {
        self.media_dir().join("unused").join(kind.subdir())
    }

    /// Path to record inside the document for a relocated file.
    pub fn document_media_path(&self, kind: MediaKind, used: bool, file_name: &str) -> PathBuf {
        let media = self.media_root.join(self.media_dir_name());
        if used {
            media.join(kind.subdir()).join(file_name)
        } else {
            media.join("unused").join(kind.subdir()).join(file_name)
        }
    }

    /// Create the full target directory structure.
    pub fn ensure_directories(&self) -> VpdResult<()> {
        let mut dirs = vec![self.project_dir(), self.media_dir()];
        for kind in MediaKind::EXTRACTION_ORDER {
            dirs.push(self.used_dir(kind));
            dirs.push(self.unused_dir(kind));
        }
        for dir in dirs {
            std::fs::create_dir_all(&dir).map_err(|e| VpdError::io(&dir, e))?;
        }
        Ok(())
    }
}

/// One unit of planned filesystem work.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCopy {
    pub uuid: String,
    pub kind: MediaKind,
    pub used: bool,
    pub source: PathBuf,
    pub dest: PathBuf,
    /// The path the rewritten document will record for this resource.
    pub document_path: PathBuf,
}

/// The full relocation plan, in catalog order.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RelocationPlan {
    pub entries: Vec<PlannedCopy>,
}

impl RelocationPlan {
    pub fn used_count(&self) -> usize {
        self.entries.iter().filter(|e| e.used).count()
    }

    pub fn unused_count(&self) -> usize {
        self.entries.len() - self.used_count()
    }

    pub fn get(&self, uuid: &str) -> Option<&PlannedCopy> {
        self.entries.iter().find(|e| e.uuid == uuid)
    }

    /// Persist the plan as JSON before executing any copies.
    pub fn write_manifest(&self, path: &Path) -> VpdResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VpdError::persist(format!("cannot encode relocation plan: {e}")))?;
        std::fs::write(path, json).map_err(|e| VpdError::io(path, e))?;
        tracing::debug!("Wrote relocation plan: {}", path.display());
        Ok(())
    }
}

/// Compute target paths for every resource in the catalog.
///
/// Used resources get an organized name under their kind's directory;
/// unused resources keep their original name under `unused/<kind>`
/// (ordering is meaningless for unused material).
pub fn plan_relocation(
    catalog: &Catalog,
    sequence: &SequenceTable,
    layout: &TargetLayout,
) -> RelocationPlan {
    let mut plan = RelocationPlan::default();

    for resource in catalog.iter() {
        plan.entries.push(plan_one(resource, sequence, layout));
    }

    tracing::info!(
        "Planned {} copies ({} used, {} unused)",
        plan.entries.len(),
        plan.used_count(),
        plan.unused_count()
    );
    plan
}

fn plan_one(
    resource: &MediaResource,
    sequence: &SequenceTable,
    layout: &TargetLayout,
) -> PlannedCopy {
    let original_name = resource.file_name();

    match sequence.get(&resource.uuid) {
        Some(seq) => {
            // Track token comes from the first attached use.
            let track = resource
                .uses
                .first()
                .map(|u| u.track.as_str())
                .unwrap_or("unknown");
            let file_name = organized_file_name(seq, track, &original_name);
            PlannedCopy {
                uuid: resource.uuid.clone(),
                kind: resource.kind,
                used: true,
                source: resource.source_path.clone(),
                dest: layout.used_dir(resource.kind).join(&file_name),
                document_path: layout.document_media_path(resource.kind, true, &file_name),
            }
        }
        None => PlannedCopy {
            uuid: resource.uuid.clone(),
            kind: resource.kind,
            used: false,
            source: resource.source_path.clone(),
            dest: layout.unused_dir(resource.kind).join(&original_name),
            document_path: layout.document_media_path(resource.kind, false, &original_name),
        },
    }
}

/// Result of one planned copy.
#[derive(Debug)]
pub struct CopyOutcome {
    pub uuid: String,
    pub used: bool,
    pub copied: bool,
    /// Recorded per-file failure; the run continues.
    pub error: Option<VpdError>,
}

/// Execute the plan through a bounded pool of blocking copy workers.
///
/// In dry-run mode every copy is simulated and logged; missing-source
/// checks still run so the reported summary matches a live run.
pub async fn execute_plan(plan: &RelocationPlan, workers: usize, dry_run: bool) -> Vec<CopyOutcome> {
    let total = plan.entries.len();
    let completed = Arc::new(AtomicUsize::new(0));

    stream::iter(plan.entries.iter().cloned())
        .map(|entry| {
            let completed = Arc::clone(&completed);
            async move {
                let uuid = entry.uuid.clone();
                let used = entry.used;
                let source = entry.source.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || copy_one(&entry, dry_run))
                        .await
                        .unwrap_or_else(|e| CopyOutcome {
                            uuid,
                            used,
                            copied: false,
                            error: Some(VpdError::copy(
                                source,
                                format!("copy worker panicked: {e}"),
                            )),
                        });
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!("Copy progress: {done}/{total}");
                outcome
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await
}

fn copy_one(entry: &PlannedCopy, dry_run: bool) -> CopyOutcome {
    let name = entry
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.source.to_string_lossy().into_owned());

    if !entry.source.exists() {
        if entry.used {
            tracing::error!("  Source file not found: {}", entry.source.display());
            return CopyOutcome {
                uuid: entry.uuid.clone(),
                used: entry.used,
                copied: false,
                error: Some(VpdError::MissingSource {
                    path: entry.source.clone(),
                }),
            };
        }
        // Unused and already gone: nothing worth reporting.
        tracing::debug!("  Source not found (skipping unused): {name}");
        return CopyOutcome {
            uuid: entry.uuid.clone(),
            used: entry.used,
            copied: false,
            error: None,
        };
    }

    if dry_run {
        tracing::info!("  [DRY RUN] Would copy: {name} -> {}", entry.dest.display());
        return CopyOutcome {
            uuid: entry.uuid.clone(),
            used: entry.used,
            copied: true,
            error: None,
        };
    }

    match copy_preserving_mtime(&entry.source, &entry.dest) {
        Ok(()) => {
            tracing::info!("  Copied: {name} -> {}", entry.dest.display());
            CopyOutcome {
                uuid: entry.uuid.clone(),
                used: entry.used,
                copied: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::error!("  Failed to copy {name}: {e}");
            CopyOutcome {
                uuid: entry.uuid.clone(),
                used: entry.used,
                copied: false,
                error: Some(VpdError::copy(entry.source.clone(), e.to_string())),
            }
        }
    }
}

/// Copy one file, carrying over the source's modification time.
fn copy_preserving_mtime(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, dest)?;
    let modified = std::fs::metadata(source)?.modified()?;
    let dest_file = std::fs::OpenOptions::new().write(true).open(dest)?;
    dest_file.set_modified(modified)?;
    Ok(())
}

/// Recursively copy a directory tree (used for container backups).
pub fn copy_tree(source: &Path, dest: &Path) -> VpdResult<()> {
    for entry in WalkDir::new(source) {
        let entry =
            entry.map_err(|e| VpdError::persist(format!("cannot walk backup source: {e}")))?;
        let relative = entry.path().strip_prefix(source).map_err(|e| {
            VpdError::persist(format!("backup path outside source tree: {e}"))
        })?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| VpdError::persist(format!("cannot create {}: {e}", target.display())))?;
        } else {
            copy_preserving_mtime(entry.path(), &target).map_err(|e| {
                VpdError::persist(format!("cannot copy {}: {e}", entry.path().display()))
            })?;
        }
    }
    Ok(())
}
