//! Broken-path repair for project documents.
//!
//! Finds resource records whose recorded path no longer exists, searches a
//! directory tree for the relocated files, and patches the paths in place.
//! Shares the document model with the organize pipeline but performs no
//! linking, sequencing, or relocation. Matching is by exact filename
//! first, then by stem, since files often come back with a different
//! extension (HEIC converted to JPG).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use walkdir::WalkDir;

use vpdpack_common::VpdResult;
use vpdpack_project_model::{normalize_uuid, MediaKind, ProjectContainer, VpdDocument};

use crate::catalog::build_catalog;
use crate::pipeline::create_backup;

/// Options for one repair run.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Source project: a `.dvp` container directory or a bare `.vpd` file.
    pub source: PathBuf,

    /// Root directory to search for missing files. Defaults to the
    /// container's parent directory.
    pub search_root: Option<PathBuf>,

    /// Where to write the repaired document. Defaults to overwriting the
    /// input.
    pub output: Option<PathBuf>,

    /// Preview changes without writing anything.
    pub dry_run: bool,

    /// Back up the source container before overwriting.
    pub backup: bool,
}

/// Result of one repair run.
#[derive(Debug, Clone, Default)]
pub struct RepairSummary {
    pub total_resources: usize,
    pub missing: usize,
    pub repaired: usize,
    /// Resources that stayed broken (nothing matched under the search root).
    pub unrepaired: Vec<String>,
    pub output_document: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Case-insensitive filename index of a directory tree.
struct SearchIndex {
    by_name: HashMap<String, Vec<PathBuf>>,
    by_stem: HashMap<String, Vec<PathBuf>>,
}

impl SearchIndex {
    fn build(root: &Path) -> Self {
        let mut by_name: HashMap<String, Vec<PathBuf>> = HashMap::new();
        let mut by_stem: HashMap<String, Vec<PathBuf>> = HashMap::new();

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();
            by_name.entry(name).or_default().push(path.to_path_buf());
            if let Some(stem) = path.file_stem() {
                by_stem
                    .entry(stem.to_string_lossy().to_lowercase())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        // Deterministic first-match selection.
        for paths in by_name.values_mut().chain(by_stem.values_mut()) {
            paths.sort();
        }

        Self { by_name, by_stem }
    }

    /// Exact filename matches, falling back to stem matches.
    fn find(&self, file_name: &str) -> &[PathBuf] {
        let lower = file_name.to_lowercase();
        if let Some(matches) = self.by_name.get(&lower) {
            return matches;
        }
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or(lower);
        self.by_stem
            .get(&stem)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Run a repair pass over a project document.
pub fn run(options: &RepairOptions) -> VpdResult<RepairSummary> {
    let container = ProjectContainer::locate(&options.source)?;
    let mut doc = VpdDocument::load(&container.document_path)?;

    let catalog = build_catalog(&doc);
    let mut summary = RepairSummary {
        total_resources: catalog.len(),
        dry_run: options.dry_run,
        ..RepairSummary::default()
    };

    tracing::info!("Verifying file existence...");
    let missing: Vec<(String, MediaKind, String)> = catalog
        .iter()
        .filter(|r| !r.source_path.exists())
        .map(|r| (r.uuid.clone(), r.kind, r.file_name()))
        .collect();
    summary.missing = missing.len();
    tracing::info!(
        "Verification complete: {} found, {} missing",
        summary.total_resources - summary.missing,
        summary.missing
    );

    if missing.is_empty() {
        tracing::info!("All files found - project is healthy");
        return Ok(summary);
    }

    let search_root = options.search_root.clone().unwrap_or_else(|| {
        let asset_dir = container.asset_dir();
        asset_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(asset_dir)
    });
    tracing::info!(
        "Searching for {} missing files in {}...",
        missing.len(),
        search_root.display()
    );
    let index = SearchIndex::build(&search_root);

    for (uuid, kind, file_name) in &missing {
        let matches = index.find(file_name);
        match matches.first() {
            Some(found) => {
                if matches.len() > 1 {
                    tracing::warn!(
                        "  Multiple matches for {file_name} ({}), using: {}",
                        matches.len(),
                        found.display()
                    );
                } else {
                    tracing::info!("  Found: {file_name} -> {}", found.display());
                }

                if options.dry_run {
                    tracing::info!("  [DRY RUN] Would update path to: {}", found.display());
                    summary.repaired += 1;
                } else if update_record_path(&mut doc, *kind, uuid, found) {
                    summary.repaired += 1;
                } else {
                    tracing::error!("  Failed to update resource {uuid} in document");
                    summary.unrepaired.push(file_name.clone());
                }
            }
            None => {
                tracing::warn!("  Not found anywhere in search tree: {file_name}");
                summary.unrepaired.push(file_name.clone());
            }
        }
    }

    if !options.dry_run && summary.repaired > 0 {
        if options.backup {
            summary.backup_path = Some(create_backup(&container)?);
        }
        let output = options
            .output
            .clone()
            .unwrap_or_else(|| container.document_path.clone());
        doc.save_to(&output)?;
        summary.output_document = Some(output);
    }

    tracing::info!(
        "Repair complete: {} repaired, {} unrepaired",
        summary.repaired,
        summary.unrepaired.len()
    );
    Ok(summary)
}

/// Patch the recorded path of the resource record with `uuid` in `kind`'s
/// record array.
fn update_record_path(doc: &mut VpdDocument, kind: MediaKind, uuid: &str, new_path: &Path) -> bool {
    let Some(records) = doc.resource_records_mut(kind) else {
        return false;
    };
    for record in records.iter_mut() {
        let Some(object) = record.as_object_mut() else {
            continue;
        };
        let matches = object
            .get("uuid")
            .and_then(Value::as_str)
            .map(|id| normalize_uuid(id) == uuid)
            .unwrap_or(false);
        if matches {
            object.insert("path".to_string(), json!(new_path.to_string_lossy()));
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_project(dir: &Path, image_path: &str) -> PathBuf {
        let container = dir.join("Trip.dvp");
        std::fs::create_dir_all(&container).unwrap();
        let doc = json!({
            "imagelist": {
                "scapegoat": [
                    {"uuid": "AAAA", "path": image_path, "title": "beach", "duration": 1}
                ],
                "subitems": []
            }
        });
        let vpd = container.join("Trip.vpd");
        std::fs::write(&vpd, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        vpd
    }

    fn options(source: PathBuf, search_root: &Path) -> RepairOptions {
        RepairOptions {
            source,
            search_root: Some(search_root.to_path_buf()),
            output: None,
            dry_run: false,
            backup: false,
        }
    }

    #[test]
    fn test_repair_patches_relocated_file_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let vpd = write_project(dir.path(), "/old/place/beach.jpg");

        let media = dir.path().join("media/2024");
        std::fs::create_dir_all(&media).unwrap();
        let relocated = media.join("beach.jpg");
        std::fs::write(&relocated, "pixels").unwrap();

        let summary = run(&options(vpd.clone(), dir.path())).unwrap();
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.repaired, 1);
        assert!(summary.unrepaired.is_empty());

        let doc = VpdDocument::load(&vpd).unwrap();
        assert_eq!(
            doc.resource_records(MediaKind::Image)[0]["path"],
            json!(relocated.to_string_lossy())
        );
    }

    #[test]
    fn test_repair_falls_back_to_stem_match() {
        let dir = tempfile::tempdir().unwrap();
        let vpd = write_project(dir.path(), "/old/place/photo.heic");

        let media = dir.path().join("converted");
        std::fs::create_dir_all(&media).unwrap();
        std::fs::write(media.join("photo.jpg"), "pixels").unwrap();

        let summary = run(&options(vpd.clone(), dir.path())).unwrap();
        assert_eq!(summary.repaired, 1);

        let doc = VpdDocument::load(&vpd).unwrap();
        let path = doc.resource_records(MediaKind::Image)[0]["path"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(path.ends_with("photo.jpg"));
    }

    #[test]
    fn test_unmatched_resources_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let vpd = write_project(dir.path(), "/old/place/vanished.jpg");

        let summary = run(&options(vpd, dir.path())).unwrap();
        assert_eq!(summary.repaired, 0);
        assert_eq!(summary.unrepaired, vec!["vanished.jpg".to_string()]);
        assert!(summary.output_document.is_none());
    }

    #[test]
    fn test_dry_run_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let vpd = write_project(dir.path(), "/old/place/beach.jpg");
        std::fs::write(dir.path().join("beach.jpg"), "pixels").unwrap();
        let before = std::fs::read_to_string(&vpd).unwrap();

        let mut opts = options(vpd.clone(), dir.path());
        opts.dry_run = true;
        let summary = run(&opts).unwrap();

        assert_eq!(summary.repaired, 1);
        assert!(summary.dry_run);
        assert_eq!(std::fs::read_to_string(&vpd).unwrap(), before);
    }

    #[test]
    fn test_healthy_project_needs_no_repair() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("beach.jpg");
        std::fs::write(&present, "pixels").unwrap();
        let vpd = write_project(dir.path(), &present.to_string_lossy());

        let summary = run(&options(vpd, dir.path())).unwrap();
        assert_eq!(summary.missing, 0);
        assert_eq!(summary.repaired, 0);
    }
}
