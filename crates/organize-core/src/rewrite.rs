//! In-place document rewriting.
//!
//! Mutates the decoded document so every resource record points at its
//! planned target path, then refreshes the project's self-referential
//! metadata. All resource records are retained, unused ones included, so
//! the document keeps referential integrity for everything the editing
//! tool's UI may still reference. Link records are likewise left intact.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Datelike, Local, Timelike};
use serde_json::{json, Value};

use vpdpack_project_model::{normalize_uuid, MediaKind, VpdDocument};

use crate::catalog::Catalog;
use crate::relocate::{PlannedCopy, RelocationPlan};

/// The document's structured save timestamp.
#[derive(Debug, Clone, Copy)]
pub struct SaveTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl SaveTime {
    /// Local wall-clock now.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
        }
    }

    fn to_value(self) -> Value {
        json!({
            "year": self.year,
            "month": self.month,
            "day": self.day,
            "hour": self.hour,
            "minute": self.minute,
            "second": self.second,
        })
    }
}

/// Point every resource record at its planned target path and derive its
/// display title from the new filename. Returns the number of used
/// resources updated.
pub fn rewrite_resource_paths(doc: &mut VpdDocument, plan: &RelocationPlan) -> usize {
    tracing::info!("Updating file paths in project document...");

    let planned: HashMap<&str, &PlannedCopy> = plan
        .entries
        .iter()
        .map(|entry| (entry.uuid.as_str(), entry))
        .collect();

    let mut updated = 0;

    for kind in MediaKind::EXTRACTION_ORDER {
        let Some(records) = doc.resource_records_mut(kind) else {
            continue;
        };

        for record in records.iter_mut() {
            let Some(object) = record.as_object_mut() else {
                continue;
            };
            let Some(uuid) = object
                .get("uuid")
                .and_then(Value::as_str)
                .map(normalize_uuid)
            else {
                continue;
            };
            let Some(entry) = planned.get(uuid.as_str()) else {
                continue;
            };

            let old_stem = object
                .get("path")
                .and_then(Value::as_str)
                .map(file_stem)
                .unwrap_or_default();

            object.insert(
                "path".to_string(),
                json!(entry.document_path.to_string_lossy()),
            );

            if entry.used {
                let new_stem = file_stem(&entry.document_path.to_string_lossy());
                object.insert("title".to_string(), json!(new_stem));
                updated += 1;
                tracing::debug!("  Updated {kind}: {uuid} -> {}", entry.document_path.display());
            } else {
                object.insert("title".to_string(), json!(format!("[unused] {old_stem}")));
                tracing::debug!("  Moved to unused: {uuid}");
            }
        }
    }

    tracing::info!("Updated {updated} resource paths in project document");
    updated
}

/// Refresh the project's self-referential metadata: its own file location
/// and the structured save timestamp.
pub fn rewrite_project_info(doc: &mut VpdDocument, project_file: &Path, savetime: SaveTime) {
    let Some(info) = doc.project_info_mut() else {
        return;
    };
    info.insert(
        "projectfile".to_string(),
        json!(project_file.to_string_lossy()),
    );
    info.insert("savetime".to_string(), savetime.to_value());
}

/// Remove timeline blocks whose reference resolves to no used resource.
///
/// Disabled by default in the pipeline: the editing tool tolerates
/// dangling references better than a user discovering silently-deleted
/// timeline content.
pub fn prune_unresolved_blocks(doc: &mut VpdDocument, catalog: &Catalog) -> usize {
    tracing::info!("Pruning unresolved timeline blocks...");

    let mut valid: std::collections::HashSet<String> = catalog
        .iter()
        .filter(|r| r.is_used())
        .map(|r| r.uuid.clone())
        .collect();
    for (instance, resource) in catalog.link_table() {
        if valid.contains(resource) {
            valid.insert(instance.clone());
        }
    }

    let mut removed = 0;
    let Some(tracks) = doc.timeline_tracks_mut() else {
        return 0;
    };

    for track in tracks.iter_mut() {
        let track_title = track
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("track")
            .to_string();
        let Some(blocks) = track
            .get_mut("subitems")
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        let before = blocks.len();
        blocks.retain(|block| match block.get("resid").and_then(Value::as_str) {
            Some(resid) => valid.contains(&normalize_uuid(resid)),
            None => true,
        });
        let dropped = before - blocks.len();
        if dropped > 0 {
            tracing::info!("  Removed {dropped} broken blocks from {track_title}");
            removed += dropped;
        }
    }

    removed
}

/// Last path component without its extension.
fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
