//! Resource catalog extraction.
//!
//! Builds the catalog of media resources and the instance-to-resource
//! indirection table from a decoded document. Image resources always carry
//! link records; video resources carry them when an indirection section is
//! present; audio resources reference directly, so they register a trivial
//! self-mapping to keep resolution uniform across kinds.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use vpdpack_project_model::{normalize_uuid, MediaKind, MediaResource, VpdDocument};

/// Resource record as it appears in the document. Records missing `uuid`
/// or `path` fail deserialization and are skipped with a warning.
#[derive(Debug, Deserialize)]
struct RawResource {
    uuid: String,
    path: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: f64,
}

/// Link-like records come in two shapes: a flat instance link, or a named
/// group of links (written by the tool for bulk folder imports). Anything
/// else in the same array is not link-like and is skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum LinkRecord {
    #[serde(rename = "link")]
    Link { uuid: String, resid: String },
    #[serde(rename = "ResourceList")]
    Group {
        #[serde(default)]
        subitems: Vec<Value>,
    },
}

/// The resource catalog: insertion-ordered media resources keyed by
/// canonical identifier, plus the indirection table. Read-only after
/// construction except for use-list attachment during link resolution.
#[derive(Debug, Default)]
pub struct Catalog {
    resources: Vec<MediaResource>,
    by_uuid: HashMap<String, usize>,
    links: HashMap<String, String>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in catalog (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &MediaResource> {
        self.resources.iter()
    }

    pub fn get(&self, uuid: &str) -> Option<&MediaResource> {
        self.by_uuid.get(uuid).map(|&idx| &self.resources[idx])
    }

    pub fn get_mut(&mut self, uuid: &str) -> Option<&mut MediaResource> {
        let idx = *self.by_uuid.get(uuid)?;
        Some(&mut self.resources[idx])
    }

    /// Resolve a normalized reference identifier to a canonical resource
    /// identifier: through the indirection table when an entry exists,
    /// otherwise the identifier is treated as already canonical.
    pub fn canonical_id(&self, normalized: &str) -> String {
        self.links
            .get(normalized)
            .cloned()
            .unwrap_or_else(|| normalized.to_string())
    }

    /// The instance-to-resource indirection table.
    pub fn link_table(&self) -> &HashMap<String, String> {
        &self.links
    }

    /// Count of resources per kind, in extraction order.
    pub fn counts_by_kind(&self) -> Vec<(MediaKind, usize)> {
        MediaKind::EXTRACTION_ORDER
            .iter()
            .map(|&kind| {
                let count = self.resources.iter().filter(|r| r.kind == kind).count();
                (kind, count)
            })
            .collect()
    }

    fn insert(&mut self, resource: MediaResource) {
        match self.by_uuid.get(&resource.uuid) {
            // Duplicate identifier: last record wins, original slot keeps
            // its catalog position so ordering stays deterministic.
            Some(&idx) => {
                tracing::warn!("Duplicate resource identifier: {}", resource.uuid);
                self.resources[idx] = resource;
            }
            None => {
                self.by_uuid
                    .insert(resource.uuid.clone(), self.resources.len());
                self.resources.push(resource);
            }
        }
    }

    fn register_link(&mut self, instance: String, resource: String) {
        tracing::debug!("  Link: {} -> {}", &instance, &resource);
        self.links.insert(instance, resource);
    }
}

/// Extract all media resources and indirection links from a document.
///
/// Kinds are walked in [`MediaKind::EXTRACTION_ORDER`]; that insertion
/// order is the tie-break key for sequence assignment downstream.
pub fn build_catalog(doc: &VpdDocument) -> Catalog {
    tracing::info!("Extracting media resources from project...");
    let mut catalog = Catalog::default();

    for kind in MediaKind::EXTRACTION_ORDER {
        for record in doc.resource_records(kind) {
            let raw: RawResource = match serde_json::from_value(record.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Skipping malformed {kind} resource record: {e}");
                    continue;
                }
            };

            let uuid = normalize_uuid(&raw.uuid);
            tracing::debug!("  Found {kind}: {} ({uuid})", raw.path);

            if kind == MediaKind::Audio {
                // Audio has no link records; the instance identifier is
                // the resource identifier.
                catalog.register_link(uuid.clone(), uuid.clone());
            }

            catalog.insert(MediaResource {
                uuid,
                source_path: raw.path.into(),
                title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
                kind,
                duration: raw.duration,
                uses: Vec::new(),
            });
        }

        if kind.has_link_records() {
            collect_links(doc.link_records(kind), &mut catalog);
        }
    }

    tracing::info!(
        "Found {} resources, {} indirection entries",
        catalog.len(),
        catalog.link_table().len()
    );
    for (kind, count) in catalog.counts_by_kind() {
        if count > 0 {
            tracing::info!("  {kind}: {count} files");
        }
    }

    catalog
}

/// Flatten flat and grouped link records into the indirection table.
fn collect_links(records: &[Value], catalog: &mut Catalog) {
    for record in records {
        match serde_json::from_value::<LinkRecord>(record.clone()) {
            Ok(LinkRecord::Link { uuid, resid }) => {
                catalog.register_link(normalize_uuid(&uuid), normalize_uuid(&resid));
            }
            Ok(LinkRecord::Group { subitems }) => collect_links(&subitems, catalog),
            // Not link-like; the arrays carry other record kinds too.
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_doc() -> VpdDocument {
        VpdDocument::from_value(json!({
            "imagelist": {
                "scapegoat": [
                    {"uuid": "AAAA1111", "path": "/m/a.jpg", "title": "a", "duration": 5000},
                    {"uuid": "BBBB2222", "path": "/m/b.jpg", "title": "b", "duration": 5000},
                    {"title": "no uuid or path"}
                ],
                "subitems": [
                    {"type": "link", "uuid": "aa-aa-11-11", "resid": "AAAA1111"},
                    {"type": "ResourceList", "title": "Holiday import", "subitems": [
                        {"type": "link", "uuid": "bb-bb-22-22", "resid": "BBBB2222"},
                        {"type": "something-else"}
                    ]},
                    {"type": "folder"}
                ]
            },
            "audiolist": {
                "subitems": [
                    {"uuid": "CCCC3333", "path": "/m/c.mp3", "title": "c", "duration": 90000}
                ]
            },
            "videolist": {
                "scapegoat": [
                    {"uuid": "DDDD4444", "path": "/m/d.mp4", "title": "d", "duration": 12000}
                ],
                "subitems": [
                    {"type": "link", "uuid": "dd-dd-44-44", "resid": "DDDD4444"}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_build_catalog_extracts_all_kinds() {
        let catalog = build_catalog(&sample_doc());
        // The malformed image record is skipped, not fatal.
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get("AAAA1111").unwrap().kind, MediaKind::Image);
        assert_eq!(catalog.get("CCCC3333").unwrap().kind, MediaKind::Audio);
        assert_eq!(catalog.get("DDDD4444").unwrap().kind, MediaKind::Video);
    }

    #[test]
    fn test_catalog_order_is_image_audio_video() {
        let catalog = build_catalog(&sample_doc());
        let kinds: Vec<MediaKind> = catalog.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::Image,
                MediaKind::Image,
                MediaKind::Audio,
                MediaKind::Video
            ]
        );
    }

    #[test]
    fn test_flat_and_grouped_links_are_flattened() {
        let catalog = build_catalog(&sample_doc());
        // Flat link, normalized on both sides.
        assert_eq!(catalog.canonical_id(&normalize_uuid("aa-aa-11-11")), "AAAA1111");
        // Link nested inside a ResourceList group.
        assert_eq!(catalog.canonical_id(&normalize_uuid("bb-bb-22-22")), "BBBB2222");
        // Video link section.
        assert_eq!(catalog.canonical_id(&normalize_uuid("dd-dd-44-44")), "DDDD4444");
    }

    #[test]
    fn test_audio_registers_self_mapping() {
        let catalog = build_catalog(&sample_doc());
        assert_eq!(catalog.link_table().get("CCCC3333").unwrap(), "CCCC3333");
    }

    #[test]
    fn test_unknown_reference_falls_back_to_itself() {
        let catalog = build_catalog(&sample_doc());
        assert_eq!(catalog.canonical_id("FFFF9999"), "FFFF9999");
    }

    #[test]
    fn test_empty_document_yields_empty_catalog() {
        let doc = VpdDocument::from_value(json!({})).unwrap();
        let catalog = build_catalog(&doc);
        assert!(catalog.is_empty());
        assert!(catalog.link_table().is_empty());
    }
}
