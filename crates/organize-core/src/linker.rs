//! Link resolution and usage analysis.
//!
//! Resolution attaches timeline references to catalog resources through
//! the indirection table (with a direct-identifier fallback). The usage
//! analyzer then derives the sequence table: a dense, 1-based ordering of
//! exactly the used resources by earliest timeline offset, with catalog
//! insertion order breaking ties. Both steps are pure functions of their
//! inputs, so repeated runs on unchanged input produce identical output.

use std::collections::HashMap;

use vpdpack_project_model::{normalize_uuid, TimelineRef};

use crate::catalog::Catalog;

/// Outcome counts of link resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkReport {
    /// Timeline references attached to a catalog resource.
    pub resolved: usize,

    /// Timeline references that matched no resource. Never fatal;
    /// editing tools tolerate stray references.
    pub unresolved: usize,
}

/// Attach each timeline reference to the resource it resolves to.
pub fn link_references(catalog: &mut Catalog, refs: &[TimelineRef]) -> LinkReport {
    tracing::info!("Linking timeline blocks to resources...");
    let mut report = LinkReport::default();

    for reference in refs {
        let instance = normalize_uuid(&reference.resid);
        let canonical = catalog.canonical_id(&instance);

        match catalog.get_mut(&canonical) {
            Some(resource) => {
                resource.uses.push(reference.clone());
                report.resolved += 1;
            }
            None => {
                tracing::warn!(
                    "Timeline block on '{}' references unknown resource: {}",
                    reference.track,
                    reference.resid
                );
                report.unresolved += 1;
            }
        }
    }

    tracing::info!("Linked {} blocks to resources", report.resolved);
    if report.unresolved > 0 {
        tracing::warn!("{} blocks reference missing resources", report.unresolved);
    }

    let used = catalog.iter().filter(|r| r.is_used()).count();
    tracing::info!(
        "Resource usage: {} used, {} unused",
        used,
        catalog.len() - used
    );

    report
}

/// Derived ordering of used resources: canonical identifier → 1-based
/// sequence number. Kept separate from the catalog so sequence assignment
/// stays an independently testable function rather than a traversal side
/// effect.
#[derive(Debug, Clone, Default)]
pub struct SequenceTable {
    order: Vec<String>,
    by_uuid: HashMap<String, u32>,
}

impl SequenceTable {
    /// Sequence number for a used resource, `None` for unused/unknown.
    pub fn get(&self, uuid: &str) -> Option<u32> {
        self.by_uuid.get(uuid).copied()
    }

    /// Number of sequenced (used) resources.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in ascending sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.order
            .iter()
            .enumerate()
            .map(|(idx, uuid)| (uuid.as_str(), idx as u32 + 1))
    }
}

/// Assign sequence numbers to used resources by earliest timeline offset.
pub fn assign_sequence(catalog: &Catalog) -> SequenceTable {
    tracing::info!("Assigning sequence numbers by timeline position...");

    let mut used: Vec<(usize, &str, i64)> = catalog
        .iter()
        .enumerate()
        .filter_map(|(idx, resource)| {
            resource
                .earliest_tstart()
                .map(|tstart| (idx, resource.uuid.as_str(), tstart))
        })
        .collect();

    // Earliest appearance first; catalog order breaks ties so the
    // assignment is deterministic across runs.
    used.sort_by_key(|&(idx, _, tstart)| (tstart, idx));

    let mut table = SequenceTable::default();
    for (seq, (_, uuid, tstart)) in used.iter().enumerate() {
        let seq = seq as u32 + 1;
        tracing::debug!("  {seq:04}: {uuid} (t={tstart}ms)");
        table.by_uuid.insert(uuid.to_string(), seq);
        table.order.push(uuid.to_string());
    }

    tracing::info!("Assigned sequence numbers to {} resources", table.len());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalog;
    use proptest::prelude::*;
    use serde_json::json;
    use vpdpack_project_model::VpdDocument;

    fn catalog_with_timeline(blocks: &[(&str, i64)]) -> (Catalog, Vec<TimelineRef>) {
        let doc = VpdDocument::from_value(json!({
            "imagelist": {
                "scapegoat": [
                    {"uuid": "AAAA", "path": "/m/a.jpg", "title": "a", "duration": 1},
                    {"uuid": "BBBB", "path": "/m/b.jpg", "title": "b", "duration": 1},
                    {"uuid": "CCCC", "path": "/m/c.jpg", "title": "c", "duration": 1}
                ],
                "subitems": [
                    {"type": "link", "uuid": "aa-1", "resid": "AAAA"},
                    {"type": "link", "uuid": "bb-1", "resid": "BBBB"},
                    {"type": "link", "uuid": "cc-1", "resid": "CCCC"}
                ]
            }
        }))
        .unwrap();
        let catalog = build_catalog(&doc);

        let refs = blocks
            .iter()
            .map(|&(resid, tstart)| TimelineRef {
                resid: resid.to_string(),
                tstart,
                kind: vpdpack_project_model::BlockKind::Image,
                track: "Video Track".to_string(),
            })
            .collect();

        (catalog, refs)
    }

    #[test]
    fn test_resolution_through_indirection_and_usage() {
        let (mut catalog, refs) = catalog_with_timeline(&[("aa-1", 5000), ("bb-1", 1000)]);
        let report = link_references(&mut catalog, &refs);

        assert_eq!(report.resolved, 2);
        assert_eq!(report.unresolved, 0);
        assert!(catalog.get("AAAA").unwrap().is_used());
        assert!(catalog.get("BBBB").unwrap().is_used());
        assert!(!catalog.get("CCCC").unwrap().is_used());
    }

    #[test]
    fn test_unknown_reference_counts_unresolved_without_failing() {
        let (mut catalog, refs) =
            catalog_with_timeline(&[("aa-1", 0), ("no-such-instance", 100)]);
        let report = link_references(&mut catalog, &refs);

        assert_eq!(report.resolved, 1);
        assert_eq!(report.unresolved, 1);
    }

    #[test]
    fn test_direct_reference_without_indirection_entry_resolves() {
        // The raw resid is already the canonical identifier.
        let (mut catalog, refs) = catalog_with_timeline(&[("AAAA", 0)]);
        let report = link_references(&mut catalog, &refs);
        assert_eq!(report.resolved, 1);
        assert!(catalog.get("AAAA").unwrap().is_used());
    }

    #[test]
    fn test_sequence_ordered_by_earliest_offset() {
        // A appears at 5000, B at 1000: B gets sequence 1, A gets 2.
        let (mut catalog, refs) = catalog_with_timeline(&[("aa-1", 5000), ("bb-1", 1000)]);
        link_references(&mut catalog, &refs);
        let table = assign_sequence(&catalog);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("BBBB"), Some(1));
        assert_eq!(table.get("AAAA"), Some(2));
        assert_eq!(table.get("CCCC"), None);
    }

    #[test]
    fn test_sequence_uses_earliest_of_multiple_uses() {
        let (mut catalog, refs) =
            catalog_with_timeline(&[("aa-1", 9000), ("bb-1", 4000), ("aa-1", 2000)]);
        link_references(&mut catalog, &refs);
        let table = assign_sequence(&catalog);

        // A's earliest use (2000) precedes B's (4000).
        assert_eq!(table.get("AAAA"), Some(1));
        assert_eq!(table.get("BBBB"), Some(2));
    }

    #[test]
    fn test_tie_broken_by_catalog_order() {
        let (mut catalog, refs) = catalog_with_timeline(&[("bb-1", 500), ("aa-1", 500)]);
        link_references(&mut catalog, &refs);
        let table = assign_sequence(&catalog);

        // Same offset: A was catalogued before B.
        assert_eq!(table.get("AAAA"), Some(1));
        assert_eq!(table.get("BBBB"), Some(2));
    }

    proptest! {
        /// Sequence numbers are a dense 1..=k assignment, monotone in the
        /// earliest-use offset.
        #[test]
        fn prop_sequence_is_dense_and_ordered(
            offsets in proptest::collection::vec(0i64..100_000, 0..3)
        ) {
            let instances = ["aa-1", "bb-1", "cc-1"];
            let blocks: Vec<(&str, i64)> = offsets
                .iter()
                .enumerate()
                .map(|(i, &t)| (instances[i], t))
                .collect();

            let (mut catalog, refs) = catalog_with_timeline(&blocks);
            link_references(&mut catalog, &refs);
            let table = assign_sequence(&catalog);

            prop_assert_eq!(table.len(), blocks.len());
            let mut seqs: Vec<u32> = table.iter().map(|(_, s)| s).collect();
            seqs.sort_unstable();
            prop_assert_eq!(seqs, (1..=blocks.len() as u32).collect::<Vec<_>>());

            for a in catalog.iter().filter(|r| r.is_used()) {
                for b in catalog.iter().filter(|r| r.is_used()) {
                    if a.earliest_tstart() < b.earliest_tstart() {
                        prop_assert!(table.get(&a.uuid) < table.get(&b.uuid));
                    }
                }
            }
        }
    }
}
