//! Timeline walking.
//!
//! Flattens the timeline's track list into an ordered sequence of media
//! reference records. Block order is order of discovery; time sorting
//! happens later, in the usage analyzer. Tracks and blocks without
//! recognized media structure are skipped silently; most block kinds
//! (titles, transitions, effects) are not media references.

use serde_json::Value;

use vpdpack_project_model::{BlockKind, TimelineRef, VpdDocument};

/// Extract every media reference block from every timeline track.
pub fn walk_timeline(doc: &VpdDocument) -> Vec<TimelineRef> {
    tracing::info!("Analyzing timeline structure...");
    let mut refs = Vec::new();

    let tracks = doc.timeline_tracks();
    if tracks.is_empty() {
        tracing::warn!("No timeline tracks found in project");
        return refs;
    }

    for track in tracks {
        let track_title = track
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled");
        tracing::debug!("  Scanning track: {track_title}");

        let blocks = track
            .get("subitems")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for block in blocks {
            let Some(kind) = block
                .get("type")
                .and_then(Value::as_str)
                .and_then(BlockKind::from_type_tag)
            else {
                continue;
            };

            let Some(resid) = block.get("resid").and_then(Value::as_str) else {
                continue;
            };
            if resid.is_empty() {
                continue;
            }

            let tstart = block.get("tstart").and_then(Value::as_i64).unwrap_or(0);
            tracing::debug!("    Block: {kind:?} at t={tstart}ms, resid={resid}");

            refs.push(TimelineRef {
                resid: resid.to_string(),
                tstart,
                kind,
                track: track_title.to_string(),
            });
        }
    }

    tracing::info!("Found {} media blocks in timeline", refs.len());
    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walk_extracts_media_blocks_in_discovery_order() {
        let doc = VpdDocument::from_value(json!({
            "timeline": {"subitems": [
                {"title": "Video Track", "subitems": [
                    {"type": "ImageFileBlock", "resid": "aa-11", "tstart": 5000},
                    {"type": "TitleBlock", "text": "Intro"},
                    {"type": "VideoFileBlock", "resid": "bb-22", "tstart": 0}
                ]},
                {"title": "Audio Track", "subitems": [
                    {"type": "MediaFileBlock", "resid": "cc-33", "tstart": 250}
                ]}
            ]}
        }))
        .unwrap();

        let refs = walk_timeline(&doc);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].resid, "aa-11");
        assert_eq!(refs[0].tstart, 5000);
        assert_eq!(refs[0].track, "Video Track");
        assert_eq!(refs[1].kind, BlockKind::Video);
        assert_eq!(refs[2].track, "Audio Track");
    }

    #[test]
    fn test_blocks_without_resid_are_skipped() {
        let doc = VpdDocument::from_value(json!({
            "timeline": {"subitems": [
                {"title": "T", "subitems": [
                    {"type": "ImageFileBlock", "tstart": 100},
                    {"type": "ImageFileBlock", "resid": "", "tstart": 100},
                    {"type": "ImageFileBlock", "resid": "ok", "tstart": 100}
                ]}
            ]}
        }))
        .unwrap();

        let refs = walk_timeline(&doc);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].resid, "ok");
    }

    #[test]
    fn test_missing_tstart_defaults_to_zero() {
        let doc = VpdDocument::from_value(json!({
            "timeline": {"subitems": [
                {"title": "T", "subitems": [
                    {"type": "AudioFileBlock", "resid": "aa"}
                ]}
            ]}
        }))
        .unwrap();

        let refs = walk_timeline(&doc);
        assert_eq!(refs[0].tstart, 0);
    }

    #[test]
    fn test_document_without_timeline_yields_nothing() {
        let doc = VpdDocument::from_value(json!({})).unwrap();
        assert!(walk_timeline(&doc).is_empty());
    }

    #[test]
    fn test_untitled_track_gets_default_name() {
        let doc = VpdDocument::from_value(json!({
            "timeline": {"subitems": [
                {"subitems": [
                    {"type": "ImageFileBlock", "resid": "aa", "tstart": 1}
                ]}
            ]}
        }))
        .unwrap();

        assert_eq!(walk_timeline(&doc)[0].track, "Untitled");
    }
}
