//! Media resources and timeline references.
//!
//! A [`MediaResource`] is one entry in the project's resource catalogs,
//! independent of whether the timeline uses it. A [`TimelineRef`] is one
//! placement of a resource at a specific offset on a specific track.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Catalog extraction order. This doubles as the sequence tie-break
    /// order, so it must stay deterministic across runs.
    pub const EXTRACTION_ORDER: [MediaKind; 3] =
        [MediaKind::Image, MediaKind::Audio, MediaKind::Video];

    /// Top-level document key for this kind's resource list.
    pub fn list_key(self) -> &'static str {
        match self {
            MediaKind::Image => "imagelist",
            MediaKind::Video => "videolist",
            MediaKind::Audio => "audiolist",
        }
    }

    /// Key under the list that holds this kind's resource records.
    /// Image and video resources live in `scapegoat`; audio records sit
    /// directly in `subitems`.
    pub fn record_key(self) -> &'static str {
        match self {
            MediaKind::Image | MediaKind::Video => "scapegoat",
            MediaKind::Audio => "subitems",
        }
    }

    /// Whether this kind carries instance-to-resource link records.
    pub fn has_link_records(self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video)
    }

    /// Target subdirectory name for organized media of this kind.
    pub fn subdir(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// Block type tags recognized as media references in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Image,
    Video,
    Audio,
    /// Generic media block; the tool uses this for audio placed on
    /// mixed tracks.
    Media,
}

impl BlockKind {
    /// Map a timeline block `type` tag to a recognized media block kind.
    /// Returns `None` for non-media blocks (titles, transitions, ...).
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "ImageFileBlock" => Some(BlockKind::Image),
            "VideoFileBlock" => Some(BlockKind::Video),
            "AudioFileBlock" => Some(BlockKind::Audio),
            "MediaFileBlock" => Some(BlockKind::Media),
            _ => None,
        }
    }
}

/// One occurrence of a resource inside a timeline track.
///
/// `resid` is the raw reference identifier as written by the tool: it may
/// be a resource's own identifier or an intermediate instance identifier
/// that needs one indirection lookup.
#[derive(Debug, Clone)]
pub struct TimelineRef {
    /// Raw reference identifier (not normalized).
    pub resid: String,

    /// Timeline start offset in milliseconds.
    pub tstart: i64,

    /// Which media block kind carried the reference.
    pub kind: BlockKind,

    /// Title of the owning track.
    pub track: String,
}

/// One entry in the project's resource catalogs.
#[derive(Debug, Clone)]
pub struct MediaResource {
    /// Canonical identifier (normalized).
    pub uuid: String,

    /// On-disk source path as recorded in the document.
    pub source_path: PathBuf,

    /// Display title as recorded in the document.
    pub title: String,

    /// Media kind.
    pub kind: MediaKind,

    /// Duration in milliseconds.
    pub duration: f64,

    /// Timeline references that resolved to this resource.
    pub uses: Vec<TimelineRef>,
}

impl MediaResource {
    /// A resource is used iff at least one timeline reference resolves
    /// to it.
    pub fn is_used(&self) -> bool {
        !self.uses.is_empty()
    }

    /// Earliest timeline offset where this resource appears.
    pub fn earliest_tstart(&self) -> Option<i64> {
        self.uses.iter().map(|u| u.tstart).min()
    }

    /// The source file's name component.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ref(tstart: i64) -> TimelineRef {
        TimelineRef {
            resid: "ABC".to_string(),
            tstart,
            kind: BlockKind::Image,
            track: "Video Track".to_string(),
        }
    }

    #[test]
    fn test_unused_resource_has_no_earliest_offset() {
        let resource = MediaResource {
            uuid: "ABC".to_string(),
            source_path: PathBuf::from("/media/a.jpg"),
            title: "a".to_string(),
            kind: MediaKind::Image,
            duration: 5000.0,
            uses: vec![],
        };
        assert!(!resource.is_used());
        assert_eq!(resource.earliest_tstart(), None);
    }

    #[test]
    fn test_earliest_tstart_is_minimum_over_uses() {
        let mut resource = MediaResource {
            uuid: "ABC".to_string(),
            source_path: PathBuf::from("/media/a.jpg"),
            title: "a".to_string(),
            kind: MediaKind::Image,
            duration: 5000.0,
            uses: vec![make_ref(5000), make_ref(1000), make_ref(9000)],
        };
        assert!(resource.is_used());
        assert_eq!(resource.earliest_tstart(), Some(1000));

        resource.uses.push(make_ref(0));
        assert_eq!(resource.earliest_tstart(), Some(0));
    }

    #[test]
    fn test_block_kind_recognizes_the_four_media_tags() {
        assert_eq!(
            BlockKind::from_type_tag("ImageFileBlock"),
            Some(BlockKind::Image)
        );
        assert_eq!(
            BlockKind::from_type_tag("VideoFileBlock"),
            Some(BlockKind::Video)
        );
        assert_eq!(
            BlockKind::from_type_tag("AudioFileBlock"),
            Some(BlockKind::Audio)
        );
        assert_eq!(
            BlockKind::from_type_tag("MediaFileBlock"),
            Some(BlockKind::Media)
        );
        assert_eq!(BlockKind::from_type_tag("TitleBlock"), None);
        assert_eq!(BlockKind::from_type_tag("TransitionBlock"), None);
    }
}
