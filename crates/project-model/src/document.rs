//! Lossless codec for VideoProc Vlogger project documents.
//!
//! A `.vpd` document is a large JSON tree of which this pipeline interprets
//! only a handful of sections: the per-kind resource lists, the timeline,
//! and `projinfo`. The decoded tree is held as a raw [`serde_json::Value`]
//! so every field the pipeline does not understand survives a load/save
//! round trip unchanged. Typed views are deserialized from subtrees where
//! the pipeline needs to read them; mutation happens in place on the tree.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use vpdpack_common::{VpdError, VpdResult};

use crate::resource::MediaKind;

/// Extension of the project document file.
pub const PROJECT_FILE_EXT: &str = "vpd";

/// Extension of the project container directory.
pub const CONTAINER_EXT: &str = "dvp";

const EMPTY: &[Value] = &[];

/// An in-memory project document.
#[derive(Debug)]
pub struct VpdDocument {
    path: PathBuf,
    root: Value,
}

impl VpdDocument {
    /// Decode a project document from disk.
    ///
    /// Fails with [`VpdError::Parse`] if the file is not well-formed JSON
    /// and with [`VpdError::Document`] if the root is not a JSON object.
    pub fn load(path: impl AsRef<Path>) -> VpdResult<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Loading project document: {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| VpdError::Io {
            path: path.clone(),
            source: e,
        })?;

        let root: Value = serde_json::from_str(&content).map_err(|e| VpdError::Parse {
            path: path.clone(),
            source: e,
        })?;

        Self::from_parts(path, root)
    }

    /// Build a document from an already-decoded tree.
    pub fn from_value(root: Value) -> VpdResult<Self> {
        Self::from_parts(PathBuf::new(), root)
    }

    fn from_parts(path: PathBuf, root: Value) -> VpdResult<Self> {
        if !root.is_object() {
            return Err(VpdError::document(
                "project document root must be a JSON object",
            ));
        }
        Ok(Self { path, root })
    }

    /// Encode the (possibly mutated) tree to `path`.
    ///
    /// This is a complete re-serialization of the in-memory tree; fields
    /// never interpreted by the pipeline are written back unchanged.
    /// Fails with [`VpdError::Persist`].
    pub fn save_to(&self, path: &Path) -> VpdResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VpdError::persist(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.root)
            .map_err(|e| VpdError::persist(format!("cannot encode document: {e}")))?;

        std::fs::write(path, json)
            .map_err(|e| VpdError::persist(format!("cannot write {}: {e}", path.display())))?;

        tracing::info!("Saved project document: {}", path.display());
        Ok(())
    }

    /// Path the document was loaded from (empty for in-memory documents).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// Resource records for `kind` (`scapegoat` for image/video, direct
    /// `subitems` for audio). Absent sections read as empty.
    pub fn resource_records(&self, kind: MediaKind) -> &[Value] {
        self.section_array(kind.list_key(), kind.record_key())
    }

    /// Mutable access to the resource record array for `kind`.
    pub fn resource_records_mut(&mut self, kind: MediaKind) -> Option<&mut Vec<Value>> {
        self.section_array_mut(kind.list_key(), kind.record_key())
    }

    /// Link records for `kind` (instance-to-resource indirection). Audio
    /// has none; absent sections read as empty.
    pub fn link_records(&self, kind: MediaKind) -> &[Value] {
        if !kind.has_link_records() {
            return EMPTY;
        }
        self.section_array(kind.list_key(), "subitems")
    }

    /// Track records under `timeline.subitems`.
    pub fn timeline_tracks(&self) -> &[Value] {
        self.section_array("timeline", "subitems")
    }

    /// Mutable access to the timeline track array.
    pub fn timeline_tracks_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.section_array_mut("timeline", "subitems")
    }

    /// The `projinfo` object, if the document has one.
    pub fn project_info_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.root
            .get_mut("projinfo")
            .and_then(Value::as_object_mut)
    }

    fn section_array(&self, list_key: &str, array_key: &str) -> &[Value] {
        self.root
            .get(list_key)
            .and_then(|list| list.get(array_key))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY)
    }

    fn section_array_mut(&mut self, list_key: &str, array_key: &str) -> Option<&mut Vec<Value>> {
        self.root
            .get_mut(list_key)
            .and_then(|list| list.get_mut(array_key))
            .and_then(Value::as_array_mut)
    }
}

/// A resolved project source: the container directory (when the source was
/// a `.dvp` folder) and the document file inside it.
#[derive(Debug, Clone)]
pub struct ProjectContainer {
    /// The `.dvp` directory, when the source was one.
    pub container_dir: Option<PathBuf>,

    /// The `.vpd` document file.
    pub document_path: PathBuf,
}

impl ProjectContainer {
    /// Resolve a user-supplied source path: either a `.dvp` container
    /// directory holding a `.vpd` file, or a bare `.vpd` file.
    pub fn locate(source: &Path) -> VpdResult<Self> {
        if !source.exists() {
            return Err(VpdError::document(format!(
                "source not found: {}",
                source.display()
            )));
        }

        if source.is_dir() && has_extension(source, CONTAINER_EXT) {
            let mut documents: Vec<PathBuf> = std::fs::read_dir(source)
                .map_err(|e| VpdError::io(source, e))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file() && has_extension(p, PROJECT_FILE_EXT))
                .collect();
            documents.sort();

            let document_path = documents.first().cloned().ok_or_else(|| {
                VpdError::document(format!("no .vpd file found in {}", source.display()))
            })?;
            if documents.len() > 1 {
                tracing::warn!(
                    "Multiple .vpd files found in {}, using: {}",
                    source.display(),
                    document_path.display()
                );
            }

            Ok(Self {
                container_dir: Some(source.to_path_buf()),
                document_path,
            })
        } else if has_extension(source, PROJECT_FILE_EXT) {
            Ok(Self {
                container_dir: None,
                document_path: source.to_path_buf(),
            })
        } else {
            Err(VpdError::document(format!(
                "source must be a .dvp folder or .vpd file: {}",
                source.display()
            )))
        }
    }

    /// Name of the project, taken from the container directory when
    /// present, otherwise from the document file.
    pub fn project_name(&self) -> String {
        let named_from = self
            .container_dir
            .as_deref()
            .unwrap_or(&self.document_path);
        named_from
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    /// Directory holding the document and its sibling asset files.
    pub fn asset_dir(&self) -> PathBuf {
        self.container_dir.clone().unwrap_or_else(|| {
            self.document_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Sibling files in the container (thumbnails, user data, ...),
    /// excluding project documents and backups.
    pub fn sibling_files(&self) -> VpdResult<Vec<PathBuf>> {
        let dir = self.asset_dir();
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| VpdError::io(&dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.is_file()
                    && !has_extension(p, PROJECT_FILE_EXT)
                    && !p
                        .file_name()
                        .map(|n| n.to_string_lossy().contains(".backup"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
