//! Document index interface and in-memory reference implementation.
//!
//! The persistent index is an external collaborator: it owns every
//! [`FileRecord`], answers "all files in collection X, page Y, media type Z"
//! queries, and accepts new files registered by the executor. The pipeline
//! core only consumes the [`DocumentIndex`] trait, so any backing store — a
//! METS file, a database, a plain directory tree — can drive a run.
//!
//! [`MemoryIndex`] is the reference implementation: records held in
//! insertion order, content written to a workspace directory on
//! registration, and the whole record table (de)serialized as a JSON
//! manifest so workspaces survive between invocations.
//!
//! ## Media-type filters
//!
//! A filter is either a literal media type (`image/png`) or a regex prefixed
//! with `//` (`//image/.*`). The regex form exists for callers that want
//! "any image" without enumerating subtypes.

use crate::types::{FileRecord, Location, extension_for};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version of the index manifest format. Bump to invalidate stale
/// workspaces when the record schema changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("no local content for remote file '{id}' at {url}")]
    RemoteContent { id: String, url: String },
    #[error("content of file '{id}' is missing from the workspace: {path}")]
    MissingContent { id: String, path: PathBuf },
    #[error("invalid media type filter '{filter}': {source}")]
    BadFilter {
        filter: String,
        source: regex::Error,
    },
    #[error("unsupported index manifest version {0}")]
    BadVersion(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A file being registered into the index by the executor.
pub struct NewFile {
    pub collection: String,
    pub page_id: Option<String>,
    pub id: String,
    pub media_type: String,
    pub content: Vec<u8>,
    /// Workspace-relative storage path. Absent means the index derives one
    /// from collection, id and media type.
    pub path_hint: Option<PathBuf>,
}

/// Query and registration interface of the external document index.
pub trait DocumentIndex {
    /// All files of `collection`, restricted to an explicit page set and/or
    /// a media-type filter. Unknown collections yield an empty list, not an
    /// error. Result order must be deterministic for a fixed index state.
    fn list_files(
        &self,
        collection: &str,
        page_filter: Option<&[String]>,
        media_type_filter: Option<&str>,
    ) -> Result<Vec<FileRecord>, IndexError>;

    /// Register a new file under `collection`/`page_id`, persisting its
    /// content. Registering an id that already exists in the collection
    /// replaces the old record.
    fn register_file(&mut self, file: NewFile) -> Result<FileRecord, IndexError>;

    /// Local filesystem path for a record's content. Remote records fail
    /// here unless the index has a cache behind it — the core treats that
    /// failure as a degradable per-page condition.
    fn materialize(&self, record: &FileRecord) -> Result<PathBuf, IndexError>;
}

/// Does `media_type` satisfy `filter` (literal, or regex prefixed `//`)?
pub fn media_type_matches(filter: &str, media_type: &str) -> Result<bool, IndexError> {
    if let Some(pattern) = filter.strip_prefix("//") {
        let re = regex::Regex::new(pattern).map_err(|source| IndexError::BadFilter {
            filter: filter.to_string(),
            source,
        })?;
        Ok(re.is_match(media_type))
    } else {
        Ok(filter == media_type)
    }
}

/// On-disk shape of the index manifest.
#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    version: u32,
    records: Vec<FileRecord>,
}

/// In-memory document index backed by a workspace directory.
///
/// Records are listed in insertion order, which makes every query — and
/// therefore every alignment built on top — deterministic for a given
/// manifest.
#[derive(Debug)]
pub struct MemoryIndex {
    workspace: PathBuf,
    records: Vec<FileRecord>,
}

impl MemoryIndex {
    /// Create an empty index rooted at `workspace`. Registered content is
    /// written below this directory.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            records: Vec::new(),
        }
    }

    /// Load the record table from a JSON manifest.
    pub fn load(manifest_path: &Path, workspace: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let content = fs::read_to_string(manifest_path)?;
        let manifest: IndexManifest = serde_json::from_str(&content)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(IndexError::BadVersion(manifest.version));
        }
        Ok(Self {
            workspace: workspace.into(),
            records: manifest.records,
        })
    }

    /// Save the record table to a JSON manifest.
    pub fn save(&self, manifest_path: &Path) -> Result<(), IndexError> {
        let manifest = IndexManifest {
            version: MANIFEST_VERSION,
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(manifest_path, json)?;
        Ok(())
    }

    /// Insert a record without writing content (for pre-existing files the
    /// workspace already holds, or remote references).
    pub fn insert(&mut self, record: FileRecord) {
        self.remove(&record.collection, &record.id);
        self.records.push(record);
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn remove(&mut self, collection: &str, id: &str) {
        self.records
            .retain(|r| !(r.collection == collection && r.id == id));
    }
}

impl DocumentIndex for MemoryIndex {
    fn list_files(
        &self,
        collection: &str,
        page_filter: Option<&[String]>,
        media_type_filter: Option<&str>,
    ) -> Result<Vec<FileRecord>, IndexError> {
        let mut out = Vec::new();
        for record in &self.records {
            if record.collection != collection {
                continue;
            }
            if let Some(pages) = page_filter {
                match &record.page_id {
                    Some(page) if pages.iter().any(|p| p == page) => {}
                    // Document-level files carry no page, so any page
                    // filter excludes them.
                    _ => continue,
                }
            }
            if let Some(filter) = media_type_filter
                && !media_type_matches(filter, &record.media_type)?
            {
                continue;
            }
            out.push(record.clone());
        }
        Ok(out)
    }

    fn register_file(&mut self, file: NewFile) -> Result<FileRecord, IndexError> {
        let relative = file.path_hint.unwrap_or_else(|| {
            PathBuf::from(&file.collection)
                .join(format!("{}.{}", file.id, extension_for(&file.media_type)))
        });
        let path = self.workspace.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.content)?;

        let record = FileRecord {
            id: file.id,
            collection: file.collection,
            page_id: file.page_id,
            media_type: file.media_type,
            location: Location::Local(path),
        };
        self.insert(record.clone());
        Ok(record)
    }

    fn materialize(&self, record: &FileRecord) -> Result<PathBuf, IndexError> {
        match &record.location {
            Location::Local(path) => {
                if path.exists() {
                    Ok(path.clone())
                } else {
                    Err(IndexError::MissingContent {
                        id: record.id.clone(),
                        path: path.clone(),
                    })
                }
            }
            Location::Remote(url) => Err(IndexError::RemoteContent {
                id: record.id.clone(),
                url: url.clone(),
            }),
        }
    }
}
