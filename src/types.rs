//! Shared types used across all pipeline stages.
//!
//! These types cross module boundaries (index → align → process) and are
//! serialized to JSON in the index manifest, so they live here rather than
//! in any one stage.
//!
//! ## Media-type classification
//!
//! The aligner distinguishes exactly two classes of file: *structured* page
//! documents (JSON records carrying page-internal structure, media type
//! [`MEDIA_TYPE_PAGE`]) and *raw* assets (images, everything else). The class
//! is derived from the media type on demand and never persisted — it exists
//! only to drive sort order and conflict tie-breaking.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Media type of structured page documents. Files of this type win
/// tie-breaks in the aligner and are what the executor parses and produces.
pub const MEDIA_TYPE_PAGE: &str = "application/vnd.pageflow.page+json";

/// A file known to the document index.
///
/// Owned by the index; the pipeline core only ever holds copies. `page_id`
/// is `None` for document-level files (a table of contents, a global
/// wordlist), which the aligner always ignores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub media_type: String,
    pub location: Location,
}

/// Where a file's content lives.
///
/// Remote content is never fetched by the core itself — materializing it is
/// the index's job, and an index without a cache simply reports the content
/// as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

/// Two-valued classification used for sort order and conflict tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MediaClass {
    /// A page document: carries page-internal structure the pipeline
    /// understands. Sorts before raw assets.
    Structured,
    /// An opaque asset (image, plain text, anything else).
    Raw,
}

/// Classify a media type string.
pub fn classify(media_type: &str) -> MediaClass {
    if media_type == MEDIA_TYPE_PAGE {
        MediaClass::Structured
    } else {
        MediaClass::Raw
    }
}

impl FileRecord {
    /// Classification of this record's media type.
    pub fn class(&self) -> MediaClass {
        classify(&self.media_type)
    }
}

/// File extension for a media type, used when the index derives storage
/// paths for newly registered content.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        MEDIA_TYPE_PAGE | "application/json" => "json",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/tiff" => "tif",
        "text/plain" => "txt",
        _ => "bin",
    }
}
