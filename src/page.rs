//! The page document: the structured annotation record the pipeline
//! transforms.
//!
//! The full annotation schema is a concern of the processing steps
//! themselves; the core needs only what the run loop touches — the page
//! identity, the append-only provenance metadata, and an opaque body the
//! transform is free to interpret. Everything else rides along untouched
//! in `body`.
//!
//! A file that fails to parse as a page document is not an error the run
//! loop raises: non-page input (an image, arbitrary JSON) is an expected
//! condition, reported as [`PageError::NotAPage`] and degraded to an empty
//! slot by the executor.

use crate::provenance::ProvenanceEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("not a page document: {0}")]
    NotAPage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A structured page record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDoc {
    /// Identity of the record. Set to the derived output id on persist.
    pub page_id: String,
    /// Processing-step history, oldest first. Append-only: entries are
    /// never rewritten or removed once attached.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<ProvenanceEntry>,
    /// Page content (regions, lines, whatever the transform works on).
    #[serde(default)]
    pub body: serde_json::Value,
}

impl PageDoc {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            metadata: Vec::new(),
            body: serde_json::Value::Null,
        }
    }

    /// Parse a page document from a file. Content that is not valid page
    /// JSON — including binary assets — yields [`PageError::NotAPage`].
    pub fn from_file(path: &Path) -> Result<Self, PageError> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PageError::NotAPage(format!("{}: {e}", path.display())))
    }

    /// Serialize for registration into the index.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}
