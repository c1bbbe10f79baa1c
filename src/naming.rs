//! Deterministic output identifier derivation.
//!
//! Output files are named from their primary input so that repeated runs of
//! the same workflow over the same inputs always produce the same
//! identifiers — idempotent naming, not idempotent content. Downstream
//! steps and humans can then correlate a page's artifacts across
//! collections (`SEG_0001` in the segmentation collection, `OCR_0001` in
//! the recognition collection) without consulting provenance.
//!
//! ## Derivation
//!
//! If the input's id contains its own collection name, that substring is
//! rewritten to the output collection name (`SEG_0001` + `OCR` →
//! `OCR_0001`). Otherwise the output collection name is prefixed
//! (`page7` + `OCR` → `OCR_page7`). The result is sanitized to
//! identifier-safe characters.

use crate::types::FileRecord;

/// Derive the output identifier for `primary` registered into
/// `output_collection`. Pure and deterministic.
pub fn output_file_id(primary: &FileRecord, output_collection: &str) -> String {
    let id = if !primary.collection.is_empty() && primary.id.contains(&primary.collection) {
        primary.id.replace(&primary.collection, output_collection)
    } else {
        format!("{}_{}", output_collection, primary.id)
    };
    sanitize_id(&id)
}

/// Map anything outside `[A-Za-z0-9_-]` to `_` so derived ids are safe as
/// filenames and reference targets.
pub fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
