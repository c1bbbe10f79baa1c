//! Input resolution: structured-first enumeration of a collection's files.
//!
//! A thin, read-only layer over [`DocumentIndex::list_files`] whose one job
//! is ordering: page documents must come before raw assets, because the
//! aligner fills slots first-come-first-kept and relies on this order to
//! prefer the annotated, page-structured form of a page over an opaque
//! asset without every caller having to pass a media-type filter.
//!
//! The sort is stable, so within a class the index's own (deterministic)
//! order is preserved — the same index state always resolves to the same
//! sequence.

use crate::index::{DocumentIndex, IndexError};
use crate::types::FileRecord;

/// Enumerate files of `collection`, sorted so structured records precede
/// raw assets. Propagates index errors unchanged; has no side effects.
pub fn resolve_inputs(
    index: &dyn DocumentIndex,
    collection: &str,
    page_filter: Option<&[String]>,
    media_type_filter: Option<&str>,
) -> Result<Vec<FileRecord>, IndexError> {
    let mut files = index.list_files(collection, page_filter, media_type_filter)?;
    files.sort_by_key(|f| f.class());
    Ok(files)
}
