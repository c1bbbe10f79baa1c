//! Page alignment: merging input collections into per-page file tuples.
//!
//! A processing step that reads from several collections cannot consume
//! them file by file — it needs, per page, the matching file from *each*
//! collection, even when not all pages are present everywhere and some
//! pages match more than one file. This module builds that per-page view.
//!
//! ## Algorithm
//!
//! For each collection, in caller order, the input resolver enumerates its
//! files (page documents first). Files without a page id are ignored. Each
//! file lands in slot *i* of its page's row, where *i* is the collection's
//! position. Row order is first-encountered-page order across collections —
//! deterministic for a fixed index, but not lexicographic on page id.
//!
//! ## Conflicts
//!
//! A second candidate for an occupied `(page, collection)` slot resolves as:
//!
//! 1. An explicit media-type filter was given → any duplicate is an
//!    ambiguity; the [`ConflictPolicy`] decides.
//! 2. The slot holds a page document and the candidate is a raw asset →
//!    the page document wins, no policy consulted.
//! 3. Both are page documents → always
//!    [`AlignError::DuplicateStructured`], regardless of policy. A page
//!    cannot have two canonical annotation documents; that is a data
//!    integrity failure, not an ordinary duplicate.
//! 4. Otherwise (both raw) → the [`ConflictPolicy`] decides.
//!
//! Case 3 is deliberately stricter than the policy-governed cases — see the
//! conflict-policy docs for what each policy does.

use crate::index::{DocumentIndex, IndexError};
use crate::resolve::resolve_inputs;
use crate::types::{FileRecord, MediaClass};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("no input collections given")]
    EmptyInput,
    #[error("multiple '{media_type}' matches for page '{page_id}' in collection '{collection}'")]
    Ambiguous {
        media_type: String,
        page_id: String,
        collection: String,
    },
    #[error("multiple page documents for page '{page_id}' in collection '{collection}'")]
    DuplicateStructured {
        page_id: String,
        collection: String,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Strategy for ordinary (policy-governed) duplicate matches within one
/// collection/page. Two page documents for one page are never ordinary —
/// they fail regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Fail the whole alignment call.
    #[default]
    Abort,
    /// Clear the slot, as if there had been no match at all. A later
    /// candidate may fill it again.
    Skip,
    /// Keep the first match, as if it were the only one.
    KeepFirst,
    /// Overwrite with the latest match.
    KeepLast,
}

/// One page's tuple of input files, one (possibly absent) slot per input
/// collection, in the caller's collection order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRow {
    pub page_id: String,
    pub slots: Vec<Option<FileRecord>>,
}

impl AlignmentRow {
    /// The first present file, used for page identity and output naming.
    pub fn primary(&self) -> Option<&FileRecord> {
        self.slots.iter().flatten().next()
    }
}

/// Knobs for one alignment call.
#[derive(Debug, Clone, Default)]
pub struct AlignOptions {
    /// Restrict to an explicit set of page ids. `None` means all pages.
    pub page_filter: Option<Vec<String>>,
    /// Literal media type or `//`-prefixed regex. Supplying this switches
    /// conflict handling to "any duplicate is ambiguous".
    pub media_type_filter: Option<String>,
    /// Drop pages that are missing from the first collection. When false,
    /// every page seen in any collection yields a row, possibly with an
    /// empty first slot.
    pub require_first: bool,
    pub on_conflict: ConflictPolicy,
}

impl AlignOptions {
    pub fn new() -> Self {
        Self {
            require_first: true,
            ..Self::default()
        }
    }
}

/// Merge `collections` into one ordered sequence of per-page rows.
///
/// Deterministic: the same index state, collection order and options always
/// produce the same rows in the same order.
pub fn align(
    index: &dyn DocumentIndex,
    collections: &[String],
    opts: &AlignOptions,
) -> Result<Vec<AlignmentRow>, AlignError> {
    if collections.is_empty() {
        return Err(AlignError::EmptyInput);
    }

    // First-encountered order of pages, with a side map for slot lookup.
    let mut rows: Vec<AlignmentRow> = Vec::new();
    let mut row_of: HashMap<String, usize> = HashMap::new();

    for (i, collection) in collections.iter().enumerate() {
        let files = resolve_inputs(
            index,
            collection,
            opts.page_filter.as_deref(),
            opts.media_type_filter.as_deref(),
        )?;
        for file in files {
            let Some(page_id) = file.page_id.clone() else {
                // Document-level file, not subject to alignment.
                continue;
            };
            let row_idx = *row_of.entry(page_id.clone()).or_insert_with(|| {
                rows.push(AlignmentRow {
                    page_id: page_id.clone(),
                    slots: vec![None; collections.len()],
                });
                rows.len() - 1
            });
            let slot = &mut rows[row_idx].slots[i];
            if slot.is_none() {
                debug!(
                    file = %file.id,
                    page = %page_id,
                    collection = %collection,
                    "adding file to alignment"
                );
                *slot = Some(file);
            } else {
                debug!(
                    file = %file.id,
                    page = %page_id,
                    collection = %collection,
                    "another file for already-filled slot"
                );
                resolve_conflict(
                    slot,
                    file,
                    collection,
                    &page_id,
                    opts.media_type_filter.is_some(),
                    opts.on_conflict,
                )?;
            }
        }
    }

    if opts.page_filter.is_some() && rows.is_empty() {
        // Most likely a mistyped page id (or range) — reportable, not fatal.
        error!(
            filter = ?opts.page_filter,
            "no files found for the selected pages; compare the filter with the index's page list"
        );
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        for (i, slot) in row.slots.iter().enumerate() {
            if slot.is_none() {
                warn!(
                    page = %row.page_id,
                    collection = %collections[i],
                    "no file for page in collection"
                );
            }
        }
        if row.slots[0].is_some() || !opts.require_first {
            out.push(row);
        }
    }
    Ok(out)
}

/// Apply the conflict rules to an occupied slot. `slot` is `Some` on entry
/// and holds the surviving candidate (or `None` after a `Skip`) on exit.
fn resolve_conflict(
    slot: &mut Option<FileRecord>,
    incoming: FileRecord,
    collection: &str,
    page_id: &str,
    filtered: bool,
    policy: ConflictPolicy,
) -> Result<(), AlignError> {
    if !filtered {
        match (slot.as_ref().map(|f| f.class()), incoming.class()) {
            (Some(MediaClass::Structured), MediaClass::Raw) => {
                // The page document stays in control unconditionally.
                return Ok(());
            }
            (Some(MediaClass::Structured), MediaClass::Structured) => {
                return Err(AlignError::DuplicateStructured {
                    page_id: page_id.to_string(),
                    collection: collection.to_string(),
                });
            }
            _ => {}
        }
    }

    match policy {
        ConflictPolicy::Abort => Err(AlignError::Ambiguous {
            media_type: incoming.media_type.clone(),
            page_id: page_id.to_string(),
            collection: collection.to_string(),
        }),
        ConflictPolicy::Skip => {
            *slot = None;
            Ok(())
        }
        ConflictPolicy::KeepFirst => Ok(()),
        ConflictPolicy::KeepLast => {
            *slot = Some(incoming);
            Ok(())
        }
    }
}
