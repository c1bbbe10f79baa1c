//! # Pageflow
//!
//! The execution core of a document-processing workflow: align files from
//! several input collections into per-page tuples, drive each page through
//! a user-supplied transform, and register the stamped results into an
//! output collection — with partial-failure isolation and a full
//! provenance trail.
//!
//! # Architecture: Align, Then Execute
//!
//! A processing step is one pass over a workspace:
//!
//! ```text
//! 1. Align     index queries  →  AlignmentRow[]   (per-page input tuples)
//! 2. Execute   rows           →  output records   (transform + provenance)
//! ```
//!
//! The two halves are independent on purpose:
//!
//! - **Inspectability**: an alignment can be previewed (`pageflow align`)
//!   without running any transform.
//! - **Testability**: the aligner is a pure function of index state; the
//!   executor can be driven with hand-built rows.
//! - **Reuse**: every processing step in a workflow shares this skeleton
//!   and differs only in its [`PageTransform`](process::PageTransform).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared data model: [`FileRecord`](types::FileRecord), media-type classification |
//! | [`index`] | [`DocumentIndex`](index::DocumentIndex) trait + in-memory reference index |
//! | [`resolve`] | Structured-first enumeration of a collection's files |
//! | [`align`] | Multi-collection merge into per-page rows, conflict policies |
//! | [`naming`] | Deterministic output identifier derivation |
//! | [`page`] | The structured page document the pipeline transforms |
//! | [`provenance`] | Append-only processing-step history on output records |
//! | [`process`] | Per-page execution loop, transform trait, run statistics |
//! | [`resource`] | Resource name resolution and local installation |
//! | [`config`] | Per-step TOML configuration |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Strictly Sequential Execution
//!
//! Pages are processed one at a time, in aligner order. No pool, no
//! overlap between one page's parse and the next page's persist. This
//! makes the central correctness property — each output's provenance
//! reflects exactly that page's inputs and parameters — hold by
//! construction, at the cost of throughput. Output identifiers are
//! derived purely from inputs, so a future parallel executor could keep
//! them stable; until someone needs one, sequencing wins.
//!
//! ## Preparation Degrades, Transformation Aborts
//!
//! Unavailable content and non-page input are facts about the workspace,
//! common in multi-tool workflows, and the transform gets a hole (`None`)
//! instead of the run dying. A transform *error* is business logic
//! failing on data it claimed to handle; continuing would silently
//! produce a partial output collection, so the run stops there.
//!
//! ## Two Canonical Documents Are Never Tolerated
//!
//! Ordinary duplicates inside one collection are resolved by the caller's
//! [`ConflictPolicy`](align::ConflictPolicy). Two *page documents* for
//! one page is different: it means the collection itself is corrupt, and
//! no policy — not even `KeepLast` — downgrades that to a preference.
//!
//! ## The Index Is a Trait
//!
//! The persistent file index (and any download cache behind it) is an
//! external collaborator. The core consumes
//! [`DocumentIndex`](index::DocumentIndex) and ships
//! [`MemoryIndex`](index::MemoryIndex) as the reference implementation;
//! a METS store, a database, or a test double plug in the same way.

pub mod align;
pub mod config;
pub mod index;
pub mod naming;
pub mod output;
pub mod page;
pub mod process;
pub mod provenance;
pub mod resolve;
pub mod resource;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
