//! Per-page execution: drive aligned rows through a transform.
//!
//! The executor consumes [`AlignmentRow`]s in aligner order and, for each
//! page: materializes remote inputs, parses page documents, derives the
//! output identifier, invokes the user transform, persists side-artifacts,
//! stamps provenance, and registers the primary output — strictly one page
//! at a time, in order. Provenance correctness (each page's output derived
//! only from that page's inputs) falls out of the sequencing for free.
//!
//! ## Failure containment
//!
//! Trouble during page *preparation* is contained to the page: a failed
//! materialization or a slot whose content is not a page document degrades
//! that slot to `None`, and the page still reaches the transform with a
//! hole. Trouble *inside the transform* is business logic failing and is
//! never contained — it aborts the whole run unchanged, with no retry.
//! Pages after the failing one are not processed.
//!
//! ```text
//! Pending → Materializing → Parsing → Transforming → Persisting → Done
//!              │ skipped       │ skipped   │
//!              └──── (hole) ───┴──→ ───────┤
//!                                          └→ Fatal (whole run)
//! ```

use crate::align::{AlignError, AlignmentRow, align};
use crate::config::{ConfigError, StepConfig};
use crate::index::{DocumentIndex, IndexError, NewFile};
use crate::naming::output_file_id;
use crate::page::{PageDoc, PageError};
use crate::provenance::stamp;
use crate::types::{FileRecord, Location, MEDIA_TYPE_PAGE};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Error raised by user transform logic. Opaque to the core; propagated
/// unchanged to the run's caller.
pub type TransformError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("transform does not support per-page execution")]
    UnsupportedTransform,
    #[error("transform failed on page '{page_id}'")]
    Transform {
        page_id: String,
        #[source]
        source: TransformError,
    },
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a transform implementation can do, declared up front and checked
/// once before the run starts — never probed per call.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub per_page: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { per_page: true }
    }
}

/// A derived file persisted alongside the primary output (a cropped image,
/// a debug overlay). Always registered before the primary record so the
/// primary may reference it.
pub struct SideArtifact {
    pub payload: Vec<u8>,
    pub artifact_id: String,
    pub media_type: String,
    /// Workspace-relative storage path, if the transform cares where the
    /// payload lands.
    pub path_hint: Option<PathBuf>,
}

/// Result of transforming one page.
pub enum Outcome {
    Single(PageDoc),
    WithArtifacts(PageDoc, Vec<SideArtifact>),
}

/// User-supplied processing logic, invoked once per aligned page.
pub trait PageTransform {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Transform one page. `inputs` has one entry per input collection, in
    /// slot order; `None` marks a hole (missing, unavailable, or non-page
    /// input). Errors here are fatal to the whole run.
    fn process_page(
        &self,
        inputs: &[Option<PageDoc>],
        output_id: &str,
        page_id: &str,
    ) -> Result<Outcome, TransformError>;
}

/// Built-in transform that copies the primary input's page document to the
/// output collection unchanged (a fresh document when the primary slot
/// holds no page document). Useful for wiring and testing workflows.
pub struct CopyTransform;

impl PageTransform for CopyTransform {
    fn process_page(
        &self,
        inputs: &[Option<PageDoc>],
        _output_id: &str,
        page_id: &str,
    ) -> Result<Outcome, TransformError> {
        let page = inputs
            .iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| PageDoc::new(page_id));
        Ok(Outcome::Single(page))
    }
}

/// Outcome counters for a run.
#[derive(Debug, Default, PartialEq)]
pub struct RunStats {
    /// Pages that reached the transform and were persisted.
    pub pages: u32,
    /// Slots degraded to a hole because their content was unavailable.
    pub degraded_slots: u32,
    /// Side-artifacts persisted.
    pub artifacts: u32,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pages processed", self.pages)?;
        if self.degraded_slots > 0 {
            write!(f, ", {} slots degraded", self.degraded_slots)?;
        }
        if self.artifacts > 0 {
            write!(f, ", {} artifacts", self.artifacts)?;
        }
        Ok(())
    }
}

/// Drives aligned rows through a transform under one step config.
pub struct Executor<'a> {
    config: &'a StepConfig,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a StepConfig) -> Self {
        Self { config }
    }

    /// Process `rows` in order. See the module docs for the containment
    /// rules; the capability check happens here, once.
    pub fn run(
        &self,
        index: &mut dyn DocumentIndex,
        rows: &[AlignmentRow],
        transform: &dyn PageTransform,
    ) -> Result<RunStats, RunError> {
        if !transform.capabilities().per_page {
            return Err(RunError::UnsupportedTransform);
        }

        let mut stats = RunStats::default();
        for row in rows {
            let Some(primary) = row.primary() else {
                warn!(page = %row.page_id, "alignment row without any file, skipping");
                continue;
            };
            info!(page = %row.page_id, "processing page");

            let output_id = output_file_id(primary, &self.config.output_collection);

            let mut inputs: Vec<Option<PageDoc>> = Vec::with_capacity(row.slots.len());
            for slot in &row.slots {
                inputs.push(match slot {
                    Some(record) => self.load_slot(index, record, &mut stats),
                    None => None,
                });
            }

            let outcome = transform
                .process_page(&inputs, &output_id, &row.page_id)
                .map_err(|source| RunError::Transform {
                    page_id: row.page_id.clone(),
                    source,
                })?;

            let (mut page, artifacts) = match outcome {
                Outcome::Single(page) => (page, Vec::new()),
                Outcome::WithArtifacts(page, artifacts) => (page, artifacts),
            };

            // Artifacts first: the primary record may reference them.
            for artifact in artifacts {
                index.register_file(NewFile {
                    collection: self.config.output_collection.clone(),
                    page_id: Some(row.page_id.clone()),
                    id: artifact.artifact_id,
                    media_type: artifact.media_type,
                    content: artifact.payload,
                    path_hint: artifact.path_hint,
                })?;
                stats.artifacts += 1;
            }

            page.page_id = output_id.clone();
            stamp(&mut page, self.config);
            let content = page.to_json()?;
            index.register_file(NewFile {
                collection: self.config.output_collection.clone(),
                page_id: Some(row.page_id.clone()),
                id: output_id,
                media_type: MEDIA_TYPE_PAGE.into(),
                content,
                path_hint: None,
            })?;
            stats.pages += 1;
        }
        Ok(stats)
    }

    /// Materialize and parse one slot. Every failure mode here degrades to
    /// `None` — the page proceeds with a hole, the run is never aborted.
    fn load_slot(
        &self,
        index: &dyn DocumentIndex,
        record: &FileRecord,
        stats: &mut RunStats,
    ) -> Option<PageDoc> {
        let path = match &record.location {
            Location::Local(path) => path.clone(),
            Location::Remote(_) if !self.config.download => {
                info!(
                    file = %record.id,
                    page = ?record.page_id,
                    "remote file with download disabled, passing a hole"
                );
                stats.degraded_slots += 1;
                return None;
            }
            Location::Remote(_) => match index.materialize(record) {
                Ok(path) => path,
                Err(e) => {
                    warn!(
                        file = %record.id,
                        page = ?record.page_id,
                        error = %e,
                        "skipping file for this page"
                    );
                    stats.degraded_slots += 1;
                    return None;
                }
            },
        };
        match PageDoc::from_file(&path) {
            Ok(doc) => Some(doc),
            Err(PageError::NotAPage(reason)) => {
                // Raw assets are legitimate inputs; they just carry no
                // parseable page structure.
                info!(file = %record.id, %reason, "non-page input");
                None
            }
            Err(PageError::Io(e)) => {
                warn!(file = %record.id, error = %e, "unreadable input, skipping for this page");
                stats.degraded_slots += 1;
                None
            }
        }
    }
}

/// Align and run in one call: the full processing-step cycle under one
/// config.
pub fn run_step(
    index: &mut dyn DocumentIndex,
    config: &StepConfig,
    transform: &dyn PageTransform,
) -> Result<RunStats, RunError> {
    config.validate()?;
    let rows = align(&*index, &config.input_collections, &config.align_options())?;
    Executor::new(config).run(index, &rows, transform)
}
