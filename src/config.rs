//! Processing-step configuration.
//!
//! A [`StepConfig`] describes one invocation of one processing step: where
//! it reads from, where it writes to, which pages it touches, how it
//! resolves duplicate matches, and the parameter snapshot that gets
//! stamped into every output's provenance. Loaded from TOML:
//!
//! ```toml
//! step_name = "binarization"
//! executable = "pageflow-binarize"
//! tool_version = "1.2.0"
//! input_collections = ["SEG"]
//! output_collection = "BIN"
//! page_filter = "PHYS_0001,PHYS_0002"
//! on_conflict = "keep-first"
//!
//! [parameters]
//! threshold = 0.5
//! ```
//!
//! Unknown keys are rejected — a typoed knob should fail loudly, not be
//! silently ignored.

use crate::align::{AlignOptions, ConflictPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid step config: {0}")]
    Invalid(String),
}

/// Configuration of one processing-step invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    /// Workflow-facing step name (goes into provenance).
    pub step_name: String,
    /// Executable identity of the tool performing the step.
    pub executable: String,
    /// Version of that tool (provenance stamp).
    pub tool_version: String,
    /// Input collections, in slot order. Slot 0 is the primary.
    pub input_collections: Vec<String>,
    pub output_collection: String,
    /// Comma-separated explicit page ids. Empty/absent means all pages.
    pub page_filter: Option<String>,
    /// Literal media type or `//`-prefixed regex.
    pub media_type_filter: Option<String>,
    pub on_conflict: ConflictPolicy,
    /// Drop pages missing from the first input collection.
    pub require_first: bool,
    /// Materialize remote inputs before parsing.
    pub download: bool,
    /// Runtime parameters handed to the transform and stamped into
    /// provenance.
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_name: "processing".into(),
            executable: "pageflow".into(),
            tool_version: crate::provenance::version_string().into(),
            input_collections: Vec::new(),
            output_collection: String::new(),
            page_filter: None,
            media_type_filter: None,
            on_conflict: ConflictPolicy::default(),
            require_first: true,
            download: true,
            parameters: BTreeMap::new(),
        }
    }
}

impl StepConfig {
    /// Load and validate a step config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that TOML parsing cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_collections.is_empty() {
            return Err(ConfigError::Invalid(
                "input_collections must name at least one collection".into(),
            ));
        }
        if self.output_collection.is_empty() {
            return Err(ConfigError::Invalid(
                "output_collection must not be empty".into(),
            ));
        }
        if self
            .input_collections
            .iter()
            .any(|c| c == &self.output_collection)
        {
            return Err(ConfigError::Invalid(format!(
                "output collection '{}' is also an input",
                self.output_collection
            )));
        }
        Ok(())
    }

    /// Page filter as an explicit id list. `None` means all pages.
    pub fn pages(&self) -> Option<Vec<String>> {
        let raw = self.page_filter.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Alignment options implied by this config.
    pub fn align_options(&self) -> AlignOptions {
        AlignOptions {
            page_filter: self.pages(),
            media_type_filter: self.media_type_filter.clone(),
            require_first: self.require_first,
            on_conflict: self.on_conflict,
        }
    }
}
