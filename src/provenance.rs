//! Provenance stamping: who produced an output record, with what.
//!
//! Every output page carries an append-only history of the processing
//! steps that derived it: step name, executable identity, the exact
//! runtime parameters, and version stamps for both the tool and this
//! crate. A record's derivation can then be audited (or reproduced) from
//! the record alone, without the workflow logs that produced it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::StepConfig;
use crate::page::PageDoc;

/// Version of this crate, stamped as `core_version` into every entry.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One processing-step record in a page's metadata. Immutable once
/// attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub step_name: String,
    pub executable: String,
    /// Exact parameter snapshot of the run. BTreeMap so serialization is
    /// stable across runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub tool_version: String,
    pub core_version: String,
}

/// Append a processing-step entry for `config` to `page`. Existing entries
/// are never touched.
pub fn stamp(page: &mut PageDoc, config: &StepConfig) {
    page.metadata.push(ProvenanceEntry {
        step_name: config.step_name.clone(),
        executable: config.executable.clone(),
        parameters: config.parameters.clone(),
        tool_version: config.tool_version.clone(),
        core_version: CORE_VERSION.to_string(),
    });
}

/// Tool version string for binaries built from this crate: the package
/// version on release tags, `dev@<hash>` otherwise.
pub fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}
