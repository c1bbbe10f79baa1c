//! CLI output formatting.
//!
//! Display is information-centric: the primary line for every entity is
//! its semantic identity (page id, slot assignment), with file details as
//! indented context. Each surface has a `format_*` function returning
//! `Vec<String>` — pure, no I/O — and a `print_*` wrapper that writes to
//! stdout, so tests can assert on the exact rendering.
//!
//! ```text
//! Pages
//! 001 PHYS_0001
//!     SEG: SEG_0001 (page document)
//!     IMG: (missing)
//! 002 PHYS_0002
//!     SEG: SEG_0002 (page document)
//!     IMG: IMG_0002 [image/png]
//! Aligned 2 pages across 2 collections
//! ```

use crate::align::AlignmentRow;
use crate::types::MediaClass;
use std::path::PathBuf;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Render alignment rows as an indented per-page listing.
pub fn format_alignment(rows: &[AlignmentRow], collections: &[String]) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (pos, row) in rows.iter().enumerate() {
        lines.push(format!("{} {}", format_index(pos + 1), row.page_id));
        for (slot, collection) in row.slots.iter().zip(collections) {
            let detail = match slot {
                None => "(missing)".to_string(),
                Some(file) if file.class() == MediaClass::Structured => {
                    format!("{} (page document)", file.id)
                }
                Some(file) => format!("{} [{}]", file.id, file.media_type),
            };
            lines.push(format!("    {collection}: {detail}"));
        }
    }
    lines.push(format!(
        "Aligned {} pages across {} collections",
        rows.len(),
        collections.len()
    ));
    lines
}

pub fn print_alignment(rows: &[AlignmentRow], collections: &[String]) {
    for line in format_alignment(rows, collections) {
        println!("{line}");
    }
}

/// Render an installed-resources listing, one absolute path per line.
pub fn format_resources(paths: &[PathBuf]) -> Vec<String> {
    if paths.is_empty() {
        return vec!["No resources installed".to_string()];
    }
    paths.iter().map(|p| p.display().to_string()).collect()
}

pub fn print_resources(paths: &[PathBuf]) {
    for line in format_resources(paths) {
        println!("{line}");
    }
}
