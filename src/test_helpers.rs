//! Shared test utilities for the pageflow test suite.
//!
//! Record builders and index seeding helpers used across the unit tests.
//! Seeded records point at real files under a temp workspace so the
//! executor's materialize/parse path runs against actual content.

use std::path::Path;

use crate::index::MemoryIndex;
use crate::page::PageDoc;
use crate::types::{FileRecord, Location, MEDIA_TYPE_PAGE};

/// A structured (page document) record with a dummy local location.
pub fn page_rec(collection: &str, id: &str, page: &str) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        collection: collection.to_string(),
        page_id: Some(page.to_string()),
        media_type: MEDIA_TYPE_PAGE.to_string(),
        location: Location::Local(format!("/tmp/ws/{collection}/{id}.json").into()),
    }
}

/// A raw (image) record with a dummy local location.
pub fn raw_rec(collection: &str, id: &str, page: &str) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        collection: collection.to_string(),
        page_id: Some(page.to_string()),
        media_type: "image/png".to_string(),
        location: Location::Local(format!("/tmp/ws/{collection}/{id}.png").into()),
    }
}

/// Owned collection list from string literals.
pub fn colls(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Write a real page document into `workspace` and index it.
pub fn seed_page_file(
    index: &mut MemoryIndex,
    workspace: &Path,
    collection: &str,
    id: &str,
    page: &str,
) {
    let dir = workspace.join(collection);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{id}.json"));
    let doc = PageDoc::new(page);
    std::fs::write(&path, doc.to_json().unwrap()).unwrap();
    index.insert(FileRecord {
        id: id.to_string(),
        collection: collection.to_string(),
        page_id: Some(page.to_string()),
        media_type: MEDIA_TYPE_PAGE.to_string(),
        location: Location::Local(path),
    });
}

/// Write a small binary asset into `workspace` and index it.
pub fn seed_raw_file(
    index: &mut MemoryIndex,
    workspace: &Path,
    collection: &str,
    id: &str,
    page: &str,
) {
    let dir = workspace.join(collection);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{id}.png"));
    std::fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).unwrap();
    index.insert(FileRecord {
        id: id.to_string(),
        collection: collection.to_string(),
        page_id: Some(page.to_string()),
        media_type: "image/png".to_string(),
        location: Location::Local(path),
    });
}
