//! Go to Definition implementation

use std::collections::HashMap;
use std::path::PathBuf;

use tower_lsp::lsp_types::Location;

use crate::db::LocalesDatabase;
use crate::input::document::LocaleDocument;

/// Find the locale document leaves defining a translation key.
///
/// Returns one location per document that defines the key (a key usually
/// exists once per locale file).
#[must_use]
pub fn find_definitions(
    db: &dyn LocalesDatabase,
    key_text: &str,
    documents: &HashMap<PathBuf, LocaleDocument>,
) -> Vec<Location> {
    let mut locations = Vec::new();

    for document in documents.values() {
        let key_ranges = document.key_ranges(db);
        if let Some(range) = key_ranges.get(key_text) {
            let file_path = document.file_path(db);
            let Ok(uri) = tower_lsp::lsp_types::Url::from_file_path(file_path) else {
                tracing::warn!("Failed to create URI from file path: {}", file_path);
                continue;
            };
            locations.push(Location { uri, range: (*range).into() });
        }
    }

    locations
}
