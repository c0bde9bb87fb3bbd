//! Translation tree store.
//!
//! The store partitions translation data by workspace unit (one opened
//! project root) so that simultaneously opened projects never leak
//! translations into each other, and within each unit by locale. Merging is
//! document-scoped: re-merging a document first removes every leaf it owned
//! before, which is what makes incremental reload honor deletions.

pub mod defaults;
mod tree;

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

pub use defaults::{
    DetectionMethod,
    FALLBACK_LOCALE,
    LocaleDefaults,
};

use crate::store::tree::TranslationTree;

/// Store errors that reach callers.
///
/// Per-document failures never surface here; they are contained (logged and
/// skipped) at the document-processing boundary. The only propagating error
/// is a caller passing a location outside any known workspace unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The path does not belong to any known workspace unit.
    #[error("no translation source found for this location: {}", .0.display())]
    UnresolvedUnit(PathBuf),
}

/// Options for one merge call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Rebuild the affected lookup index as part of the merge.
    ///
    /// Full loads leave this off and batch a single
    /// [`TranslationStore::update_lookup_maps`] at the end; watched-file
    /// reloads turn it on because changes arrive one at a time and lookup
    /// latency matters more than merge throughput there.
    pub rebuild_index_immediately: bool,
}

/// Where one document's leaves currently live.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DocumentHandle {
    /// Owning workspace unit root.
    unit: PathBuf,
    /// Locale tree the document merged into.
    locale: String,
}

/// Per-unit slice of the store.
#[derive(Debug, Default)]
struct UnitPartition {
    /// One tree per observed locale.
    trees: HashMap<String, TranslationTree>,
    /// Resolved default locale, set once per load cycle.
    defaults: Option<LocaleDefaults>,
}

/// The central translation store.
#[derive(Debug)]
pub struct TranslationStore {
    /// Key path separator used by newly created trees.
    separator: String,
    /// Partitions keyed by workspace unit root.
    units: HashMap<PathBuf, UnitPartition>,
    /// Document identity -> where its leaves live, for removal and
    /// relocation on reload.
    documents: HashMap<PathBuf, DocumentHandle>,
}

impl Default for TranslationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationStore {
    /// Creates an empty store with the conventional `.` separator.
    #[must_use]
    pub fn new() -> Self {
        Self { separator: ".".to_string(), units: HashMap::new(), documents: HashMap::new() }
    }

    /// Sets the key separator used for trees created from now on.
    /// Call before [`TranslationStore::init`] when the configuration changes.
    pub fn set_key_separator(&mut self, separator: &str) {
        self.separator = separator.to_string();
    }

    /// Resets the store to its empty state. Idempotent; called before every
    /// load cycle begins.
    pub fn init(&mut self) {
        self.units.clear();
        self.documents.clear();
    }

    /// Registers a workspace unit partition (created when the host reports a
    /// workspace folder).
    pub fn register_unit(&mut self, root: &Path) {
        self.units.entry(root.to_path_buf()).or_default();
    }

    /// Destroys a unit partition and every document registration inside it.
    pub fn remove_unit(&mut self, root: &Path) {
        self.units.remove(root);
        self.documents.retain(|_, handle| handle.unit != root);
    }

    /// Roots of all registered units.
    #[must_use]
    pub fn unit_roots(&self) -> Vec<&Path> {
        let mut roots: Vec<&Path> = self.units.keys().map(PathBuf::as_path).collect();
        roots.sort_unstable();
        roots
    }

    /// Maps a path to the unit that owns it (longest matching root).
    #[must_use]
    pub fn unit_for_path(&self, path: &Path) -> Option<&Path> {
        self.units
            .keys()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Merges one parsed document into its unit/locale tree.
    ///
    /// Every leaf the document previously owned is removed first, then the
    /// given entries are inserted under its ownership — so a key the new
    /// version no longer defines disappears. If two documents in the same
    /// unit define the same locale and key, the later merge wins; this
    /// mirrors the practice of overriding base translations from files that
    /// sort (and therefore merge) later, and is deliberate.
    pub fn merge_document(
        &mut self,
        unit: &Path,
        document: &Path,
        locale: &str,
        entries: &HashMap<String, String>,
        options: MergeOptions,
    ) {
        // A reload can move a document to another locale (or unit); detach
        // its old contribution first.
        let relocated = self
            .documents
            .get(document)
            .filter(|handle| handle.unit != unit || handle.locale != locale)
            .cloned();
        if let Some(previous) = relocated {
            self.detach_document(document, &previous);
        }

        let separator = self.separator.clone();
        let partition = self.units.entry(unit.to_path_buf()).or_default();
        let tree = partition
            .trees
            .entry(locale.to_string())
            .or_insert_with(|| TranslationTree::new(&separator));

        let document_id = document.to_string_lossy();
        tree.remove_document(&document_id);

        // Sorted insertion keeps merges deterministic regardless of the
        // entries map's iteration order.
        let mut sorted: Vec<(&String, &String)> = entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in sorted {
            tree.insert(key, value, &document_id);
        }

        if options.rebuild_index_immediately {
            tree.rebuild_index();
        }

        self.documents.insert(
            document.to_path_buf(),
            DocumentHandle { unit: unit.to_path_buf(), locale: locale.to_string() },
        );

        tracing::debug!(
            document = %document.display(),
            locale,
            leaves = tree.leaf_count(),
            "Merged locale document"
        );
    }

    /// Removes a document's entire contribution (used when the file is
    /// deleted from disk). Returns the owning unit root, if the document was
    /// known. The affected index is left stale; call
    /// [`TranslationStore::update_lookup_maps`] afterwards.
    pub fn remove_document(&mut self, document: &Path) -> Option<PathBuf> {
        let handle = self.documents.remove(document)?;
        self.detach_document(document, &handle);
        Some(handle.unit)
    }

    /// Removes the document's leaves from the tree recorded in `handle`,
    /// pruning the tree itself when it becomes empty.
    fn detach_document(&mut self, document: &Path, handle: &DocumentHandle) {
        let Some(partition) = self.units.get_mut(&handle.unit) else {
            return;
        };
        let Some(tree) = partition.trees.get_mut(&handle.locale) else {
            return;
        };
        let removed = tree.remove_document(&document.to_string_lossy());
        tracing::debug!(
            document = %document.display(),
            locale = %handle.locale,
            removed,
            "Detached locale document"
        );
        if tree.is_empty() {
            partition.trees.remove(&handle.locale);
        }
    }

    /// Rebuilds the lookup index of every tree that merged since the last
    /// rebuild. Callers batch merges and invoke this once per batch.
    pub fn update_lookup_maps(&mut self) {
        for partition in self.units.values_mut() {
            for tree in partition.trees.values_mut() {
                if tree.is_stale() {
                    tree.rebuild_index();
                }
            }
        }
    }

    /// Point lookup. Returns `None` (not an error) when the key, locale, or
    /// unit is unknown — a missing key is a normal steady state.
    #[must_use]
    pub fn get_translation(&self, key: &str, locale: &str, unit: &Path) -> Option<&str> {
        self.units.get(unit)?.trees.get(locale)?.lookup(key)
    }

    /// Locales observed for a unit, sorted.
    #[must_use]
    pub fn locales(&self, unit: &Path) -> Vec<String> {
        let Some(partition) = self.units.get(unit) else {
            return Vec::new();
        };
        let mut locales: Vec<String> = partition.trees.keys().cloned().collect();
        locales.sort_unstable();
        locales
    }

    /// Recomputes the unit's default locale from the detection chain.
    pub fn refresh_defaults(&mut self, unit: &Path, configured: Option<&str>) {
        let locales = self.locales(unit);
        if let Some(partition) = self.units.get_mut(unit) {
            let resolved = defaults::detect(configured, &locales);
            tracing::debug!(
                unit = %unit.display(),
                locale = %resolved.locale,
                method = ?resolved.method,
                "Resolved default locale"
            );
            partition.defaults = Some(resolved);
        }
    }

    /// The unit's resolved default locale, if a load cycle has run.
    #[must_use]
    pub fn defaults(&self, unit: &Path) -> Option<&LocaleDefaults> {
        self.units.get(unit)?.defaults.as_ref()
    }

    /// Default locale for the unit owning `path`.
    ///
    /// # Errors
    /// [`StoreError::UnresolvedUnit`] if the path belongs to no known unit —
    /// a programmer error upstream, not an environmental failure.
    pub fn default_locale_for_path(&self, path: &Path) -> Result<String, StoreError> {
        let unit = self
            .unit_for_path(path)
            .ok_or_else(|| StoreError::UnresolvedUnit(path.to_path_buf()))?;
        if let Some(resolved) = self.defaults(unit) {
            return Ok(resolved.locale.clone());
        }
        // Queried before any load cycle: detect on the spot without caching.
        Ok(defaults::detect(None, &self.locales(unit)).locale)
    }

    /// Spec query surface: translation for a key in the context of a source
    /// path, with the locale defaulting to the owning unit's default.
    ///
    /// # Errors
    /// [`StoreError::UnresolvedUnit`] if `source` belongs to no known unit.
    pub fn translation_for_key(
        &self,
        key: &str,
        locale: Option<&str>,
        source: &Path,
    ) -> Result<Option<String>, StoreError> {
        let unit = self
            .unit_for_path(source)
            .ok_or_else(|| StoreError::UnresolvedUnit(source.to_path_buf()))?
            .to_path_buf();
        let locale = match locale {
            Some(locale) => locale.to_string(),
            None => self.default_locale_for_path(&unit)?,
        };
        Ok(self.get_translation(key, &locale, &unit).map(ToString::to_string))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    /// Builds an entries map from (key, value) pairs.
    fn entries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    const BATCHED: MergeOptions = MergeOptions { rebuild_index_immediately: false };
    const IMMEDIATE: MergeOptions = MergeOptions { rebuild_index_immediately: true };

    fn unit_a() -> PathBuf {
        PathBuf::from("/projects/a")
    }

    fn unit_b() -> PathBuf {
        PathBuf::from("/projects/b")
    }

    #[googletest::test]
    fn disjoint_merges_commute() {
        let doc1 = entries(&[("greeting.hi", "Hi")]);
        let doc2 = entries(&[("farewell.bye", "Bye")]);

        let mut forward = TranslationStore::new();
        forward.merge_document(&unit_a(), Path::new("/a/1.yml"), "en", &doc1, BATCHED);
        forward.merge_document(&unit_a(), Path::new("/a/2.yml"), "en", &doc2, BATCHED);
        forward.update_lookup_maps();

        let mut reversed = TranslationStore::new();
        reversed.merge_document(&unit_a(), Path::new("/a/2.yml"), "en", &doc2, BATCHED);
        reversed.merge_document(&unit_a(), Path::new("/a/1.yml"), "en", &doc1, BATCHED);
        reversed.update_lookup_maps();

        for store in [&forward, &reversed] {
            expect_that!(store.get_translation("greeting.hi", "en", &unit_a()), some(eq("Hi")));
            expect_that!(store.get_translation("farewell.bye", "en", &unit_a()), some(eq("Bye")));
        }
    }

    #[googletest::test]
    fn last_merged_document_wins_conflicts() {
        let mut store = TranslationStore::new();

        store.merge_document(
            &unit_a(),
            Path::new("/a/base.yml"),
            "en",
            &entries(&[("a.b", "base")]),
            BATCHED,
        );
        store.merge_document(
            &unit_a(),
            Path::new("/a/override.yml"),
            "en",
            &entries(&[("a.b", "override")]),
            BATCHED,
        );
        store.update_lookup_maps();

        expect_that!(store.get_translation("a.b", "en", &unit_a()), some(eq("override")));
    }

    #[googletest::test]
    fn reload_drops_keys_the_new_version_no_longer_defines() {
        let mut store = TranslationStore::new();
        let doc = PathBuf::from("/a/en.yml");

        store.merge_document(
            &unit_a(),
            &doc,
            "en",
            &entries(&[("a.b", "Old"), ("a.c", "Kept")]),
            IMMEDIATE,
        );
        expect_that!(store.get_translation("a.b", "en", &unit_a()), some(eq("Old")));

        store.merge_document(&unit_a(), &doc, "en", &entries(&[("a.c", "Kept")]), IMMEDIATE);

        expect_that!(store.get_translation("a.b", "en", &unit_a()), none());
        expect_that!(store.get_translation("a.c", "en", &unit_a()), some(eq("Kept")));
    }

    #[googletest::test]
    fn remove_document_leaves_sibling_documents_untouched() {
        let mut store = TranslationStore::new();

        store.merge_document(
            &unit_a(),
            Path::new("/a/users.yml"),
            "en",
            &entries(&[("users.index.title", "Users"), ("users.show.title", "User")]),
            BATCHED,
        );
        store.merge_document(
            &unit_a(),
            Path::new("/a/posts.yml"),
            "en",
            &entries(&[("posts.index.title", "Posts")]),
            BATCHED,
        );

        store.remove_document(Path::new("/a/users.yml"));
        store.update_lookup_maps();

        expect_that!(store.get_translation("users.index.title", "en", &unit_a()), none());
        expect_that!(store.get_translation("users.show.title", "en", &unit_a()), none());
        expect_that!(store.get_translation("posts.index.title", "en", &unit_a()), some(eq("Posts")));
    }

    #[googletest::test]
    fn removing_the_last_document_prunes_the_locale() {
        let mut store = TranslationStore::new();

        store.merge_document(
            &unit_a(),
            Path::new("/a/de.yml"),
            "de",
            &entries(&[("greeting.hi", "Hallo")]),
            IMMEDIATE,
        );
        expect_that!(store.locales(&unit_a()), elements_are![eq("de")]);

        let removed_from = store.remove_document(Path::new("/a/de.yml"));

        expect_that!(removed_from, some(eq(&unit_a())));
        expect_that!(store.locales(&unit_a()), is_empty());
    }

    #[googletest::test]
    fn units_are_isolated() {
        let mut store = TranslationStore::new();

        store.merge_document(
            &unit_a(),
            Path::new("/projects/a/config/locales/en.yml"),
            "en",
            &entries(&[("greeting.hi", "Hi")]),
            BATCHED,
        );
        store.merge_document(
            &unit_b(),
            Path::new("/projects/b/config/locales/en.yml"),
            "en",
            &entries(&[("greeting.hi", "Bonjour")]),
            BATCHED,
        );
        store.update_lookup_maps();

        expect_that!(store.get_translation("greeting.hi", "en", &unit_a()), some(eq("Hi")));
        expect_that!(store.get_translation("greeting.hi", "en", &unit_b()), some(eq("Bonjour")));
    }

    #[googletest::test]
    fn init_then_identical_sequence_is_idempotent() {
        let mut store = TranslationStore::new();

        for _ in 0..2 {
            store.init();
            store.register_unit(&unit_a());
            store.merge_document(
                &unit_a(),
                Path::new("/a/en.yml"),
                "en",
                &entries(&[("greeting.hi", "Hi")]),
                BATCHED,
            );
            store.merge_document(
                &unit_a(),
                Path::new("/a/fr.yml"),
                "fr",
                &entries(&[("greeting.hi", "Salut")]),
                BATCHED,
            );
            store.update_lookup_maps();
        }

        expect_that!(store.get_translation("greeting.hi", "en", &unit_a()), some(eq("Hi")));
        expect_that!(store.get_translation("greeting.hi", "fr", &unit_a()), some(eq("Salut")));
        expect_that!(store.locales(&unit_a()), elements_are![eq("en"), eq("fr")]);
    }

    #[googletest::test]
    fn lookup_requires_index_rebuild_after_batched_merge() {
        let mut store = TranslationStore::new();

        store.merge_document(
            &unit_a(),
            Path::new("/a/en.yml"),
            "en",
            &entries(&[("greeting.hi", "Hi")]),
            BATCHED,
        );

        // Documented contract: stale until the batch rebuild runs.
        expect_that!(store.get_translation("greeting.hi", "en", &unit_a()), none());
        store.update_lookup_maps();
        expect_that!(store.get_translation("greeting.hi", "en", &unit_a()), some(eq("Hi")));
    }

    #[googletest::test]
    fn reload_with_changed_locale_relocates_the_document() {
        let mut store = TranslationStore::new();
        let doc = PathBuf::from("/a/misc.yml");

        store.merge_document(&unit_a(), &doc, "en", &entries(&[("x", "X")]), IMMEDIATE);
        store.merge_document(&unit_a(), &doc, "de", &entries(&[("x", "X-de")]), IMMEDIATE);

        expect_that!(store.get_translation("x", "en", &unit_a()), none());
        expect_that!(store.get_translation("x", "de", &unit_a()), some(eq("X-de")));
        expect_that!(store.locales(&unit_a()), elements_are![eq("de")]);
    }

    #[googletest::test]
    fn unit_for_path_prefers_longest_root() {
        let mut store = TranslationStore::new();
        store.register_unit(Path::new("/projects"));
        store.register_unit(Path::new("/projects/a"));

        let owner = store.unit_for_path(Path::new("/projects/a/config/locales/en.yml"));

        expect_that!(owner, some(eq(Path::new("/projects/a"))));
    }

    #[googletest::test]
    fn default_locale_for_unknown_path_is_a_caller_error() {
        let store = TranslationStore::new();

        let result = store.default_locale_for_path(Path::new("/nowhere/file.rb"));

        expect_that!(
            result,
            err(eq(&StoreError::UnresolvedUnit(PathBuf::from("/nowhere/file.rb"))))
        );
    }

    #[googletest::test]
    fn refresh_defaults_follows_detection_chain() {
        let mut store = TranslationStore::new();
        store.register_unit(&unit_a());
        store.merge_document(
            &unit_a(),
            Path::new("/projects/a/config/locales/de.yml"),
            "de",
            &entries(&[("k", "v")]),
            IMMEDIATE,
        );
        store.merge_document(
            &unit_a(),
            Path::new("/projects/a/config/locales/en.yml"),
            "en",
            &entries(&[("k", "v")]),
            IMMEDIATE,
        );

        store.refresh_defaults(&unit_a(), Some("de"));
        expect_that!(
            store.defaults(&unit_a()).map(|d| d.locale.as_str()),
            some(eq("de"))
        );

        store.refresh_defaults(&unit_a(), None);
        expect_that!(
            store.defaults(&unit_a()).map(|d| d.locale.as_str()),
            some(eq("en"))
        );
    }

    #[googletest::test]
    fn translation_for_key_defaults_to_unit_default_locale() {
        let mut store = TranslationStore::new();
        store.register_unit(&unit_a());
        store.merge_document(
            &unit_a(),
            Path::new("/projects/a/config/locales/fr.yml"),
            "fr",
            &entries(&[("greeting.hi", "Salut")]),
            IMMEDIATE,
        );
        store.refresh_defaults(&unit_a(), None);

        let source = Path::new("/projects/a/app/models/user.rb");
        let value = store.translation_for_key("greeting.hi", None, source).unwrap();

        expect_that!(value, some(eq("Salut")));
    }
}
