//! Workspace load / refresh lifecycle.
//!
//! The loader owns the `Uninitialized -> Loading -> Watching` lifecycle: a
//! full load resets the store, discovers and merges every locale document
//! per workspace unit, rebuilds the lookup maps once behind a join barrier,
//! and fires a one-shot did-load signal. After that, watched-file changes go
//! through the single-document paths, which rebuild immediately.

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};

use futures::StreamExt;
use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};
use ignore::WalkBuilder;
use tokio::sync::{
    Mutex,
    oneshot,
};

use crate::config::RailsI18nSettings;
use crate::db::LocalesDatabaseImpl;
use crate::input::document::{
    self,
    LocaleDocument,
};
use crate::loader::load_paths;
use crate::loader::types::LoaderError;
use crate::store::{
    MergeOptions,
    TranslationStore,
};

/// Loader lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No load has been requested yet.
    Uninitialized,
    /// A full load is in progress.
    Loading,
    /// Initial load finished; incremental changes apply one at a time.
    Watching,
}

/// Result of one full load pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Workspace units loaded.
    pub units: usize,
    /// Locale documents successfully merged.
    pub documents: usize,
}

/// Include/exclude matcher for locale documents, relative to a unit root.
#[derive(Debug, Clone)]
pub struct TranslationMatcher {
    /// Patterns a document must match.
    include: GlobSet,
    /// Patterns that remove a document from consideration.
    exclude: GlobSet,
}

impl TranslationMatcher {
    /// Builds the matcher from the configured patterns.
    ///
    /// # Errors
    /// [`LoaderError::Pattern`] if a configured glob fails to compile.
    pub fn from_settings(settings: &RailsI18nSettings) -> Result<Self, LoaderError> {
        let pattern = &settings.translation_files.file_pattern;
        let mut include_builder = GlobSetBuilder::new();
        let glob = Glob::new(pattern)
            .map_err(|e| LoaderError::Pattern(format!("file pattern '{pattern}': {e}")))?;
        include_builder.add(glob);
        let include = include_builder
            .build()
            .map_err(|e| LoaderError::Pattern(format!("file pattern '{pattern}': {e}")))?;

        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in &settings.exclude_patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| LoaderError::Pattern(format!("exclude pattern '{pattern}': {e}")))?;
            exclude_builder.add(glob);
        }
        let exclude = exclude_builder
            .build()
            .map_err(|e| LoaderError::Pattern(format!("exclude patterns: {e}")))?;

        Ok(Self { include, exclude })
    }

    /// Whether a unit-relative path is a locale document.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

/// Shared references threaded through one load pass.
struct LoadContext<'a> {
    /// Salsa database holding document inputs.
    db: &'a Mutex<LocalesDatabaseImpl>,
    /// Live document registry (path -> current input).
    documents: &'a Mutex<HashMap<PathBuf, LocaleDocument>>,
    /// Effective settings for this pass.
    settings: &'a RailsI18nSettings,
}

/// The synchronization orchestrator.
#[derive(Debug)]
pub struct WorkspaceLoader {
    /// The store all merges target.
    store: Arc<Mutex<TranslationStore>>,
    /// Current lifecycle state.
    phase: std::sync::Mutex<LoadPhase>,
    /// Set once the first full load completes; never reset.
    loaded: AtomicBool,
    /// Pending one-shot did-load listeners.
    did_load: std::sync::Mutex<Vec<oneshot::Sender<()>>>,
}

impl WorkspaceLoader {
    /// Creates a loader over the given store.
    #[must_use]
    pub fn new(store: Arc<Mutex<TranslationStore>>) -> Self {
        Self {
            store,
            phase: std::sync::Mutex::new(LoadPhase::Uninitialized),
            loaded: AtomicBool::new(false),
            did_load: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn phase(&self) -> LoadPhase {
        self.phase.lock().map_or(LoadPhase::Uninitialized, |guard| *guard)
    }

    /// Whether the initial load has completed at least once.
    ///
    /// Listeners that call [`WorkspaceLoader::on_did_load`] after the signal
    /// already fired are never notified; they must check this flag instead.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Registers a one-shot did-load listener.
    ///
    /// The returned receiver resolves when the next full load completes. It
    /// is NOT replayed: registering after the signal has fired leaves the
    /// receiver pending forever — check [`WorkspaceLoader::is_loaded`] first.
    #[must_use]
    pub fn on_did_load(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut listeners) = self.did_load.lock() {
            listeners.push(tx);
        }
        rx
    }

    /// Full load: reset, discover, merge, rebuild once, signal.
    ///
    /// Units load concurrently (they touch disjoint store partitions); the
    /// final index rebuild runs only after every unit finished — rebuilding
    /// per document during a load of N documents would cost O(N x index)
    /// instead of O(N + index).
    ///
    /// # Errors
    /// [`LoaderError::Pattern`] if the configured globs fail to compile.
    /// Per-document failures never abort the load; they are logged and the
    /// document is skipped.
    pub async fn load(
        &self,
        db: &Mutex<LocalesDatabaseImpl>,
        documents: &Mutex<HashMap<PathBuf, LocaleDocument>>,
        units: &[PathBuf],
        settings: &RailsI18nSettings,
    ) -> Result<LoadSummary, LoaderError> {
        let matcher = TranslationMatcher::from_settings(settings)?;
        self.set_phase(LoadPhase::Loading);

        {
            let mut store = self.store.lock().await;
            store.set_key_separator(&settings.key_separator);
            store.init();
            for unit in units {
                store.register_unit(unit);
            }
        }
        documents.lock().await.clear();

        let ctx = LoadContext { db, documents, settings };
        let tasks = units.iter().map(|unit| self.load_unit(&ctx, unit, &matcher));
        let counts = futures::future::join_all(tasks).await;

        {
            let mut store = self.store.lock().await;
            store.update_lookup_maps();
            for unit in units {
                store.refresh_defaults(unit, settings.default_locale.as_deref());
            }
        }

        self.loaded.store(true, Ordering::Release);
        self.set_phase(LoadPhase::Watching);
        self.fire_did_load();

        let summary = LoadSummary { units: units.len(), documents: counts.iter().sum() };
        tracing::info!(units = summary.units, documents = summary.documents, "Initial load complete");
        Ok(summary)
    }

    /// Loads one unit into an already-loaded store (workspace folder added
    /// mid-session). Does not reset anything and does not fire the did-load
    /// signal.
    ///
    /// # Errors
    /// [`LoaderError::Pattern`] if the configured globs fail to compile.
    pub async fn load_additional_unit(
        &self,
        db: &Mutex<LocalesDatabaseImpl>,
        documents: &Mutex<HashMap<PathBuf, LocaleDocument>>,
        unit: &Path,
        settings: &RailsI18nSettings,
    ) -> Result<usize, LoaderError> {
        let matcher = TranslationMatcher::from_settings(settings)?;
        self.store.lock().await.register_unit(unit);

        let ctx = LoadContext { db, documents, settings };
        let merged = self.load_unit(&ctx, unit, &matcher).await;

        let mut store = self.store.lock().await;
        store.update_lookup_maps();
        store.refresh_defaults(unit, settings.default_locale.as_deref());
        Ok(merged)
    }

    /// Destroys a unit partition and forgets its documents (workspace folder
    /// removed).
    pub async fn remove_unit(
        &self,
        documents: &Mutex<HashMap<PathBuf, LocaleDocument>>,
        unit: &Path,
    ) {
        self.store.lock().await.remove_unit(unit);
        documents.lock().await.retain(|path, _| !path.starts_with(unit));
        tracing::debug!(unit = %unit.display(), "Workspace unit removed");
    }

    /// Re-merges a single document after a watched-file change, rebuilding
    /// the affected index immediately (changes arrive one at a time; lookup
    /// latency matters more than merge throughput here).
    ///
    /// Returns whether the document merged. A reload produces a fresh
    /// [`LocaleDocument`] that supersedes the previous one; on failure the
    /// store keeps the document's previous contribution.
    pub async fn reload_file(
        &self,
        db: &Mutex<LocalesDatabaseImpl>,
        documents: &Mutex<HashMap<PathBuf, LocaleDocument>>,
        path: &Path,
        settings: &RailsI18nSettings,
    ) -> bool {
        let unit = { self.store.lock().await.unit_for_path(path).map(Path::to_path_buf) };
        let Some(unit) = unit else {
            tracing::warn!(file = %path.display(), "Changed document belongs to no known unit");
            return false;
        };

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(error) => {
                let error = document::DocumentError::Unreadable(error);
                tracing::warn!(file = %path.display(), %error, "Skipping changed locale document");
                return false;
            }
        };

        let ctx = LoadContext { db, documents, settings };
        let options = MergeOptions { rebuild_index_immediately: true };
        let merged = self.merge_text(&ctx, &unit, path, &text, options).await;
        if merged {
            self.store.lock().await.refresh_defaults(&unit, settings.default_locale.as_deref());
        }
        merged
    }

    /// Removes a deleted document's contribution from the store.
    pub async fn remove_file(
        &self,
        documents: &Mutex<HashMap<PathBuf, LocaleDocument>>,
        path: &Path,
        settings: &RailsI18nSettings,
    ) {
        documents.lock().await.remove(path);
        let mut store = self.store.lock().await;
        if let Some(unit) = store.remove_document(path) {
            store.update_lookup_maps();
            store.refresh_defaults(&unit, settings.default_locale.as_deref());
        }
    }

    /// Discovers, reads, parses, and merges one unit's documents.
    ///
    /// Reads run concurrently (bounded by the indexing settings) but results
    /// apply in sorted path order, so the last-merged-wins policy is a
    /// stable rule: override files win by filename sort, not by I/O timing.
    async fn load_unit(
        &self,
        ctx: &LoadContext<'_>,
        unit: &Path,
        matcher: &TranslationMatcher,
    ) -> usize {
        let mut files = self.discover(unit, ctx.settings, matcher).await;
        files.sort();

        let concurrency = ctx.settings.indexing.effective_threads();
        let reads = files.into_iter().map(|path| async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => Some((path, text)),
                Err(error) => {
                    let error = document::DocumentError::Unreadable(error);
                    tracing::warn!(file = %path.display(), %error, "Skipping locale document");
                    None
                }
            }
        });
        let contents: Vec<Option<(PathBuf, String)>> =
            futures::stream::iter(reads).buffered(concurrency.max(1)).collect().await;

        let mut merged = 0_usize;
        for (path, text) in contents.into_iter().flatten() {
            if self.merge_text(ctx, unit, &path, &text, MergeOptions::default()).await {
                merged += 1;
            }
        }
        tracing::debug!(unit = %unit.display(), merged, "Unit load finished");
        merged
    }

    /// Parses text and merges it into the store under the document's
    /// identity. Parse and shape failures are contained here.
    async fn merge_text(
        &self,
        ctx: &LoadContext<'_>,
        unit: &Path,
        path: &Path,
        text: &str,
        options: MergeOptions,
    ) -> bool {
        let parsed = match document::parse_document(text, &ctx.settings.key_separator) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(file = %path.display(), %error, "Skipping locale document");
                return false;
            }
        };

        let doc = {
            let db = ctx.db.lock().await;
            LocaleDocument::new(
                &*db,
                parsed.locale.clone(),
                path.to_string_lossy().to_string(),
                parsed.entries.clone(),
                parsed.key_ranges,
                parsed.value_ranges,
            )
        };
        ctx.documents.lock().await.insert(path.to_path_buf(), doc);

        self.store.lock().await.merge_document(unit, path, &parsed.locale, &parsed.entries, options);
        true
    }

    /// File discovery for one unit: declared load paths when configured,
    /// glob search otherwise (and as the fallback when the external tool is
    /// unavailable).
    async fn discover(
        &self,
        unit: &Path,
        settings: &RailsI18nSettings,
        matcher: &TranslationMatcher,
    ) -> Vec<PathBuf> {
        if settings.load_all_translations {
            match load_paths::declared_load_paths(unit).await {
                Ok(paths) => return paths,
                Err(error) => {
                    tracing::warn!(
                        unit = %unit.display(),
                        %error,
                        "Declared load paths unavailable; falling back to file search"
                    );
                }
            }
        }
        find_locale_files(unit, matcher)
    }

    /// Updates the lifecycle state.
    fn set_phase(&self, next: LoadPhase) {
        if let Ok(mut guard) = self.phase.lock() {
            *guard = next;
        }
    }

    /// Drains and notifies all pending did-load listeners.
    fn fire_did_load(&self) {
        let drained: Vec<oneshot::Sender<()>> = match self.did_load.lock() {
            Ok(mut listeners) => listeners.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for listener in drained {
            // A dropped receiver is fine; the listener went away.
            let _ = listener.send(());
        }
    }
}

/// Walks a unit root collecting files that match the translation pattern.
/// Unreadable directory entries are skipped, not fatal.
fn find_locale_files(unit_root: &Path, matcher: &TranslationMatcher) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for result in WalkBuilder::new(unit_root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(unit_root) else {
            continue;
        };
        if !matcher.matches(relative) {
            continue;
        }

        found.push(path.to_path_buf());
    }
    found
}
