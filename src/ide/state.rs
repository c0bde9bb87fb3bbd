//! LSP サーバーの共有状態

use std::collections::{
    HashMap,
    HashSet,
};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::LocalesDatabaseImpl;
use crate::input::document::LocaleDocument;
use crate::input::source::SourceFile;
use crate::store::TranslationStore;

/// LSP サーバーの共有状態
///
/// `Backend` から状態管理の責務を分離し、ハンドラー間で共有可能にします。
///
/// # ロック順序
///
/// 複数のロックを同時に取得する場合は、以下の順序を厳守してください：
/// 1. `db`
/// 2. `store`
/// 3. `documents` / `source_files` / `opened_files`
#[derive(Clone)]
pub struct ServerState {
    /// Salsa データベース
    pub db: Arc<Mutex<LocalesDatabaseImpl>>,
    /// 翻訳ストア
    pub store: Arc<Mutex<TranslationStore>>,
    /// ロード済み翻訳ドキュメント（ファイルパス → `LocaleDocument`）
    pub documents: Arc<Mutex<HashMap<PathBuf, LocaleDocument>>>,
    /// `SourceFile` 管理（ファイルパス → `SourceFile`）
    pub source_files: Arc<Mutex<HashMap<PathBuf, SourceFile>>>,
    /// 現在開いているファイルの URI
    pub opened_files: Arc<Mutex<HashSet<tower_lsp::lsp_types::Url>>>,
}

impl ServerState {
    /// 新しい `ServerState` を作成
    #[must_use]
    pub fn new(db: LocalesDatabaseImpl) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            store: Arc::new(Mutex::new(TranslationStore::new())),
            documents: Arc::new(Mutex::new(HashMap::new())),
            source_files: Arc::new(Mutex::new(HashMap::new())),
            opened_files: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("db", &"<LocalesDatabaseImpl>")
            .field("store", &"<TranslationStore>")
            .field("documents", &"<HashMap<PathBuf, LocaleDocument>>")
            .field("source_files", &"<HashMap<PathBuf, SourceFile>>")
            .field("opened_files", &"<HashSet<Url>>")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[googletest::test]
    fn new_creates_empty_state() {
        let db = LocalesDatabaseImpl::default();
        let state = ServerState::new(db);

        expect_that!(Arc::strong_count(&state.db), eq(1));
        expect_that!(Arc::strong_count(&state.store), eq(1));
        expect_that!(Arc::strong_count(&state.documents), eq(1));
        expect_that!(Arc::strong_count(&state.source_files), eq(1));
        expect_that!(Arc::strong_count(&state.opened_files), eq(1));
    }

    #[googletest::test]
    fn clone_shares_state() {
        let db = LocalesDatabaseImpl::default();
        let state1 = ServerState::new(db);
        let state2 = state1.clone();

        expect_that!(Arc::strong_count(&state1.store), eq(2));
        expect_that!(Arc::ptr_eq(&state1.db, &state2.db), eq(true));
        expect_that!(Arc::ptr_eq(&state1.store, &state2.store), eq(true));
    }

    #[tokio::test]
    async fn cloned_state_shares_modifications() {
        let db = LocalesDatabaseImpl::default();
        let state1 = ServerState::new(db);
        let state2 = state1.clone();

        {
            let mut opened_files = state1.opened_files.lock().await;
            let uri = tower_lsp::lsp_types::Url::parse("file:///app/models/user.rb").unwrap();
            opened_files.insert(uri);
        }

        let opened_files = state2.opened_files.lock().await;
        assert_eq!(opened_files.len(), 1);
    }
}
