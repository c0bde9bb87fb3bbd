//! LSP Backend 実装

use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams,
    DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions,
    DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
    ExecuteCommandParams,
    FileSystemWatcher,
    GlobPattern,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Hover,
    HoverParams,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    MessageType,
    Registration,
    Unregistration,
    Url,
    WorkspaceFolder,
};
use tower_lsp::{
    Client,
    LanguageServer,
};

use super::handlers;
use crate::config::{
    ConfigManager,
    RailsI18nSettings,
};
use crate::db::LocalesDatabaseImpl;
use crate::ide::state::ServerState;
use crate::loader::{
    TranslationMatcher,
    WorkspaceLoader,
};

/// Registration id for the translation file watcher subscription.
const WATCHER_REGISTRATION_ID: &str = "rails-i18n-watched-files";

/// LSP Backend
#[derive(Clone)]
pub struct Backend {
    /// LSP クライアント
    pub client: Client,
    /// 設定管理
    pub config_manager: Arc<Mutex<ConfigManager>>,
    /// ロード・同期オーケストレーター
    pub loader: Arc<WorkspaceLoader>,
    /// 共有状態
    pub state: ServerState,
    /// 現在のファイルウォッチャー登録 ID
    watcher_registration: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config_manager", &"<ConfigManager>")
            .field("loader", &"<WorkspaceLoader>")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// 新しい Backend を作成
    #[must_use]
    pub fn new(client: Client) -> Self {
        let state = ServerState::new(LocalesDatabaseImpl::default());
        let loader = Arc::new(WorkspaceLoader::new(Arc::clone(&state.store)));
        Self {
            client,
            config_manager: Arc::new(Mutex::new(ConfigManager::new())),
            loader,
            state,
            watcher_registration: Arc::new(Mutex::new(None)),
        }
    }

    /// ワークスペースフォルダを取得
    ///
    /// # Errors
    /// クライアントとの通信に失敗した場合
    pub(crate) async fn get_workspace_folders(&self) -> Result<Vec<WorkspaceFolder>> {
        self.client.workspace_folders().await.map(Option::unwrap_or_default)
    }

    /// URI をファイルパスに変換
    pub(crate) fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().ok()
    }

    /// サーバー設定ファイルかどうか
    pub(crate) fn is_config_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == ".rails-i18n.json")
    }

    /// 現在の設定のスナップショットを取得
    pub(crate) async fn settings(&self) -> RailsI18nSettings {
        self.config_manager.lock().await.get_settings().clone()
    }

    /// パスが翻訳ドキュメントかどうか（ユニットからの相対パスで判定）
    pub(crate) async fn is_translation_file(&self, path: &Path) -> bool {
        let settings = self.settings().await;
        let Ok(matcher) = TranslationMatcher::from_settings(&settings) else {
            return false;
        };
        let unit = { self.state.store.lock().await.unit_for_path(path).map(Path::to_path_buf) };
        let Some(unit) = unit else {
            return false;
        };
        path.strip_prefix(&unit).is_ok_and(|relative| matcher.matches(relative))
    }

    /// 全ワークスペースフォルダをフルロード
    pub(crate) async fn load_workspace(&self) {
        let folders = match self.get_workspace_folders().await {
            Ok(folders) => folders,
            Err(error) => {
                tracing::error!(%error, "Failed to query workspace folders");
                return;
            }
        };
        let units: Vec<PathBuf> =
            folders.iter().filter_map(|folder| folder.uri.to_file_path().ok()).collect();

        let settings = self.settings().await;
        match self.loader.load(&self.state.db, &self.state.documents, &units, &settings).await {
            Ok(summary) => {
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!(
                            "Loaded {} locale documents across {} workspace folders",
                            summary.documents, summary.units
                        ),
                    )
                    .await;
            }
            Err(error) => {
                tracing::error!(%error, "Workspace load failed");
                self.client
                    .log_message(MessageType::ERROR, format!("Workspace load failed: {error}"))
                    .await;
            }
        }
    }

    /// 設定変更後のフルリロード（ウォッチャーも登録し直す）
    pub(crate) async fn reload_workspace(&self) {
        self.load_workspace().await;
        self.register_file_watchers().await;
    }

    /// 変更された翻訳ドキュメントを再マージ
    pub(crate) async fn reload_translation_file(&self, path: &Path) {
        let settings = self.settings().await;
        let merged = self
            .loader
            .reload_file(&self.state.db, &self.state.documents, path, &settings)
            .await;
        tracing::debug!(file = %path.display(), merged, "Watched translation file reloaded");
    }

    /// 削除された翻訳ドキュメントをストアから除去
    pub(crate) async fn remove_translation_file(&self, path: &Path) {
        let settings = self.settings().await;
        self.loader.remove_file(&self.state.documents, path, &settings).await;
        tracing::debug!(file = %path.display(), "Watched translation file removed");
    }

    /// 翻訳ドキュメントのファイルウォッチャーを登録
    ///
    /// 既存の登録があれば先に解除してから登録する（繰り返しロードしても
    /// 通知の重複購読が発生しないようにするため）。
    pub(crate) async fn register_file_watchers(&self) {
        self.release_file_watchers().await;

        let settings = self.settings().await;
        let pattern = format!("**/{}", settings.translation_files.file_pattern);
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![
                FileSystemWatcher { glob_pattern: GlobPattern::String(pattern), kind: None },
                FileSystemWatcher {
                    glob_pattern: GlobPattern::String("**/.rails-i18n.json".to_string()),
                    kind: None,
                },
            ],
        };
        let registration = Registration {
            id: WATCHER_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };

        match self.client.register_capability(vec![registration]).await {
            Ok(()) => {
                *self.watcher_registration.lock().await =
                    Some(WATCHER_REGISTRATION_ID.to_string());
                tracing::debug!("File watchers registered");
            }
            Err(error) => tracing::warn!(%error, "Failed to register file watchers"),
        }
    }

    /// ファイルウォッチャーの登録を無条件に解除
    pub(crate) async fn release_file_watchers(&self) {
        let previous = { self.watcher_registration.lock().await.take() };
        if let Some(id) = previous {
            let unregistration = Unregistration {
                id,
                method: "workspace/didChangeWatchedFiles".to_string(),
            };
            if let Err(error) = self.client.unregister_capability(vec![unregistration]).await {
                tracing::warn!(%error, "Failed to unregister file watchers");
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::lifecycle::handle_initialize(self, params).await
    }

    async fn initialized(&self, params: InitializedParams) {
        handlers::lifecycle::handle_initialized(self, params).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handlers::lifecycle::handle_shutdown(self).await
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        handlers::workspace::handle_did_change_workspace_folders(self, params).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handlers::workspace::handle_did_change_configuration(self, params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        handlers::workspace::handle_did_change_watched_files(self, params).await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handlers::document_sync::handle_did_open(self, params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handlers::document_sync::handle_did_change(self, params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        handlers::document_sync::handle_did_save(self, params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handlers::document_sync::handle_did_close(self, params).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        handlers::features::handle_hover(self, params).await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        handlers::features::handle_goto_definition(self, params).await
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        handlers::execute_command::handle_execute_command(self, params).await
    }
}
