//! Document synchronization handlers.

use salsa::Setter;
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
    MessageType,
    Url,
};

use super::super::backend::Backend;
use crate::input::source::{
    SourceFile,
    SourceLanguage,
};

pub async fn handle_did_open(backend: &Backend, params: DidOpenTextDocumentParams) {
    let uri = params.text_document.uri.clone();
    let text = params.text_document.text;

    {
        let mut opened_files = backend.state.opened_files.lock().await;
        opened_files.insert(uri.clone());
    }

    update_source_file(backend, &uri, text).await;
}

pub async fn handle_did_change(backend: &Backend, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;

    // FULL sync なので最後の変更が全文
    let Some(change) = params.content_changes.into_iter().next_back() else {
        return;
    };

    update_source_file(backend, &uri, change.text).await;
}

pub async fn handle_did_save(backend: &Backend, params: DidSaveTextDocumentParams) {
    // 翻訳ドキュメントの保存はウォッチャー通知側で処理される
    tracing::debug!(uri = %params.text_document.uri, "file saved");
    backend
        .client
        .log_message(MessageType::INFO, "file saved!")
        .await;
}

pub async fn handle_did_close(backend: &Backend, params: DidCloseTextDocumentParams) {
    let uri = params.text_document.uri;

    let mut opened_files = backend.state.opened_files.lock().await;
    opened_files.remove(&uri);
}

/// 既存の `SourceFile` を更新するか、新規作成する
///
/// Salsa が自動的に依存クエリを無効化するため、更新はテキストの差し替え
/// だけで済みます。
async fn update_source_file(backend: &Backend, uri: &Url, text: String) {
    let Some(path) = Backend::uri_to_path(uri) else {
        tracing::warn!("Failed to convert URI to file path: {}", uri);
        return;
    };
    let Some(language) = SourceLanguage::from_uri(uri.as_str()) else {
        return;
    };

    let mut db = backend.state.db.lock().await;
    let mut source_files = backend.state.source_files.lock().await;

    if let Some(existing) = source_files.get(&path) {
        existing.set_text(&mut *db).to(text);
    } else {
        let source_file = SourceFile::new(&*db, uri.to_string(), text, language);
        source_files.insert(path, source_file);
    }
}
