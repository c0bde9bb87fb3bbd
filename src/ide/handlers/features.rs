//! Language feature handlers: hover, go-to-definition.

use std::path::Path;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Hover,
    HoverContents,
    HoverParams,
    MarkupContent,
    MarkupKind,
    TextDocumentPositionParams,
};

use super::super::backend::Backend;
use crate::ide::{
    goto_definition,
    hover,
};
use crate::syntax;

pub async fn handle_hover(backend: &Backend, params: HoverParams) -> Result<Option<Hover>> {
    let position_params = params.text_document_position_params;

    let Some((path, key_text)) = key_under_cursor(backend, &position_params).await else {
        return Ok(None);
    };

    let store = backend.state.store.lock().await;
    let Some(unit) = store.unit_for_path(&path).map(Path::to_path_buf) else {
        tracing::debug!(file = %path.display(), "Hover outside any workspace unit");
        return Ok(None);
    };
    let Some(content) = hover::generate_hover_content(&store, &unit, &key_text) else {
        tracing::debug!(key = %key_text, "No translations found for key");
        return Ok(None);
    };

    Ok(Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: content,
        }),
        range: None,
    }))
}

pub async fn handle_goto_definition(
    backend: &Backend,
    params: GotoDefinitionParams,
) -> Result<Option<GotoDefinitionResponse>> {
    let position_params = params.text_document_position_params;

    let Some((_path, key_text)) = key_under_cursor(backend, &position_params).await else {
        return Ok(None);
    };

    let db = backend.state.db.lock().await;
    let documents = backend.state.documents.lock().await;
    let locations = goto_definition::find_definitions(&*db, &key_text, &documents);

    if locations.is_empty() { Ok(None) } else { Ok(Some(GotoDefinitionResponse::Array(locations))) }
}

/// カーソル位置の翻訳キーを解決する
async fn key_under_cursor(
    backend: &Backend,
    position_params: &TextDocumentPositionParams,
) -> Option<(std::path::PathBuf, String)> {
    let uri = &position_params.text_document.uri;
    let path = Backend::uri_to_path(uri)?;

    let source_file = { backend.state.source_files.lock().await.get(&path).copied() };
    let Some(source_file) = source_file else {
        tracing::debug!("Source file not found in cache: {}", path.display());
        return None;
    };

    let db = backend.state.db.lock().await;
    let position = crate::types::SourcePosition::from(position_params.position);
    let key = syntax::key_at_position(&*db, source_file, position)?;
    Some((path, key.text(&*db).clone()))
}
