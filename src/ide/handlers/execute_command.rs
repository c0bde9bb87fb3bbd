//! `workspace/executeCommand` handlers.
//!
//! Exposes the store's query surface to clients that are not driving an
//! editor cursor: `railsI18n.getTranslationValue` and
//! `railsI18n.getDefaultLocale`.

use std::path::PathBuf;

use serde_json::Value;
use tower_lsp::jsonrpc::{
    Error,
    ErrorCode,
    Result,
};
use tower_lsp::lsp_types::{
    ExecuteCommandParams,
    Url,
};

use super::super::backend::Backend;

/// An `InvalidParams` error carrying a specific message.
fn invalid_params(message: String) -> Error {
    Error { code: ErrorCode::InvalidParams, message: message.into(), data: None }
}

pub async fn handle_execute_command(
    backend: &Backend,
    params: ExecuteCommandParams,
) -> Result<Option<Value>> {
    match params.command.as_str() {
        "railsI18n.getTranslationValue" => get_translation_value(backend, &params.arguments).await,
        "railsI18n.getDefaultLocale" => get_default_locale(backend, &params.arguments).await,
        other => {
            tracing::warn!(command = other, "Unknown command");
            Ok(None)
        }
    }
}

/// `railsI18n.getTranslationValue(key, locale?, sourceUri?)`
///
/// Returns the translation text, or null when the key has no value — a
/// missing key is a normal steady state, not an error.
async fn get_translation_value(backend: &Backend, arguments: &[Value]) -> Result<Option<Value>> {
    let key = required_string(arguments, 0, "key")?;
    let locale = optional_string(arguments, 1);
    let source_uri = optional_string(arguments, 2);

    let store = backend.state.store.lock().await;
    let source = match source_uri {
        Some(uri) => parse_file_uri(&uri)?,
        None => single_unit_root(&store)?,
    };

    let value = store
        .translation_for_key(&key, locale.as_deref(), &source)
        .map_err(|error| invalid_params(error.to_string()))?;

    Ok(Some(value.map_or(Value::Null, Value::String)))
}

/// `railsI18n.getDefaultLocale(sourceUri?)`
async fn get_default_locale(backend: &Backend, arguments: &[Value]) -> Result<Option<Value>> {
    let source_uri = optional_string(arguments, 0);

    let store = backend.state.store.lock().await;
    let source = match source_uri {
        Some(uri) => parse_file_uri(&uri)?,
        None => single_unit_root(&store)?,
    };

    let locale = store
        .default_locale_for_path(&source)
        .map_err(|error| invalid_params(error.to_string()))?;

    Ok(Some(Value::String(locale)))
}

/// Required positional string argument.
fn required_string(arguments: &[Value], index: usize, name: &str) -> Result<String> {
    optional_string(arguments, index)
        .ok_or_else(|| invalid_params(format!("missing argument: {name}")))
}

/// Optional positional string argument (absent or null both count as none).
fn optional_string(arguments: &[Value], index: usize) -> Option<String> {
    arguments.get(index).and_then(Value::as_str).map(ToString::to_string)
}

/// Parses a `file://` URI argument into a path.
fn parse_file_uri(uri: &str) -> Result<PathBuf> {
    Url::parse(uri)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .ok_or_else(|| invalid_params(format!("not a file URI: {uri}")))
}

/// The implicit unit when no source URI is given: the only registered one.
fn single_unit_root(store: &crate::store::TranslationStore) -> Result<PathBuf> {
    let roots = store.unit_roots();
    match roots.as_slice() {
        [root] => Ok(root.to_path_buf()),
        [] => Err(invalid_params("no workspace folder is loaded".to_string())),
        _ => Err(invalid_params(
            "multiple workspace folders are loaded; pass a source URI to disambiguate".to_string(),
        )),
    }
}
