//! Workspace-related handlers.

use tower_lsp::lsp_types::{
    DidChangeConfigurationParams,
    DidChangeWatchedFilesParams,
    DidChangeWorkspaceFoldersParams,
    FileChangeType,
};

use super::super::backend::Backend;

pub async fn handle_did_change_configuration(
    backend: &Backend,
    params: DidChangeConfigurationParams,
) {
    tracing::info!(settings = %params.settings, "didChangeConfiguration received");

    let new_settings = serde_json::from_value::<crate::config::RailsI18nSettings>(
        params.settings.clone(),
    )
    .or_else(|_| {
        serde_json::from_value::<crate::config::ServerSettings>(params.settings)
            .map(|wrapped| wrapped.rails_i18n)
    });

    if let Ok(new_settings) = new_settings {
        let mut config_manager = backend.config_manager.lock().await;
        match config_manager.update_settings(new_settings) {
            Ok(()) => {
                drop(config_manager);
                tracing::info!("configuration updated successfully");

                backend.reload_workspace().await;
            }
            Err(error) => {
                tracing::error!(%error, "configuration validation error");
            }
        }
    }
}

pub async fn handle_did_change_watched_files(
    backend: &Backend,
    params: DidChangeWatchedFilesParams,
) {
    for change in params.changes {
        let Some(file_path) = Backend::uri_to_path(&change.uri) else {
            continue;
        };

        if Backend::is_config_file(&file_path) {
            handle_config_file_change(backend, &file_path).await;
            continue;
        }

        if backend.is_translation_file(&file_path).await {
            tracing::debug!("Translation file changed: {:?}, type: {:?}", file_path, change.typ);

            match change.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    backend.reload_translation_file(&file_path).await;
                }
                FileChangeType::DELETED => {
                    backend.remove_translation_file(&file_path).await;
                }
                _ => {}
            }
        }
    }
}

pub async fn handle_did_change_workspace_folders(
    backend: &Backend,
    params: DidChangeWorkspaceFoldersParams,
) {
    for removed in params.event.removed {
        if let Ok(root) = removed.uri.to_file_path() {
            backend.loader.remove_unit(&backend.state.documents, &root).await;
        }
    }

    let settings = backend.settings().await;
    for added in params.event.added {
        let Ok(root) = added.uri.to_file_path() else {
            continue;
        };
        match backend
            .loader
            .load_additional_unit(&backend.state.db, &backend.state.documents, &root, &settings)
            .await
        {
            Ok(merged) => {
                tracing::info!(unit = %root.display(), merged, "Workspace folder loaded");
            }
            Err(error) => {
                tracing::error!(unit = %root.display(), %error, "Failed to load added workspace folder");
            }
        }
    }
}

/// サーバー設定ファイル変更時はディスクから読み直してフルリロード
async fn handle_config_file_change(backend: &Backend, file_path: &std::path::Path) {
    tracing::info!(file = %file_path.display(), "Configuration file changed");

    let workspace_root = file_path.parent().map(std::path::Path::to_path_buf);
    {
        let mut config_manager = backend.config_manager.lock().await;
        if let Err(error) = config_manager.load_settings(workspace_root) {
            tracing::error!(%error, "Failed to reload configuration");
            return;
        }
    }

    backend.reload_workspace().await;
}
