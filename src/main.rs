//! Entry point for the Language Server Protocol implementation.

use rails_i18n_language_server::Backend;
use tower_lsp::{
    LspService,
    Server,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // stdout は LSP のトランスポートなので、ログはファイルへ出力する
    let log_dir = std::env::temp_dir().join("rails-i18n-language-server");
    let _ = std::fs::create_dir_all(&log_dir);
    let appender = tracing_appender::rolling::never(&log_dir, "server.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
