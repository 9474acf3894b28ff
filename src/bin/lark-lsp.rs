// Lark Language Server Protocol (LSP) Binary
// Serves diagnostics, completion, hover and go-to-definition over stdio

use lark_core::lsp::LarkLanguageServer;
use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(LarkLanguageServer::new);

    Server::new(stdin, stdout, socket).serve(service).await;
}
