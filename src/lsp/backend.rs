// Lark Language Server Backend
// Implements tower_lsp::LanguageServer over the workspace index and analysis core

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use std::path::Path;
use std::sync::Arc;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use super::analyzer::analyze;
use super::completion::complete;
use super::definition::find_definition;
use super::hover::hover;
use super::symbols::{Symbol, SymbolKind};
use super::workspace::WorkspaceIndex;
use crate::config::{AnalyzerConfig, CONFIG_FILE};

/// Lark Language Server
pub struct LarkLanguageServer {
    client: Client,
    index: Arc<WorkspaceIndex>,
    /// Texts of documents open in the editor
    documents: DashMap<Url, String>,
    config: RwLock<AnalyzerConfig>,
    /// initializationOptions, re-applied whenever lark.json is reloaded
    options: RwLock<Option<serde_json::Value>>,
    /// Problems found during initialize, reported once the client is ready
    startup_errors: Mutex<Vec<String>>,
}

impl LarkLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: Arc::new(WorkspaceIndex::new()),
            documents: DashMap::new(),
            config: RwLock::new(AnalyzerConfig::default()),
            options: RwLock::new(None),
            startup_errors: Mutex::new(Vec::new()),
        }
    }

    fn config(&self) -> AnalyzerConfig {
        self.config.read().clone()
    }

    /// lark.json of `root` (defaults if absent) overlaid with initializationOptions
    fn load_config(&self, root: Option<&Path>) -> std::result::Result<AnalyzerConfig, String> {
        let base = match root {
            Some(root) => AnalyzerConfig::discover(root).map_err(|e| e.to_string())?,
            None => AnalyzerConfig::default(),
        };
        match self.options.read().as_ref() {
            Some(options) => base.merge_options(options).map_err(|e| e.to_string()),
            None => Ok(base),
        }
    }

    /// Diagnostics for one document; all index locks are released on return
    fn diagnostics_for(&self, uri: &Url, text: &str) -> Vec<Diagnostic> {
        let config = self.config();
        let snapshot = self.index.snapshot();
        analyze(uri, text, &snapshot, &config)
    }

    async fn publish(&self, uri: Url, text: &str) {
        let diagnostics = self.diagnostics_for(&uri, text);
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    /// Re-validate every open document except `skip`, since imports may now resolve differently
    async fn revalidate_open_documents(&self, skip: Option<&Url>) {
        let open: Vec<(Url, String)> = self
            .documents
            .iter()
            .filter(|entry| Some(entry.key()) != skip)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for (uri, text) in open {
            self.publish(uri, &text).await;
        }
    }

    /// Re-index an edited document and publish diagnostics
    async fn on_document_change(&self, uri: Url, text: String) {
        self.index.update_document(uri.clone(), &text);
        self.documents.insert(uri.clone(), text.clone());
        self.publish(uri.clone(), &text).await;
        self.revalidate_open_documents(Some(&uri)).await;
    }

    fn open_text(&self, uri: &Url) -> Option<String> {
        self.documents.get(uri).map(|entry| entry.value().clone())
    }

    async fn scan_workspace(&self) {
        let config = self.config();
        let open: FxHashSet<Url> = self.documents.iter().map(|entry| entry.key().clone()).collect();

        for root in self.index.roots() {
            let Ok(path) = root.to_file_path() else {
                continue;
            };
            let index = Arc::clone(&self.index);
            let scan_config = config.clone();
            let skip = open.clone();
            let scan_root = path.clone();
            let result = tokio::task::spawn_blocking(move || {
                index.scan_directory(&scan_root, &scan_config, |uri| skip.contains(uri))
            })
            .await;

            match result {
                Ok(report) => {
                    self.client
                        .log_message(
                            MessageType::INFO,
                            format!(
                                "Indexed {} file(s) under {} ({} skipped)",
                                report.indexed,
                                path.display(),
                                report.skipped
                            ),
                        )
                        .await;
                }
                Err(e) => {
                    let message = format!("Workspace scan of {} failed: {}", path.display(), e);
                    self.client.log_message(MessageType::ERROR, message).await;
                }
            }
        }
    }

    async fn register_file_watchers(&self) {
        let extension = self.config.read().dotted_extension();
        let watchers = vec![
            FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/*{}", extension)),
                kind: None,
            },
            FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/{}", CONFIG_FILE)),
                kind: None,
            },
        ];
        let options = DidChangeWatchedFilesRegistrationOptions { watchers };
        let registration = Registration {
            id: "lark-watched-files".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            self.client
                .log_message(MessageType::WARNING, format!("File watching unavailable: {}", e))
                .await;
        }
    }

    async fn reload_config(&self, root: &Path) {
        match self.load_config(Some(root)) {
            Ok(config) => {
                *self.config.write() = config;
                let message = format!("Reloaded {}", root.join(CONFIG_FILE).display());
                self.client.log_message(MessageType::INFO, message).await;
            }
            Err(e) => {
                self.client.show_message(MessageType::WARNING, e).await;
            }
        }
    }
}

/// Document outline: struct fields nest under the struct that precedes them
#[allow(deprecated)]
pub fn document_symbols(symbols: &[Arc<Symbol>]) -> Vec<DocumentSymbol> {
    let mut outline: Vec<DocumentSymbol> = Vec::new();
    let mut last_struct: Option<usize> = None;

    for symbol in symbols {
        let entry = DocumentSymbol {
            name: symbol.name.clone(),
            detail: symbol.detail.clone(),
            kind: symbol.kind.to_lsp(),
            tags: None,
            deprecated: None,
            range: symbol.range,
            selection_range: symbol.range,
            children: None,
        };

        match (symbol.kind, last_struct) {
            (SymbolKind::Field, Some(parent)) => {
                outline[parent].children.get_or_insert_with(Vec::new).push(entry);
            }
            (SymbolKind::Struct, _) => {
                last_struct = Some(outline.len());
                outline.push(entry);
            }
            _ => {
                last_struct = None;
                outline.push(entry);
            }
        }
    }

    outline
}

#[tower_lsp::async_trait]
impl LanguageServer for LarkLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let mut roots: Vec<Url> = params
            .workspace_folders
            .unwrap_or_default()
            .into_iter()
            .map(|folder| folder.uri)
            .collect();
        if roots.is_empty() {
            #[allow(deprecated)]
            let root_uri = params.root_uri;
            roots.extend(root_uri);
        }

        *self.options.write() = params.initialization_options;
        let first_root = roots.iter().find_map(|root| root.to_file_path().ok());
        match self.load_config(first_root.as_deref()) {
            Ok(config) => *self.config.write() = config,
            Err(e) => self.startup_errors.lock().push(e),
        }
        self.index.set_roots(roots);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "lark-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Lark LSP server initialized")
            .await;

        let errors = std::mem::take(&mut *self.startup_errors.lock());
        for error in errors {
            self.client.show_message(MessageType::WARNING, error).await;
        }

        self.register_file_watchers().await;
        self.scan_workspace().await;
        self.revalidate_open_documents(None).await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.on_document_change(params.text_document.uri, params.text_document.text)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().next() {
            self.on_document_change(params.text_document.uri, change.text)
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);

        // The saved file, not the closed buffer, is what other modules see now
        let on_disk = uri.to_file_path().ok().filter(|path| path.is_file());
        match on_disk {
            Some(path) => {
                if let Err(e) = self.index.index_file(&path) {
                    self.index.remove_document(&uri);
                    self.client.log_message(MessageType::WARNING, e.to_string()).await;
                }
            }
            None => {
                self.index.remove_document(&uri);
            }
        }

        self.client.publish_diagnostics(uri, vec![], None).await;
        self.revalidate_open_documents(None).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut index_changed = false;

        for change in params.changes {
            let Ok(path) = change.uri.to_file_path() else {
                continue;
            };

            if path.file_name().is_some_and(|name| name == CONFIG_FILE) {
                if let Some(root) = path.parent() {
                    self.reload_config(root).await;
                    index_changed = true;
                }
                continue;
            }

            // Open buffers are authoritative over the disk
            if self.documents.contains_key(&change.uri) {
                continue;
            }

            let is_source = self.config.read().is_source_file(&path);
            if change.typ == FileChangeType::DELETED {
                index_changed |= self.index.remove_document(&change.uri);
            } else if is_source {
                match self.index.index_file(&path) {
                    Ok(_) => index_changed = true,
                    Err(e) => {
                        self.client.log_message(MessageType::WARNING, e.to_string()).await;
                    }
                }
            }
        }

        if index_changed {
            self.revalidate_open_documents(None).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(text) = self.open_text(&uri) else {
            return Ok(None);
        };

        let config = self.config();
        let snapshot = self.index.snapshot();
        let items = complete(&uri, &text, position, &snapshot, &config);
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(text) = self.open_text(&uri) else {
            return Ok(None);
        };

        let config = self.config();
        let snapshot = self.index.snapshot();
        Ok(hover(&uri, &text, position, &snapshot, &config))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(text) = self.open_text(&uri) else {
            return Ok(None);
        };

        let config = self.config();
        let snapshot = self.index.snapshot();
        let location = find_definition(&uri, &text, position, &snapshot, &config);
        Ok(location.map(GotoDefinitionResponse::Scalar))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let symbols = self.index.get_symbols_in(&params.text_document.uri);
        if symbols.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocumentSymbolResponse::Nested(document_symbols(&symbols))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::indexer::index_document;

    #[test]
    fn test_fields_nest_under_struct() {
        let uri = Url::parse("file:///ws/shapes.lark").unwrap();
        let text = "pub type Point = {\n  x: int,\n  y: int\n}\nfun origin() {}";
        let symbols: Vec<Arc<Symbol>> =
            index_document(&uri, text).symbols.into_iter().map(Arc::new).collect();

        let outline = document_symbols(&symbols);
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].name, "Point");
        assert_eq!(outline[0].kind, tower_lsp::lsp_types::SymbolKind::STRUCT);
        let fields: Vec<&str> = outline[0]
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(fields, vec!["x", "y"]);
        assert_eq!(outline[1].name, "origin");
        assert!(outline[1].children.is_none());
    }
}
