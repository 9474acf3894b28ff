// Workspace Index for Lark LSP
// Process-wide symbol table: by-document and by-name maps, mutated together

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::fs;
use std::hash::BuildHasherDefault;
use std::path::Path;
use std::sync::Arc;
use tower_lsp::lsp_types::Url;
use walkdir::WalkDir;

use super::import_resolver::ModuleResolver;
use super::indexer::index_document;
use super::symbols::{ImportRecord, Symbol, SymbolKind};
use crate::config::AnalyzerConfig;
use crate::error::{LarkError, LarkResult};

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Symbols and imports of one document
#[derive(Debug, Clone, Default)]
pub struct DocumentEntry {
    pub symbols: Vec<Arc<Symbol>>,
    pub imports: Vec<ImportRecord>,
}

#[derive(Debug, Default)]
struct IndexState {
    /// Insertion order is scan order; module resolution depends on it
    by_document: FxIndexMap<Url, DocumentEntry>,
    by_name: FxHashMap<String, Vec<Arc<Symbol>>>,
    roots: Vec<Url>,
}

impl IndexState {
    fn remove(&mut self, uri: &Url) -> Option<DocumentEntry> {
        let entry = self.by_document.get(uri)?.clone();
        for symbol in &entry.symbols {
            if let Some(list) = self.by_name.get_mut(&symbol.name) {
                list.retain(|s| !Arc::ptr_eq(s, symbol));
                if list.is_empty() {
                    self.by_name.remove(&symbol.name);
                }
            }
        }
        Some(entry)
    }
}

/// Counts reported by a directory scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub indexed: usize,
    pub skipped: usize,
}

/// Global symbol table across all documents
#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    state: RwLock<IndexState>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_roots(&self, roots: Vec<Url>) {
        self.state.write().roots = roots;
    }

    pub fn roots(&self) -> Vec<Url> {
        self.state.read().roots.clone()
    }

    /// Re-scan `text` and replace every entry of `uri` in one step
    pub fn update_document(&self, uri: Url, text: &str) {
        let indexed = index_document(&uri, text);
        let symbols: Vec<Arc<Symbol>> = indexed.symbols.into_iter().map(Arc::new).collect();

        let mut state = self.state.write();
        state.remove(&uri);
        for symbol in &symbols {
            state
                .by_name
                .entry(symbol.name.clone())
                .or_default()
                .push(Arc::clone(symbol));
        }
        // Re-inserting an existing key keeps its scan-order slot
        state.by_document.insert(
            uri,
            DocumentEntry {
                symbols,
                imports: indexed.imports,
            },
        );
    }

    /// Drop a document and its contributions to the by-name map
    pub fn remove_document(&self, uri: &Url) -> bool {
        let mut state = self.state.write();
        let removed = state.remove(uri).is_some();
        state.by_document.shift_remove(uri);
        removed
    }

    /// All symbols with this name, across documents
    pub fn get_definition(&self, name: &str) -> Vec<Arc<Symbol>> {
        self.state.read().by_name.get(name).cloned().unwrap_or_default()
    }

    pub fn get_all_symbols(&self) -> Vec<Arc<Symbol>> {
        self.state
            .read()
            .by_document
            .values()
            .flat_map(|entry| entry.symbols.iter().cloned())
            .collect()
    }

    pub fn get_imports(&self, uri: &Url) -> Vec<ImportRecord> {
        self.state
            .read()
            .by_document
            .get(uri)
            .map(|entry| entry.imports.clone())
            .unwrap_or_default()
    }

    pub fn get_symbols_in(&self, uri: &Url) -> Vec<Arc<Symbol>> {
        self.state
            .read()
            .by_document
            .get(uri)
            .map(|entry| entry.symbols.clone())
            .unwrap_or_default()
    }

    pub fn get_known_documents(&self) -> Vec<Url> {
        self.state.read().by_document.keys().cloned().collect()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.state.read().by_document.contains_key(uri)
    }

    /// Consistent read view for one query; holds the read lock until dropped
    pub fn snapshot(&self) -> IndexSnapshot<'_> {
        IndexSnapshot {
            state: self.state.read(),
        }
    }

    /// Read a file from disk and index it
    pub fn index_file(&self, path: &Path) -> LarkResult<Url> {
        let uri = Url::from_file_path(path)
            .map_err(|_| LarkError::NotAFile(path.display().to_string()))?;
        let text = fs::read_to_string(path).map_err(|e| LarkError::io(path, e))?;
        self.update_document(uri.clone(), &text);
        Ok(uri)
    }

    /// Recursively index every source file under `root`, skipping excluded
    /// directories and any document `skip` rejects (e.g. open buffers).
    /// Unreadable entries are counted and otherwise ignored.
    pub fn scan_directory(
        &self,
        root: &Path,
        config: &AnalyzerConfig,
        skip: impl Fn(&Url) -> bool,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                let excluded = entry.depth() > 0
                    && entry.file_type().is_dir()
                    && entry.file_name().to_str().is_some_and(|name| config.is_excluded_dir(name));
                !excluded
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => {
                    report.skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !config.is_source_file(entry.path()) {
                continue;
            }
            if let Ok(uri) = Url::from_file_path(entry.path()) {
                if skip(&uri) {
                    continue;
                }
            }
            match self.index_file(entry.path()) {
                Ok(_) => report.indexed += 1,
                Err(_) => report.skipped += 1,
            }
        }

        report
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let state = self.state.read();
        let by_doc_count: usize = state.by_document.values().map(|e| e.symbols.len()).sum();
        let by_name_count: usize = state.by_name.values().map(|v| v.len()).sum();
        let every_named_is_owned = state.by_name.values().flatten().all(|s| {
            state
                .by_document
                .get(&s.document)
                .is_some_and(|e| e.symbols.iter().any(|o| Arc::ptr_eq(o, s)))
        });
        by_doc_count == by_name_count && every_named_is_owned
    }
}

/// Read view over the index, shared by diagnostics, completion and definition
pub struct IndexSnapshot<'a> {
    state: RwLockReadGuard<'a, IndexState>,
}

impl IndexSnapshot<'_> {
    pub fn documents(&self) -> impl Iterator<Item = &Url> {
        self.state.by_document.keys()
    }

    pub fn roots(&self) -> &[Url] {
        &self.state.roots
    }

    pub fn symbols_in(&self, uri: &Url) -> &[Arc<Symbol>] {
        self.state
            .by_document
            .get(uri)
            .map(|entry| entry.symbols.as_slice())
            .unwrap_or(&[])
    }

    pub fn imports(&self, uri: &Url) -> &[ImportRecord] {
        self.state
            .by_document
            .get(uri)
            .map(|entry| entry.imports.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_symbols(&self) -> impl Iterator<Item = &Arc<Symbol>> {
        self.state.by_document.values().flat_map(|entry| entry.symbols.iter())
    }

    pub fn resolve_module(&self, module_path: &str, config: &AnalyzerConfig) -> Option<&Url> {
        ModuleResolver::new(&config.extension).resolve(module_path, self.documents())
    }

    pub fn module_path_of(&self, uri: &Url, config: &AnalyzerConfig) -> String {
        ModuleResolver::new(&config.extension).module_path_of(uri, self.roots())
    }

    pub fn namespace_roots(&self, config: &AnalyzerConfig) -> FxHashSet<String> {
        ModuleResolver::new(&config.extension).namespace_roots(self.documents(), self.roots())
    }

    /// First non-field symbol named `name` in `uri`, public or not
    pub fn find_symbol(&self, uri: &Url, name: &str) -> Option<&Arc<Symbol>> {
        self.symbols_in(uri)
            .iter()
            .find(|s| s.name == name && s.kind != SymbolKind::Field)
    }

    /// First symbol named `name` in `uri` that other modules may import
    pub fn public_symbol(&self, uri: &Url, name: &str) -> Option<&Arc<Symbol>> {
        self.symbols_in(uri)
            .iter()
            .find(|s| s.name == name && s.is_importable())
    }
}
