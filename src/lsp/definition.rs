// Definition Resolver for Lark LSP
// Cursor position to declaration: module paths, local names, imports, qualified access

use tower_lsp::lsp_types::{Location, Position, Url};

use super::indexer::index_document;
use super::lexer::is_ident_char;
use super::symbols::{document_start, range_contains, ImportRecord, LineIndex, Symbol, SymbolKind};
use super::workspace::IndexSnapshot;
use crate::config::AnalyzerConfig;

/// What a position refers to
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A whole module; navigation lands on the start of its document
    Module { uri: Url, module_path: String },
    Symbol(Symbol),
    /// The import statement that binds a module name locally
    Import { uri: Url, import: ImportRecord },
}

impl Target {
    pub fn location(&self) -> Location {
        match self {
            Target::Module { uri, .. } => Location::new(uri.clone(), document_start()),
            Target::Symbol(symbol) => Location::new(symbol.document.clone(), symbol.range),
            Target::Import { uri, import } => Location::new(uri.clone(), import.range),
        }
    }
}

/// Byte range of the identifier touching `offset`, if any
pub fn word_at(text: &str, offset: usize) -> Option<(usize, usize)> {
    let offset = offset.min(text.len());
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());
    (start < end).then_some((start, end))
}

/// Dotted chain right before a `.` that ends at `dot`, e.g. `math.vector` in `math.vector.dot`
fn qualifier_before(text: &str, dot: usize) -> &str {
    let start = text[..dot]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c) || *c == '.')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(dot);
    text[start..dot].trim_matches('.')
}

pub fn find_definition(
    uri: &Url,
    text: &str,
    position: Position,
    snapshot: &IndexSnapshot<'_>,
    config: &AnalyzerConfig,
) -> Option<Location> {
    resolve_target(uri, text, position, snapshot, config).map(|target| target.location())
}

/// Resolution order: module path under the cursor, then the bare word, then `X.word`
pub fn resolve_target(
    uri: &Url,
    text: &str,
    position: Position,
    snapshot: &IndexSnapshot<'_>,
    config: &AnalyzerConfig,
) -> Option<Target> {
    let local = index_document(uri, text);

    for import in &local.imports {
        if range_contains(&import.path_range, position) {
            let target = snapshot.resolve_module(&import.module_path, config)?;
            return Some(Target::Module {
                uri: target.clone(),
                module_path: import.module_path.clone(),
            });
        }
    }

    let offset = LineIndex::new(text).offset(position)?;
    let (start, end) = word_at(text, offset)?;
    let word = &text[start..end];

    if start > 0 && text[..start].ends_with('.') && !text[..start].ends_with("..") {
        let qualifier = qualifier_before(text, start - 1);
        return resolve_qualified(qualifier, word, &local.imports, snapshot, config);
    }

    let mut named = local.symbols.iter().filter(|s| s.name == word);
    let first = named.next();
    let non_field = first
        .into_iter()
        .chain(named)
        .find(|s| s.kind != SymbolKind::Field);
    if let Some(symbol) = non_field.or(first) {
        return Some(Target::Symbol(symbol.clone()));
    }

    for import in local.imports.iter().filter(|i| i.selective) {
        let Some(item) = import.names.iter().find(|n| n.local_name() == word) else {
            continue;
        };
        let found = snapshot
            .resolve_module(&import.module_path, config)
            .and_then(|target| snapshot.find_symbol(target, &item.name));
        if let Some(symbol) = found {
            return Some(Target::Symbol(Symbol::clone(symbol)));
        }
    }

    for import in local.imports.iter().filter(|i| i.wildcard) {
        let found = snapshot
            .resolve_module(&import.module_path, config)
            .and_then(|target| snapshot.public_symbol(target, word));
        if let Some(symbol) = found {
            return Some(Target::Symbol(Symbol::clone(symbol)));
        }
    }

    local
        .imports
        .iter()
        .find(|import| import.local_name() == Some(word))
        .map(|import| Target::Import {
            uri: uri.clone(),
            import: import.clone(),
        })
}

/// `X.word` where `X` names an import (alias, full path or last segment),
/// or is itself a known module path reached through its namespace root
fn resolve_qualified(
    qualifier: &str,
    word: &str,
    imports: &[ImportRecord],
    snapshot: &IndexSnapshot<'_>,
    config: &AnalyzerConfig,
) -> Option<Target> {
    if qualifier.is_empty() {
        return None;
    }
    let module_path = imports
        .iter()
        .filter(|import| !import.selective)
        .find(|import| {
            import.alias.as_deref() == Some(qualifier)
                || import.module_path == qualifier
                || import.last_segment() == qualifier
        })
        .map(|import| import.module_path.as_str())
        .unwrap_or(qualifier);

    let target = snapshot.resolve_module(module_path, config)?;
    snapshot
        .public_symbol(target, word)
        .map(|symbol| Target::Symbol(Symbol::clone(symbol)))
}
