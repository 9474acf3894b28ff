// Completion Provider for Lark LSP
// Local declarations, cross-module public symbols with auto-import edits, and keywords

use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Position, Range, TextEdit, Url};

use super::indexer::extract_imports;
use super::lexer::{is_ident_char, strip_comments, KEYWORDS};
use super::symbols::{LineIndex, SymbolKind};
use super::workspace::IndexSnapshot;
use crate::config::AnalyzerConfig;

/// Declarations re-derived from the text alone, independent of the index
static LOCAL_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let ident = r"[A-Za-z_][A-Za-z0-9_]*";
    let pattern = format!(r"\b(let|const|type|enum|class|fun)\s+({ident})(?:\s+({ident})\s*=)?");
    Regex::new(&pattern).expect("valid pattern")
});

/// Get keyword completions
pub fn get_keyword_completions() -> Vec<CompletionItem> {
    KEYWORDS
        .iter()
        .map(|(name, _, doc)| CompletionItem {
            label: name.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some(doc.to_string()),
            ..Default::default()
        })
        .collect()
}

/// Trailing identifier part of the last whitespace-separated chunk
pub fn completion_prefix(line_before_cursor: &str) -> &str {
    let chunk = line_before_cursor
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("");
    let start = chunk
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(chunk.len());
    &chunk[start..]
}

fn matches_prefix(name: &str, prefix: &str) -> bool {
    name.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// (name, kind) of every declaration in `text`, in source order
pub fn local_declarations(text: &str) -> Vec<(String, SymbolKind)> {
    let stripped = strip_comments(text);
    LOCAL_DECL_RE
        .captures_iter(&stripped)
        .filter_map(|caps| {
            let keyword = caps.get(1)?.as_str();
            let first = caps.get(2)?;
            let (name, kind) = match keyword {
                "let" => (first, SymbolKind::Variable),
                // `const int MAX = ...` names the second word
                "const" => (caps.get(3).unwrap_or(first), SymbolKind::Constant),
                "type" => {
                    let rest = stripped[first.end()..].trim_start();
                    let rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
                    let kind = if rest.starts_with('{') {
                        SymbolKind::Struct
                    } else {
                        SymbolKind::TypeAlias
                    };
                    (first, kind)
                }
                "enum" => (first, SymbolKind::Enum),
                "class" => (first, SymbolKind::Class),
                _ => (first, SymbolKind::Function),
            };
            Some((name.as_str().to_string(), kind))
        })
        .collect()
}

/// Completion items at `position` in `text`
pub fn complete(
    uri: &Url,
    text: &str,
    position: Position,
    snapshot: &IndexSnapshot<'_>,
    config: &AnalyzerConfig,
) -> Vec<CompletionItem> {
    let positions = LineIndex::new(text);
    let cursor = positions.offset(position).unwrap_or(text.len());
    let line_start = text[..cursor].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = completion_prefix(&text[line_start..cursor]);

    let mut items = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    // 1. Declarations in this document
    let locals = local_declarations(text);
    for (name, kind) in &locals {
        if matches_prefix(name, prefix) && seen.insert(name.clone()) {
            items.push(CompletionItem {
                label: name.clone(),
                kind: Some(kind.to_completion_kind()),
                detail: Some(kind.label().to_string()),
                ..Default::default()
            });
        }
    }

    // 2. Public symbols elsewhere that still need an import
    let imports = extract_imports(uri, text);
    let mut visible: FxHashSet<&str> = locals.iter().map(|(name, _)| name.as_str()).collect();
    for import in &imports {
        visible.extend(import.local_name());
        visible.extend(import.names.iter().map(|n| n.local_name()));
    }
    let wildcard_targets: Vec<&Url> = imports
        .iter()
        .filter(|import| import.wildcard)
        .filter_map(|import| snapshot.resolve_module(&import.module_path, config))
        .collect();

    for symbol in snapshot.all_symbols() {
        if symbol.document == *uri
            || !symbol.is_importable()
            || !matches_prefix(&symbol.name, prefix)
        {
            continue;
        }
        if visible.contains(symbol.name.as_str()) || wildcard_targets.contains(&&symbol.document) {
            continue;
        }
        if !seen.insert(symbol.name.clone()) {
            continue;
        }
        let module = snapshot.module_path_of(&symbol.document, config);
        items.push(CompletionItem {
            label: symbol.name.clone(),
            kind: Some(symbol.kind.to_completion_kind()),
            detail: Some(format!("{} (from {})", symbol.signature(), module)),
            additional_text_edits: Some(vec![TextEdit {
                range: Range::new(Position::new(0, 0), Position::new(0, 0)),
                new_text: format!("import from {} {{ {} }};\n", module, symbol.name),
            }]),
            ..Default::default()
        });
    }

    // 3. Keywords
    for item in get_keyword_completions() {
        if matches_prefix(&item.label, prefix) && seen.insert(item.label.clone()) {
            items.push(item);
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::workspace::WorkspaceIndex;

    fn url(path: &str) -> Url {
        Url::parse(&format!("file:///ws/{}", path)).unwrap()
    }

    fn complete_at_end(files: &[(&str, &str)], main: &str) -> Vec<CompletionItem> {
        let index = WorkspaceIndex::new();
        index.set_roots(vec![Url::parse("file:///ws/").unwrap()]);
        for (path, text) in files {
            index.update_document(url(path), text);
        }
        let main_uri = url("main.lark");
        index.update_document(main_uri.clone(), main);

        let lines: Vec<&str> = main.split('\n').collect();
        let last = lines.last().copied().unwrap_or("");
        let position = Position::new((lines.len() - 1) as u32, last.chars().count() as u32);
        let snapshot = index.snapshot();
        complete(&main_uri, main, position, &snapshot, &AnalyzerConfig::default())
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    const VECTOR: (&str, &str) =
        ("math/vector.lark", "pub fun dot(int a, int b) {}\nfun hidden() {}");

    #[test]
    fn test_prefix_extraction() {
        assert_eq!(completion_prefix("let x = vec.no"), "no");
        assert_eq!(completion_prefix("    print(ba"), "ba");
        assert_eq!(completion_prefix("let x = "), "");
        assert_eq!(completion_prefix("co"), "co");
    }

    #[test]
    fn test_local_declarations() {
        let text = "let count = 1;\n\
                    const int MAX = 2;\n\
                    type P = { x: int }\n\
                    type M = int;\n\
                    // fun ghost() {}\n\
                    fun compute() {}";
        let decls = local_declarations(text);
        assert_eq!(
            decls,
            vec![
                ("count".to_string(), SymbolKind::Variable),
                ("MAX".to_string(), SymbolKind::Constant),
                ("P".to_string(), SymbolKind::Struct),
                ("M".to_string(), SymbolKind::TypeAlias),
                ("compute".to_string(), SymbolKind::Function),
            ]
        );
    }

    #[test]
    fn test_locals_then_keywords() {
        let items = complete_at_end(&[], "let count = 1;\nfun compute() {}\nCO");
        let labels = labels(&items);
        assert_eq!(&labels[..2], &["count", "compute"]);
        assert!(labels.contains(&"const"));
        assert!(labels.contains(&"continue"));
        assert!(!labels.contains(&"let"));
    }

    #[test]
    fn test_cross_module_auto_import() {
        let items = complete_at_end(&[VECTOR], "let x = d");
        let dot = items.iter().find(|i| i.label == "dot").expect("dot proposed");
        assert_eq!(dot.detail.as_deref(), Some("fun dot(int a, int b) (from math.vector)"));
        let edits = dot.additional_text_edits.as_ref().unwrap();
        assert_eq!(edits[0].range.start, Position::new(0, 0));
        assert_eq!(edits[0].new_text, "import from math.vector { dot };\n");
        assert!(items.iter().all(|i| i.label != "hidden"));
    }

    #[test]
    fn test_no_edit_when_already_visible() {
        for main in [
            "import from math.vector { dot }\nlet x = d",
            "import math.vector.*;\nlet x = d",
            "let dot = 1;\nlet x = d",
        ] {
            let items = complete_at_end(&[VECTOR], main);
            assert!(
                items
                    .iter()
                    .filter(|i| i.label == "dot")
                    .all(|i| i.additional_text_edits.is_none()),
                "{}",
                main
            );
        }
    }

    #[test]
    fn test_labels_are_unique() {
        let other = ("other.lark", "pub fun dot() {}");
        let items = complete_at_end(&[VECTOR, other], "let x = d");
        assert_eq!(items.iter().filter(|i| i.label == "dot").count(), 1);
    }
}
