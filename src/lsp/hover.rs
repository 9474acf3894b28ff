// Hover Provider for Lark LSP
// Keyword docs, built-ins, and whatever the definition resolver finds

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Url};

use super::analyzer::BUILTIN_NAMES;
use super::definition::{resolve_target, word_at, Target};
use super::lexer::KEYWORDS;
use super::symbols::LineIndex;
use super::workspace::IndexSnapshot;
use crate::config::AnalyzerConfig;

fn markdown(value: String) -> HoverContents {
    HoverContents::Markup(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

pub fn hover(
    uri: &Url,
    text: &str,
    position: Position,
    snapshot: &IndexSnapshot<'_>,
    config: &AnalyzerConfig,
) -> Option<Hover> {
    let positions = LineIndex::new(text);
    let offset = positions.offset(position)?;
    let (start, end) = word_at(text, offset)?;
    let word = &text[start..end];
    let range = Some(positions.range(start, end));

    if let Some((_, _, doc)) = KEYWORDS.iter().find(|(spelling, _, _)| *spelling == word) {
        return Some(Hover {
            contents: markdown(format!("**{}** (keyword)\n\n{}", word, doc)),
            range,
        });
    }

    let value = match resolve_target(uri, text, position, snapshot, config) {
        Some(Target::Symbol(symbol)) => {
            let visibility = if symbol.is_public { "public" } else { "private" };
            let module = snapshot.module_path_of(&symbol.document, config);
            format!(
                "**{}** ({})\n\n```lark\n{}\n```\n\n{} in `{}`",
                symbol.name,
                symbol.kind.label(),
                symbol.signature(),
                visibility,
                module
            )
        }
        Some(Target::Module { module_path, .. }) => format!("**module** `{}`", module_path),
        Some(Target::Import { import, .. }) => match &import.alias {
            Some(alias) => format!("**import** `{}` as `{}`", import.module_path, alias),
            None => format!("**import** `{}`", import.module_path),
        },
        None if BUILTIN_NAMES.contains(&word) || config.builtins.iter().any(|b| b == word) => {
            format!("**{}** (built-in)", word)
        }
        None => return None,
    };

    Some(Hover {
        contents: markdown(value),
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::workspace::WorkspaceIndex;

    fn hover_text(main: &str, line: u32, character: u32) -> Option<String> {
        let index = WorkspaceIndex::new();
        index.set_roots(vec![Url::parse("file:///ws/").unwrap()]);
        let lib = Url::parse("file:///ws/geo/shapes.lark").unwrap();
        index.update_document(lib, "pub fun area(float r) {}");
        let main_uri = Url::parse("file:///ws/main.lark").unwrap();
        index.update_document(main_uri.clone(), main);
        let snapshot = index.snapshot();
        let position = Position::new(line, character);
        let hover = hover(&main_uri, main, position, &snapshot, &AnalyzerConfig::default())?;
        match hover.contents {
            HoverContents::Markup(content) => Some(content.value),
            _ => None,
        }
    }

    #[test]
    fn test_keyword_hover() {
        let text = hover_text("return 1;", 0, 2).unwrap();
        assert!(text.starts_with("**return** (keyword)"));
    }

    #[test]
    fn test_imported_symbol_hover() {
        let text = hover_text("import from geo.shapes { area }\nlet a = area(1.0);", 1, 9).unwrap();
        assert!(text.contains("**area** (function)"));
        assert!(text.contains("fun area(float r)"));
        assert!(text.contains("public in `geo.shapes`"));
    }

    #[test]
    fn test_local_and_module_hover() {
        let local = hover_text("let count = 1;\nlet b = count;", 1, 9).unwrap();
        assert!(local.contains("private in `main`"));

        let module = hover_text("import geo.shapes;", 0, 9).unwrap();
        assert_eq!(module, "**module** `geo.shapes`");
    }

    #[test]
    fn test_builtin_and_unknown() {
        assert_eq!(hover_text("print(1);", 0, 1).as_deref(), Some("**print** (built-in)"));
        assert!(hover_text("nothing(1);", 0, 1).is_none());
    }
}
