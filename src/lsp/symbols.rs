// Symbol Model for Lark LSP
// Declarations, import records and offset/position conversion

use tower_lsp::lsp_types::{Position, Range, Url};

/// Symbol kind for LSP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Constant,
    TypeAlias,
    Struct,
    Function,
    ExternFunction,
    Class,
    Field,
    Enum,
}

impl SymbolKind {
    pub fn to_lsp(&self) -> tower_lsp::lsp_types::SymbolKind {
        match self {
            SymbolKind::Variable => tower_lsp::lsp_types::SymbolKind::VARIABLE,
            SymbolKind::Constant => tower_lsp::lsp_types::SymbolKind::CONSTANT,
            SymbolKind::TypeAlias => tower_lsp::lsp_types::SymbolKind::TYPE_PARAMETER,
            SymbolKind::Struct => tower_lsp::lsp_types::SymbolKind::STRUCT,
            SymbolKind::Function => tower_lsp::lsp_types::SymbolKind::FUNCTION,
            SymbolKind::ExternFunction => tower_lsp::lsp_types::SymbolKind::FUNCTION,
            SymbolKind::Class => tower_lsp::lsp_types::SymbolKind::CLASS,
            SymbolKind::Field => tower_lsp::lsp_types::SymbolKind::FIELD,
            SymbolKind::Enum => tower_lsp::lsp_types::SymbolKind::ENUM,
        }
    }

    pub fn to_completion_kind(&self) -> tower_lsp::lsp_types::CompletionItemKind {
        match self {
            SymbolKind::Variable => tower_lsp::lsp_types::CompletionItemKind::VARIABLE,
            SymbolKind::Constant => tower_lsp::lsp_types::CompletionItemKind::CONSTANT,
            SymbolKind::TypeAlias => tower_lsp::lsp_types::CompletionItemKind::TYPE_PARAMETER,
            SymbolKind::Struct => tower_lsp::lsp_types::CompletionItemKind::STRUCT,
            SymbolKind::Function => tower_lsp::lsp_types::CompletionItemKind::FUNCTION,
            SymbolKind::ExternFunction => tower_lsp::lsp_types::CompletionItemKind::FUNCTION,
            SymbolKind::Class => tower_lsp::lsp_types::CompletionItemKind::CLASS,
            SymbolKind::Field => tower_lsp::lsp_types::CompletionItemKind::FIELD,
            SymbolKind::Enum => tower_lsp::lsp_types::CompletionItemKind::ENUM,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::TypeAlias => "type alias",
            SymbolKind::Struct => "struct",
            SymbolKind::Function => "function",
            SymbolKind::ExternFunction => "extern function",
            SymbolKind::Class => "class",
            SymbolKind::Field => "field",
            SymbolKind::Enum => "enum",
        }
    }
}

/// A declared parameter: `int a` gives name `a`, type `int`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub document: Url,
    /// Range of the name token
    pub range: Range,
    pub is_public: bool,
    /// Field names, for struct types
    pub fields: Option<Vec<String>>,
    /// Parameters, for functions, extern functions and classes with a constructor list
    pub params: Option<Vec<Parameter>>,
    pub detail: Option<String>,
}

impl Symbol {
    /// Anything that can be named from another module (fields cannot)
    pub fn is_importable(&self) -> bool {
        self.is_public && self.kind != SymbolKind::Field
    }

    /// Source-like signature used by completion and hover
    pub fn signature(&self) -> String {
        if let Some(detail) = &self.detail {
            return detail.clone();
        }
        format!("{} {}", self.kind.label(), self.name)
    }
}

/// One name of a selective import: `sqrt` or `pow as power`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
    /// Where the original name is spelled
    pub range: Range,
    /// Where the local (post-alias) name is spelled
    pub local_range: Range,
}

impl ImportedName {
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An import statement in one of its four forms
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    /// Dotted module path, e.g. `math.vector`
    pub module_path: String,
    pub alias: Option<String>,
    pub wildcard: bool,
    /// Non-empty only for `import from M { ... }`
    pub names: Vec<ImportedName>,
    pub selective: bool,
    /// The whole statement
    pub range: Range,
    pub path_range: Range,
    /// Where the local module name (alias or last segment) is spelled,
    /// for bare and aliased imports
    pub local_range: Option<Range>,
}

impl ImportRecord {
    pub fn last_segment(&self) -> &str {
        self.module_path.rsplit('.').next().unwrap_or(&self.module_path)
    }

    /// The name this import binds in the importing document, for bare and aliased imports
    pub fn local_name(&self) -> Option<&str> {
        if self.wildcard || self.selective {
            return None;
        }
        Some(self.alias.as_deref().unwrap_or_else(|| self.last_segment()))
    }
}

/// Byte offset to LSP position conversion for one text
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }

    /// Columns are counted in chars; offsets past the end clamp to the end
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        Position {
            line: line as u32,
            character: column as u32,
        }
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        Range {
            start: self.position(start),
            end: self.position(end),
        }
    }

    /// Byte offset of a position, clamped to the end of its line
    pub fn offset(&self, position: Position) -> Option<usize> {
        let start = *self.line_starts.get(position.line as usize)?;
        let end = self
            .line_starts
            .get(position.line as usize + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        let column = line
            .char_indices()
            .nth(position.character as usize)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        Some(start + column)
    }
}

/// Zero-length range at the start of a document, used for module-level navigation
pub fn document_start() -> Range {
    Range::default()
}

/// True if `position` lies within `range`. The end is inclusive, so a cursor
/// right after a name still hits it.
pub fn range_contains(range: &Range, position: Position) -> bool {
    let at = (position.line, position.character);
    let after_start = at >= (range.start.line, range.start.character);
    let before_end = at <= (range.end.line, range.end.character);
    after_start && before_end
}
