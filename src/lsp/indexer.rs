// Symbol Indexer for Lark LSP
// Line-pattern extraction of declarations and import statements.
// No grammar: each line is matched against declaration patterns, struct bodies
// and selective imports are accumulated across lines until a closing brace.

use regex::Regex;
use std::sync::LazyLock;
use tower_lsp::lsp_types::Url;

use super::lexer::{is_keyword, strip_comments};
use super::symbols::{ImportRecord, ImportedName, LineIndex, Parameter, Symbol, SymbolKind};

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(&$re.replace("IDENT", IDENT)).expect("valid pattern"));
    };
}

pattern!(LET_RE, r"^\s*(pub\s+)?let\s+(IDENT)");
pattern!(CONST_TYPED_RE, r"^\s*(pub\s+)?const\s+(IDENT)\s+(IDENT)\s*=");
pattern!(CONST_RE, r"^\s*(pub\s+)?const\s+(IDENT)\s*(?::\s*([A-Za-z_][\w.]*)\s*)?=");
pattern!(STRUCT_RE, r"^\s*(pub\s+)?type\s+(IDENT)\s*=?\s*\{");
pattern!(TYPE_ALIAS_RE, r"^\s*(pub\s+)?type\s+(IDENT)\s*=\s*([^{;]+?)\s*(?:;|$)");
pattern!(FUN_RE, r"^\s*(pub\s+)?fun\s+(IDENT)\s*\(([^)]*)\)");
pattern!(
    EXTERN_RE,
    r#"^\s*(pub\s+)?extern(?:\s*\(\s*"[^"]*"\s*\))?\s+(?:fun\s+)?(IDENT)\s*\(([^)]*)\)"#
);
pattern!(CLASS_RE, r"^\s*(pub\s+)?class\s+(IDENT)(?:\s*\(([^)]*)\))?");
pattern!(ENUM_RE, r"^\s*(pub\s+)?enum\s+(IDENT)");
pattern!(BARE_DECL_RE, r"(?:\b(pub)\s+)?\b(IDENT)\s+(IDENT)\s*(?:=(?:[^=]|$)|;)");

pattern!(IMPORT_SELECTIVE_RE, r"^\s*(import)\s+from\s+(IDENT(?:\.IDENT)*)");
pattern!(IMPORT_WILDCARD_RE, r"^\s*(import)\s+(IDENT(?:\.IDENT)*)\.\*");
pattern!(IMPORT_ALIAS_RE, r"^\s*(import)\s+(IDENT(?:\.IDENT)*)\s+as\s+(IDENT)");
pattern!(IMPORT_BARE_RE, r"^\s*(import)\s+(IDENT(?:\.IDENT)*)");
pattern!(IMPORT_ITEM_RE, r"^\s*(IDENT)(?:\s+as\s+(IDENT))?\s*$");

/// One line of the stripped text with its absolute byte offset
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    text: &'a str,
}

/// Result of indexing one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentIndex {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportRecord>,
}

/// Extract declarations and imports from one document
pub fn index_document(document: &Url, text: &str) -> DocumentIndex {
    let stripped = mask_strings(&strip_comments(text));
    let mut indexer = Indexer::new(document, text, &stripped);
    indexer.run();
    DocumentIndex {
        symbols: indexer.symbols,
        imports: indexer.imports,
    }
}

/// Extract only the import records (used by the diagnostic engine on live text)
pub fn extract_imports(document: &Url, text: &str) -> Vec<ImportRecord> {
    index_document(document, text).imports
}

struct Indexer<'a> {
    document: &'a Url,
    stripped: &'a str,
    lines: Vec<Line<'a>>,
    positions: LineIndex<'a>,
    symbols: Vec<Symbol>,
    imports: Vec<ImportRecord>,
}

impl<'a> Indexer<'a> {
    fn new(document: &'a Url, original: &'a str, stripped: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for raw in stripped.split('\n') {
            lines.push(Line {
                start,
                text: raw.strip_suffix('\r').unwrap_or(raw),
            });
            start += raw.len() + 1;
        }
        Self {
            document,
            stripped,
            lines,
            positions: LineIndex::new(original),
            symbols: Vec::new(),
            imports: Vec::new(),
        }
    }

    fn run(&mut self) {
        let mut i = 0;
        while i < self.lines.len() {
            let line = self.lines[i];
            let is_import = line
                .text
                .trim_start()
                .strip_prefix("import")
                .is_some_and(|rest| rest.starts_with(char::is_whitespace));
            i = if is_import {
                self.scan_import(i)
            } else {
                self.scan_declarations(i)
            };
        }
    }

    /// Returns the index of the next line to scan
    fn scan_declarations(&mut self, i: usize) -> usize {
        let line = self.lines[i];
        let text = line.text;

        if let Some(caps) = STRUCT_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let brace = line.start + caps.get(0).map_or(text.len(), |m| m.end());
            let is_public = caps.get(1).is_some();
            let start = line.start + name.start();
            return self.scan_struct(i, is_public, name.as_str(), start, brace);
        }

        let mut matched_end = None;

        if let Some(caps) = TYPE_ALIAS_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let target = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            self.push(
                name.as_str(),
                SymbolKind::TypeAlias,
                line.start + name.start(),
                caps.get(1).is_some(),
                Some(format!("type {} = {}", name.as_str(), target)),
            );
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = EXTERN_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let params = parse_params(caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            let detail = format!("extern fun {}({})", name.as_str(), format_params(&params));
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            let kind = SymbolKind::ExternFunction;
            self.push_callable(name.as_str(), kind, start, is_public, params, detail);
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = FUN_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let params = parse_params(caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            let detail = format!("fun {}({})", name.as_str(), format_params(&params));
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            let kind = SymbolKind::Function;
            self.push_callable(name.as_str(), kind, start, is_public, params, detail);
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = CLASS_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            match caps.get(3) {
                Some(list) => {
                    let params = parse_params(list.as_str());
                    let detail = format!("class {}({})", name.as_str(), format_params(&params));
                    let kind = SymbolKind::Class;
                    self.push_callable(name.as_str(), kind, start, is_public, params, detail);
                }
                None => {
                    let detail = Some(format!("class {}", name.as_str()));
                    self.push(name.as_str(), SymbolKind::Class, start, is_public, detail);
                }
            }
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = ENUM_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let detail = Some(format!("enum {}", name.as_str()));
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            self.push(name.as_str(), SymbolKind::Enum, start, is_public, detail);
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = CONST_TYPED_RE.captures(text) {
            let (Some(type_name), Some(name)) = (caps.get(2), caps.get(3)) else {
                return i + 1;
            };
            let detail = Some(format!("const {} {}", type_name.as_str(), name.as_str()));
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            self.push(name.as_str(), SymbolKind::Constant, start, is_public, detail);
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = CONST_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let detail = Some(match caps.get(3) {
                Some(ty) => format!("const {}: {}", name.as_str(), ty.as_str()),
                None => format!("const {}", name.as_str()),
            });
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            self.push(name.as_str(), SymbolKind::Constant, start, is_public, detail);
            matched_end = caps.get(0).map(|m| m.end());
        } else if let Some(caps) = LET_RE.captures(text) {
            let Some(name) = caps.get(2) else {
                return i + 1;
            };
            let detail = Some(format!("let {}", name.as_str()));
            let start = line.start + name.start();
            let is_public = caps.get(1).is_some();
            self.push(name.as_str(), SymbolKind::Variable, start, is_public, detail);
            matched_end = caps.get(0).map(|m| m.end());
        }

        // `Type name = ...` declarations on whatever the line has left
        let rest_start = matched_end.unwrap_or(0);
        self.scan_bare_declarations(line.start + rest_start, &text[rest_start..]);
        i + 1
    }

    fn scan_bare_declarations(&mut self, offset: usize, text: &str) {
        for caps in BARE_DECL_RE.captures_iter(text) {
            let (Some(type_name), Some(name)) = (caps.get(2), caps.get(3)) else {
                continue;
            };
            if is_keyword(type_name.as_str()) || is_keyword(name.as_str()) {
                continue;
            }
            // `a.b c = ...` is not a declaration of `c`
            if text[..type_name.start()].ends_with('.') {
                continue;
            }
            let detail = Some(format!("{} {}", type_name.as_str(), name.as_str()));
            let is_public = caps.get(1).is_some();
            let start = offset + name.start();
            self.push(name.as_str(), SymbolKind::Variable, start, is_public, detail);
        }
    }

    /// Struct body: accumulate lines until one holds `}` (no brace balancing)
    fn scan_struct(
        &mut self,
        i: usize,
        is_public: bool,
        name: &str,
        name_offset: usize,
        body_start: usize,
    ) -> usize {
        let (body_end, last_line) = self.find_closing_brace(i, body_start);
        let body = &self.stripped[body_start..body_end];

        let mut fields = Vec::new();
        let mut field_symbols = Vec::new();
        let mut seg_start = body_start;
        for segment in body.split([',', ';', '\n']) {
            let field = segment.split(':').next().unwrap_or("");
            let trimmed = field.trim();
            if is_identifier(trimmed) {
                let offset = seg_start + (field.len() - field.trim_start().len());
                fields.push(trimmed.to_string());
                field_symbols.push((trimmed.to_string(), offset));
            }
            seg_start += segment.len() + 1;
        }

        let symbol = Symbol {
            name: name.to_string(),
            kind: SymbolKind::Struct,
            document: self.document.clone(),
            range: self.positions.range(name_offset, name_offset + name.len()),
            is_public,
            detail: Some(format!("type {} {{ {} }}", name, fields.join(", "))),
            fields: Some(fields),
            params: None,
        };
        self.symbols.push(symbol);

        for (field, offset) in field_symbols {
            let detail = Some(format!("{}.{}", name, field));
            self.push(&field, SymbolKind::Field, offset, false, detail);
        }
        last_line + 1
    }

    /// Returns the index of the next line to scan
    fn scan_import(&mut self, i: usize) -> usize {
        let line = self.lines[i];
        let text = line.text;

        if let Some(caps) = IMPORT_SELECTIVE_RE.captures(text) {
            return self.scan_selective_import(i, &caps);
        }

        let record = if let Some(caps) = IMPORT_WILDCARD_RE.captures(text) {
            let Some(path) = caps.get(2) else {
                return i + 1;
            };
            let end = statement_end(text, caps.get(0).map_or(text.len(), |m| m.end()));
            Some(self.import_record(line.start, &caps, path, None, true, line.start + end))
        } else if let Some(caps) = IMPORT_ALIAS_RE.captures(text) {
            let (Some(path), Some(alias)) = (caps.get(2), caps.get(3)) else {
                return i + 1;
            };
            let end = statement_end(text, caps.get(0).map_or(text.len(), |m| m.end()));
            let end = line.start + end;
            let mut record =
                self.import_record(line.start, &caps, path, Some(alias.as_str()), false, end);
            let alias_start = line.start + alias.start();
            record.local_range = Some(self.positions.range(alias_start, line.start + alias.end()));
            Some(record)
        } else if let Some(caps) = IMPORT_BARE_RE.captures(text) {
            let Some(path) = caps.get(2) else {
                return i + 1;
            };
            if path.as_str() == "from" {
                None
            } else {
                let end = statement_end(text, caps.get(0).map_or(text.len(), |m| m.end()));
                let end = line.start + end;
                let mut record = self.import_record(line.start, &caps, path, None, false, end);
                let last = path.as_str().rsplit('.').next().unwrap_or(path.as_str());
                let last_start = line.start + path.end() - last.len();
                let path_end = line.start + path.end();
                record.local_range = Some(self.positions.range(last_start, path_end));
                Some(record)
            }
        } else {
            None
        };

        if let Some(record) = record {
            self.imports.push(record);
        }
        i + 1
    }

    fn import_record(
        &self,
        line_start: usize,
        caps: &regex::Captures<'_>,
        path: regex::Match<'_>,
        alias: Option<&str>,
        wildcard: bool,
        end: usize,
    ) -> ImportRecord {
        let keyword_start = caps.get(1).map_or(path.start(), |m| m.start());
        ImportRecord {
            module_path: path.as_str().to_string(),
            alias: alias.map(str::to_string),
            wildcard,
            names: Vec::new(),
            selective: false,
            range: self.positions.range(line_start + keyword_start, end),
            path_range: self.positions.range(line_start + path.start(), line_start + path.end()),
            local_range: None,
        }
    }

    /// `import from M { a, b as c }`, possibly spread over several lines
    fn scan_selective_import(&mut self, i: usize, caps: &regex::Captures<'_>) -> usize {
        let line = self.lines[i];
        let (Some(keyword), Some(path)) = (caps.get(1), caps.get(2)) else {
            return i + 1;
        };
        let after_path = line.start + path.end();

        // Half-typed `import from M` with no list: stay on this line
        if !self.opens_import_list(i, path.end()) {
            let end = line.start + statement_end(line.text, path.end());
            self.imports.push(ImportRecord {
                module_path: path.as_str().to_string(),
                alias: None,
                wildcard: false,
                names: Vec::new(),
                selective: true,
                range: self.positions.range(line.start + keyword.start(), end),
                path_range: self.positions.range(line.start + path.start(), after_path),
                local_range: None,
            });
            return i + 1;
        }

        let (brace_end, last_line) = self.find_closing_brace(i, after_path);
        let region = &self.stripped[after_path..brace_end];

        let mut names = Vec::new();
        if let Some(open) = region.find('{') {
            let items_start = after_path + open + 1;
            let mut seg_start = items_start;
            for segment in self.stripped[items_start..brace_end].split(',') {
                let item = IMPORT_ITEM_RE.captures(segment);
                if let Some((item, name)) = item.as_ref().and_then(|c| Some((c, c.get(1)?))) {
                    let name_range =
                        self.positions.range(seg_start + name.start(), seg_start + name.end());
                    let (alias, local_range) = match item.get(2) {
                        Some(alias) => {
                            let start = seg_start + alias.start();
                            let range = self.positions.range(start, seg_start + alias.end());
                            (Some(alias.as_str().to_string()), range)
                        }
                        None => (None, name_range),
                    };
                    names.push(ImportedName {
                        name: name.as_str().to_string(),
                        alias,
                        range: name_range,
                        local_range,
                    });
                }
                seg_start += segment.len() + 1;
            }
        }

        let closing_line = self.lines[last_line];
        let end = if brace_end < self.stripped.len() {
            let within = brace_end - closing_line.start;
            closing_line.start + statement_end(closing_line.text, within + 1)
        } else {
            brace_end
        };

        self.imports.push(ImportRecord {
            module_path: path.as_str().to_string(),
            alias: None,
            wildcard: false,
            names,
            selective: true,
            range: self.positions.range(line.start + keyword.start(), end),
            path_range: self.positions.range(line.start + path.start(), after_path),
            local_range: None,
        });
        last_line + 1
    }

    /// A `{` follows the path on line `i`, or starts the next non-blank line
    fn opens_import_list(&self, i: usize, path_end: usize) -> bool {
        if self.lines[i].text[path_end..].contains('{') {
            return true;
        }
        self.lines[i + 1..]
            .iter()
            .map(|line| line.text.trim_start())
            .find(|text| !text.is_empty())
            .is_some_and(|text| text.starts_with('{'))
    }

    /// Offset of the first `}` at or after `from`, scanning line by line starting at line `i`.
    /// Unterminated bodies run to the end of the text.
    fn find_closing_brace(&self, i: usize, from: usize) -> (usize, usize) {
        for (j, line) in self.lines.iter().enumerate().skip(i) {
            let line_end = line.start + line.text.len();
            let search_from = from.max(line.start);
            if search_from > line_end {
                continue;
            }
            if let Some(pos) = self.stripped[search_from..line_end].find('}') {
                return (search_from + pos, j);
            }
        }
        (self.stripped.len(), self.lines.len().saturating_sub(1))
    }

    fn push(
        &mut self,
        name: &str,
        kind: SymbolKind,
        offset: usize,
        is_public: bool,
        detail: Option<String>,
    ) {
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            document: self.document.clone(),
            range: self.positions.range(offset, offset + name.len()),
            is_public,
            fields: None,
            params: None,
            detail,
        });
    }

    fn push_callable(
        &mut self,
        name: &str,
        kind: SymbolKind,
        offset: usize,
        is_public: bool,
        params: Vec<Parameter>,
        detail: String,
    ) {
        self.push(name, kind, offset, is_public, Some(detail));
        if let Some(symbol) = self.symbols.last_mut() {
            symbol.params = Some(params);
        }
    }
}

/// `int a, string b` -> [(a, int), (b, string)]; entries without two tokens are skipped
fn parse_params(list: &str) -> Vec<Parameter> {
    list.split(',')
        .filter_map(|param| {
            let mut parts = param.split_whitespace();
            let type_name = parts.next()?;
            let name = parts.next()?;
            Some(Parameter {
                name: name.to_string(),
                type_name: type_name.to_string(),
            })
        })
        .collect()
}

fn format_params(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| format!("{} {}", p.type_name, p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// End of a statement on its line: just past a `;` if one follows `from`, else `from`
fn statement_end(line: &str, from: usize) -> usize {
    let from = from.min(line.len());
    let rest = &line[from..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with(';') {
        from + (rest.len() - trimmed.len()) + 1
    } else {
        from
    }
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_keyword(word)
}

/// Blank out string literal contents (quotes kept) so patterns never match inside them
fn mask_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == '\n' {
                    quote = None;
                    out.push(c);
                } else if escaped {
                    escaped = false;
                    push_blank(&mut out, c);
                } else if c == '\\' {
                    escaped = true;
                    push_blank(&mut out, c);
                } else if c == q {
                    quote = None;
                    out.push(c);
                } else {
                    push_blank(&mut out, c);
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// One space per byte, so offsets stay aligned with the original text
fn push_blank(out: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position, Range};

    fn doc() -> Url {
        Url::parse("file:///ws/main.lark").unwrap()
    }

    fn index(text: &str) -> DocumentIndex {
        index_document(&doc(), text)
    }

    fn names(idx: &DocumentIndex) -> Vec<(&str, SymbolKind, bool)> {
        idx.symbols.iter().map(|s| (s.name.as_str(), s.kind, s.is_public)).collect()
    }

    #[test]
    fn test_let_is_private_variable() {
        let idx = index("let x = 5;");
        assert_eq!(names(&idx), vec![("x", SymbolKind::Variable, false)]);
        assert_eq!(idx.symbols[0].range, Range::new(Position::new(0, 4), Position::new(0, 5)));
    }

    #[test]
    fn test_public_function_with_params() {
        let idx = index("pub fun add(int a, int b) { return a + b; }");
        assert_eq!(names(&idx), vec![("add", SymbolKind::Function, true)]);
        let params = idx.symbols[0].params.as_ref().unwrap();
        assert_eq!(
            params,
            &vec![
                Parameter { name: "a".into(), type_name: "int".into() },
                Parameter { name: "b".into(), type_name: "int".into() },
            ]
        );
        assert_eq!(idx.symbols[0].detail.as_deref(), Some("fun add(int a, int b)"));
    }

    #[test]
    fn test_constants() {
        let idx = index("const LIMIT = 10;\npub const int MAX = 99;\nconst RATE: float = 0.5;");
        assert_eq!(
            names(&idx),
            vec![
                ("LIMIT", SymbolKind::Constant, false),
                ("MAX", SymbolKind::Constant, true),
                ("RATE", SymbolKind::Constant, false),
            ]
        );
    }

    #[test]
    fn test_type_alias_and_enum() {
        let idx = index("pub type Meters = int;\nenum Color = { Red, Green };");
        assert_eq!(
            names(&idx),
            vec![("Meters", SymbolKind::TypeAlias, true), ("Color", SymbolKind::Enum, false)]
        );
    }

    #[test]
    fn test_multiline_struct() {
        let text = "pub type Point = {\n    x: int,\n    y: int\n}\nlet origin = 0;";
        let idx = index(text);
        assert_eq!(
            names(&idx),
            vec![
                ("Point", SymbolKind::Struct, true),
                ("x", SymbolKind::Field, false),
                ("y", SymbolKind::Field, false),
                ("origin", SymbolKind::Variable, false),
            ]
        );
        assert_eq!(idx.symbols[0].fields, Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(idx.symbols[1].range.start, Position::new(1, 4));
        assert_eq!(idx.symbols[2].range.start, Position::new(2, 4));
    }

    #[test]
    fn test_single_line_struct() {
        let idx = index("type Pair { first: int, second: int };");
        assert_eq!(idx.symbols[0].kind, SymbolKind::Struct);
        assert_eq!(idx.symbols[0].fields.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_extern_and_class() {
        let idx = index(
            "pub extern(\"C\") fun puts(string s) -> int;\n\
             extern fun abs(int n);\n\
             class Counter(int start) {\n}\n\
             class Empty {}",
        );
        assert_eq!(
            names(&idx),
            vec![
                ("puts", SymbolKind::ExternFunction, true),
                ("abs", SymbolKind::ExternFunction, false),
                ("Counter", SymbolKind::Class, false),
                ("Empty", SymbolKind::Class, false),
            ]
        );
        assert_eq!(idx.symbols[2].params.as_ref().unwrap()[0].name, "start");
        assert!(idx.symbols[3].params.is_none());
    }

    #[test]
    fn test_bare_type_name_declarations() {
        let text = "fun main() {\n    int count = 0;\n    string label;\n    \
                    count = count + 1;\n    return count;\n}";
        let idx = index(text);
        assert_eq!(
            names(&idx),
            vec![
                ("main", SymbolKind::Function, false),
                ("count", SymbolKind::Variable, false),
                ("label", SymbolKind::Variable, false),
            ]
        );
    }

    #[test]
    fn test_no_declarations_from_strings_or_comments() {
        let idx = index("print(\"hello world = 1\"); // int hidden = 2;\n/* let gone = 3; */");
        assert!(idx.symbols.is_empty());
    }

    #[test]
    fn test_import_forms() {
        let text = "import io;\n\
                    import math.vector as vec;\n\
                    import util.*;\n\
                    import from mathlib { sqrt, pow as power };";
        let idx = index(text);
        assert_eq!(idx.imports.len(), 4);

        let bare = &idx.imports[0];
        assert_eq!(bare.module_path, "io");
        assert_eq!(bare.local_name(), Some("io"));
        assert_eq!(bare.path_range, Range::new(Position::new(0, 7), Position::new(0, 9)));
        assert_eq!(bare.range, Range::new(Position::new(0, 0), Position::new(0, 10)));

        let aliased = &idx.imports[1];
        assert_eq!(aliased.module_path, "math.vector");
        assert_eq!(aliased.alias.as_deref(), Some("vec"));
        let alias_range = Range::new(Position::new(1, 22), Position::new(1, 25));
        assert_eq!(aliased.local_range, Some(alias_range));

        let wildcard = &idx.imports[2];
        assert!(wildcard.wildcard);
        assert_eq!(wildcard.module_path, "util");

        let selective = &idx.imports[3];
        assert!(selective.selective);
        assert_eq!(selective.module_path, "mathlib");
        let locals: Vec<&str> = selective.names.iter().map(|n| n.local_name()).collect();
        assert_eq!(locals, vec!["sqrt", "power"]);
        assert_eq!(selective.names[1].name, "pow");
        assert_eq!(selective.names[1].local_range.start, Position::new(3, 35));
        assert!(idx.symbols.is_empty());
    }

    #[test]
    fn test_multiline_selective_import() {
        let text = "import from geometry.shapes {\n    Circle,\n    Square as Box\n}\nlet x = 1;";
        let idx = index(text);
        assert_eq!(idx.imports.len(), 1);
        let import = &idx.imports[0];
        assert_eq!(import.module_path, "geometry.shapes");
        assert_eq!(import.names.len(), 2);
        assert_eq!(import.names[0].range.start, Position::new(1, 4));
        assert_eq!(import.names[1].local_range.start, Position::new(2, 14));
        assert_eq!(import.range.end, Position::new(3, 1));
        assert_eq!(names(&idx), vec![("x", SymbolKind::Variable, false)]);
    }

    #[test]
    fn test_half_typed_selective_import_keeps_later_declarations() {
        let text = "import from ma\npub fun sqrt(float x) {\n    return x;\n}\npub fun cube() {}";
        let idx = index(text);
        let declared: Vec<&str> = idx.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(declared, vec!["sqrt", "cube"]);
        assert_eq!(idx.imports.len(), 1);
        let import = &idx.imports[0];
        assert!(import.selective);
        assert_eq!(import.module_path, "ma");
        assert!(import.names.is_empty());
        assert_eq!(import.range, Range::new(Position::new(0, 0), Position::new(0, 14)));

        let braced_below = index("import from geo\n\n{ Circle }\nlet y = 2;");
        assert_eq!(braced_below.imports[0].names.len(), 1);
        assert_eq!(names(&braced_below), vec![("y", SymbolKind::Variable, false)]);
    }

    #[test]
    fn test_unterminated_struct_is_best_effort() {
        let idx = index("type Broken = {\n  a: int,\n  b: int");
        assert_eq!(idx.symbols[0].fields, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_idempotent() {
        let text = "pub fun f(int a) {}\nimport from m { f }";
        assert_eq!(index(text), index(text));
    }
}
