// Diagnostic Engine for Lark LSP
// Validates imports, flags unused imports and undefined symbols with a scope-aware token walk

use rustc_hash::FxHashSet;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range, Url};

use super::indexer::index_document;
use super::lexer::{find_whole_words, strip_comments, tokenize, Token, TokenKind};
use super::scope::{ContextMachine, Event, IdentClass, IdentSite, Prev, ScopeStack};
use super::symbols::{ImportRecord, LineIndex, Symbol, SymbolKind};
use super::workspace::IndexSnapshot;
use crate::config::AnalyzerConfig;

/// Names every document can use without declaring them
pub const BUILTIN_NAMES: &[&str] = &[
    "int", "float", "string", "bool", "char", "byte", "void", "any", "print", "println", "len",
    "panic", "assert",
];

/// A local import name still waiting to be seen in the text
struct ImportCandidate {
    name: String,
    range: Range,
}

/// Analyze one document against the current index
pub fn analyze(
    uri: &Url,
    text: &str,
    snapshot: &IndexSnapshot<'_>,
    config: &AnalyzerConfig,
) -> Vec<Diagnostic> {
    DiagnosticEngine::new(uri, text, snapshot, config).run()
}

struct DiagnosticEngine<'a, 's> {
    uri: &'a Url,
    text: &'a str,
    stripped: String,
    positions: LineIndex<'a>,
    snapshot: &'a IndexSnapshot<'s>,
    config: &'a AnalyzerConfig,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, 's> DiagnosticEngine<'a, 's> {
    fn new(
        uri: &'a Url,
        text: &'a str,
        snapshot: &'a IndexSnapshot<'s>,
        config: &'a AnalyzerConfig,
    ) -> Self {
        Self {
            uri,
            text,
            stripped: strip_comments(text),
            positions: LineIndex::new(text),
            snapshot,
            config,
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Diagnostic> {
        // The live text, not the index, is the source of truth for this document
        let local = index_document(self.uri, self.text);

        let candidates = self.check_imports(&local.imports);
        if self.config.report_unused_imports {
            self.check_unused(&candidates);
        }

        if self.config.report_undefined_symbols {
            let mut global: FxHashSet<String> =
                BUILTIN_NAMES.iter().map(|s| s.to_string()).collect();
            global.extend(self.config.builtins.iter().cloned());
            global.extend(self.top_level_names(&local.symbols));
            for import in &local.imports {
                global.extend(import.local_name().map(str::to_string));
                global.extend(import.names.iter().map(|n| n.local_name().to_string()));
            }
            global.extend(self.snapshot.namespace_roots(self.config));

            let wildcard = self.wildcard_exports(&local.imports);
            self.check_usages(global, &wildcard);
        }

        self.diagnostics
    }

    /// Declarations outside every brace block; block locals are left to the scope walk
    fn top_level_names(&self, symbols: &[Symbol]) -> Vec<String> {
        let tokens = tokenize(&self.stripped);
        let depths = brace_depths(&tokens);
        symbols
            .iter()
            .filter(|s| s.kind != SymbolKind::Field)
            .filter(|s| {
                self.positions
                    .offset(s.range.start)
                    .is_some_and(|offset| depth_at(&depths, offset) == 0)
            })
            .map(|s| s.name.clone())
            .collect()
    }

    fn report(&mut self, range: Range, severity: DiagnosticSeverity, message: String) {
        self.diagnostics.push(Diagnostic {
            range,
            severity: Some(severity),
            source: Some(self.config.diagnostic_source.clone()),
            message,
            ..Default::default()
        });
    }

    /// Resolve every import; returns the local names to check for use
    fn check_imports(&mut self, imports: &[ImportRecord]) -> Vec<ImportCandidate> {
        let snapshot = self.snapshot;
        let mut candidates = Vec::new();

        for import in imports {
            let Some(target) = snapshot.resolve_module(&import.module_path, self.config) else {
                self.report(
                    import.path_range,
                    DiagnosticSeverity::ERROR,
                    format!("Module '{}' not found", import.module_path),
                );
                continue;
            };

            if import.selective {
                for item in &import.names {
                    match snapshot.find_symbol(target, &item.name) {
                        None => self.report(
                            item.range,
                            DiagnosticSeverity::ERROR,
                            format!(
                                "Symbol '{}' not found in module '{}'",
                                item.name, import.module_path
                            ),
                        ),
                        Some(symbol) if !symbol.is_public => self.report(
                            item.range,
                            DiagnosticSeverity::ERROR,
                            format!(
                                "Symbol '{}' is not public in module '{}'",
                                item.name, import.module_path
                            ),
                        ),
                        Some(_) => {}
                    }
                    candidates.push(ImportCandidate {
                        name: item.local_name().to_string(),
                        range: item.local_range,
                    });
                }
            } else if let (Some(name), Some(range)) = (import.local_name(), import.local_range) {
                candidates.push(ImportCandidate {
                    name: name.to_string(),
                    range,
                });
            }
        }

        candidates
    }

    /// Whole-word counting: the import itself is the only occurrence
    fn check_unused(&mut self, candidates: &[ImportCandidate]) {
        for candidate in candidates {
            let occurrences = find_whole_words(&self.stripped, &candidate.name).count();
            if occurrences == 1 {
                self.report(
                    candidate.range,
                    DiagnosticSeverity::WARNING,
                    format!("Unused import '{}'", candidate.name),
                );
            }
        }
    }

    /// Public names of every module pulled in with `import M.*`
    fn wildcard_exports(&self, imports: &[ImportRecord]) -> FxHashSet<String> {
        imports
            .iter()
            .filter(|import| import.wildcard)
            .filter_map(|import| self.snapshot.resolve_module(&import.module_path, self.config))
            .flat_map(|target| self.snapshot.symbols_in(target))
            .filter(|symbol| symbol.is_importable())
            .map(|symbol| symbol.name.clone())
            .collect()
    }

    fn check_usages(&mut self, global: FxHashSet<String>, wildcard: &FxHashSet<String>) {
        let stripped = std::mem::take(&mut self.stripped);
        let tokens = tokenize(&stripped);
        let mut machine = ContextMachine::new();
        let mut scopes = ScopeStack::new(global);

        for (i, token) in tokens.iter().enumerate() {
            let prev_token = i.checked_sub(1).map(|j| &tokens[j]);
            let prev = Prev::of(prev_token);

            if token.kind != TokenKind::Identifier {
                if let Some(event) = Event::of(token, prev) {
                    scopes.apply(machine.step(event));
                }
                continue;
            }

            let site = IdentSite {
                prev,
                after_dot: is_member_access(&tokens, i),
                next_is_colon: tokens.get(i + 1).is_some_and(|t| t.is_punct(':')),
            };
            match machine.classify(site) {
                IdentClass::Declaration | IdentClass::ExternName => scopes.declare(token.text),
                IdentClass::Parameter => machine.buffer_param(token.text),
                IdentClass::Usage => {
                    if !scopes.resolves(token.text) && !wildcard.contains(token.text) {
                        let range = self.positions.range(token.start, token.end);
                        self.report(
                            range,
                            DiagnosticSeverity::ERROR,
                            format!("Undefined symbol '{}'", token.text),
                        );
                    }
                }
                IdentClass::Member
                | IdentClass::NonSemantic
                | IdentClass::TypeRef
                | IdentClass::Label => {}
            }
        }

        self.stripped = stripped;
    }
}

/// Offset of every `{` and `}` token with the nesting depth just after it
fn brace_depths(tokens: &[Token<'_>]) -> Vec<(usize, usize)> {
    let mut depth = 0usize;
    tokens
        .iter()
        .filter_map(|token| match token.kind {
            TokenKind::Punct('{') => {
                depth += 1;
                Some((token.start, depth))
            }
            TokenKind::Punct('}') => {
                depth = depth.saturating_sub(1);
                Some((token.start, depth))
            }
            _ => None,
        })
        .collect()
}

fn depth_at(depths: &[(usize, usize)], offset: usize) -> usize {
    let before = depths.partition_point(|(start, _)| *start < offset);
    before.checked_sub(1).map_or(0, |j| depths[j].1)
}

/// `a.b` is member access; `...rest` is not
fn is_member_access(tokens: &[Token<'_>], i: usize) -> bool {
    let dot = i.checked_sub(1).and_then(|j| tokens.get(j));
    if !dot.is_some_and(|t| t.is_punct('.')) {
        return false;
    }
    let before = i.checked_sub(2).and_then(|j| tokens.get(j));
    !before.is_some_and(|t| t.is_punct('.'))
}
