// Lark Language Server Protocol (LSP) Module
// Heuristic analysis core and the tower-lsp backend

mod analyzer;
mod backend;
mod completion;
mod definition;
mod hover;
mod import_resolver;
mod indexer;
mod lexer;
mod scope;
mod symbols;
mod workspace;

pub use analyzer::{analyze, BUILTIN_NAMES};
pub use backend::LarkLanguageServer;
pub use completion::complete;
pub use definition::{find_definition, Target};
pub use hover::hover;
pub use import_resolver::ModuleResolver;
pub use indexer::{extract_imports, index_document, DocumentIndex};
pub use lexer::{strip_comments, tokenize, Keyword, Token, TokenKind};
pub use scope::{Context, ContextMachine, IdentClass};
pub use symbols::{ImportRecord, ImportedName, LineIndex, Parameter, Symbol, SymbolKind};
pub use workspace::{IndexSnapshot, ScanReport, WorkspaceIndex};
