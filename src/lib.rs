// Lark Language Tooling
// Heuristic static analysis for Lark sources: symbol index, import graph,
// scope-aware diagnostics, completion and go-to-definition

pub mod check;
pub mod config;
pub mod error;
pub mod lsp;
