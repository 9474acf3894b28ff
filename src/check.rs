// Batch Checking
// Runs the analyzer over files and directories outside an editor (used by `lark check`)

use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Url};

use crate::config::AnalyzerConfig;
use crate::error::{LarkError, LarkResult};
use crate::lsp::{analyze, WorkspaceIndex};

/// Diagnostics of one checked file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of checking a set of paths
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub files: Vec<FileReport>,
    /// Files found but not readable
    pub skipped: usize,
}

impl CheckReport {
    fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.files
            .iter()
            .flat_map(|f| &f.diagnostics)
            .filter(|d| d.severity == Some(severity))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.count(DiagnosticSeverity::ERROR)
    }

    pub fn warnings(&self) -> usize {
        self.count(DiagnosticSeverity::WARNING)
    }
}

/// Index every given file and directory, then analyze each indexed file.
/// Directories become workspace roots for module paths.
pub fn check_paths(paths: &[PathBuf], config: &AnalyzerConfig) -> LarkResult<CheckReport> {
    let index = WorkspaceIndex::new();
    let mut report = CheckReport::default();

    let roots: Vec<Url> = paths
        .iter()
        .filter(|p| p.is_dir())
        .filter_map(|p| p.canonicalize().ok())
        .filter_map(|p| Url::from_directory_path(p).ok())
        .collect();
    index.set_roots(roots);

    for path in paths {
        let path = path.canonicalize().map_err(|e| LarkError::io(path, e))?;
        if path.is_dir() {
            let scan = index.scan_directory(&path, config, |_| false);
            report.skipped += scan.skipped;
        } else {
            index.index_file(&path)?;
        }
    }

    for uri in index.get_known_documents() {
        let path = uri
            .to_file_path()
            .map_err(|_| LarkError::NotAFile(uri.to_string()))?;
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(_) => {
                report.skipped += 1;
                continue;
            }
        };
        let diagnostics = {
            let snapshot = index.snapshot();
            analyze(&uri, &source, &snapshot, config)
        };
        report.files.push(FileReport {
            path,
            source,
            diagnostics,
        });
    }

    report.files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(report)
}

/// Render a diagnostic with a source excerpt and a caret line, e.g.
///
/// ```text
/// error: Undefined symbol 'y' at main.lark:1:9
///
///    1 | let x = y + 1;
///                ^
/// ```
pub fn format_diagnostic(path: &Path, source: &str, diagnostic: &Diagnostic) -> String {
    let mut output = String::new();

    let line = diagnostic.range.start.line as usize + 1;
    let column = diagnostic.range.start.character as usize;
    let label = match diagnostic.severity {
        Some(DiagnosticSeverity::WARNING) => "warning".yellow().bold(),
        _ => "error".red().bold(),
    };
    output.push_str(&format!(
        "{}: {} at {}:{}:{}\n",
        label,
        diagnostic.message.white().bold(),
        path.display(),
        line,
        column + 1
    ));

    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return output;
    }

    output.push('\n');
    let first = line.saturating_sub(1).max(1);
    let last = (line + 1).min(lines.len());
    for number in first..=last {
        let content = lines[number - 1];
        let gutter = format!("{:>4} |", number);
        if number == line {
            output.push_str(&format!("{} {}\n", gutter.red(), content));
            let width = if diagnostic.range.end.line == diagnostic.range.start.line {
                (diagnostic.range.end.character as usize).saturating_sub(column).max(1)
            } else {
                1
            };
            let spaces = " ".repeat(7 + column);
            output.push_str(&format!("{}{}\n", spaces, "^".repeat(width).red().bold()));
        } else {
            output.push_str(&format!("{} {}\n", gutter.dimmed(), content));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position, Range};

    #[test]
    fn test_check_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("math")).unwrap();
        let ops = "pub fun add(int a, int b) { return a + b; }";
        fs::write(root.join("math/ops.lark"), ops).unwrap();
        fs::write(
            root.join("main.lark"),
            "import from math.ops { add }\n\
             import from missing { thing }\n\
             let x = add(1, 2) + ghost;",
        )
        .unwrap();

        let report = check_paths(&[root.to_path_buf()], &AnalyzerConfig::default()).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.errors(), 2);
        assert_eq!(report.warnings(), 0);

        let main = report.files.iter().find(|f| f.path.ends_with("main.lark")).unwrap();
        let messages: Vec<&str> = main.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Module 'missing' not found", "Undefined symbol 'ghost'"]);
    }

    #[test]
    fn test_check_missing_file_is_an_error() {
        let missing = [PathBuf::from("/no/such/file.lark")];
        let result = check_paths(&missing, &AnalyzerConfig::default());
        assert!(matches!(result, Err(LarkError::Io { .. })));
    }

    #[test]
    fn test_format_diagnostic_points_at_range() {
        colored::control::set_override(false);
        let source = "let a = 1;\nlet x = ghost + 1;\nlet b = 2;";
        let diagnostic = Diagnostic {
            range: Range::new(Position::new(1, 8), Position::new(1, 13)),
            severity: Some(DiagnosticSeverity::ERROR),
            message: "Undefined symbol 'ghost'".to_string(),
            ..Default::default()
        };
        let text = format_diagnostic(Path::new("main.lark"), source, &diagnostic);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "error: Undefined symbol 'ghost' at main.lark:2:9");
        assert_eq!(lines[2], "   1 | let a = 1;");
        assert_eq!(lines[3], "   2 | let x = ghost + 1;");
        assert_eq!(lines[4], format!("{}^^^^^", " ".repeat(15)));
        assert_eq!(lines[5], "   3 | let b = 2;");
    }
}
