// Lark CLI - Command Line Interface
// Usage: lark check [PATHS]... [--config FILE]

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use lark_core::check::{check_paths, format_diagnostic};
use lark_core::config::AnalyzerConfig;
use lark_core::error::LarkResult;
use tower_lsp::lsp_types::DiagnosticSeverity;

/// Lark - static checks for Lark sources
#[derive(Parser)]
#[command(name = "lark")]
#[command(author = "starssxproject")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Static checks for Lark sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report unresolved imports, unused imports and undefined symbols
    Check {
        /// Files or directories to check (default: current directory)
        paths: Vec<PathBuf>,

        /// Config file to use instead of lark.json in the first directory
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,

        /// Only print errors
        #[arg(short = 'q', long = "quiet")]
        quiet: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check { paths, config, quiet } => handle_check(paths, config.as_deref(), quiet),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns Ok(false) when any error was reported
fn handle_check(paths: Vec<PathBuf>, config_path: Option<&Path>, quiet: bool) -> LarkResult<bool> {
    let paths = if paths.is_empty() { vec![PathBuf::from(".")] } else { paths };

    let config = match config_path {
        Some(path) => AnalyzerConfig::load(path)?,
        None => {
            let root = paths
                .iter()
                .find(|p| p.is_dir())
                .cloned()
                .unwrap_or_else(|| PathBuf::from("."));
            AnalyzerConfig::discover(&root)?
        }
    };

    let report = check_paths(&paths, &config)?;

    for file in &report.files {
        for diagnostic in &file.diagnostics {
            let is_warning = diagnostic.severity == Some(DiagnosticSeverity::WARNING);
            if quiet && is_warning {
                continue;
            }
            eprintln!("{}", format_diagnostic(&file.path, &file.source, diagnostic));
        }
    }

    if report.skipped > 0 {
        eprintln!("{} Skipped {} unreadable file(s)", "!".yellow(), report.skipped);
    }

    let errors = report.errors();
    let warnings = report.warnings();
    if errors == 0 && warnings == 0 {
        println!("{} No problems found in {} file(s)", "✓".green(), report.files.len());
    } else if errors == 0 {
        println!("{} {} warning(s) in {} file(s)", "!".yellow(), warnings, report.files.len());
    } else {
        println!(
            "{} {} error(s), {} warning(s) in {} file(s)",
            "✗".red(),
            errors,
            warnings,
            report.files.len()
        );
    }

    Ok(errors == 0)
}
