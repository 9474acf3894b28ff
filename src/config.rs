// Analyzer Configuration
// Read from lark.json at the workspace root, overridable by LSP initializationOptions

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{LarkError, LarkResult};

/// Name of the project config file looked up at each workspace root
pub const CONFIG_FILE: &str = "lark.json";

/// Analyzer configuration (lark.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    /// Source file extension, without the dot
    pub extension: String,
    /// Directory names skipped by the workspace scan
    pub exclude_dirs: Vec<String>,
    /// Value of the `source` field on every diagnostic
    pub diagnostic_source: String,
    pub report_unused_imports: bool,
    pub report_undefined_symbols: bool,
    /// Extra names treated as built-ins (host functions, prelude types)
    pub builtins: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            extension: "lark".to_string(),
            exclude_dirs: [".git", ".hg", ".svn", "target", "build", "dist", "out", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            diagnostic_source: "lark".to_string(),
            report_unused_imports: true,
            report_undefined_symbols: true,
            builtins: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> LarkResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| LarkError::io(path, e))?;
        serde_json::from_str(&content).map_err(|source| LarkError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `lark.json` from a workspace root, defaults if there is none
    pub fn discover(root: &Path) -> LarkResult<Self> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay LSP initializationOptions on top of this config.
    /// Keys absent from `options` keep their current value.
    pub fn merge_options(&self, options: &serde_json::Value) -> LarkResult<Self> {
        let mut merged = serde_json::to_value(self).map_err(LarkError::InvalidOptions)?;
        if let (Some(target), Some(overrides)) = (merged.as_object_mut(), options.as_object()) {
            for (key, value) in overrides {
                target.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged).map_err(LarkError::InvalidOptions)
    }

    /// File suffix including the dot, e.g. ".lark"
    pub fn dotted_extension(&self) -> String {
        format!(".{}", self.extension.trim_start_matches('.'))
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e == self.extension.trim_start_matches('.'))
            .unwrap_or(false)
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.extension, "lark");
        assert_eq!(config.dotted_extension(), ".lark");
        assert!(config.is_excluded_dir(".git"));
        assert!(config.is_excluded_dir("target"));
        assert!(!config.is_excluded_dir("src"));
        assert!(config.report_unused_imports);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{ "extension": "lk", "reportUnusedImports": false }"#).unwrap();
        assert_eq!(config.extension, "lk");
        assert!(!config.report_unused_imports);
        assert!(config.report_undefined_symbols);
        assert_eq!(config.diagnostic_source, "lark");
    }

    #[test]
    fn test_merge_options() {
        let base = AnalyzerConfig::default();
        let merged = base
            .merge_options(&json!({ "builtins": ["host_log"], "diagnosticSource": "lark-ls" }))
            .unwrap();
        assert_eq!(merged.builtins, vec!["host_log".to_string()]);
        assert_eq!(merged.diagnostic_source, "lark-ls");
        assert_eq!(merged.extension, "lark");
    }

    #[test]
    fn test_merge_options_rejects_bad_types() {
        let base = AnalyzerConfig::default();
        assert!(base.merge_options(&json!({ "reportUnusedImports": "yes" })).is_err());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(AnalyzerConfig::discover(dir.path()).unwrap(), AnalyzerConfig::default());

        fs::write(dir.path().join(CONFIG_FILE), r#"{ "excludeDirs": ["vendor"] }"#).unwrap();
        let config = AnalyzerConfig::discover(dir.path()).unwrap();
        assert!(config.is_excluded_dir("vendor"));
        assert!(!config.is_excluded_dir(".git"));

        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(matches!(
            AnalyzerConfig::discover(dir.path()),
            Err(LarkError::Config { .. })
        ));
    }

    #[test]
    fn test_is_source_file() {
        let config = AnalyzerConfig::default();
        assert!(config.is_source_file(Path::new("a/b/main.lark")));
        assert!(!config.is_source_file(Path::new("a/b/main.rs")));
        assert!(!config.is_source_file(Path::new("Makefile")));
    }
}
