// Lark Error Handling Module
// Errors for the fallible edges: config loading, file reading, URL conversion.
// The analysis core itself never fails.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Lark tooling
#[derive(Debug, Error)]
pub enum LarkError {
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid initialization options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("'{0}' is not a file path")]
    NotAFile(String),
}

impl LarkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LarkError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type LarkResult<T> = Result<T, LarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = LarkError::io(
            "/tmp/missing.lark",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.lark"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_not_a_file() {
        let err = LarkError::NotAFile("untitled:1".to_string());
        assert_eq!(err.to_string(), "'untitled:1' is not a file path");
    }
}
