//! Error types and result definitions for settings-tree operations.
//!
//! Every fallible call in this crate returns [`ConfigError`]. Engine faults
//! raised while loading or saving are classified by the translator in
//! [`crate::fault`] before they reach the caller; the remaining variants are
//! produced directly by lookup, codec and mutation code.

use thiserror::Error;

use crate::value::SettingType;

/// Errors surfaced by the settings tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Malformed source text during load.
    #[error("parse error at {file}:{line} - {message}")]
    ParseError {
        /// Name of the file (or pseudo-file) being parsed.
        file: String,
        /// 1-based line of the offending token.
        line: usize,
        /// Parser diagnostic.
        message: String,
    },

    /// Path resolution found no matching child at some segment.
    #[error("setting not found: {path}")]
    NotFound {
        /// Absolute path of the segment that failed to match.
        path: String,
    },

    /// Operation requires a type the setting does not have.
    #[error("type mismatch at '{path}': expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: SettingType,
    },

    /// A typed read would lose information under the stored width.
    #[error("value at '{path}' does not fit the requested type")]
    NarrowingError { path: String },

    /// A group already holds a member with this name.
    #[error("duplicate setting name '{name}' in '{path}'")]
    DuplicateName { path: String, name: String },

    /// An array element would not share the type of its siblings.
    #[error("array '{path}' cannot hold elements of differing types")]
    HeterogeneousArray { path: String },

    /// The children of a container changed while a cursor was walking them.
    #[error("children of '{path}' changed during iteration")]
    ConcurrentModification { path: String },

    /// Load/save I/O failure.
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// Uncategorized engine failure, message preserved verbatim.
    #[error("{message}")]
    NativeError { message: String },

    /// The path expression does not follow the path grammar.
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Missing or malformed member name, or a name given to an element.
    #[error("invalid setting name '{name}' in '{path}'")]
    InvalidName { path: String, name: String },

    /// The handle refers to a setting that has been removed.
    #[error("setting handle refers to a removed setting")]
    StaleHandle,
}

impl ConfigError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        ConfigError::NotFound { path: path.into() }
    }

    pub(crate) fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: SettingType,
    ) -> Self {
        ConfigError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub(crate) fn invalid_path(path: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidPath {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for settings-tree operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ConfigError::ParseError {
            file: "app.cfg".to_string(),
            line: 3,
            message: "expected value".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at app.cfg:3 - expected value");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = ConfigError::type_mismatch("server.port", "String", SettingType::Int32);
        assert_eq!(
            err.to_string(),
            "type mismatch at 'server.port': expected String, found Int32"
        );
    }
}
