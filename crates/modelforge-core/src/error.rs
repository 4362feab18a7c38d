//! Unified error handling for modelforge
//!
//! This module provides a comprehensive error type that encompasses
//! all possible errors across the modelforge crates.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all modelforge operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Format Errors ====================
    /// File does not start with the expected magic/container id
    #[error("Invalid magic: expected {expected}, found {found}")]
    InvalidMagic {
        /// What the format requires at the start of the file
        expected: String,
        /// What was actually read
        found: String,
    },

    /// Unsupported format version
    #[error("Unsupported version: {version} (supported: {supported})")]
    UnsupportedVersion {
        /// Version declared by the file
        version: String,
        /// Versions this implementation accepts
        supported: String,
    },

    /// Recognized format, but an encoding variant this implementation rejects
    #[error("Unsupported encoding: {encoding}")]
    UnsupportedEncoding {
        /// The declared encoding
        encoding: String,
    },

    /// Unexpected end of file
    #[error("Unexpected end of file at offset {offset}")]
    UnexpectedEof {
        /// Byte offset at which input ran out
        offset: u64,
    },

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Human-readable description
        message: String,
    },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField {
        /// The field name
        field: String,
    },

    // ==================== Reference Errors ====================
    /// A named part, mesh, or material could not be resolved
    #[error("Unresolved reference: {reference}")]
    UnresolvedReference {
        /// The name that failed to resolve
        reference: String,
    },

    /// A preprocessing instruction addressed a target that does not exist
    #[error("Instruction {instruction}: cannot resolve target '{target}'")]
    UnresolvedTarget {
        /// Zero-based index of the instruction in its program
        instruction: usize,
        /// The identifier that failed to resolve
        target: String,
    },

    /// A preprocessing instruction was used with an illegal target class
    #[error("Instruction {instruction}: {message}")]
    InvalidInstruction {
        /// Zero-based index of the instruction in its program
        instruction: usize,
        /// What was wrong
        message: String,
    },

    // ==================== Configuration Errors ====================
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable description
        message: String,
    },

    /// File extension does not map to any supported format
    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(PathBuf),

    // ==================== General Errors ====================
    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable description
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        /// Context description
        context: String,
        /// The wrapped error
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Error::MissingField {
            field: field.into(),
        }
    }

    /// Check if this is a "not found" type error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound(_)
                | Error::UnresolvedReference { .. }
                | Error::UnresolvedTarget { .. }
        )
    }

    /// Check if this is a parse/format error
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidMagic { .. }
                | Error::UnsupportedVersion { .. }
                | Error::UnsupportedEncoding { .. }
                | Error::UnexpectedEof { .. }
                | Error::InvalidData { .. }
                | Error::MissingField { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::FileNotFound(PathBuf::from("/test"));
        let contextualized = err.with_context("while loading model");

        assert!(contextualized.to_string().contains("while loading model"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::FileNotFound(PathBuf::from("/test")).is_not_found());
        assert!(Error::UnresolvedReference {
            reference: "brick".into()
        }
        .is_not_found());
        assert!(!Error::internal("oops").is_not_found());
    }

    #[test]
    fn test_is_parse_error() {
        assert!(Error::InvalidMagic {
            expected: "0x4D4D".into(),
            found: "0x0000".into(),
        }
        .is_parse_error());

        assert!(!Error::FileNotFound(PathBuf::from("/test")).is_parse_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::FileNotFound(PathBuf::from("/test")));
        let with_context = result.context("loading data");

        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("loading data"));
    }
}
