//! Error types for the stat document.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur on purely local document operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// A stat name must not be empty.
    #[error("stat name must not be empty")]
    EmptyName,

    /// The requested stat does not exist in the document.
    #[error("stat not found: {0}")]
    NotFound(String),
}
