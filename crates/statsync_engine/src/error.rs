//! Error types for the stats engine.

use statsync_core::DocumentError;
use thiserror::Error;

/// Result type for stats engine operations.
pub type StatsResult<T> = Result<T, StatsError>;

/// Errors that can occur in stats engine operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatsError {
    /// The caller passed an invalid argument (duplicate add, operation on
    /// an unknown user, empty stat name). Always synchronous, never
    /// retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested stat name is absent from the user's document.
    #[error("stat not found: {0}")]
    NotFound(String),

    /// The remote stats service failed.
    #[error("service error: {message}")]
    Service {
        /// Error message.
        message: String,
        /// Whether the failure is connectivity-related or transient.
        /// Connectivity failures trigger the offline-state transition and
        /// fallback logging; other failures leave local state untouched
        /// so a later retry can be attempted.
        connectivity: bool,
    },

    /// Document payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl StatsError {
    /// Creates a connectivity-class service error.
    pub fn service_connectivity(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            connectivity: true,
        }
    }

    /// Creates a non-connectivity (fatal or server-side) service error.
    pub fn service_fatal(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            connectivity: false,
        }
    }

    /// Returns true if this error should put the document into an offline
    /// state and route the payload to the offline fallback writer.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StatsError::Service {
                connectivity: true,
                ..
            }
        )
    }
}

impl From<DocumentError> for StatsError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::EmptyName => StatsError::InvalidArgument(err.to_string()),
            DocumentError::NotFound(name) => StatsError::NotFound(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_classification() {
        assert!(StatsError::service_connectivity("connection reset").is_connectivity());
        assert!(!StatsError::service_fatal("document too large").is_connectivity());
        assert!(!StatsError::InvalidArgument("bad".into()).is_connectivity());
        assert!(!StatsError::NotFound("score".into()).is_connectivity());
    }

    #[test]
    fn document_error_conversion() {
        let err: StatsError = DocumentError::EmptyName.into();
        assert!(matches!(err, StatsError::InvalidArgument(_)));

        let err: StatsError = DocumentError::NotFound("score".into()).into();
        assert_eq!(err, StatsError::NotFound("score".into()));
    }

    #[test]
    fn error_display() {
        let err = StatsError::service_connectivity("connection reset");
        assert_eq!(err.to_string(), "service error: connection reset");
    }
}
