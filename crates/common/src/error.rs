//! Error types for Cirrus

use thiserror::Error;

/// Result type alias using Cirrus Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the remote management API and shared plumbing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("Resource already exists: {kind} with id {id}")]
    AlreadyExists { kind: String, id: String },

    #[error("ConflictException: {0}")]
    Conflict(String),

    #[error("ValidationException: {0}")]
    Validation(String),

    #[error("ThrottlingException: {0}")]
    Throttling(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// A conflict whose message mentions `needle`.
    pub fn is_conflict_containing(&self, needle: &str) -> bool {
        matches!(self, Error::Conflict(msg) if msg.contains(needle))
    }

    /// A validation failure whose message mentions `needle`.
    pub fn is_validation_containing(&self, needle: &str) -> bool {
        matches!(self, Error::Validation(msg) if msg.contains(needle))
    }

    /// Throttling and transport failures are worth another attempt
    /// regardless of which call produced them.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Throttling(_) | Error::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_matching() {
        let err = Error::Conflict(
            "There is an operation running on the workgroup. Try deleting the workgroup again later."
                .to_string(),
        );
        assert!(err.is_conflict_containing("operation running"));
        assert!(!err.is_conflict_containing("snapshot"));
        assert!(!err.is_validation_containing("operation running"));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("workgroup", "analytics");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Resource not found: workgroup with id analytics"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Throttling("slow down".into()).is_transient());
        assert!(Error::Transport("reset".into()).is_transient());
        assert!(!Error::Validation("bad".into()).is_transient());
    }
}
