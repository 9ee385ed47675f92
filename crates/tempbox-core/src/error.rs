//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No resource can be created for the chosen provider or domain.
    ///
    /// Recoverable by choosing another provider.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Transient network or upstream failure. Recoverable by retrying.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The referenced resource or message no longer exists upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entry with the same id is already present in a collection.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The active resource has already expired and is awaiting replacement.
    #[error("Resource expired: {0}")]
    Expired(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the upstream reported the target as gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RequestFailed(_))
    }

    /// Returns true for the collection uniqueness rejection.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEntry(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::NotFound("r1".into()).is_not_found());
        assert!(Error::RequestFailed("timeout".into()).is_retryable());
        assert!(!Error::ProviderUnavailable("mailtm".into()).is_retryable());
        assert!(Error::DuplicateEntry("r1".into()).is_duplicate());
    }

    #[test]
    fn test_display() {
        let err = Error::ProviderUnavailable("no domains for mailgw".into());
        assert_eq!(err.to_string(), "Provider unavailable: no domains for mailgw");
    }
}
