//! Error types for the HTTP gateway.

/// Result type alias for gateway requests.
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP gateway error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail from the response body.
        detail: String,
    },

    /// The base URL cannot carry API paths.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// A response was well-formed JSON but missing required data.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Returns the HTTP status for status errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Maps a failed creation request, where a client error naming missing
    /// domains or an unavailable provider means the provider cannot serve it.
    #[must_use]
    pub fn into_create_error(self) -> tempbox_core::Error {
        if let Self::Status { detail, .. } = &self {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("no domains") || lower.contains("unavailable") {
                return tempbox_core::Error::ProviderUnavailable(detail.clone());
            }
        }
        self.into()
    }
}

impl From<Error> for tempbox_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Status {
                status: 404,
                detail,
            } => Self::NotFound(detail),
            Error::Status {
                status: 503,
                detail,
            } => Self::ProviderUnavailable(detail),
            Error::InvalidBaseUrl(_) | Error::Url(_) => Self::Config(error.to_string()),
            other => Self::RequestFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(error: Error) -> tempbox_core::Error {
        error.into()
    }

    fn status(status: u16, detail: &str) -> Error {
        Error::Status {
            status,
            detail: detail.to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            core(status(404, "Email not found")),
            tempbox_core::Error::NotFound(_)
        ));
        assert!(matches!(
            core(status(503, "Mail.tm unavailable")),
            tempbox_core::Error::ProviderUnavailable(_)
        ));
        assert!(matches!(
            core(status(500, "boom")),
            tempbox_core::Error::RequestFailed(_)
        ));
        assert!(matches!(
            core(Error::InvalidBaseUrl("mailto:x".into())),
            tempbox_core::Error::Config(_)
        ));
    }

    #[test]
    fn test_create_error_mapping() {
        assert!(matches!(
            status(400, "No domains available from Mail.tm").into_create_error(),
            tempbox_core::Error::ProviderUnavailable(_)
        ));
        assert!(matches!(
            status(429, "Rate limit: wait 30 seconds").into_create_error(),
            tempbox_core::Error::RequestFailed(_)
        ));
        assert_eq!(status(429, "slow down").status(), Some(429));
    }
}
