//! Client error types.

use std::sync::Arc;

use thiserror::Error;

/// Client error type.
///
/// Cloneable so that a single refresh failure can be handed to every request
/// that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Transport-level failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    /// Server returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The `message` field of the JSON error body, or `HTTP <status>`.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request that owned an in-flight refresh was dropped before the
    /// refresh finished.
    #[error("token refresh was abandoned before completing")]
    RefreshAborted,

    /// A refresh completed after the local session had already been cleared.
    #[error("session ended while the token was being refreshed")]
    SessionEnded,

    /// The operation needs a stored access token and there is none.
    #[error("not signed in")]
    NotAuthenticated,
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(Arc::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(Arc::new(e))
    }
}

impl Error {
    /// HTTP status carried by this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the server answered 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }

    /// Check if this error means the local session is gone.
    pub fn is_session_lost(&self) -> bool {
        matches!(
            self,
            Error::SessionEnded | Error::NotAuthenticated | Error::RefreshAborted
        )
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            Error::Http(_) => "Unable to reach the server".to_string(),
            Error::SessionEnded | Error::NotAuthenticated => {
                "Your session has ended. Please sign in again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the server. Every field is optional.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> Error {
        Error::Api {
            status,
            message: format!("HTTP {}", status),
        }
    }

    #[test]
    fn test_status_helpers() {
        assert!(api(401).is_unauthorized());
        assert!(!api(403).is_unauthorized());
        assert!(api(404).is_not_found());
        assert!(api(503).is_server_error());
        assert!(!api(499).is_server_error());
        assert_eq!(Error::RefreshAborted.status(), None);
    }

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = Error::Api {
            status: 400,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(Error::SessionEnded.user_message().contains("sign in"));
    }

    #[test]
    fn test_error_response_tolerates_missing_message() {
        let body: ErrorResponse = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert!(body.message.is_none());

        let body: ErrorResponse = serde_json::from_str(r#"{"message":"Email already used"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("Email already used"));
    }

    #[test]
    fn test_error_is_clone() {
        let err = Error::SessionEnded;
        let copy = err.clone();
        assert!(copy.is_session_lost());
    }
}
