//! Error types for the client library.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Problem details returned by the backend on failure.
///
/// The backend answers errors with an RFC 7807 body; only the human-readable
/// parts are kept for logging.
#[derive(Debug, Deserialize)]
pub struct ProblemDetails {
    /// Short summary of the problem.
    #[serde(default)]
    pub title: Option<String>,
    /// Longer explanation, when the backend provides one.
    #[serde(default)]
    pub detail: Option<String>,
}

impl ProblemDetails {
    /// Joins title and detail into one line, if either is present.
    #[must_use]
    pub fn message(self) -> Option<String> {
        match (self.title, self.detail) {
            (Some(title), Some(detail)) => Some(format!("{title}: {detail}")),
            (Some(text), None) | (None, Some(text)) => Some(text),
            (None, None) => None,
        }
    }
}

/// Errors that can occur when talking to the chat backend.
///
/// Stream-level problems with individual events (malformed JSON, unexpected
/// shapes) are not errors: those events are dropped and logged so the reply
/// keeps streaming.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    ///
    /// Indicates issues like DNS resolution, connection failures, a body that
    /// broke off mid-stream, or socket errors.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error.
    ///
    /// Errors surfaced by the retry middleware wrapping generation requests.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// JSON serialization error while encoding a request body.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Client configuration issue.
    ///
    /// Invalid base URL, endpoint path or timeout.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimitError {
        /// Suggested wait time before retrying, if the backend sent one.
        retry_after: Option<Duration>,
    },

    /// Backend unavailable (5xx).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other non-success status.
    #[error("Request failed with status {status}: {message}")]
    RequestError {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Unexpected response that could not be used at all.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Check if this error is potentially retryable.
    ///
    /// Returns `true` for network errors, rate limits and service unavailable errors.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::MiddlewareError(_)
                | Self::RateLimitError { .. }
                | Self::ServiceUnavailable(_)
        )
    }

    /// Check if this is a rate limit error.
    pub const fn is_rate_limit_error(&self) -> bool {
        matches!(self, Self::RateLimitError { .. })
    }

    /// Get the retry-after duration if this is a rate limit error.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitError { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Maps a non-success status and its body text to an error.
    #[must_use]
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => Self::RateLimitError { retry_after },
            500..=599 => Self::ServiceUnavailable(message),
            _ => Self::RequestError { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from_status(429, String::new(), Some(Duration::from_secs(3))),
            ClientError::RateLimitError { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));
        assert!(matches!(
            ClientError::from_status(503, "down".to_string(), None),
            ClientError::ServiceUnavailable(m) if m == "down"
        ));
        assert!(matches!(
            ClientError::from_status(400, "bad".to_string(), None),
            ClientError::RequestError { status: 400, .. }
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::ServiceUnavailable(String::new()).is_retryable());
        assert!(ClientError::RateLimitError { retry_after: None }.is_retryable());
        assert!(!ClientError::ConfigurationError(String::new()).is_retryable());
        assert!(
            !ClientError::RequestError {
                status: 400,
                message: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_rate_limit_helpers() {
        let limited = ClientError::from_status(429, String::new(), Some(Duration::from_secs(7)));
        assert!(limited.is_rate_limit_error());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));

        let unavailable = ClientError::from_status(503, String::new(), Some(Duration::from_secs(7)));
        assert!(!unavailable.is_rate_limit_error());
        assert_eq!(unavailable.retry_after(), None);
    }

    #[test]
    fn test_problem_details_message() {
        let parsed: ProblemDetails =
            serde_json::from_str(r#"{"title":"Bad Request","detail":"messages is empty"}"#)
                .unwrap_or(ProblemDetails {
                    title: None,
                    detail: None,
                });
        assert_eq!(
            parsed.message().as_deref(),
            Some("Bad Request: messages is empty")
        );

        let empty = ProblemDetails {
            title: None,
            detail: None,
        };
        assert!(empty.message().is_none());
    }
}
