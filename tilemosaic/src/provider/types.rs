//! Provider types

use std::fmt;

/// Errors that can occur while fetching a tile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport failure before a response arrived
    HttpError(String),
    /// Server answered with a non-success status
    HttpStatus { status: u16, url: String },
    /// Request did not complete within the configured timeout
    Timeout { url: String, secs: u64 },
    /// Response body is not a decodable image
    InvalidResponse(String),
    /// Fetch was abandoned because the run was cancelled
    Cancelled,
}

impl ProviderError {
    /// Returns true if a later attempt at the same request may succeed.
    ///
    /// Client errors are permanent except `408 Request Timeout` and
    /// `429 Too Many Requests`. A payload that fails to decode is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::HttpError(_) | ProviderError::Timeout { .. } => true,
            ProviderError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            ProviderError::InvalidResponse(_) | ProviderError::Cancelled => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::HttpStatus { status, url } => {
                write!(f, "HTTP {} from {}", status, url)
            }
            ProviderError::Timeout { url, secs } => {
                write!(f, "Request to {} timed out after {}s", url, secs)
            }
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::Cancelled => write!(f, "Fetch cancelled"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ProviderError {
        ProviderError::HttpStatus {
            status: code,
            url: "http://tiles.test/1/2/3.png".to_string(),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(!status(400).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn test_throttling_and_request_timeout_are_retryable() {
        assert!(status(408).is_retryable());
        assert!(status(429).is_retryable());
    }

    #[test]
    fn test_transport_and_timeout_are_retryable() {
        assert!(ProviderError::HttpError("connection reset".into()).is_retryable());
        assert!(ProviderError::Timeout {
            url: "u".into(),
            secs: 30
        }
        .is_retryable());
    }

    #[test]
    fn test_invalid_payload_and_cancel_are_permanent() {
        assert!(!ProviderError::InvalidResponse("not an image".into()).is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(status(404).to_string(), "HTTP 404 from http://tiles.test/1/2/3.png");
        assert_eq!(ProviderError::Cancelled.to_string(), "Fetch cancelled");
    }
}
