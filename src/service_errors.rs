//! # External Service Error Types Module
//!
//! Errors raised while talking to Google Vision and Nutritionix, with a
//! classification of which ones are worth retrying.

use thiserror::Error;

/// Errors from external API collaborators
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Request never got a response (DNS, TLS, connection reset)
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// Service answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// A single attempt exceeded the configured timeout
    #[error("{service} did not answer within {seconds}s")]
    Timeout { service: &'static str, seconds: u64 },

    /// Circuit breaker is open, the call was not attempted
    #[error("{0} is temporarily unavailable (circuit open)")]
    CircuitOpen(&'static str),

    /// Credentials document unusable
    #[error("{service} credentials error: {message}")]
    Credentials {
        service: &'static str,
        message: String,
    },

    /// Image rejected before any call was made
    #[error("image rejected: {0}")]
    ImageRejected(String),
}

impl ServiceError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Transport { .. } | ServiceError::Timeout { .. } => true,
            ServiceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn transport(service: &'static str, err: reqwest::Error) -> Self {
        // The URL may carry an API key
        ServiceError::Transport {
            service,
            message: err.without_url().to_string(),
        }
    }

    pub(crate) fn decode(service: &'static str, err: impl std::fmt::Display) -> Self {
        ServiceError::Decode {
            service,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let status = |status| ServiceError::Status {
            service: "nutritionix",
            status,
            body: String::new(),
        };

        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(ServiceError::Timeout {
            service: "vision",
            seconds: 15
        }
        .is_retryable());
        assert!(!ServiceError::CircuitOpen("vision").is_retryable());
        assert!(!ServiceError::ImageRejected("empty".into()).is_retryable());
    }

    #[test]
    fn test_error_message_formatting() {
        let err = ServiceError::Status {
            service: "vision",
            status: 403,
            body: "API key not valid".to_string(),
        };
        assert_eq!(err.to_string(), "vision returned HTTP 403: API key not valid");

        let err = ServiceError::CircuitOpen("nutritionix");
        assert_eq!(
            err.to_string(),
            "nutritionix is temporarily unavailable (circuit open)"
        );
    }
}
