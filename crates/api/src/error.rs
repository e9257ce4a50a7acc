//! Error type for the backend API layer.
//!
//! The backend answers failures with a JSON envelope of the form
//! `{ "error": "<message>", "code": "<CODE>" }`. Business-rule rejections
//! (`INVALID_STATE_TRANSITION`, `CONFLICT`) are authoritative — callers
//! must surface them, never retry them. Only transport failures are
//! candidates for retry, at the caller's discretion.

use serde::Deserialize;

/// Well-known error codes returned in the backend envelope.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_STATE_TRANSITION: &str = "INVALID_STATE_TRANSITION";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const BUDGET_EXCEEDED: &str = "BUDGET_EXCEEDED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Errors from the backend API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("backend error ({status}): [{code}] {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from the envelope, or `INTERNAL_ERROR` when absent.
        code: String,
        /// Human-readable message from the envelope, or the raw body.
        message: String,
    },
}

/// The backend's JSON error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
    code: Option<String>,
}

impl ApiError {
    /// Classify a non-2xx response body into a typed error.
    ///
    /// Falls back to the raw body (and `INTERNAL_ERROR`) when the body is
    /// not the expected envelope.
    pub fn from_envelope(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => ApiError::Api {
                status,
                code: envelope
                    .code
                    .unwrap_or_else(|| codes::INTERNAL_ERROR.to_string()),
                message: envelope.error,
            },
            Err(_) => ApiError::Api {
                status,
                code: codes::INTERNAL_ERROR.to_string(),
                message: body.to_string(),
            },
        }
    }

    /// The envelope code, if this is a backend-reported error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Api { code, .. } => Some(code),
            ApiError::Transport(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }

    /// Only transport failures may be retried; backend verdicts are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}
