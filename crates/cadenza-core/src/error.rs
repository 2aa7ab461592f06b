//! Error types for Cadenza.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProviderAttempt;

/// Result type alias using Cadenza's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cadenza.
#[derive(Error, Debug)]
pub enum Error {
    // Caller errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio resolution failed for all providers/qualities ({} attempts)", .0.len())]
    Exhausted(Vec<ProviderAttempt>),

    // Provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    // Upstream API errors
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Content not available: {0}")]
    ContentNotAvailable(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Tool not available: {0}")]
    ToolUnavailable(String),

    // Startup errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// HTTP-specific errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed with status {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,
}

impl Error {
    /// Returns true if this error was caused by the caller rather than a provider.
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Attempt diagnostics carried by an exhaustion error.
    pub fn attempts(&self) -> &[ProviderAttempt] {
        match self {
            Self::Exhausted(attempts) => attempts,
            _ => &[],
        }
    }
}

/// Category of a single provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider's dependency is missing.
    Unavailable,
    /// Network, timeout or non-2xx failure.
    Transient,
    /// The provider answered but the payload did not validate.
    InvalidResponse,
}

/// Failure reported by one provider for one (locator, quality) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("{message}")]
    Transient {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid response: {message}")]
    InvalidResponse {
        status: Option<u16>,
        message: String,
    },
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            status: None,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Unavailable(_) => FailureKind::Unavailable,
            Self::Transient { .. } => FailureKind::Transient,
            Self::InvalidResponse { .. } => FailureKind::InvalidResponse,
        }
    }

    /// HTTP status of the upstream response, if there was one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unavailable(_) => None,
            Self::Transient { status, .. } | Self::InvalidResponse { status, .. } => *status,
        }
    }

    /// Response body or error message.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unavailable(reason) => reason,
            Self::Transient { message, .. } | Self::InvalidResponse { message, .. } => message,
        }
    }

    /// Returns true if another try of the same call may succeed.
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

impl From<Error> for ProviderError {
    fn from(err: Error) -> Self {
        match err {
            Error::Provider(inner) => inner,
            Error::Http(HttpError::StatusError { status, message }) => Self::Transient {
                status: Some(status),
                message,
            },
            Error::ToolUnavailable(reason) => Self::Unavailable(reason),
            Error::ParseError(_)
            | Error::Json(_)
            | Error::ContentNotAvailable(_)
            | Error::InvalidInput(_) => Self::invalid(err.to_string()),
            other => Self::transient(other.to_string()),
        }
    }
}
