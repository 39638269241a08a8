//! Error types for Vault Transform operations.

use thiserror::Error;

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors that can occur during an encode/decode round trip.
///
/// Each variant maps to a per-item failure kind at the envelope boundary via
/// [`TransformError::kind`]; the caller never sees raw Vault response bodies.
#[derive(Error, Debug, Clone)]
pub enum TransformError {
    /// Vault could not be reached, the call timed out, or Vault reported a
    /// server-side fault.
    #[error("Vault unavailable: {message}")]
    Unavailable { message: String },

    /// The session credential was rejected and could not be refreshed.
    #[error("Vault authentication failed: {message}")]
    Unauthenticated { message: String },

    /// Vault rejected the call semantically: the value does not match the
    /// transformation template, or the role/transformation is unknown.
    #[error("Vault rejected the call: {message}")]
    Rejected { message: String },

    /// The transform client is misconfigured.
    #[error("Transform configuration error: {message}")]
    Config { message: String },
}

impl TransformError {
    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    /// Create a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Stable failure-kind tag embedded in per-item reply markers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "backend_unavailable",
            Self::Unauthenticated { .. } => "backend_unauthenticated",
            Self::Rejected { .. } => "backend_rejected",
            Self::Config { .. } => "backend_config",
        }
    }

    /// Check if this error should be retried with backoff.
    ///
    /// Only transport-level failures are retryable; a semantic rejection will
    /// fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
