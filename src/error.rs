//! Error types for rotation operations.

use thiserror::Error;

/// Result type alias using [`RotationError`].
pub type Result<T> = std::result::Result<T, RotationError>;

/// Errors that can occur while executing a rotation step.
///
/// Guard and phase failures are reported to the scheduler as a failed step
/// invocation; the scheduler owns retry policy. All errors implement
/// `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The secret is not enabled for rotation.
    #[error("secret {0} is not enabled for rotation")]
    RotationDisabled(String),

    /// The version token is not among the secret's known versions.
    #[error("secret version {version} has no stage for rotation of secret {secret_id}")]
    UnknownVersion {
        /// Secret identifier
        secret_id: String,
        /// Offending version token
        version: String,
    },

    /// The version is neither current nor staged as pending.
    #[error("secret version {version} not set as pending for rotation of secret {secret_id}")]
    InvalidStageForRotation {
        /// Secret identifier
        secret_id: String,
        /// Offending version token
        version: String,
    },

    /// The step name is not one of the four lifecycle steps.
    #[error("invalid rotation step: {0}")]
    InvalidStep(String),

    /// The secret (or one of its staged values) could not be read.
    #[error("secret not found: {0}")]
    SecretNotFound(String),

    /// A managed resource is not in a state that can be safely updated.
    #[error("resource not ready: {0}")]
    ResourceNotReady(String),

    /// No origin of the distribution carries the managed header.
    #[error("no custom header {header} found in distribution {distribution_id}")]
    HeaderNotFound {
        /// Distribution identifier
        distribution_id: String,
        /// Managed header name
        header: String,
    },

    /// A firewall or distribution control-plane write was rejected.
    #[error("{system}: update failed: {reason}")]
    ExternalUpdateFailed {
        /// Which external system rejected the write
        system: String,
        /// Underlying failure description
        reason: String,
    },

    /// The optimistic-concurrency token was stale on write.
    #[error("concurrent modification detected: {0}")]
    ConcurrentModification(String),

    /// The origin probe rejected a candidate header value.
    #[error("verification failed for header value {value} against {url}")]
    VerificationFailed {
        /// Probe target URL
        url: String,
        /// Header value that was rejected
        value: String,
    },

    /// A required configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Probe request failed at the transport level.
    #[error("probe request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RotationError {
    /// Creates an [`ExternalUpdateFailed`](Self::ExternalUpdateFailed) with
    /// the failing system named.
    pub fn external(system: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ExternalUpdateFailed {
            system: system.into(),
            reason: reason.to_string(),
        }
    }
}
