//! Errors from certification provider operations.

use thiserror::Error;

/// Errors from PAC gateway operations.
///
/// Provider-side rejections are not errors: a rejected stamp or a
/// refused cancellation comes back inside the normalized outcome so the
/// lifecycle engine can record the provider's code and message on the
/// document. `PacError` covers everything that prevented getting an
/// answer at all.
#[derive(Debug, Error)]
pub enum PacError {
    /// The provider service is unreachable or returned a 5xx status.
    #[error("PAC service unavailable: {reason}")]
    ServiceUnavailable {
        /// Human-readable description of the outage or error.
        reason: String,
    },

    /// No gateway is configured for the requested provider.
    #[error("PAC gateway not configured: {reason}")]
    NotConfigured {
        /// Why configuration is missing or incomplete.
        reason: String,
    },

    /// The request timed out.
    #[error("PAC request timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time in milliseconds before the timeout triggered.
        elapsed_ms: u64,
    },

    /// The provider answered with a body this client could not decode.
    #[error("PAC response could not be decoded: {reason}")]
    MalformedResponse {
        /// What failed while decoding.
        reason: String,
    },
}
