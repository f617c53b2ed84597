//! Failures surfaced by a provider call.

use thiserror::Error;

/// A single provider call failed.
///
/// None of these are retried at this layer; retry policy belongs to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, refused
    /// connection, reset, body read failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-2xx status.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, unparsed.
        body: String,
    },

    /// A 2xx response whose body does not have the documented shape.
    #[error("unexpected response from {path}: {message}")]
    Decode {
        /// Endpoint path that produced the body.
        path: String,
        /// Deserializer message.
        message: String,
    },

    /// The credential header could not be constructed.
    #[error("invalid credential header: {0}")]
    Header(String),
}

impl ProviderError {
    /// Whether the failure happened below HTTP.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The HTTP status code, when the API answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
