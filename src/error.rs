//! Error types for bulk license operations.
//!
//! Business outcomes such as "nothing to do", a failed preflight check or a
//! hard stop on insufficient inventory are not errors; they travel inside
//! [`BulkOutcome`](crate::bulk::BulkOutcome). The types here cover what the
//! caller cannot branch on as an ordinary result: transport failures, malformed
//! responses, misuse of the executor and invalid configuration.

use crate::bulk::state::BulkState;
use crate::config::ConfigurationError;
use crate::remote::TransportError;

/// Main error type for bulk operations.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    /// A remote call rejected and the retry budget was exhausted.
    #[error("Transport failure in '{operation}'{} after {attempts} attempt(s): {source}", chunk_label(.chunk))]
    Transport {
        operation: String,
        chunk: Option<usize>,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The remote side answered, but with an error envelope.
    #[error("Remote operation '{operation}' failed: {message}")]
    Remote { operation: String, message: String },

    /// The response payload did not match the chunked operation contract
    #[error("Invalid response from '{operation}': {source}")]
    InvalidResponse {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// A second bulk operation was started on an executor that is still busy.
    #[error("A bulk operation is already in flight on this executor")]
    AlreadyRunning,

    /// The per-invocation state machine was asked to make an illegal move.
    #[error("Invalid bulk state transition from {from:?} to {to:?}")]
    InvalidTransition { from: BulkState, to: BulkState },

    /// Invalid request parameters
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

fn chunk_label(chunk: &Option<usize>) -> String {
    match chunk {
        Some(index) => format!(" (chunk {})", index),
        None => String::new(),
    }
}

impl BulkError {
    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether this error came from the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Result type alias for bulk operations.
pub type BulkResult<T> = Result<T, BulkError>;
