//! Error types for the remote command layer.
//!
//! [`TransportError`] is what a [`RemoteInvoker`](super::RemoteInvoker) returns
//! when a call itself rejects. [`BackendError`] describes business failures
//! inside a backend; those never leave the backend as errors but are turned
//! into per-identifier failure records.

use std::time::Duration;

/// Failures of a remote call that did not produce a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection-level failure (reset, refused, DNS, ...).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered with a non-success status.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The call did not complete in time.
    #[error("Timeout after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

impl TransportError {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a server error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a timeout error from an elapsed duration.
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout {
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Client-side rejections (4xx) are permanent; everything else is assumed
    /// to be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. } | TransportError::Timeout { .. } => true,
            TransportError::Server { status, .. } => *status >= 500,
        }
    }
}

/// Business failures raised while a backend processes a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("License with code {code:?} was not found")]
    LicenseNotFound { code: String },

    #[error("No {object_type} with name {name:?} was found")]
    ObjectNotFound { object_type: String, name: String },

    #[error("License with license type {license_type:?} can't be assigned to the object type {object_type:?}")]
    WrongLicenseType {
        license_type: String,
        object_type: String,
    },

    #[error("License can't be assigned to a different school")]
    WrongSchool,

    #[error("The license with code {code:?} is ignored for assignments")]
    LicenseIgnored { code: String },

    #[error("The license with code {code:?} has expired")]
    LicenseExpired { code: String },

    #[error(
        "There are no more assignments available for the license with code {code:?}. No license has been assigned to the object {name:?}!"
    )]
    NoAssignmentsLeft { code: String, name: String },

    #[error(
        "This license is allowed for assignments to groups including a maximum of <{quantity}> members. The selected group exceeds this number of users"
    )]
    GroupTooLarge { quantity: usize },

    #[error("No assignment for license with code {code:?} was found for object {name:?}")]
    AssignmentNotFound { code: String, name: String },
}
