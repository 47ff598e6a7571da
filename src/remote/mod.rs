//! Remote command invocation.
//!
//! Every backend interaction of the bulk engine goes through
//! [`RemoteInvoker::invoke`]: a named command plus a JSON argument map, answered
//! with a [`CommandResponse`] envelope. The engine treats this as an opaque RPC
//! mechanism; the concrete transport (an HTTP command dispatcher, an in-process
//! store, a test double) is up to the implementation.
//!
//! # Example Usage
//!
//! ```rust
//! use school_license_bulk::remote::{InMemoryLicenseBackend, RemoteInvoker, operations};
//! use serde_json::{Map, json};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryLicenseBackend::new();
//! backend.add_user("anna", "school-a").await;
//!
//! let mut arguments = Map::new();
//! arguments.insert("usernames".to_string(), json!(["anna"]));
//! arguments.insert("licenseCodes".to_string(), json!([]));
//!
//! let response = backend.invoke(operations::NOT_ASSIGNED_USERS, arguments).await?;
//! assert_eq!(response.result, json!(["anna"]));
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::{BackendError, TransportError};
pub use in_memory::{InMemoryLicenseBackend, License, LicenseType};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

/// Command names understood by the license backend.
pub mod operations {
    pub const ASSIGN_TO_USERS: &str = "licenses/assign_to_users";
    pub const ASSIGN_TO_SCHOOL: &str = "licenses/assign_to_school";
    pub const ASSIGN_TO_CLASS: &str = "licenses/assign_to_class";
    pub const ASSIGN_TO_WORKGROUP: &str = "licenses/assign_to_workgroup";
    pub const NOT_ASSIGNED_USERS: &str = "licenses/not_assigned_users";
    pub const REMOVE_FROM_USERS: &str = "licenses/remove_from_users";
    pub const DELETE: &str = "licenses/delete";
}

/// Error details carried inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Uniform response envelope: `{ error, result }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub result: Value,
}

impl CommandResponse {
    /// A successful response carrying `result`.
    pub fn ok(result: Value) -> Self {
        Self {
            error: None,
            result,
        }
    }

    /// An error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorInfo {
                message: message.into(),
                code: None,
            }),
            result: Value::Null,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The single seam through which chunk calls and preflight queries reach the
/// backend.
///
/// Implementations must be safe to share between tasks; the bulk executor
/// itself only ever has one call in flight per operation.
pub trait RemoteInvoker: Send + Sync {
    /// Invoke `operation` with `arguments`.
    ///
    /// # Returns
    /// * `Ok(response)` - the backend answered; the envelope may still carry
    ///   an error
    /// * `Err(TransportError)` - the call itself rejected
    fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<CommandResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_deserializes_with_missing_fields() {
        let response: CommandResponse =
            serde_json::from_value(json!({"result": {"countSuccessfulAssignments": 3}})).unwrap();
        assert!(!response.is_error());
        assert_eq!(response.result["countSuccessfulAssignments"], 3);

        let response: CommandResponse =
            serde_json::from_value(json!({"error": {"message": "boom"}})).unwrap();
        assert!(response.is_error());
        assert_eq!(response.result, Value::Null);
    }

    #[test]
    fn test_error_envelope() {
        let response = CommandResponse::error("Unknown command");
        assert_eq!(response.error.unwrap().message, "Unknown command");
    }
}
