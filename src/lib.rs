//! Chunked bulk license operations for school administration.
//!
//! Applies license assignment, removal and deletion to large sets of users
//! without overloading the backend: items are sent in bounded chunks, one
//! chunk at a time, and the per-chunk results are merged into a single
//! outcome with progress reporting along the way.
//!
//! # Core Components
//!
//! - [`BulkOperationExecutor`] - Sequential chunked driver for one remote operation
//! - [`RemoteInvoker`] - Trait for the remote command transport
//! - [`LicenseAssignmentService`] - Assignment, removal and deletion actions
//! - [`AssignmentSummary`] - Result dialog lines for an outcome
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use school_license_bulk::{BulkConfig, LicenseAssignmentService, LicenseSelection, OperationContext};
//! use school_license_bulk::bulk::LogProgressSink;
//! use school_license_bulk::remote::InMemoryLicenseBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = LicenseAssignmentService::new(InMemoryLicenseBackend::new(), BulkConfig::default())?;
//! let selection = LicenseSelection::default().with_license("VOL-1", 200);
//! let usernames = vec!["anna".to_string(), "ben".to_string()];
//!
//! let outcome = service
//!     .assign_to_users(
//!         &OperationContext::for_school("school-a"),
//!         &selection,
//!         usernames,
//!         &LogProgressSink::new("assignment"),
//!     )
//!     .await?;
//! println!("{}", outcome.to_envelope());
//! # Ok(())
//! # }
//! ```

pub mod assignment;
pub mod bulk;
pub mod config;
pub mod context;
pub mod error;
pub mod remote;

// Re-export commonly used types for convenience
pub use assignment::{
    AssignmentSummary, AssignmentTarget, LicenseAssignmentService, LicenseSelection,
    SelectedLicense,
};
pub use bulk::{
    AggregatedResult, BulkOperationExecutor, BulkOutcome, BulkRequest, FailedAssignment,
    OutcomeStatus, ProgressSink,
};
pub use config::{BulkConfig, FailureMerge, RetryConfig};
pub use context::OperationContext;
pub use error::{BulkError, BulkResult};
pub use remote::{CommandResponse, ErrorInfo, RemoteInvoker, TransportError};
