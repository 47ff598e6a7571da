//! Chunked bulk operation engine.
//!
//! A bulk operation applies one remote command to a potentially large list of
//! identifiers. The engine splits the list into chunks, sends them strictly one
//! after another, folds the per-chunk payloads into one result, reports
//! progress for multi-chunk runs and stops early when the backend reports that
//! licenses ran out.
//!
//! # Architecture
//!
//! - [`planner`]: chunk sizing and the LIFO item queue
//! - [`preflight`]: optional reduction of the item list before chunking
//! - [`result`]: per-chunk payloads and their aggregation
//! - [`progress`]: progress sink seam and the scoped reporter
//! - [`state`]: per-invocation state machine
//! - [`executor`]: the sequential driver tying the pieces together
//! - [`outcome`]: what the caller gets back
//!
//! # Example Usage
//!
//! ```rust
//! use school_license_bulk::bulk::{BulkOperationExecutor, BulkRequest, NoProgress};
//! use school_license_bulk::config::BulkConfig;
//! use school_license_bulk::context::OperationContext;
//! use school_license_bulk::remote::{InMemoryLicenseBackend, License, LicenseType, operations};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryLicenseBackend::new();
//! backend.add_license(License::new("VOL-1", "school-a", LicenseType::Volume, 200)).await;
//! for i in 0..130 {
//!     backend.add_user(format!("user{}", i), "school-a").await;
//! }
//!
//! let executor = BulkOperationExecutor::new(backend, BulkConfig::default())?;
//! let users = (0..130).map(|i| format!("user{}", i)).collect();
//! let request = BulkRequest::new(operations::ASSIGN_TO_USERS, "usernames", users)
//!     .with_parameter("licenseCodes", json!(["VOL-1"]));
//!
//! let outcome = executor
//!     .execute(&OperationContext::for_school("school-a"), request, &NoProgress)
//!     .await?;
//! assert_eq!(outcome.result.successful_count, 130);
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod outcome;
pub mod planner;
pub mod preflight;
pub mod progress;
pub mod request;
pub mod result;
pub mod state;

pub use executor::BulkOperationExecutor;
pub use outcome::{BulkOutcome, OutcomeStatus};
pub use planner::{ChunkPlan, ChunkPlanner, ItemQueue};
pub use preflight::{PreflightDecision, PreflightFilter};
pub use progress::{
    LogProgressSink, NoProgress, ProgressReporter, ProgressSink, ProgressState, START_MESSAGE,
};
pub use request::BulkRequest;
pub use result::{AggregatedResult, ChunkResult, FailedAssignment, ResultAggregator, SuccessCounting};
pub use state::{BulkState, StateMachine};
