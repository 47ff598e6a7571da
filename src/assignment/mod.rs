//! License assignment on top of the bulk engine.
//!
//! [`LicenseAssignmentService`] exposes the administrator-facing actions:
//! assigning selected licenses to users, a school, a class or a workgroup,
//! removing a license from users, and deleting licenses. Each action resolves
//! to a [`BulkOutcome`](crate::bulk::BulkOutcome), which
//! [`AssignmentSummary`] renders into the lines of the result dialog.

pub mod selection;
pub mod service;
pub mod summary;

pub use selection::{LicenseSelection, SelectedLicense};
pub use service::{LicenseAssignmentService, group_name_from_dn};
pub use summary::{AssignmentSummary, AssignmentTarget};
