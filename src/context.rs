//! Operation context for bulk runs.
//!
//! Every bulk invocation carries an [`OperationContext`] used to correlate log
//! lines across the preflight query and all chunk calls of one run.

use uuid::Uuid;

/// Context for one bulk invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Unique identifier for this invocation
    pub operation_id: String,
    /// School the administrator is working in, if one was chosen
    pub school: Option<String>,
}

impl OperationContext {
    /// Create a context with a specific operation ID.
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            school: None,
        }
    }

    /// Create a context with a generated operation ID.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Create a context with a generated operation ID for a school.
    pub fn for_school(school: impl Into<String>) -> Self {
        Self::with_generated_id().with_school(school)
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = Some(school.into());
        self
    }

    pub fn school(&self) -> Option<&str> {
        self.school.as_deref()
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}
