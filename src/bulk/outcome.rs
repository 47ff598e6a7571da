//! Caller-facing outcome of a bulk operation.
//!
//! Every business result (completion, hard stop, nothing to do, preflight
//! abort) resolves to a [`BulkOutcome`] with a discriminating
//! [`OutcomeStatus`], so callers branch on one value instead of catching
//! errors. The legacy JSON envelope is available through
//! [`BulkOutcome::to_envelope`].

use crate::bulk::result::AggregatedResult;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// All chunks were processed.
    Completed,
    /// A chunk reported insufficient inventory; remaining chunks were skipped.
    HardStopped,
    /// No item needed processing; no remote operation was issued.
    NothingToDo,
    /// The preflight check refused to start.
    PreflightAborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub status: OutcomeStatus,
    pub error: Option<String>,
    pub message: Option<String>,
    pub reason: Option<String>,
    pub result: AggregatedResult,
}

impl BulkOutcome {
    fn with_status(status: OutcomeStatus, result: AggregatedResult) -> Self {
        Self {
            status,
            error: None,
            message: None,
            reason: None,
            result,
        }
    }

    /// Completed or hard-stopped, depending on the aggregated flag.
    pub fn finished(result: AggregatedResult) -> Self {
        let status = if result.insufficient_inventory {
            OutcomeStatus::HardStopped
        } else {
            OutcomeStatus::Completed
        };
        Self::with_status(status, result)
    }

    pub fn nothing_to_do() -> Self {
        Self::with_status(OutcomeStatus::NothingToDo, AggregatedResult::default())
    }

    pub fn preflight_aborted(reason: impl Into<String>) -> Self {
        let mut outcome =
            Self::with_status(OutcomeStatus::PreflightAborted, AggregatedResult::default());
        outcome.reason = Some(reason.into());
        outcome
    }

    pub fn is_nothing_to_do(&self) -> bool {
        self.status == OutcomeStatus::NothingToDo
    }

    pub fn is_aborted(&self) -> bool {
        self.status == OutcomeStatus::PreflightAborted
    }

    /// Whether the backend lacked licenses, found before or during the run.
    pub fn not_enough_licenses(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::HardStopped | OutcomeStatus::PreflightAborted
        )
    }

    /// `{ error, message, reason, result }` as the administration UI consumes it.
    pub fn to_envelope(&self) -> Value {
        let result = match self.status {
            OutcomeStatus::NothingToDo => json!({ "nothingToDo": true }),
            _ => json!(self.result),
        };
        json!({
            "error": self.error,
            "message": self.message,
            "reason": self.reason,
            "result": result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_status_follows_inventory_flag() {
        let outcome = BulkOutcome::finished(AggregatedResult {
            successful_count: 10,
            ..AggregatedResult::default()
        });
        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert!(!outcome.not_enough_licenses());

        let outcome = BulkOutcome::finished(AggregatedResult {
            insufficient_inventory: true,
            ..AggregatedResult::default()
        });
        assert_eq!(outcome.status, OutcomeStatus::HardStopped);
        assert!(outcome.not_enough_licenses());
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(
            BulkOutcome::nothing_to_do().to_envelope(),
            json!({
                "error": null,
                "message": null,
                "reason": null,
                "result": {"nothingToDo": true},
            })
        );

        let envelope = BulkOutcome::finished(AggregatedResult {
            successful_count: 4,
            ..AggregatedResult::default()
        })
        .to_envelope();
        assert_eq!(envelope["error"], Value::Null);
        assert_eq!(envelope["result"]["countSuccessfulAssignments"], 4);
        assert_eq!(envelope["result"]["failedAssignments"], json!([]));

        let envelope = BulkOutcome::preflight_aborted("Assigning licenses to 5 users failed")
            .to_envelope();
        assert_eq!(envelope["reason"], "Assigning licenses to 5 users failed");
    }
}
