//! Plain-text summary of an assignment outcome.

use crate::bulk::{BulkOutcome, FailedAssignment, OutcomeStatus};
use std::fmt;

pub const TITLE_DONE: &str = "Assigning licenses";
pub const TITLE_FAILED: &str = "Assigning licenses failed";
pub const TITLE_NOTHING_TO_DO: &str = "No assignment needed";

/// What the licenses were assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    /// Individual users; `requested` is the number of users the administrator
    /// selected, before preflight reduction.
    Users { requested: usize },
    School,
    Class,
    Workgroup,
}

impl AssignmentTarget {
    fn noun(&self) -> &'static str {
        match self {
            AssignmentTarget::Users { .. } => "users",
            AssignmentTarget::School => "school",
            AssignmentTarget::Class => "class",
            AssignmentTarget::Workgroup => "workgroup",
        }
    }
}

/// Title plus message lines for the result dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSummary {
    pub title: &'static str,
    pub lines: Vec<String>,
}

impl AssignmentSummary {
    pub fn from_outcome(outcome: &BulkOutcome, target: AssignmentTarget) -> Self {
        match outcome.status {
            OutcomeStatus::HardStopped => Self::failed(vec![not_enough_message(target)]),
            OutcomeStatus::PreflightAborted => {
                let mut lines = Vec::new();
                if let Some(reason) = &outcome.reason {
                    lines.push(reason.clone());
                }
                lines.push(not_enough_message(target));
                Self::failed(lines)
            }
            OutcomeStatus::NothingToDo => Self {
                title: TITLE_NOTHING_TO_DO,
                lines: vec![
                    "All selected users already have the requested license. \
                     Therefore, nothing had to be done."
                        .to_string(),
                ],
            },
            OutcomeStatus::Completed => Self::completed(outcome, target),
        }
    }

    fn failed(lines: Vec<String>) -> Self {
        Self {
            title: TITLE_FAILED,
            lines,
        }
    }

    fn completed(outcome: &BulkOutcome, target: AssignmentTarget) -> Self {
        let result = &outcome.result;
        let mut lines = Vec::new();

        let count = result.successful_count;
        if count > 0 {
            lines.push(match target {
                AssignmentTarget::Users { requested } if count == requested => format!(
                    "Licenses were successfully assigned to all {} selected users.",
                    count
                ),
                AssignmentTarget::Users { requested } => format!(
                    "Licenses were successfully assigned to {} of the {} selected users. \
                     The remaining users already had the license.",
                    count, requested
                ),
                _ => format!(
                    "Licenses were successfully assigned to selected {}.",
                    target.noun()
                ),
            });
        }

        if !result.failures.is_empty() {
            lines.push(match target {
                AssignmentTarget::Users { .. } if count > 0 => {
                    "Some selected users could not be assigned licenses:".to_string()
                }
                AssignmentTarget::Users { .. } => {
                    "Failed to assign licenses to the selected users:".to_string()
                }
                _ => format!("Failed to assign licenses to the selected {}.", target.noun()),
            });
            lines.extend(result.failures.iter().map(failure_line));
        }

        if !result.future_validity_warnings.is_empty() {
            lines.push(
                "Warning: The validity for the following assigned licenses lies in the future:"
                    .to_string(),
            );
            lines.extend(
                result
                    .future_validity_warnings
                    .iter()
                    .map(|code| format!("- {}", code)),
            );
        }

        Self {
            title: TITLE_DONE,
            lines,
        }
    }
}

impl fmt::Display for AssignmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for line in &self.lines {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

fn not_enough_message(target: AssignmentTarget) -> String {
    match target {
        AssignmentTarget::Users { .. } => "The number of selected licenses is not sufficient to \
            assign a license to all selected users. Therefore, no licenses have been assigned. \
            Please reduce the number of selected users or select more licenses and repeat the \
            process."
            .to_string(),
        _ => format!(
            "The number of selected licenses is not sufficient to assign a license to the selected {}.",
            target.noun()
        ),
    }
}

fn failure_line(failure: &FailedAssignment) -> String {
    if failure.identifier.is_empty() {
        format!("- {}", failure.error)
    } else {
        format!("- {} -- {}", failure.identifier, failure.error)
    }
}
