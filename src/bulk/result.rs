//! Per-chunk results and their aggregation.
//!
//! A [`ChunkResult`] is one chunk call's payload as defined by the chunked
//! operation contract:
//!
//! ```json
//! {
//!   "countSuccessfulAssignments": 60,
//!   "notEnoughLicenses": false,
//!   "failedAssignments": [{"username": "anna", "error": "..."}],
//!   "validityInFuture": ["VHT-1234"]
//! }
//! ```
//!
//! Every field is optional on the wire. The [`ResultAggregator`] folds chunk
//! results into one [`AggregatedResult`]. With the default
//! [`FailureMerge::LastChunkWins`] a chunk that reports a failure or warning
//! list replaces what earlier chunks reported, even when the list is empty;
//! only an omitted list leaves the previous value alone.

use crate::config::FailureMerge;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single identifier that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAssignment {
    #[serde(rename = "username")]
    pub identifier: String,
    pub error: String,
}

impl FailedAssignment {
    pub fn new(identifier: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            error: error.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FailedAssignmentRepr {
    Record {
        #[serde(alias = "identifier")]
        username: String,
        error: String,
    },
    Message(String),
}

// Some commands report failures as "<name> -- <error>" strings instead of
// records.
impl<'de> Deserialize<'de> for FailedAssignment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match FailedAssignmentRepr::deserialize(deserializer)? {
            FailedAssignmentRepr::Record { username, error } => Self::new(username, error),
            FailedAssignmentRepr::Message(message) => match message.split_once(" -- ") {
                Some((name, error)) => Self::new(name, error),
                None => Self::new(String::new(), message),
            },
        })
    }
}

/// The payload of one chunk call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_successful_assignments: Option<usize>,
    pub not_enough_licenses: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_assignments: Option<Vec<FailedAssignment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_in_future: Option<Vec<String>>,
}

impl ChunkResult {
    /// Parse a response payload. A `null` payload is an empty result.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        if payload.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(payload)
    }

    pub fn successes(count: usize) -> Self {
        Self {
            count_successful_assignments: Some(count),
            ..Self::default()
        }
    }

    pub fn with_failures(mut self, failures: Vec<FailedAssignment>) -> Self {
        self.failed_assignments = Some(failures);
        self
    }

    pub fn with_validity_in_future(mut self, codes: Vec<String>) -> Self {
        self.validity_in_future = Some(codes);
        self
    }

    pub fn not_enough_licenses(mut self) -> Self {
        self.not_enough_licenses = true;
        self
    }
}

/// Where a chunk's success count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessCounting {
    /// Use `countSuccessfulAssignments`; a missing counter counts as zero.
    #[default]
    Reported,
    /// Count every item sent in the chunk. For commands such as deletion that
    /// report no counter.
    ChunkLength,
    /// Count every item sent minus the chunk's failure records. For removal,
    /// which reports only failures.
    ChunkLengthMinusFailures,
}

/// The consolidated outcome of all chunks of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedResult {
    #[serde(rename = "countSuccessfulAssignments")]
    pub successful_count: usize,
    #[serde(rename = "notEnoughLicenses")]
    pub insufficient_inventory: bool,
    #[serde(rename = "failedAssignments")]
    pub failures: Vec<FailedAssignment>,
    #[serde(rename = "validityInFuture")]
    pub future_validity_warnings: Vec<String>,
}

/// Folds chunk results into an [`AggregatedResult`].
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    merge: FailureMerge,
    result: AggregatedResult,
}

impl ResultAggregator {
    pub fn new(merge: FailureMerge) -> Self {
        Self {
            merge,
            result: AggregatedResult::default(),
        }
    }

    /// Apply one chunk's result. `processed` is the number of items the chunk
    /// carried.
    pub fn merge(&mut self, chunk: &ChunkResult, processed: usize, counting: SuccessCounting) {
        let successes = match counting {
            SuccessCounting::Reported => chunk.count_successful_assignments.unwrap_or(0),
            SuccessCounting::ChunkLength => processed,
            SuccessCounting::ChunkLengthMinusFailures => {
                processed.saturating_sub(chunk.failed_assignments.as_ref().map_or(0, Vec::len))
            }
        };
        self.result.successful_count += successes;

        if chunk.not_enough_licenses {
            self.result.insufficient_inventory = true;
        }

        if let Some(failures) = &chunk.failed_assignments {
            match self.merge {
                FailureMerge::LastChunkWins => self.result.failures = failures.clone(),
                FailureMerge::Accumulate => self.result.failures.extend(failures.iter().cloned()),
            }
        }

        if let Some(warnings) = &chunk.validity_in_future {
            match self.merge {
                FailureMerge::LastChunkWins => {
                    self.result.future_validity_warnings = warnings.clone()
                }
                FailureMerge::Accumulate => {
                    for code in warnings {
                        if !self.result.future_validity_warnings.contains(code) {
                            self.result.future_validity_warnings.push(code.clone());
                        }
                    }
                }
            }
        }
    }

    pub fn result(&self) -> &AggregatedResult {
        &self.result
    }

    pub fn into_result(self) -> AggregatedResult {
        self.result
    }
}
