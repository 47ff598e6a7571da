//! Preflight reduction for license assignment to users.
//!
//! Before any assignment chunk is sent, the requested users are reduced to
//! those who hold none of the selected licenses yet. The reduced set is then
//! checked against the available inventory of the selected license rows, so a
//! selection that cannot succeed is refused before any partial work happens.

use crate::remote::operations;
use serde_json::{Map, Value, json};

/// Reduces a user set to those who still need the license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightFilter {
    pub license_codes: Vec<String>,
    /// Sum of the "available" counts of the selected license rows.
    pub available: usize,
}

/// What the preflight query decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightDecision {
    /// Every requested user already holds the license.
    NothingToDo,
    /// The reduced set is larger than the available inventory.
    Insufficient { needed: usize, available: usize },
    /// Continue with only these users.
    Proceed(Vec<String>),
}

impl PreflightDecision {
    /// Human readable reason for an abort, if this is one.
    pub fn abort_reason(&self) -> Option<String> {
        match self {
            PreflightDecision::Insufficient { needed, .. } => {
                Some(format!("Assigning licenses to {} users failed", needed))
            }
            _ => None,
        }
    }
}

impl PreflightFilter {
    pub fn new(license_codes: Vec<String>, available: usize) -> Self {
        Self {
            license_codes,
            available,
        }
    }

    pub fn operation(&self) -> &'static str {
        operations::NOT_ASSIGNED_USERS
    }

    /// Arguments of the "who still lacks these licenses" query.
    pub fn arguments(&self, usernames: &[String]) -> Map<String, Value> {
        let mut arguments = Map::new();
        arguments.insert("usernames".to_string(), json!(usernames));
        arguments.insert("licenseCodes".to_string(), json!(self.license_codes));
        arguments
    }

    /// Decide from the query's payload, a list of usernames.
    pub fn decide(&self, payload: Value) -> Result<PreflightDecision, serde_json::Error> {
        let reduced: Vec<String> = serde_json::from_value(payload)?;
        if reduced.is_empty() {
            return Ok(PreflightDecision::NothingToDo);
        }
        if self.available < reduced.len() {
            return Ok(PreflightDecision::Insufficient {
                needed: reduced.len(),
                available: self.available,
            });
        }
        Ok(PreflightDecision::Proceed(reduced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(available: usize) -> PreflightFilter {
        PreflightFilter::new(vec!["VOL-1".to_string()], available)
    }

    #[test]
    fn test_arguments() {
        let arguments = filter(3).arguments(&["anna".to_string()]);
        assert_eq!(arguments["usernames"], json!(["anna"]));
        assert_eq!(arguments["licenseCodes"], json!(["VOL-1"]));
    }

    #[test]
    fn test_empty_reduction_is_nothing_to_do() {
        assert_eq!(
            filter(0).decide(json!([])).unwrap(),
            PreflightDecision::NothingToDo
        );
    }

    #[test]
    fn test_insufficient_inventory() {
        let decision = filter(3).decide(json!(["a", "b", "c", "d", "e"])).unwrap();
        assert_eq!(
            decision,
            PreflightDecision::Insufficient {
                needed: 5,
                available: 3
            }
        );
        assert_eq!(
            decision.abort_reason().unwrap(),
            "Assigning licenses to 5 users failed"
        );
    }

    #[test]
    fn test_proceed_with_reduced_set() {
        let decision = filter(2).decide(json!(["b", "a"])).unwrap();
        assert_eq!(
            decision,
            PreflightDecision::Proceed(vec!["b".to_string(), "a".to_string()])
        );
        assert!(decision.abort_reason().is_none());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(filter(2).decide(json!({"result": []})).is_err());
        assert!(filter(2).decide(Value::Null).is_err());
    }
}
