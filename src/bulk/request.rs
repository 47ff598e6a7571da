//! Bulk request description.

use crate::bulk::result::SuccessCounting;
use serde_json::{Map, Value, json};

/// One logical bulk action: a remote operation applied to many items.
///
/// Each chunk call receives `fixed_parameters` unchanged plus the chunk's items
/// under `items_key`.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequest {
    pub operation: String,
    pub items_key: String,
    pub target_items: Vec<String>,
    pub fixed_parameters: Map<String, Value>,
    /// Overrides the executor's configured chunk size.
    pub chunk_size: Option<usize>,
    pub counting: SuccessCounting,
    /// Suffix of the "X of Y ..." progress message.
    pub progress_label: String,
}

impl BulkRequest {
    pub fn new(
        operation: impl Into<String>,
        items_key: impl Into<String>,
        target_items: Vec<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            items_key: items_key.into(),
            target_items,
            fixed_parameters: Map::new(),
            chunk_size: None,
            counting: SuccessCounting::default(),
            progress_label: "processed".to_string(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fixed_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_counting(mut self, counting: SuccessCounting) -> Self {
        self.counting = counting;
        self
    }

    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = label.into();
        self
    }

    /// Arguments for one chunk call.
    pub fn chunk_arguments(&self, chunk: Vec<String>) -> Map<String, Value> {
        let mut arguments = self.fixed_parameters.clone();
        arguments.insert(self.items_key.clone(), json!(chunk));
        arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_arguments_merge_fixed_parameters() {
        let request = BulkRequest::new(
            "licenses/assign_to_users",
            "usernames",
            vec!["a".to_string(), "b".to_string()],
        )
        .with_parameter("licenseCodes", json!(["VOL-1"]));

        let arguments = request.chunk_arguments(vec!["b".to_string()]);
        assert_eq!(arguments["licenseCodes"], json!(["VOL-1"]));
        assert_eq!(arguments["usernames"], json!(["b"]));
        assert_eq!(request.fixed_parameters.len(), 1);
    }

    #[test]
    fn test_items_key_wins_over_fixed_parameter() {
        let request = BulkRequest::new("licenses/delete", "licenses", vec![])
            .with_parameter("licenses", json!("stale"));
        let arguments = request.chunk_arguments(vec!["X".to_string()]);
        assert_eq!(arguments["licenses"], json!(["X"]));
    }
}
