//! Common test utilities for the bulk engine tests.
//!
//! Provides a scripted [`RemoteInvoker`] that records every call and answers
//! from a queue of canned replies, a progress sink that records events, and
//! small builders for users and configurations.

#![allow(dead_code)]

use school_license_bulk::bulk::ProgressSink;
use school_license_bulk::config::{BulkConfig, RetryConfig};
use school_license_bulk::remote::{CommandResponse, RemoteInvoker, TransportError};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Initialize test logging once; repeated calls are harmless.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `user0`, `user1`, ... `user{n-1}`.
pub fn users(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("user{}", i)).collect()
}

/// Default configuration with a custom chunk size and fast retries.
pub fn config(chunk_size: usize) -> BulkConfig {
    BulkConfig::builder()
        .with_chunk_size(chunk_size)
        .with_retry(RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            exponential_backoff: true,
        })
        .build()
        .unwrap()
}

/// One canned answer of the scripted invoker.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with this payload.
    Payload(Value),
    /// Answer with an error envelope.
    Envelope(String),
    /// Reject the call.
    Fail(TransportError),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub operation: String,
    pub arguments: Map<String, Value>,
}

impl Call {
    pub fn items(&self, key: &str) -> Vec<String> {
        self.arguments
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    replies: VecDeque<Reply>,
}

/// A [`RemoteInvoker`] answering from a reply queue.
///
/// Once the queue is empty every call succeeds and reports all items under
/// `items_key` as successful.
#[derive(Clone)]
pub struct ScriptedInvoker {
    items_key: String,
    script: Arc<Mutex<Script>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedInvoker {
    pub fn new(items_key: &str) -> Self {
        Self {
            items_key: items_key.to_string(),
            script: Arc::new(Mutex::new(Script::default())),
            gate: None,
        }
    }

    /// Hold every call until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.script.lock().unwrap().replies.push_back(reply);
        self
    }

    pub fn payload(self, payload: Value) -> Self {
        self.reply(Reply::Payload(payload))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, operation: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }
}

impl RemoteInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> Result<CommandResponse, TransportError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call {
                operation: operation.to_string(),
                arguments: arguments.clone(),
            });
            script.replies.pop_front()
        };

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match reply {
            Some(Reply::Payload(payload)) => Ok(CommandResponse::ok(payload)),
            Some(Reply::Envelope(message)) => Ok(CommandResponse::error(message)),
            Some(Reply::Fail(error)) => Err(error),
            None => {
                let count = arguments
                    .get(&self.items_key)
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                Ok(CommandResponse::ok(
                    json!({ "countSuccessfulAssignments": count }),
                ))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin { total: usize },
    Update { completed: usize, message: String },
    Teardown,
}

/// A [`ProgressSink`] that records what it was told.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Update { completed, .. } => Some(completed),
                _ => None,
            })
            .collect()
    }

    pub fn teardowns(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == ProgressEvent::Teardown)
            .count()
    }
}

impl ProgressSink for RecordingSink {
    fn begin(&self, total: usize, _message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Begin { total });
    }

    fn update(&self, completed: usize, message: &str) {
        self.events.lock().unwrap().push(ProgressEvent::Update {
            completed,
            message: message.to_string(),
        });
    }

    fn teardown(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Teardown);
    }
}
