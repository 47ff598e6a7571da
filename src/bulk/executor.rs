//! Sequential chunked execution of one bulk operation.
//!
//! The executor turns a [`BulkRequest`] into a series of remote calls, one
//! chunk at a time. Chunk `i + 1` is only sent after chunk `i` resolved, which
//! bounds the load on the backend to a single in-flight call per operation.
//! All per-run state (remaining queue, aggregated result, progress, state
//! machine) lives inside the call; the executor itself only holds a busy flag
//! that rejects a second concurrent run.

use crate::bulk::outcome::BulkOutcome;
use crate::bulk::planner::{ChunkPlanner, ItemQueue};
use crate::bulk::preflight::{PreflightDecision, PreflightFilter};
use crate::bulk::progress::{ProgressReporter, ProgressSink};
use crate::bulk::request::BulkRequest;
use crate::bulk::result::{ChunkResult, ResultAggregator, SuccessCounting};
use crate::bulk::state::{BulkState, StateMachine};
use crate::config::BulkConfig;
use crate::context::OperationContext;
use crate::error::{BulkError, BulkResult};
use crate::remote::RemoteInvoker;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

/// Marks the executor busy for the lifetime of one run.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> BulkResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BulkError::AlreadyRunning)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives chunked bulk operations against a [`RemoteInvoker`].
pub struct BulkOperationExecutor<I: RemoteInvoker> {
    invoker: I,
    config: BulkConfig,
    in_flight: AtomicBool,
}

impl<I: RemoteInvoker> BulkOperationExecutor<I> {
    /// Create an executor; the configuration is validated first.
    pub fn new(invoker: I, config: BulkConfig) -> BulkResult<Self> {
        config.validate()?;
        Ok(Self {
            invoker,
            config,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Whether a run is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run `request` chunk by chunk.
    ///
    /// An empty item list resolves to a "nothing to do" outcome without any
    /// remote call. Transport failures abort the run and discard the partial
    /// result.
    pub async fn execute(
        &self,
        context: &OperationContext,
        request: BulkRequest,
        progress: &dyn ProgressSink,
    ) -> BulkResult<BulkOutcome> {
        self.run(context, request, None, progress).await
    }

    /// Reduce the request's items through `preflight` first, then run the
    /// reduced set chunk by chunk.
    pub async fn execute_with_preflight(
        &self,
        context: &OperationContext,
        request: BulkRequest,
        preflight: &PreflightFilter,
        progress: &dyn ProgressSink,
    ) -> BulkResult<BulkOutcome> {
        self.run(context, request, Some(preflight), progress).await
    }

    /// Issue one unchunked call whose payload follows the chunked operation
    /// contract (e.g. assigning licenses to a whole school).
    pub async fn execute_single(
        &self,
        context: &OperationContext,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> BulkResult<BulkOutcome> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let mut machine = StateMachine::new();
        machine.advance(BulkState::Chunking)?;
        machine.advance(BulkState::Running(0))?;

        let chunk = match self
            .call_with_retry(context, operation, arguments, Some(0))
            .await
            .and_then(|payload| parse_chunk(operation, payload))
        {
            Ok(chunk) => chunk,
            Err(e) => {
                machine.advance(BulkState::Failed)?;
                error!(
                    "Single call '{}' failed: {} (operation: '{}')",
                    operation, e, context.operation_id
                );
                return Err(e);
            }
        };

        let mut aggregator = ResultAggregator::new(self.config.failure_merge);
        aggregator.merge(&chunk, 1, SuccessCounting::Reported);
        let outcome = BulkOutcome::finished(aggregator.into_result());
        machine.advance(if outcome.result.insufficient_inventory {
            BulkState::HardStopped
        } else {
            BulkState::Completed
        })?;
        Ok(outcome)
    }

    async fn run(
        &self,
        context: &OperationContext,
        mut request: BulkRequest,
        preflight: Option<&PreflightFilter>,
        progress: &dyn ProgressSink,
    ) -> BulkResult<BulkOutcome> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let planner = ChunkPlanner::new(request.chunk_size.unwrap_or(self.config.chunk_size))?;
        let mut machine = StateMachine::new();
        let mut items = std::mem::take(&mut request.target_items);

        info!(
            "Bulk '{}' requested for {} items (operation: '{}')",
            request.operation,
            items.len(),
            context.operation_id
        );

        if items.is_empty() {
            machine.advance(BulkState::NothingToDo)?;
            return Ok(BulkOutcome::nothing_to_do());
        }

        if let Some(filter) = preflight {
            machine.advance(BulkState::Preflighting)?;
            let decision = match self
                .call_with_retry(context, filter.operation(), filter.arguments(&items), None)
                .await
                .and_then(|payload| {
                    filter
                        .decide(payload)
                        .map_err(|source| BulkError::InvalidResponse {
                            operation: filter.operation().to_string(),
                            source,
                        })
                }) {
                Ok(decision) => decision,
                Err(e) => {
                    machine.advance(BulkState::Failed)?;
                    return Err(e);
                }
            };

            match decision {
                PreflightDecision::NothingToDo => {
                    machine.advance(BulkState::NothingToDo)?;
                    info!(
                        "All {} users already hold the license (operation: '{}')",
                        items.len(),
                        context.operation_id
                    );
                    return Ok(BulkOutcome::nothing_to_do());
                }
                PreflightDecision::Insufficient { needed, available } => {
                    machine.advance(BulkState::Aborted)?;
                    warn!(
                        "Preflight refused: {} users need a license, {} available (operation: '{}')",
                        needed, available, context.operation_id
                    );
                    let reason = decision.abort_reason().unwrap_or_default();
                    return Ok(BulkOutcome::preflight_aborted(reason));
                }
                PreflightDecision::Proceed(reduced) => {
                    debug!(
                        "Preflight reduced {} users to {} (operation: '{}')",
                        items.len(),
                        reduced.len(),
                        context.operation_id
                    );
                    items = reduced;
                }
            }
        }

        let plan = planner.plan(items.len());
        machine.advance(BulkState::Chunking)?;
        debug!(
            "Planned {} chunk(s) of up to {} for {} items (operation: '{}')",
            plan.chunk_count, plan.chunk_size, plan.total, context.operation_id
        );

        let mut reporter = plan.is_chunked().then(|| {
            ProgressReporter::start(progress, plan.total, request.progress_label.clone())
        });
        let mut queue = ItemQueue::new(items);
        let mut aggregator = ResultAggregator::new(self.config.failure_merge);
        let mut index = 0;

        while let Some(chunk) = queue.take_chunk(planner.chunk_size()) {
            machine.advance(BulkState::Running(index))?;
            let processed = chunk.len();

            let chunk_result = match self.process_chunk(context, &request, chunk, index).await {
                Ok(chunk_result) => chunk_result,
                Err(e) => {
                    machine.advance(BulkState::Failed)?;
                    if let Some(reporter) = reporter.as_mut() {
                        reporter.teardown();
                    }
                    error!(
                        "Bulk '{}' failed at chunk {}: {} (operation: '{}')",
                        request.operation, index, e, context.operation_id
                    );
                    return Err(e);
                }
            };

            aggregator.merge(&chunk_result, processed, request.counting);
            if chunk_result.not_enough_licenses {
                warn!(
                    "Chunk {} reported insufficient licenses, skipping {} remaining items (operation: '{}')",
                    index,
                    queue.len(),
                    context.operation_id
                );
                queue.clear();
            }
            if let Some(reporter) = reporter.as_mut() {
                reporter.update(aggregator.result().successful_count);
            }
            index += 1;
        }

        if let Some(mut reporter) = reporter.take() {
            reporter.teardown();
        }

        let result = aggregator.into_result();
        machine.advance(if result.insufficient_inventory {
            BulkState::HardStopped
        } else {
            BulkState::Completed
        })?;
        info!(
            "Bulk '{}' finished after {} chunk(s): {} successful, {} failed (operation: '{}')",
            request.operation,
            index,
            result.successful_count,
            result.failures.len(),
            context.operation_id
        );
        Ok(BulkOutcome::finished(result))
    }

    async fn process_chunk(
        &self,
        context: &OperationContext,
        request: &BulkRequest,
        chunk: Vec<String>,
        index: usize,
    ) -> BulkResult<ChunkResult> {
        debug!(
            "Sending chunk {} with {} items to '{}' (operation: '{}')",
            index,
            chunk.len(),
            request.operation,
            context.operation_id
        );
        let arguments = request.chunk_arguments(chunk);
        let payload = self
            .call_with_retry(context, &request.operation, arguments, Some(index))
            .await?;
        parse_chunk(&request.operation, payload)
    }

    /// Invoke once, retrying retryable transport failures within the
    /// configured budget. An error envelope is final.
    async fn call_with_retry(
        &self,
        context: &OperationContext,
        operation: &str,
        arguments: Map<String, Value>,
        chunk: Option<usize>,
    ) -> BulkResult<Value> {
        let retry = &self.config.retry;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.invoker.invoke(operation, arguments.clone()).await {
                Ok(response) => {
                    if let Some(error) = response.error {
                        return Err(BulkError::Remote {
                            operation: operation.to_string(),
                            message: error.message,
                        });
                    }
                    return Ok(response.result);
                }
                Err(source) => {
                    if !source.is_retryable() || attempt > retry.max_retries {
                        return Err(BulkError::Transport {
                            operation: operation.to_string(),
                            chunk,
                            attempts: attempt,
                            source,
                        });
                    }
                    let delay = retry.delay_for(attempt);
                    warn!(
                        "Call '{}' failed ({}), retry {}/{} in {:?} (operation: '{}')",
                        operation, source, attempt, retry.max_retries, delay, context.operation_id
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn parse_chunk(operation: &str, payload: Value) -> BulkResult<ChunkResult> {
    ChunkResult::from_payload(payload).map_err(|source| BulkError::InvalidResponse {
        operation: operation.to_string(),
        source,
    })
}
