//! Batch coordinator
//!
//! Dispatches a set of [`WorkUnit`]s with bounded parallelism, retries each
//! one under the run's [`RetryPolicy`], and reports outcomes as
//! [`BatchEvent`]s on a channel. A single driver task owns the run's state, so
//! the final event is decided once, after every dispatched unit has come back.

use crate::core::export::batch::{BatchEvent, BatchRun, UnitOutcome};
use crate::core::export::policy::{ExportPolicy, RetryPolicy};
use crate::core::export::retry::run_with_retry;
use crate::domain::{QuireError, Result, RunId};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// One independently retryable piece of a batch run
#[async_trait]
pub trait WorkUnit: Send + Sync + 'static {
    /// Value a successful unit hands back to the run
    type Output: Send + 'static;

    /// Position of the unit within its run
    fn index(&self) -> u64;

    /// Perform one attempt. `attempt` starts at 1.
    async fn run(&self, attempt: u32) -> Result<Self::Output>;
}

/// Receiving side of a submitted batch run
pub struct BatchHandle<O> {
    run_id: RunId,
    events: mpsc::UnboundedReceiver<BatchEvent<O>>,
    finished: bool,
}

impl<O> BatchHandle<O> {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Next event of the run, `None` once the final event has been taken
    pub async fn next_event(&mut self) -> Option<BatchEvent<O>> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await?;
        self.finished = event.is_final();
        Some(event)
    }
}

/// Runs batches of work units
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    policy: ExportPolicy,
}

impl BatchCoordinator {
    pub fn new(policy: ExportPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExportPolicy {
        &self.policy
    }

    /// Start a run over `units`.
    ///
    /// Cancelling `cancel` stops further dispatch.
    /// The run's events arrive on the returned handle; the last one is always
    /// [`BatchEvent::Succeeded`] or [`BatchEvent::Cancelled`].
    pub fn submit<U: WorkUnit>(
        &self,
        run_id: RunId,
        units: Vec<U>,
        cancel: CancellationToken,
    ) -> BatchHandle<U::Output> {
        let (tx, rx) = mpsc::unbounded_channel();
        let total = units.len();

        tracing::info!(
            run_id = %run_id,
            units = total,
            max_concurrency = self.policy.max_concurrency,
            policy = %self.policy.reconciliation,
            "Dispatching batch"
        );

        tokio::spawn(drive(run_id, units, self.policy.clone(), cancel, tx));

        BatchHandle {
            run_id,
            events: rx,
            finished: false,
        }
    }
}

async fn drive<U: WorkUnit>(
    run_id: RunId,
    units: Vec<U>,
    policy: ExportPolicy,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<BatchEvent<U::Output>>,
) {
    let mut batch = BatchRun::new(
        run_id,
        units.iter().map(|unit| unit.index()),
        policy.reconciliation,
    );
    let limit = policy.max_concurrency.max(1);
    let mut queue: VecDeque<Arc<U>> = units.into_iter().map(Arc::new).collect();
    let mut running = FuturesUnordered::new();

    loop {
        while running.len() < limit && !cancel.is_cancelled() {
            let Some(unit) = queue.pop_front() else {
                break;
            };
            running.push(spawn_unit(unit, policy.retry.clone(), cancel.clone()));
        }

        let Some((index, joined)) = running.next().await else {
            break;
        };

        for event in batch.record(index, into_outcome(index, joined)) {
            // A dropped receiver only means nobody is listening any more
            let _ = tx.send(event);
        }

        if batch.should_cancel() && !cancel.is_cancelled() {
            tracing::warn!(
                run_id = %run_id,
                index,
                "Unit failed under strict policy, cancelling run"
            );
            cancel.cancel();
        }
    }

    if !queue.is_empty() {
        tracing::info!(
            run_id = %run_id,
            skipped = queue.len(),
            "Run cancelled before all units were dispatched"
        );
    }

    let event = batch.finish(cancel.is_cancelled());
    match &event {
        BatchEvent::Succeeded { progress, .. } => tracing::info!(
            run_id = %run_id,
            succeeded = progress.succeeded,
            failed = progress.failed,
            "Batch finished"
        ),
        BatchEvent::Cancelled { progress, .. } => tracing::warn!(
            run_id = %run_id,
            succeeded = progress.succeeded,
            failed = progress.failed,
            cancelled = progress.cancelled,
            "Batch cancelled"
        ),
        _ => {}
    }
    let _ = tx.send(event);
}

fn spawn_unit<U: WorkUnit>(
    unit: Arc<U>,
    retry: RetryPolicy,
    cancel: CancellationToken,
) -> impl Future<Output = (u64, std::result::Result<Result<U::Output>, JoinError>)> {
    let index = unit.index();
    let task = tokio::spawn(async move {
        let label = format!("unit {index}");
        run_with_retry(&label, &retry, &cancel, |attempt| {
            let unit = unit.clone();
            async move { unit.run(attempt).await }
        })
        .await
    });
    task.map(move |joined| (index, joined))
}

fn into_outcome<O>(
    index: u64,
    joined: std::result::Result<Result<O>, JoinError>,
) -> UnitOutcome<O> {
    match joined {
        Ok(Ok(output)) => UnitOutcome::Succeeded(output),
        Ok(Err(QuireError::Cancelled(reason))) => {
            tracing::debug!(index, reason = %reason, "Unit cancelled");
            UnitOutcome::Cancelled
        }
        Ok(Err(error)) => {
            tracing::error!(index, error = %error, "Unit failed");
            UnitOutcome::Failed(error)
        }
        Err(join_error) => {
            tracing::error!(index, error = %join_error, "Unit task aborted");
            UnitOutcome::Failed(QuireError::Other(format!(
                "unit {index} task failed: {join_error}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::batch::BatchProgress;

    struct Echo(u64);

    #[async_trait]
    impl WorkUnit for Echo {
        type Output = u64;

        fn index(&self) -> u64 {
            self.0
        }

        async fn run(&self, _attempt: u32) -> Result<u64> {
            Ok(self.0 * 10)
        }
    }

    #[tokio::test]
    async fn test_empty_run_succeeds_immediately() {
        let coordinator = BatchCoordinator::new(ExportPolicy::default());
        let mut handle =
            coordinator.submit::<Echo>(RunId::new(), Vec::new(), CancellationToken::new());

        let event = handle.next_event().await.unwrap();
        assert!(matches!(
            event,
            BatchEvent::Succeeded {
                progress: BatchProgress { total: 0, .. },
                ..
            }
        ));
        assert!(handle.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_outputs_reported_by_index() {
        let coordinator = BatchCoordinator::new(ExportPolicy::default());
        let units = (0..5).map(Echo).collect();
        let mut handle = coordinator.submit(RunId::new(), units, CancellationToken::new());

        let mut progress_events = 0;
        while let Some(event) = handle.next_event().await {
            match event {
                BatchEvent::Progress(_) => progress_events += 1,
                BatchEvent::Succeeded { outcomes, .. } => {
                    let outputs: Vec<u64> = outcomes
                        .iter()
                        .filter_map(|(_, o)| o.output().copied())
                        .collect();
                    assert_eq!(outputs, vec![0, 10, 20, 30, 40]);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(progress_events, 5);
    }
}
