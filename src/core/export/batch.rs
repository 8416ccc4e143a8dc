//! Batch run bookkeeping
//!
//! [`BatchRun`] tracks the terminal outcome of every unit in one run and turns
//! those outcomes into the events the orchestrator reacts to. It holds no
//! tasks or I/O, so the event rules can be checked in isolation:
//!
//! - a [`BatchEvent::Progress`] after every recorded outcome
//! - at most one [`BatchEvent::Failed`], for the first unit that failed
//! - exactly one final event, [`BatchEvent::Succeeded`] or
//!   [`BatchEvent::Cancelled`], produced by [`BatchRun::finish`]

use crate::core::export::policy::ReconciliationMode;
use crate::domain::{QuireError, RunId};
use std::collections::BTreeMap;

/// Terminal outcome of one unit of work
#[derive(Debug, Clone)]
pub enum UnitOutcome<O> {
    /// The unit finished and produced a value
    Succeeded(O),
    /// The unit failed permanently or exhausted its retries
    Failed(QuireError),
    /// The unit never ran, or stopped because the run was cancelled
    Cancelled,
}

impl<O> UnitOutcome<O> {
    /// Value produced by a successful unit
    pub fn output(&self) -> Option<&O> {
        match self {
            UnitOutcome::Succeeded(output) => Some(output),
            _ => None,
        }
    }
}

/// Counts of terminal outcomes so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
}

impl BatchProgress {
    /// Units with a terminal outcome
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Event emitted by a batch run
#[derive(Debug)]
pub enum BatchEvent<O> {
    /// A unit reached a terminal outcome
    Progress(BatchProgress),

    /// The first unit failure of the run
    Failed { index: u64, error: QuireError },

    /// Every unit finished and the run was never cancelled.
    ///
    /// Under the strict policy this also means every unit succeeded.
    Succeeded {
        progress: BatchProgress,
        outcomes: Vec<(u64, UnitOutcome<O>)>,
    },

    /// The run was cancelled, either externally or by the strict policy
    /// reacting to a failure (`reason` carries that failure).
    Cancelled {
        progress: BatchProgress,
        outcomes: Vec<(u64, UnitOutcome<O>)>,
        reason: Option<QuireError>,
    },
}

impl<O> BatchEvent<O> {
    /// Whether this is the last event of the run
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            BatchEvent::Succeeded { .. } | BatchEvent::Cancelled { .. }
        )
    }
}

/// Outcome bookkeeping for one batch run
#[derive(Debug)]
pub struct BatchRun<O> {
    run_id: RunId,
    mode: ReconciliationMode,
    expected: Vec<u64>,
    outcomes: BTreeMap<u64, UnitOutcome<O>>,
    progress: BatchProgress,
    first_failure: Option<QuireError>,
}

impl<O> BatchRun<O> {
    /// Start tracking a run over the given unit indices
    pub fn new(
        run_id: RunId,
        indices: impl IntoIterator<Item = u64>,
        mode: ReconciliationMode,
    ) -> Self {
        let mut expected: Vec<u64> = indices.into_iter().collect();
        expected.sort_unstable();
        expected.dedup();
        let progress = BatchProgress {
            total: expected.len(),
            ..BatchProgress::default()
        };

        Self {
            run_id,
            mode,
            expected,
            outcomes: BTreeMap::new(),
            progress,
            first_failure: None,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn progress(&self) -> BatchProgress {
        self.progress
    }

    /// Record the terminal outcome of unit `index` and return the events it
    /// causes. Unknown indices and repeated outcomes are ignored.
    pub fn record(&mut self, index: u64, outcome: UnitOutcome<O>) -> Vec<BatchEvent<O>> {
        if self.expected.binary_search(&index).is_err() {
            tracing::warn!(run_id = %self.run_id, index, "Outcome for unknown unit ignored");
            return Vec::new();
        }
        if self.outcomes.contains_key(&index) {
            tracing::warn!(run_id = %self.run_id, index, "Duplicate unit outcome ignored");
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        match &outcome {
            UnitOutcome::Succeeded(_) => self.progress.succeeded += 1,
            UnitOutcome::Cancelled => self.progress.cancelled += 1,
            UnitOutcome::Failed(error) => {
                self.progress.failed += 1;
                if self.first_failure.is_none() {
                    self.first_failure = Some(error.clone());
                    events.push(BatchEvent::Failed {
                        index,
                        error: error.clone(),
                    });
                }
            }
        }
        self.outcomes.insert(index, outcome);
        events.insert(0, BatchEvent::Progress(self.progress));
        events
    }

    /// Whether the strict policy requires the run to stop now
    pub fn should_cancel(&self) -> bool {
        self.mode == ReconciliationMode::Strict && self.first_failure.is_some()
    }

    /// Close the run and produce its final event.
    ///
    /// Units without an outcome are recorded as cancelled.
    pub fn finish(mut self, cancelled: bool) -> BatchEvent<O> {
        for index in &self.expected {
            if !self.outcomes.contains_key(index) {
                self.outcomes.insert(*index, UnitOutcome::Cancelled);
                self.progress.cancelled += 1;
            }
        }

        let strict_failure = self.should_cancel();
        let progress = self.progress;
        let outcomes: Vec<(u64, UnitOutcome<O>)> = self.outcomes.into_iter().collect();

        if cancelled || strict_failure {
            BatchEvent::Cancelled {
                progress,
                outcomes,
                reason: if strict_failure {
                    self.first_failure
                } else {
                    None
                },
            }
        } else {
            BatchEvent::Succeeded { progress, outcomes }
        }
    }
}
