//! Progress reporting and cooperative cancellation.
//!
//! Both engines take a `ProgressSink` and a `CancellationToken` explicitly.
//! Workers only bump an atomic counter and read the token; the sink is called
//! under a lock so the reported percentage never goes backwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::PlannerError;

/// Terminal state of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Completed(T),
    /// Stopped on request before completion. No partial result is kept.
    Cancelled,
}

impl<T> RunOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            RunOutcome::Completed(value) => Some(value),
            RunOutcome::Cancelled => None,
        }
    }
}

/// Why a stage stopped early.
#[derive(Debug)]
pub(crate) enum Halt {
    Cancelled,
    Failed(PlannerError),
}

impl From<PlannerError> for Halt {
    fn from(err: PlannerError) -> Self {
        Halt::Failed(err)
    }
}

/// Fold a stage result into the public outcome.
pub(crate) fn settle<T>(result: Result<T, Halt>) -> Result<RunOutcome<T>, PlannerError> {
    match result {
        Ok(value) => Ok(RunOutcome::Completed(value)),
        Err(Halt::Cancelled) => Ok(RunOutcome::Cancelled),
        Err(Halt::Failed(err)) => Err(err),
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Stop the current unit of work if cancellation was requested.
    pub(crate) fn checkpoint(&self) -> Result<(), Halt> {
        if self.is_cancelled() { Err(Halt::Cancelled) } else { Ok(()) }
    }
}

/// Receives progress in percent, in `[0, 100]`.
pub trait ProgressSink: Sync {
    fn report(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// A sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: f64) {}
}

/// Counts completed work units for one run and forwards whole percentages.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    done: AtomicUsize,
    last_reported: Mutex<Option<u32>>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            total,
            done: AtomicUsize::new(0),
            last_reported: Mutex::new(None),
        }
    }

    /// Record `units` finished work units.
    pub(crate) fn advance(&self, units: usize) {
        if units == 0 || self.total == 0 {
            return;
        }
        let done = self.done.fetch_add(units, Ordering::Relaxed) + units;
        // 100 is reserved for `finish`, so a run that is cancelled on its
        // last unit never looks complete.
        let percent = ((done.min(self.total) * 100) / self.total).min(99) as u32;
        self.emit(percent);
    }

    /// Report successful completion.
    pub(crate) fn finish(&self) {
        self.emit(100);
    }

    fn emit(&self, percent: u32) {
        let mut last = self.last_reported.lock();
        if last.is_some_and(|previous| previous >= percent) {
            return;
        }
        *last = Some(percent);
        self.sink.report(percent as f64);
    }
}
