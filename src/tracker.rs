//! Progress reporting for batch identification.
//!
//! A [`ProgressTracker`] is shared between the thread running a batch and
//! any number of observers (usually behind an `Arc`).  Observers can poll
//! [`ProgressTracker::percentage`] or block on completion.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Integer percentage clamped to `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(u8);

impl Percentage {
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    /// `completed / total`, rounded down; a zero total counts as one step.
    pub fn from_steps(completed: u64, total: u64) -> Self {
        let total = total.max(1) as u128;
        let ratio = (completed as u128 * 100) / total;
        Self(ratio.min(100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug)]
struct Progress {
    total:     u64,
    completed: u64,
}

/// Thread-safe completed/total step counter.
#[derive(Debug)]
pub struct ProgressTracker {
    state:   Mutex<Progress>,
    changed: Condvar,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ProgressTracker {
    /// `total_steps` below one is raised to one.
    pub fn new(total_steps: u64) -> Self {
        Self {
            state: Mutex::new(Progress { total: total_steps.max(1), completed: 0 }),
            changed: Condvar::new(),
        }
    }

    // A panic while holding the lock cannot leave the counters inconsistent.
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance by `steps`, saturating at the total.
    pub fn advance(&self, steps: u64) {
        let mut state = self.lock();
        state.completed = state.completed.saturating_add(steps).min(state.total);
        self.changed.notify_all();
    }

    pub fn completed_steps(&self) -> u64 {
        self.lock().completed
    }

    pub fn remaining_steps(&self) -> u64 {
        let state = self.lock();
        state.total - state.completed
    }

    pub fn total_steps(&self) -> u64 {
        self.lock().total
    }

    pub fn percentage(&self) -> Percentage {
        let state = self.lock();
        Percentage::from_steps(state.completed, state.total)
    }

    pub fn is_completed(&self) -> bool {
        let state = self.lock();
        state.completed >= state.total
    }

    pub fn mark_completed(&self) {
        let mut state = self.lock();
        state.completed = state.total;
        self.changed.notify_all();
    }

    /// Start over with a new total.
    pub fn reset(&self, total_steps: u64) {
        let mut state = self.lock();
        state.total = total_steps.max(1);
        state.completed = 0;
        self.changed.notify_all();
    }

    pub fn wait_for_completion(&self) {
        let state = self.lock();
        let _done = self
            .changed
            .wait_while(state, |p| p.completed < p.total)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Returns whether the tracker completed before `timeout` elapsed.
    pub fn wait_for_completion_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |p| p.completed < p.total)
            .unwrap_or_else(PoisonError::into_inner);
        state.completed >= state.total
    }
}

/// Marks the wrapped tracker completed when dropped.
pub(crate) struct CompletionGuard<'a>(pub(crate) Option<&'a ProgressTracker>);

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        if let Some(tracker) = self.0 {
            tracker.mark_completed();
        }
    }
}
