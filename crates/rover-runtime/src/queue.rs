//! [`CommandQueue`] – the pending action sequence and the dispatcher mode.
//!
//! One mutex guards the mode, the pending FIFO and the name of the item the
//! drain loop is currently running.  Producers append batches; the drain
//! loop pops one item at a time with [`CommandQueue::next`] and reports back
//! with [`CommandQueue::finish`].  A flush only ever touches items that have
//! not been popped yet, so a motion already in progress always completes.
//!
//! # Example
//!
//! ```rust
//! use rover_runtime::queue::CommandQueue;
//! use rover_types::QueueMode;
//!
//! let q = CommandQueue::new();
//! q.execute_actions(["sit", "bark"]);
//! assert_eq!(q.mode(), QueueMode::RunningBatch);
//!
//! assert_eq!(q.next().as_deref(), Some("sit"));
//! assert_eq!(q.flush(), 1); // "bark" never starts
//! q.finish(true);
//! assert!(q.is_idle());
//! ```

use std::collections::VecDeque;

use parking_lot::Mutex;
use rover_types::QueueMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Default)]
struct QueueState {
    mode: QueueMode,
    pending: VecDeque<String>,
    in_flight: Option<String>,
    completed: u64,
    failed: u64,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub mode: QueueMode,
    pub pending: Vec<String>,
    pub in_flight: Option<String>,
    pub completed: u64,
    pub failed: u64,
}

/// Shared FIFO of action names plus the dispatcher mode.
#[derive(Default)]
pub struct CommandQueue {
    state: Mutex<QueueState>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `names` to the pending sequence and switch to
    /// [`QueueMode::RunningBatch`].  Returns the number of names appended.
    ///
    /// An empty batch leaves the queue untouched.
    pub fn execute_actions<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        let before = state.pending.len();
        state.pending.extend(names.into_iter().map(Into::into));
        let added = state.pending.len() - before;
        if added > 0 {
            state.mode = QueueMode::RunningBatch;
            debug!(added, pending = state.pending.len(), "batch queued");
        }
        added
    }

    /// Discard every item that has not started and force
    /// [`QueueMode::Standby`].  Returns the number of items discarded.
    ///
    /// Idempotent: flushing an empty queue in standby changes nothing.
    pub fn flush(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.mode = QueueMode::Standby;
        if dropped > 0 {
            info!(dropped, "queue flushed");
        }
        dropped
    }

    /// Flush and enqueue `names` under a single lock acquisition, so no
    /// other producer can slip an item in between.  Returns the number of
    /// items discarded.
    pub fn preempt<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.pending.extend(names.into_iter().map(Into::into));
        state.mode = if state.pending.is_empty() {
            QueueMode::Standby
        } else {
            QueueMode::RunningBatch
        };
        info!(dropped, queued = state.pending.len(), "queue pre-empted");
        dropped
    }

    pub fn set_mode(&self, mode: QueueMode) {
        let mut state = self.state.lock();
        if state.mode != mode {
            debug!(from = %state.mode, to = %mode, "mode changed");
            state.mode = mode;
        }
    }

    pub fn mode(&self) -> QueueMode {
        self.state.lock().mode
    }

    /// Pop the next item for the drain loop.
    ///
    /// Returns `None` unless the mode is [`QueueMode::RunningBatch`].  When
    /// the pending sequence is empty the mode drops back to standby.
    pub fn next(&self) -> Option<String> {
        let mut state = self.state.lock();
        if state.mode != QueueMode::RunningBatch || state.in_flight.is_some() {
            return None;
        }
        match state.pending.pop_front() {
            Some(name) => {
                state.in_flight = Some(name.clone());
                Some(name)
            }
            None => {
                state.mode = QueueMode::Standby;
                None
            }
        }
    }

    /// Report that the item returned by [`next`][Self::next] has ended.
    pub fn finish(&self, ok: bool) {
        let mut state = self.state.lock();
        state.in_flight = None;
        if ok {
            state.completed += 1;
        } else {
            state.failed += 1;
        }
        if state.pending.is_empty() && state.mode == QueueMode::RunningBatch {
            state.mode = QueueMode::Standby;
        }
    }

    /// `true` when nothing is being drained and nothing is running.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.mode != QueueMode::RunningBatch && state.in_flight.is_none()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock();
        QueueSnapshot {
            mode: state.mode,
            pending: state.pending.iter().cloned().collect(),
            in_flight: state.in_flight.clone(),
            completed: state.completed,
            failed: state.failed,
        }
    }
}
