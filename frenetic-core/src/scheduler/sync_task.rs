// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Delayed tasks executed on the main tick thread
//!
//! Pending tasks live in a [`SyncTaskQueue`], a FIFO guarded by a single
//! mutex. Any thread may append; only the tick thread drains. The lock is
//! never held while a task body runs, so tasks may schedule further tasks.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::error;

use super::{panic_message, Scheduler};

pub(crate) type SyncAction = Box<dyn FnOnce(&Scheduler) + Send>;

/// Shared state between a queued task and its handle
///
/// Tick time is accumulated rather than counted down, so a task fires on the
/// exact call where the summed deltas reach its delay.
#[derive(Debug)]
struct SyncTaskState {
    delay: f64,
    elapsed_bits: AtomicU64,
    fired: AtomicBool,
    cancelled: AtomicBool,
}

impl SyncTaskState {
    fn elapsed(&self) -> f64 {
        f64::from_bits(self.elapsed_bits.load(Ordering::Acquire))
    }

    /// Add `delta` to the elapsed time and report whether the task is due
    fn advance(&self, delta: f64) -> bool {
        let elapsed = self.elapsed() + delta;
        self.elapsed_bits.store(elapsed.to_bits(), Ordering::Release);
        elapsed >= self.delay
    }

    fn remaining(&self) -> f64 {
        self.delay - self.elapsed()
    }
}

/// Handle to a scheduled sync task
///
/// Dropping the handle does not cancel the task.
#[derive(Debug, Clone)]
pub struct SyncScheduleItem {
    id: u64,
    state: Arc<SyncTaskState>,
}

impl SyncScheduleItem {
    /// Scheduler-assigned task id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Seconds left before the task fires
    pub fn remaining(&self) -> f64 {
        self.state.remaining()
    }

    /// Whether the task has run
    pub fn has_fired(&self) -> bool {
        self.state.fired.load(Ordering::Acquire)
    }

    /// Whether the task was cancelled before it ran
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Prevent the task from running
    ///
    /// Returns false if it already ran. The task is dropped from the queue
    /// on the next run.
    pub fn cancel(&self) -> bool {
        if self.has_fired() {
            return false;
        }
        self.state.cancelled.store(true, Ordering::Release);
        true
    }
}

pub(crate) struct SyncTask {
    id: u64,
    state: Arc<SyncTaskState>,
    action: SyncAction,
}

impl SyncTask {
    pub(crate) fn new(id: u64, delay: f64, action: SyncAction) -> (Self, SyncScheduleItem) {
        let state = Arc::new(SyncTaskState {
            delay,
            elapsed_bits: AtomicU64::new(0.0f64.to_bits()),
            fired: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        });
        let handle = SyncScheduleItem {
            id,
            state: Arc::clone(&state),
        };
        (SyncTask { id, state, action }, handle)
    }

    /// Run the task body, containing any panic
    ///
    /// Returns false if the body panicked.
    pub(crate) fn run(self, scheduler: &Scheduler) -> bool {
        let SyncTask { id, state, action } = self;
        state.fired.store(true, Ordering::Release);
        match panic::catch_unwind(AssertUnwindSafe(|| action(scheduler))) {
            Ok(()) => true,
            Err(payload) => {
                error!(
                    "Scheduled sync task {} panicked: {}",
                    id,
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }
}

/// FIFO of pending sync tasks
#[derive(Default)]
pub(crate) struct SyncTaskQueue {
    tasks: Mutex<VecDeque<SyncTask>>,
}

impl SyncTaskQueue {
    pub(crate) fn push(&self, task: SyncTask) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }

    /// Advance every pending task by `delta` and pull out the due ones
    ///
    /// Due tasks come back in submission order. Cancelled tasks are dropped.
    pub(crate) fn take_due(&self, delta: f64) -> Vec<SyncTask> {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut due = Vec::new();
        let mut pending = VecDeque::with_capacity(tasks.len());

        for task in tasks.drain(..) {
            if task.state.cancelled.load(Ordering::Acquire) {
                continue;
            }
            if task.state.advance(delta) {
                due.push(task);
            } else {
                pending.push_back(task);
            }
        }

        *tasks = pending;
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn clear(&self) {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
