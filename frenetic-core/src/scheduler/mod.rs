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
//! Tick-driven task scheduling
//!
//! The scheduler offers two kinds of deferred work:
//!
//! - **Sync tasks** carry a countdown in seconds of simulated time and run on
//!   the thread that calls [`Scheduler::run_all_sync_tasks`] (the engine's
//!   tick thread) once the countdown reaches zero.
//! - **Async tasks** run on a background pool immediately
//!   ([`Scheduler::start_async_task`]) or when explicitly started
//!   ([`Scheduler::add_async_task`] then [`AsyncScheduleItem::run_me`]), and
//!   can be chained with follow-ups.
//!
//! # Ordering
//!
//! Sync tasks due in the same run execute in submission order. A task that
//! panics is logged and does not stop the others.
//!
//! # Example
//!
//! ```
//! use frenetic_core::scheduler::Scheduler;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let scheduler = Scheduler::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&fired);
//! scheduler.schedule_sync_task(move || flag.store(true, Ordering::SeqCst), 0.5);
//!
//! scheduler.run_all_sync_tasks(0.25);
//! assert!(!fired.load(Ordering::SeqCst));
//! scheduler.run_all_sync_tasks(0.25);
//! assert!(fired.load(Ordering::SeqCst));
//! ```

mod async_task;
mod pool;
mod sync_task;

pub use async_task::AsyncScheduleItem;
pub use sync_task::SyncScheduleItem;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::EngineError;
use pool::TaskPool;
use sync_task::{SyncTask, SyncTaskQueue};

struct SchedulerShared {
    sync_tasks: SyncTaskQueue,
    next_id: AtomicU64,
    pool: TaskPool,
}

/// Handle to the task scheduler
///
/// Cloning is cheap and every clone drives the same queues, so subsystems
/// (and background threads) can keep their own handle for submitting work.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
}

impl Scheduler {
    /// Create a scheduler backed by the default background pool
    pub fn new() -> Self {
        Self::with_pool(TaskPool::shared())
    }

    /// Create a scheduler with a dedicated pool of `threads` async workers
    pub fn with_worker_threads(threads: usize) -> Result<Self, EngineError> {
        if threads == 0 {
            return Err(EngineError::Config("worker thread count must be at least 1".to_string()));
        }
        Ok(Self::with_pool(TaskPool::with_threads(threads)?))
    }

    fn with_pool(pool: TaskPool) -> Self {
        Scheduler {
            shared: Arc::new(SchedulerShared {
                sync_tasks: SyncTaskQueue::default(),
                next_id: AtomicU64::new(1),
                pool,
            }),
        }
    }

    fn next_id(&self) -> u64 {
        self.shared.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue `action` to run once `delay` seconds of tick time have elapsed
    ///
    /// Nothing runs until the next [`run_all_sync_tasks`](Self::run_all_sync_tasks).
    ///
    /// # Panics
    ///
    /// Panics if `delay` is NaN
    pub fn schedule_sync_task<F>(&self, action: F, delay: f64) -> SyncScheduleItem
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_with_scheduler(move |_| action(), delay)
    }

    /// Like [`schedule_sync_task`](Self::schedule_sync_task), but the action
    /// receives the scheduler that runs it
    pub fn schedule_with_scheduler<F>(&self, action: F, delay: f64) -> SyncScheduleItem
    where
        F: FnOnce(&Scheduler) + Send + 'static,
    {
        assert!(!delay.is_nan(), "Task delay must not be NaN");
        let (task, handle) = SyncTask::new(self.next_id(), delay, Box::new(action));
        self.shared.sync_tasks.push(task);
        handle
    }

    /// Advance every pending sync task by `delta` seconds and run the due ones
    ///
    /// Called once per engine tick. Tasks scheduled while this runs are first
    /// counted down on the following call. Returns the number of tasks run.
    pub fn run_all_sync_tasks(&self, delta: f64) -> usize {
        let due = self.shared.sync_tasks.take_due(delta);
        let count = due.len();
        for task in due {
            task.run(self);
        }
        count
    }

    /// Number of sync tasks still counting down
    pub fn pending_sync_tasks(&self) -> usize {
        self.shared.sync_tasks.len()
    }

    /// Drop every pending sync task without running it
    pub fn clear_sync_tasks(&self) {
        self.shared.sync_tasks.clear();
    }

    /// Start `action` on the background pool right away
    pub fn start_async_task<F>(&self, action: F) -> AsyncScheduleItem
    where
        F: FnOnce() + Send + 'static,
    {
        let item = self.add_async_task(action, None);
        item.run_me();
        item
    }

    /// Build an async task bound to an optional follow-up without starting it
    ///
    /// Start it with [`AsyncScheduleItem::run_me`] or chain it onto another
    /// item.
    pub fn add_async_task<F>(&self, action: F, follow_up: Option<AsyncScheduleItem>) -> AsyncScheduleItem
    where
        F: FnOnce() + Send + 'static,
    {
        AsyncScheduleItem::new(
            self.next_id(),
            self.shared.pool.clone(),
            Box::new(action),
            follow_up,
        )
    }

    /// Number of threads available to async tasks
    pub fn worker_count(&self) -> usize {
        self.shared.pool.thread_count()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending_sync_tasks", &self.pending_sync_tasks())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_zero_delay_runs_on_next_run() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let handle = scheduler.schedule_sync_task(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }, 0.0);

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.run_all_sync_tasks(0.016), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(handle.has_fired());
        assert_eq!(scheduler.pending_sync_tasks(), 0);
    }

    #[test]
    fn test_fifo_among_due_tasks() {
        let scheduler = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, delay) in [("a", 0.3), ("b", 0.1), ("c", 0.2)] {
            let log = Arc::clone(&log);
            scheduler.schedule_sync_task(move || log.lock().unwrap().push(name), delay);
        }

        scheduler.run_all_sync_tasks(0.5);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_sync_task(|| panic!("task failure"), 0.0);
        let c = Arc::clone(&counter);
        scheduler.schedule_sync_task(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }, 0.0);

        assert_eq!(scheduler.run_all_sync_tasks(0.1), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_scheduled_during_run_waits_for_next_run() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        scheduler.schedule_with_scheduler(move |sched| {
            sched.schedule_sync_task(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }, 0.0);
        }, 0.0);

        scheduler.run_all_sync_tasks(0.1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_sync_tasks(), 1);

        scheduler.run_all_sync_tasks(0.1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_schedule_from_background_thread() {
        let scheduler = Scheduler::new();
        let remote = scheduler.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);

        let item = scheduler.start_async_task(move || {
            remote.schedule_sync_task(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }, 0.0);
        });
        assert!(item.wait_timeout(Duration::from_secs(5)));

        scheduler.run_all_sync_tasks(0.0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "Task delay must not be NaN")]
    fn test_nan_delay_rejected() {
        Scheduler::new().schedule_sync_task(|| {}, f64::NAN);
    }

    #[test]
    fn test_zero_worker_threads_rejected() {
        assert!(Scheduler::with_worker_threads(0).is_err());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
