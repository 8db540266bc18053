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
//! Background tasks with follow-up chaining
//!
//! # State Machine
//!
//! ```text
//! NotStarted --run_me--> Started --body returns--> Done --> follow-up.run_me()
//! ```
//!
//! An item that is never started never reaches `Done`. There is no
//! cancellation: a started body always runs to completion, though pending
//! work can be superseded with [`AsyncScheduleItem::replace_or_follow_with`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::error;

use super::panic_message;
use super::pool::TaskPool;

pub(crate) type AsyncAction = Box<dyn FnOnce() + Send>;

struct AsyncState {
    action: Option<AsyncAction>,
    follow_up: Option<AsyncScheduleItem>,
    started: bool,
    done: bool,
}

struct AsyncInner {
    id: u64,
    pool: TaskPool,
    state: Mutex<AsyncState>,
    finished: Condvar,
}

/// Handle to a unit of background work
///
/// Cloning the handle shares the same underlying item.
#[derive(Clone)]
pub struct AsyncScheduleItem {
    inner: Arc<AsyncInner>,
}

impl AsyncScheduleItem {
    pub(crate) fn new(
        id: u64,
        pool: TaskPool,
        action: AsyncAction,
        follow_up: Option<AsyncScheduleItem>,
    ) -> Self {
        AsyncScheduleItem {
            inner: Arc::new(AsyncInner {
                id,
                pool,
                state: Mutex::new(AsyncState {
                    action: Some(action),
                    follow_up,
                    started: false,
                    done: false,
                }),
                finished: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AsyncState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scheduler-assigned task id
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether [`run_me`](Self::run_me) has been called
    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    /// Whether the body has finished (successfully or by panicking)
    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    /// The item that runs once this one is done, if any
    pub fn follow_up(&self) -> Option<AsyncScheduleItem> {
        self.lock().follow_up.clone()
    }

    /// Check whether two handles refer to the same item
    pub fn same_item(&self, other: &AsyncScheduleItem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Start background execution
    ///
    /// Returns false if the item was already started.
    pub fn run_me(&self) -> bool {
        let action = {
            let mut state = self.lock();
            if state.started {
                return false;
            }
            state.started = true;
            state.action.take()
        };

        let item = self.clone();
        self.inner.pool.spawn(move || item.execute(action));
        true
    }

    fn execute(self, action: Option<AsyncAction>) {
        if let Some(action) = action {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(action)) {
                error!(
                    "Async task {} panicked: {}",
                    self.inner.id,
                    panic_message(payload.as_ref())
                );
            }
        }

        let follow_up = {
            let mut state = self.lock();
            state.done = true;
            state.follow_up.clone()
        };
        self.inner.finished.notify_all();

        if let Some(next) = follow_up {
            next.run_me();
        }
    }

    /// Queue `item` behind this one, collapsing work that has not started yet
    ///
    /// - If this item already has a follow-up, the call is delegated to the
    ///   tail of the chain.
    /// - If this item has not started, its pending action and follow-up are
    ///   replaced by `item`'s; `item` itself is discarded and this item is
    ///   returned.
    /// - If this item is done, `item` is started immediately.
    /// - Otherwise `item` becomes the follow-up and runs when this one ends.
    ///
    /// Returns the item that will carry the submitted payload. `item` must be
    /// a fresh, unstarted item not shared with other chains.
    pub fn replace_or_follow_with(&self, item: AsyncScheduleItem) -> AsyncScheduleItem {
        if self.same_item(&item) {
            return item;
        }

        let mut state = self.lock();
        if let Some(next) = state.follow_up.clone() {
            drop(state);
            return next.replace_or_follow_with(item);
        }

        if !state.started {
            let mut other = item.lock();
            state.action = other.action.take();
            state.follow_up = other.follow_up.take();
            return self.clone();
        }

        if state.done {
            drop(state);
            item.run_me();
            return item;
        }

        state.follow_up = Some(item.clone());
        item
    }

    /// Run `item` after this one without collapsing
    ///
    /// If this item is done, `item` starts immediately; otherwise it replaces
    /// any existing follow-up.
    pub fn follow_with(&self, item: AsyncScheduleItem) {
        let mut state = self.lock();
        if state.done {
            drop(state);
            item.run_me();
        } else {
            state.follow_up = Some(item);
        }
    }

    /// Block until the item is done
    ///
    /// Never returns for an item that is never started.
    pub fn wait(&self) {
        let mut state = self.lock();
        while !state.done {
            state = self
                .inner
                .finished
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the item is done or `timeout` elapses
    ///
    /// Returns whether the item is done.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.done {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .inner
                .finished
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

impl fmt::Debug for AsyncScheduleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AsyncScheduleItem")
            .field("id", &self.inner.id)
            .field("started", &state.started)
            .field("done", &state.done)
            .field("has_follow_up", &state.follow_up.is_some())
            .finish()
    }
}
