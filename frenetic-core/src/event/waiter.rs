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
//! Cooperative suspension for waitable event handlers
//!
//! A waitable handler is a step function. Each call receives a
//! [`FreneticEventWaiter`]; calling [`wait`](FreneticEventWaiter::wait)
//! before returning suspends the handler, and the scheduler calls it again
//! after that many seconds of tick time with [`stage`](FreneticEventWaiter::stage)
//! incremented. Returning without waiting completes the handler.
//!
//! ```text
//! step(stage 0) --wait(d0)--> [sync task, d0] --> step(stage 1) --return--> complete
//! ```
//!
//! No thread ever blocks: resumption is an ordinary sync task.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error};

use crate::scheduler::{panic_message, Scheduler};

pub(crate) type WaitableFn<A> = Arc<dyn Fn(&A, &mut FreneticEventWaiter) + Send + Sync>;

/// Suspension control handed to waitable handlers
#[derive(Debug, Default)]
pub struct FreneticEventWaiter {
    stage: u32,
    requested: Option<f64>,
    waited_total: f64,
}

impl FreneticEventWaiter {
    /// How many times the handler has been resumed after a wait
    ///
    /// 0 on the first call made during [`fire`](super::FreneticEvent::fire).
    pub fn stage(&self) -> u32 {
        self.stage
    }

    /// Suspend the handler for `seconds` of tick time once it returns
    ///
    /// Calling this more than once in the same step keeps the last value.
    /// Negative or NaN delays resume on the next tick.
    pub fn wait(&mut self, seconds: f64) {
        self.requested = Some(if seconds.is_nan() { 0.0 } else { seconds.max(0.0) });
    }

    /// Whether the current step asked to be suspended
    pub fn is_waiting(&self) -> bool {
        self.requested.is_some()
    }

    /// Total seconds waited across all completed suspensions
    pub fn waited_total(&self) -> f64 {
        self.waited_total
    }
}

/// Completion flag of a suspended waitable handler
#[derive(Debug, Clone)]
pub struct WaitHandle {
    complete: Arc<AtomicBool>,
}

impl WaitHandle {
    /// Whether the handler has run to completion (or panicked)
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

/// One in-flight execution of a waitable handler
pub(crate) struct WaitableRun<A> {
    handler: WaitableFn<A>,
    args: Arc<A>,
    waiter: FreneticEventWaiter,
    complete: Arc<AtomicBool>,
}

impl<A> WaitableRun<A>
where
    A: Send + Sync + 'static,
{
    pub(crate) fn new(handler: WaitableFn<A>, args: Arc<A>) -> Self {
        WaitableRun {
            handler,
            args,
            waiter: FreneticEventWaiter::default(),
            complete: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn handle(&self) -> WaitHandle {
        WaitHandle {
            complete: Arc::clone(&self.complete),
        }
    }

    /// Run one step; reschedule through `scheduler` if the handler waits
    ///
    /// Returns true when the handler completed in this step.
    pub(crate) fn step(mut self, scheduler: &Scheduler) -> bool {
        self.waiter.requested = None;
        let handler = Arc::clone(&self.handler);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            handler(&self.args, &mut self.waiter)
        }));

        if let Err(payload) = result {
            error!(
                "Waitable event handler panicked at stage {}: {}",
                self.waiter.stage,
                panic_message(payload.as_ref())
            );
            self.complete.store(true, Ordering::Release);
            return true;
        }

        match self.waiter.requested.take() {
            Some(delay) => {
                self.waiter.stage += 1;
                self.waiter.waited_total += delay;
                debug!("Waitable event handler suspended for {}s", delay);
                scheduler.schedule_with_scheduler(move |sched| {
                    self.step(sched);
                }, delay);
                false
            }
            None => {
                self.complete.store(true, Ordering::Release);
                true
            }
        }
    }
}
