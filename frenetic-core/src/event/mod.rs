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
//! Prioritized multi-handler events
//!
//! A [`FreneticEvent`] keeps handlers sorted by ascending priority. Ties keep
//! registration order. Each handler is registered under an [`EventSource`]
//! so everything a plugin or subsystem added can be removed in one call.
//!
//! Handlers come in two forms:
//!
//! - **Sync** handlers run to completion inside [`FreneticEvent::fire`].
//! - **Waitable** handlers may suspend themselves for a number of seconds of
//!   tick time through a [`FreneticEventWaiter`]; their continuation runs as
//!   a scheduler sync task (see [`waiter`]).
//!
//! # Example
//!
//! ```
//! use frenetic_core::event::{EventSource, FreneticEvent};
//! use frenetic_core::scheduler::Scheduler;
//! use std::sync::{Arc, Mutex};
//!
//! let scheduler = Scheduler::new();
//! let source = EventSource::new("example");
//! let order = Arc::new(Mutex::new(Vec::new()));
//!
//! let mut event: FreneticEvent<u32> = FreneticEvent::new();
//! for priority in [5.0, 1.0, 3.0] {
//!     let order = Arc::clone(&order);
//!     event.add_event(move |_| order.lock().unwrap().push(priority), &source, priority);
//! }
//!
//! event.fire(&scheduler, 0);
//! assert_eq!(*order.lock().unwrap(), vec![1.0, 3.0, 5.0]);
//! ```

pub mod waiter;

pub use waiter::{FreneticEventWaiter, WaitHandle};

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::error;

use crate::scheduler::{panic_message, Scheduler};
use waiter::{WaitableFn, WaitableRun};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Tracks who registered a handler, for bulk removal
///
/// Two sources are equal only if one was cloned from the other.
#[derive(Debug, Clone)]
pub struct EventSource {
    id: u64,
    name: Arc<str>,
}

impl EventSource {
    /// Create a new, distinct source
    pub fn new(name: &str) -> Self {
        EventSource {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    /// Descriptive name of the source
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for EventSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventSource {}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Identifier of one handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

enum EventHandler<A> {
    Sync(Box<dyn FnMut(&A)>),
    Waitable(WaitableFn<A>),
}

struct HandlerEntry<A> {
    id: HandlerId,
    priority: f64,
    source: EventSource,
    handler: EventHandler<A>,
}

/// Result of firing an event
#[derive(Debug, Default)]
pub struct FireOutcome {
    /// Handlers invoked during this fire
    pub invoked: usize,
    /// Waitable handlers that suspended and will resume on later ticks
    pub suspended: Vec<WaitHandle>,
}

impl FireOutcome {
    /// Whether every handler finished during the fire
    pub fn all_complete(&self) -> bool {
        self.suspended.iter().all(WaitHandle::is_complete)
    }
}

/// An ordered list of prioritized handlers for events carrying `A`
pub struct FreneticEvent<A> {
    handlers: Vec<HandlerEntry<A>>,
    next_id: u64,
}

impl<A> FreneticEvent<A> {
    /// Create an event with no handlers
    pub fn new() -> Self {
        FreneticEvent {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, handler: EventHandler<A>, source: &EventSource, priority: f64) -> HandlerId {
        assert!(!priority.is_nan(), "Handler priority must not be NaN");
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push(HandlerEntry {
            id,
            priority,
            source: source.clone(),
            handler,
        });
        // Stable: equal priorities stay in registration order
        self.handlers.sort_by(|a, b| a.priority.total_cmp(&b.priority));
        id
    }

    /// Register a handler that runs to completion when the event fires
    ///
    /// Lower priorities run first.
    ///
    /// # Panics
    ///
    /// Panics if `priority` is NaN
    pub fn add_event<F>(&mut self, handler: F, source: &EventSource, priority: f64) -> HandlerId
    where
        F: FnMut(&A) + 'static,
    {
        self.insert(EventHandler::Sync(Box::new(handler)), source, priority)
    }

    /// Register a handler that may suspend itself through a waiter
    pub fn add_waitable_event<F>(&mut self, handler: F, source: &EventSource, priority: f64) -> HandlerId
    where
        F: Fn(&A, &mut FreneticEventWaiter) + Send + Sync + 'static,
    {
        self.insert(EventHandler::Waitable(Arc::new(handler)), source, priority)
    }

    /// Remove a single handler
    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|entry| entry.id != id);
        self.handlers.len() != before
    }

    /// Remove every handler registered under `source`
    ///
    /// Returns the number of handlers removed. Suspended waitable runs
    /// already queued on the scheduler still finish.
    pub fn remove_by_source(&mut self, source: &EventSource) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|entry| entry.source != *source);
        before - self.handlers.len()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Priorities of the registered handlers in invocation order
    pub fn priorities(&self) -> Vec<f64> {
        self.handlers.iter().map(|entry| entry.priority).collect()
    }
}

impl<A> FreneticEvent<A>
where
    A: Send + Sync + 'static,
{
    /// Invoke every handler in priority order
    ///
    /// Sync handlers and the first step of waitable handlers run before this
    /// returns. A handler that panics is logged and skipped.
    pub fn fire(&mut self, scheduler: &Scheduler, args: A) -> FireOutcome {
        let args = Arc::new(args);
        let mut outcome = FireOutcome::default();

        for entry in &mut self.handlers {
            outcome.invoked += 1;
            match &mut entry.handler {
                EventHandler::Sync(handler) => {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&args)));
                    if let Err(payload) = result {
                        error!(
                            "Event handler {:?} from {} panicked: {}",
                            entry.id,
                            entry.source,
                            panic_message(payload.as_ref())
                        );
                    }
                }
                EventHandler::Waitable(handler) => {
                    let run = WaitableRun::new(Arc::clone(handler), Arc::clone(&args));
                    let handle = run.handle();
                    if !run.step(scheduler) {
                        outcome.suspended.push(handle);
                    }
                }
            }
        }

        outcome
    }
}

impl<A> Default for FreneticEvent<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for FreneticEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreneticEvent")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;

    fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_priority_order() {
        let scheduler = Scheduler::new();
        let source = EventSource::new("test");
        let order = recorder();
        let mut event: FreneticEvent<()> = FreneticEvent::new();

        for (name, priority) in [("five", 5.0), ("one", 1.0), ("three", 3.0)] {
            let order = Rc::clone(&order);
            event.add_event(move |_| order.borrow_mut().push(name), &source, priority);
        }

        let outcome = event.fire(&scheduler, ());
        assert_eq!(outcome.invoked, 3);
        assert!(outcome.all_complete());
        assert_eq!(*order.borrow(), vec!["one", "three", "five"]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let scheduler = Scheduler::new();
        let source = EventSource::new("test");
        let order = recorder();
        let mut event: FreneticEvent<()> = FreneticEvent::new();

        for (name, priority) in [("a", 1.0), ("b", 0.0), ("c", 1.0), ("d", 1.0)] {
            let order = Rc::clone(&order);
            event.add_event(move |_| order.borrow_mut().push(name), &source, priority);
        }

        event.fire(&scheduler, ());
        assert_eq!(*order.borrow(), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_handlers_receive_args() {
        let scheduler = Scheduler::new();
        let source = EventSource::new("test");
        let total = Rc::new(RefCell::new(0));
        let mut event: FreneticEvent<u32> = FreneticEvent::new();

        let sink = Rc::clone(&total);
        event.add_event(move |value| *sink.borrow_mut() += *value, &source, 0.0);

        event.fire(&scheduler, 4);
        event.fire(&scheduler, 6);
        assert_eq!(*total.borrow(), 10);
    }

    #[test]
    fn test_remove_by_source() {
        let plugin = EventSource::new("plugin");
        let core = EventSource::new("core");
        let mut event: FreneticEvent<()> = FreneticEvent::new();

        event.add_event(|_| {}, &plugin, 0.0);
        event.add_event(|_| {}, &core, 1.0);
        event.add_event(|_| {}, &plugin.clone(), 2.0);

        assert_eq!(event.remove_by_source(&plugin), 2);
        assert_eq!(event.len(), 1);
        assert_eq!(event.priorities(), vec![1.0]);
        assert_eq!(event.remove_by_source(&plugin), 0);
    }

    #[test]
    fn test_sources_with_same_name_are_distinct() {
        let a = EventSource::new("same");
        let b = EventSource::new("same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.name(), "same");
    }

    #[test]
    fn test_remove_single_handler() {
        let source = EventSource::new("test");
        let mut event: FreneticEvent<()> = FreneticEvent::new();
        let first = event.add_event(|_| {}, &source, 0.0);
        event.add_event(|_| {}, &source, 0.0);

        assert!(event.remove_handler(first));
        assert!(!event.remove_handler(first));
        assert_eq!(event.len(), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_others() {
        let scheduler = Scheduler::new();
        let source = EventSource::new("test");
        let order = recorder();
        let mut event: FreneticEvent<()> = FreneticEvent::new();

        event.add_event(|_| panic!("handler failure"), &source, 0.0);
        let sink = Rc::clone(&order);
        event.add_event(move |_| sink.borrow_mut().push("after"), &source, 1.0);

        event.fire(&scheduler, ());
        assert_eq!(*order.borrow(), vec!["after"]);
    }

    #[test]
    fn test_waitable_handler_suspends_without_blocking_others() {
        let scheduler = Scheduler::new();
        let source = EventSource::new("test");
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut event: FreneticEvent<u32> = FreneticEvent::new();

        let waitable_log = Arc::clone(&log);
        event.add_waitable_event(
            move |value, waiter| {
                if waiter.stage() == 0 {
                    waitable_log.lock().unwrap().push(format!("start {}", value));
                    waiter.wait(1.0);
                } else {
                    waitable_log.lock().unwrap().push(format!("resume {}", value));
                }
            },
            &source,
            0.0,
        );
        let sync_log = Arc::clone(&log);
        event.add_event(move |value| sync_log.lock().unwrap().push(format!("sync {}", value)), &source, 1.0);

        let outcome = event.fire(&scheduler, 9);
        assert_eq!(outcome.suspended.len(), 1);
        assert!(!outcome.all_complete());
        assert_eq!(*log.lock().unwrap(), vec!["start 9", "sync 9"]);

        scheduler.run_all_sync_tasks(0.5);
        assert!(!outcome.all_complete());
        scheduler.run_all_sync_tasks(0.5);
        assert!(outcome.all_complete());
        assert_eq!(*log.lock().unwrap(), vec!["start 9", "sync 9", "resume 9"]);
    }

    #[test]
    fn test_waitable_handler_without_wait_completes_inline() {
        let scheduler = Scheduler::new();
        let source = EventSource::new("test");
        let mut event: FreneticEvent<()> = FreneticEvent::new();
        event.add_waitable_event(|_, _| {}, &source, 0.0);

        let outcome = event.fire(&scheduler, ());
        assert!(outcome.suspended.is_empty());
        assert_eq!(scheduler.pending_sync_tasks(), 0);
    }

    #[test]
    #[should_panic(expected = "Handler priority must not be NaN")]
    fn test_nan_priority_rejected() {
        let mut event: FreneticEvent<()> = FreneticEvent::new();
        event.add_event(|_| {}, &EventSource::new("test"), f64::NAN);
    }
}
