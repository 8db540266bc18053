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
//! Scheduling and event dispatch tests
//!
//! Sync task countdowns, async chain collapsing, handler ordering, and
//! waitable handlers resumed by engine ticks.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frenetic_core::engine::{BasicEngine, EntityLifecycleArgs};
use frenetic_core::event::{EventSource, FreneticEvent, FreneticEventWaiter};
use frenetic_core::scheduler::Scheduler;

#[test]
fn test_sync_task_fires_once_when_delay_elapses() {
    let scheduler = Scheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let item = scheduler.schedule_sync_task(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        1.0,
    );

    // 0.3 + 0.3 + 0.3 = 0.9 < 1.0
    for _ in 0..3 {
        scheduler.run_all_sync_tasks(0.3);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    scheduler.run_all_sync_tasks(0.3);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(item.has_fired());

    for _ in 0..5 {
        scheduler.run_all_sync_tasks(1.0);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pending_sync_tasks(), 0);
}

#[test]
fn test_zero_delay_runs_on_next_tick() {
    let scheduler = Scheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    scheduler.schedule_sync_task(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        0.0,
    );

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.run_all_sync_tasks(0.0), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancelled_task_never_runs() {
    let scheduler = Scheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let item = scheduler.schedule_sync_task(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        0.5,
    );

    assert!(item.cancel());
    scheduler.run_all_sync_tasks(1.0);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_task_scheduled_from_task_waits_for_next_tick() {
    let scheduler = Scheduler::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let outer = Arc::clone(&order);
    scheduler.schedule_with_scheduler(
        move |sched| {
            outer.lock().unwrap().push("outer");
            let inner = Arc::clone(&outer);
            sched.schedule_sync_task(move || inner.lock().unwrap().push("inner"), 0.0);
        },
        0.0,
    );

    scheduler.run_all_sync_tasks(0.1);
    assert_eq!(*order.lock().unwrap(), vec!["outer"]);
    scheduler.run_all_sync_tasks(0.1);
    assert_eq!(*order.lock().unwrap(), vec!["outer", "inner"]);
}

#[test]
#[should_panic(expected = "Task delay must not be NaN")]
fn test_nan_delay_panics() {
    let scheduler = Scheduler::new();
    scheduler.schedule_sync_task(|| {}, f64::NAN);
}

#[test]
fn test_async_chain_collapses_unstarted_follow_up() {
    let scheduler = Scheduler::with_worker_threads(2).unwrap();
    let ran = Arc::new(Mutex::new(Vec::new()));
    let (release, gate) = mpsc::channel::<()>();

    let head = scheduler.start_async_task(move || {
        let _ = gate.recv_timeout(Duration::from_secs(5));
    });

    let first = Arc::clone(&ran);
    let a = scheduler.add_async_task(move || first.lock().unwrap().push("A"), None);
    let carrier = head.replace_or_follow_with(a.clone());
    assert!(carrier.same_item(&a));

    let second = Arc::clone(&ran);
    let b = scheduler.add_async_task(move || second.lock().unwrap().push("B"), None);
    let carrier = head.replace_or_follow_with(b);
    assert!(carrier.same_item(&a));

    release.send(()).unwrap();
    assert!(a.wait_timeout(Duration::from_secs(5)));
    assert_eq!(*ran.lock().unwrap(), vec!["B"]);
}

#[test]
fn test_replace_on_unstarted_item_returns_it() {
    let scheduler = Scheduler::new();
    let ran = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&ran);
    let pending = scheduler.add_async_task(move || first.lock().unwrap().push("old"), None);
    let second = Arc::clone(&ran);
    let replacement = scheduler.add_async_task(move || second.lock().unwrap().push("new"), None);

    let carrier = pending.replace_or_follow_with(replacement);
    assert!(carrier.same_item(&pending));
    assert!(!pending.is_started());

    assert!(pending.run_me());
    assert!(!pending.run_me());
    assert!(pending.wait_timeout(Duration::from_secs(5)));
    assert_eq!(*ran.lock().unwrap(), vec!["new"]);
}

#[test]
fn test_follow_up_on_finished_item_starts_immediately() {
    let scheduler = Scheduler::new();
    let head = scheduler.start_async_task(|| {});
    assert!(head.wait_timeout(Duration::from_secs(5)));

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let next = scheduler.add_async_task(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        None,
    );
    let carrier = head.replace_or_follow_with(next.clone());
    assert!(carrier.same_item(&next));
    assert!(next.wait_timeout(Duration::from_secs(5)));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_handlers_run_in_priority_order() {
    let scheduler = Scheduler::new();
    let source = EventSource::new("ordering");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut event: FreneticEvent<u32> = FreneticEvent::new();

    for priority in [5.0, 1.0, 3.0] {
        let seen = Rc::clone(&seen);
        event.add_event(move |_| seen.borrow_mut().push(priority), &source, priority);
    }

    let outcome = event.fire(&scheduler, 0);
    assert_eq!(outcome.invoked, 3);
    assert!(outcome.all_complete());
    assert_eq!(*seen.borrow(), vec![1.0, 3.0, 5.0]);
}

#[test]
fn test_panicking_handler_does_not_stop_dispatch() {
    let scheduler = Scheduler::new();
    let source = EventSource::new("faulty");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut event: FreneticEvent<&'static str> = FreneticEvent::new();

    event.add_event(|_| panic!("handler failure"), &source, 0.0);
    let after = Rc::clone(&seen);
    event.add_event(move |name| after.borrow_mut().push(*name), &source, 1.0);

    event.fire(&scheduler, "fired");
    assert_eq!(*seen.borrow(), vec!["fired"]);
}

#[test]
fn test_waitable_handler_resumes_with_engine_ticks() {
    let mut engine: BasicEngine = BasicEngine::default();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let source = EventSource::new("waitable");

    let log = Arc::clone(&stages);
    engine.events_mut().on_entity_spawn.add_waitable_event(
        move |args: &EntityLifecycleArgs, waiter: &mut FreneticEventWaiter| {
            log.lock().unwrap().push((args.entity.raw(), waiter.stage()));
            if waiter.stage() == 0 {
                waiter.wait(1.0);
            }
        },
        &source,
        0.0,
    );

    let id = engine.spawn_entity(false, Vec::new()).unwrap();
    assert_eq!(*stages.lock().unwrap(), vec![(id.raw(), 0)]);

    engine.tick(0.5);
    assert_eq!(stages.lock().unwrap().len(), 1);

    engine.tick(0.5);
    assert_eq!(*stages.lock().unwrap(), vec![(id.raw(), 0), (id.raw(), 1)]);

    engine.tick(5.0);
    assert_eq!(stages.lock().unwrap().len(), 2);
}

#[test]
fn test_engine_tick_drives_sync_tasks() {
    let mut engine: BasicEngine = BasicEngine::default();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    engine.scheduler().schedule_sync_task(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        0.25,
    );

    engine.tick(0.1);
    engine.tick(0.1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    engine.tick(0.1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!((engine.global_tick_time() - 0.3).abs() < 1e-12);
}
