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
//! Benchmarks for task scheduling and event dispatch
//!
//! These benchmarks measure:
//! - Sync task countdown cost with many pending tasks
//! - Event fire cost for growing handler counts
//! - Async task round trip through the background pool

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frenetic_core::event::{EventSource, FreneticEvent};
use frenetic_core::scheduler::Scheduler;

fn bench_sync_countdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_countdown");

    for task_count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*task_count as u64));
        group.bench_with_input(
            BenchmarkId::new("pending", task_count),
            task_count,
            |b, &task_count| {
                let scheduler = Scheduler::new();
                let counter = Arc::new(AtomicUsize::new(0));
                for _ in 0..task_count {
                    let counter = Arc::clone(&counter);
                    scheduler.schedule_sync_task(
                        move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                        },
                        f64::MAX,
                    );
                }
                // Nothing becomes due, so every call walks the full queue
                b.iter(|| scheduler.run_all_sync_tasks(black_box(1.0 / 60.0)));
            },
        );
    }

    group.finish();
}

fn bench_event_fire(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_fire");
    let scheduler = Scheduler::new();

    for handler_count in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*handler_count as u64));
        group.bench_with_input(
            BenchmarkId::new("handlers", handler_count),
            handler_count,
            |b, &handler_count| {
                let source = EventSource::new("bench");
                let mut event: FreneticEvent<u64> = FreneticEvent::new();
                let mut sum = 0u64;
                for i in 0..handler_count {
                    event.add_event(move |value: &u64| {
                        black_box(value + i as u64);
                    }, &source, i as f64);
                }
                b.iter(|| {
                    sum += 1;
                    event.fire(&scheduler, black_box(sum))
                });
            },
        );
    }

    group.finish();
}

fn bench_async_round_trip(c: &mut Criterion) {
    let scheduler = Scheduler::new();

    c.bench_function("async_round_trip", |b| {
        b.iter(|| {
            let item = scheduler.start_async_task(|| {
                black_box(1 + 1);
            });
            item.wait();
        });
    });
}

criterion_group!(benches, bench_sync_countdown, bench_event_fire, bench_async_round_trip);
criterion_main!(benches);
