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
//! Basic example demonstrating entities, properties and scheduling
//!
//! This example shows how to spawn entities with properties, react to
//! lifecycle events, schedule delayed work, and despawn an entity from
//! inside its own tick.
//!
//! Run with `RUST_LOG=debug` to see the engine's own log output.

use frenetic_core::engine::{BasicEngine, TickContext};
use frenetic_core::event::{EventSource, FreneticEventWaiter};
use frenetic_core::property::{Property, PropertySlot};
use frenetic_core::EngineConfig;

// Counts down and despawns its entity when the fuse runs out
#[derive(Debug, Clone)]
struct Fuse {
    slot: PropertySlot,
    remaining: f64,
}

impl Fuse {
    fn new(seconds: f64) -> Self {
        Fuse {
            slot: PropertySlot::new(),
            remaining: seconds,
        }
    }
}

impl Property for Fuse {
    fn slot(&self) -> &PropertySlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut PropertySlot {
        &mut self.slot
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) {
        self.remaining -= ctx.delta();
        if self.remaining <= 0.0 {
            println!("  [Fuse] {} burned out at t={:.1}s", ctx.id(), ctx.global_tick_time());
            ctx.despawn_self();
        }
    }
}

#[derive(Debug, Clone)]
struct Label {
    slot: PropertySlot,
    text: String,
}

impl Label {
    fn new(text: &str) -> Self {
        Label {
            slot: PropertySlot::new(),
            text: text.to_string(),
        }
    }
}

impl Property for Label {
    fn slot(&self) -> &PropertySlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut PropertySlot {
        &mut self.slot
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Frenetic Core - Basic Example");
    println!("=============================\n");

    let config = EngineConfig::from_env()?;
    let mut engine: BasicEngine = BasicEngine::new(config)?;
    let source = EventSource::new("basic_example");

    engine.events_mut().on_entity_spawn.add_event(
        |args| println!("  [Event] spawned {}", args.entity),
        &source,
        0.0,
    );
    engine.events_mut().on_entity_despawn.add_event(
        |args| println!("  [Event] despawned {}", args.entity),
        &source,
        0.0,
    );

    // Waitable handler: reacts now, then again two seconds later
    engine.events_mut().on_entity_despawn.add_waitable_event(
        |args, waiter: &mut FreneticEventWaiter| {
            if waiter.stage() == 0 {
                println!("  [Waitable] {} is gone; checking back in 2s", args.entity);
                waiter.wait(2.0);
            } else {
                println!("  [Waitable] still no sign of {}", args.entity);
            }
        },
        &source,
        10.0,
    );

    println!("Spawning entities:");
    let crate_id = engine.spawn_entity(true, vec![Label::new("crate").into_boxed()])?;
    let bomb = engine.spawn_entity(
        true,
        vec![Label::new("bomb").into_boxed(), Fuse::new(1.5).into_boxed()],
    )?;
    println!("  Created {} and {}\n", crate_id, bomb);

    println!("Labels in the world:");
    for (id, label) in engine.get_all_by_type::<Label>() {
        println!("  - {}: {}", id, label.text);
    }
    println!();

    // Adding a second property of the same type is rejected
    let duplicate = engine.spawn_entity(
        true,
        vec![Label::new("a").into_boxed(), Label::new("b").into_boxed()],
    );
    if let Err(e) = duplicate {
        println!("Rejected spawn: {}\n", e);
    }

    engine.scheduler().schedule_sync_task(
        || println!("  [Scheduler] one second of tick time has passed"),
        1.0,
    );

    println!("Running 8 frames of 0.5s:");
    for frame in 1..=8 {
        println!(" Frame {} ({} entities)", frame, engine.entity_count());
        engine.tick(0.5);
    }

    println!("\nShutting down...");
    engine.shutdown()?;
    println!("Done after {:.1}s of tick time", engine.global_tick_time());

    Ok(())
}
