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
//! Entity lifecycle orchestration
//!
//! [`BasicEngine`] owns the entity registry, the [`Scheduler`](crate::scheduler::Scheduler)
//! and the [`PhysicsSpace`](crate::physics::PhysicsSpace), and drives them
//! once per [`tick`](BasicEngine::tick):
//!
//! 1. Run due sync tasks
//! 2. Step the physics simulation
//! 3. Snapshot the entity list
//! 4. Tick every snapshotted entity that has ticking enabled
//!
//! Every entity in the snapshot gets exactly one tick per frame, even if it
//! (or any other entity) is despawned partway through the frame.

mod basic;
mod context;
mod entity;

pub use basic::BasicEngine;
pub use context::{LifecycleContext, TickContext};
pub use entity::{BasicEntity, EngineEntity, Entity};

pub(crate) use context::EngineCommand;

use std::fmt;

use crate::event::{EventSource, FreneticEvent};

/// Identity of a spawned entity
///
/// Assigned from a monotonic counter; never reused by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw id
    pub fn new(raw: u64) -> Self {
        EntityId(raw)
    }

    /// Raw id value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EID({})", self.0)
    }
}

/// Arguments of the engine's entity lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLifecycleArgs {
    /// Entity that was spawned or despawned
    pub entity: EntityId,
}

/// Events fired by the engine
#[derive(Debug, Default)]
pub struct EngineEvents {
    /// Fired after an entity is registered and its properties saw `on_spawn`
    pub on_entity_spawn: FreneticEvent<EntityLifecycleArgs>,
    /// Fired after an entity's properties saw `on_despawn`
    pub on_entity_despawn: FreneticEvent<EntityLifecycleArgs>,
}

impl EngineEvents {
    /// Remove every handler registered under `source` from all events
    pub fn remove_by_source(&mut self, source: &EventSource) -> usize {
        self.on_entity_spawn.remove_by_source(source) + self.on_entity_despawn.remove_by_source(source)
    }

    /// Total number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.on_entity_spawn.len() + self.on_entity_despawn.len()
    }
}
