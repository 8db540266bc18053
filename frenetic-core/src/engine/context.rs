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
//! Scoped engine access handed to entities and properties
//!
//! Neither context exposes the entity registry. Registry changes requested
//! during a tick are recorded as commands and applied by the engine once the
//! requesting entity's tick returns.

use super::EntityId;
use crate::physics::PhysicsSpace;
use crate::property::Property;
use crate::scheduler::Scheduler;

/// Registry change requested from inside a tick
pub(crate) enum EngineCommand {
    Despawn(EntityId),
    Spawn {
        id: EntityId,
        ticks: bool,
        properties: Vec<Box<dyn Property>>,
    },
}

/// Access given to property spawn and despawn hooks
pub struct LifecycleContext<'a> {
    entity: EntityId,
    physics: &'a mut PhysicsSpace,
    scheduler: &'a Scheduler,
}

impl<'a> LifecycleContext<'a> {
    pub(crate) fn new(entity: EntityId, physics: &'a mut PhysicsSpace, scheduler: &'a Scheduler) -> Self {
        LifecycleContext {
            entity,
            physics,
            scheduler,
        }
    }

    /// Entity being spawned or despawned
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The engine's physics space
    pub fn physics(&self) -> &PhysicsSpace {
        self.physics
    }

    /// Mutable access to the engine's physics space
    pub fn physics_mut(&mut self) -> &mut PhysicsSpace {
        self.physics
    }

    /// The engine's scheduler
    pub fn scheduler(&self) -> &Scheduler {
        self.scheduler
    }
}

/// Access given to an entity (and its properties) during its tick
pub struct TickContext<'a> {
    entity: EntityId,
    delta: f64,
    global_tick_time: f64,
    scheduler: &'a Scheduler,
    physics: &'a mut PhysicsSpace,
    current_eid: &'a mut u64,
    commands: &'a mut Vec<EngineCommand>,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        entity: EntityId,
        delta: f64,
        global_tick_time: f64,
        scheduler: &'a Scheduler,
        physics: &'a mut PhysicsSpace,
        current_eid: &'a mut u64,
        commands: &'a mut Vec<EngineCommand>,
    ) -> Self {
        TickContext {
            entity,
            delta,
            global_tick_time,
            scheduler,
            physics,
            current_eid,
            commands,
        }
    }

    /// Entity being ticked
    pub fn id(&self) -> EntityId {
        self.entity
    }

    /// Seconds covered by this tick
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Seconds of tick time since the engine started, including this tick
    pub fn global_tick_time(&self) -> f64 {
        self.global_tick_time
    }

    /// The engine's scheduler
    pub fn scheduler(&self) -> &Scheduler {
        self.scheduler
    }

    /// The engine's physics space
    pub fn physics(&self) -> &PhysicsSpace {
        self.physics
    }

    /// Mutable access to the engine's physics space
    pub fn physics_mut(&mut self) -> &mut PhysicsSpace {
        self.physics
    }

    /// Despawn the ticking entity once its tick returns
    pub fn despawn_self(&mut self) {
        self.commands.push(EngineCommand::Despawn(self.entity));
    }

    /// Despawn another entity once this tick returns
    ///
    /// If `other` has not ticked yet this frame it still does.
    pub fn despawn(&mut self, other: EntityId) {
        self.commands.push(EngineCommand::Despawn(other));
    }

    /// Spawn a new entity after every entity has ticked this frame
    ///
    /// The id is reserved immediately. The new entity first ticks next frame.
    /// If its properties conflict the spawn is dropped and logged. Despawning
    /// the id before the frame ends cancels the spawn.
    pub fn spawn_entity(&mut self, ticks: bool, properties: Vec<Box<dyn Property>>) -> EntityId {
        *self.current_eid += 1;
        let id = EntityId::new(*self.current_eid);
        self.commands.push(EngineCommand::Spawn {
            id,
            ticks,
            properties,
        });
        id
    }
}
