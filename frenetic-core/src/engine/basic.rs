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
//! The engine orchestrator

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, info, warn};

use super::{
    EngineCommand, EngineEntity, EngineEvents, Entity, EntityId, EntityLifecycleArgs,
    LifecycleContext, TickContext,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::physics::{PhysicsBackend, PhysicsSpace};
use crate::plugins::{Plugin, PluginRegistry};
use crate::property::Property;
use crate::scheduler::{panic_message, Scheduler};

struct PendingSpawn {
    id: EntityId,
    ticks: bool,
    properties: Vec<Box<dyn Property>>,
}

/// Owns the entity registry, the scheduler and the physics space
///
/// # Example
///
/// ```
/// use frenetic_core::engine::BasicEngine;
///
/// let mut engine: BasicEngine = BasicEngine::default();
/// let first = engine.spawn_entity(true, Vec::new()).unwrap();
/// let second = engine.spawn_entity(false, Vec::new()).unwrap();
/// assert!(second > first);
///
/// engine.tick(1.0 / 60.0);
/// assert!(engine.despawn_entity(first));
/// assert!(!engine.despawn_entity(first));
/// assert_eq!(engine.entity_ids(), &[second]);
/// ```
pub struct BasicEngine<E: EngineEntity = Entity> {
    config: EngineConfig,
    entities: HashMap<EntityId, E>,
    /// Spawned entities in insertion order
    entity_list: Vec<EntityId>,
    /// Entities despawned during the current tick that may still owe a tick
    limbo: HashMap<EntityId, E>,
    pending_spawns: Vec<PendingSpawn>,
    ticking: bool,
    current_eid: u64,
    delta: f64,
    global_tick_time: f64,
    scheduler: Scheduler,
    physics: PhysicsSpace,
    events: EngineEvents,
    plugins: PluginRegistry,
}

impl<E: EngineEntity> BasicEngine<E> {
    /// Create an engine over the built-in physics world
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the async worker pool cannot be
    /// built.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let physics = PhysicsSpace::new(config.gravity);
        Self::with_physics(config, physics)
    }

    /// Create an engine over a custom physics backend
    ///
    /// The backend's gravity is replaced by the configured one.
    pub fn with_backend(config: EngineConfig, backend: Box<dyn PhysicsBackend>) -> Result<Self, EngineError> {
        let mut physics = PhysicsSpace::with_backend(backend);
        physics.set_gravity(config.gravity);
        Self::with_physics(config, physics)
    }

    fn with_physics(config: EngineConfig, physics: PhysicsSpace) -> Result<Self, EngineError> {
        let scheduler = match config.worker_threads {
            Some(threads) => Scheduler::with_worker_threads(threads)?,
            None => Scheduler::new(),
        };
        Ok(Self::from_parts(config, scheduler, physics))
    }

    fn from_parts(config: EngineConfig, scheduler: Scheduler, physics: PhysicsSpace) -> Self {
        BasicEngine {
            config,
            entities: HashMap::new(),
            entity_list: Vec::new(),
            limbo: HashMap::new(),
            pending_spawns: Vec::new(),
            ticking: false,
            current_eid: 0,
            delta: 0.0,
            global_tick_time: 0.0,
            scheduler,
            physics,
            events: EngineEvents::default(),
            plugins: PluginRegistry::new(),
        }
    }

    fn next_eid(&mut self) -> EntityId {
        self.current_eid += 1;
        EntityId::new(self.current_eid)
    }

    /// Create, register and spawn an entity
    ///
    /// See [`spawn_entity_with`](Self::spawn_entity_with).
    pub fn spawn_entity(
        &mut self,
        ticks: bool,
        properties: Vec<Box<dyn Property>>,
    ) -> Result<EntityId, EngineError> {
        self.spawn_entity_with(ticks, |_| {}, properties)
    }

    /// Create an entity, let `configure` adjust it, then spawn it
    ///
    /// The entity receives the next id before `configure` runs. After the
    /// properties are attached it is registered, marked spawned, every
    /// property sees `on_spawn`, and `on_entity_spawn` fires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Property`] if the properties conflict. The
    /// entity is then not registered, its properties are detached, and its
    /// id is not reused.
    pub fn spawn_entity_with<F>(
        &mut self,
        ticks: bool,
        configure: F,
        properties: Vec<Box<dyn Property>>,
    ) -> Result<EntityId, EngineError>
    where
        F: FnOnce(&mut E),
    {
        let mut entity = E::create(ticks);
        let id = self.next_eid();
        entity.base_mut().id = Some(id);
        configure(&mut entity);
        self.register(id, entity, properties)
    }

    fn register(
        &mut self,
        id: EntityId,
        mut entity: E,
        properties: Vec<Box<dyn Property>>,
    ) -> Result<EntityId, EngineError> {
        let base = entity.base_mut();
        if let Err(e) = base.properties_mut().add_properties(properties) {
            base.properties_mut().clear();
            return Err(e.into());
        }
        base.id = Some(id);
        base.spawned = true;

        self.entity_list.push(id);
        let entity = self.entities.entry(id).or_insert(entity);
        let mut ctx = LifecycleContext::new(id, &mut self.physics, &self.scheduler);
        entity.base_mut().properties_mut().notify_spawn(&mut ctx);

        self.events
            .on_entity_spawn
            .fire(&self.scheduler, EntityLifecycleArgs { entity: id });
        debug!("Spawned {}", id);
        Ok(id)
    }

    /// Despawn a spawned entity
    ///
    /// Properties see `on_despawn`, `on_entity_despawn` fires, and the entity
    /// leaves the registry. Despawning an entity that is not spawned logs a
    /// warning and returns false.
    pub fn despawn_entity(&mut self, id: EntityId) -> bool {
        let Some(mut entity) = self.entities.remove(&id) else {
            if self.config.warn_on_double_despawn {
                warn!("Despawn of {} ignored: entity is not spawned", id);
            }
            return false;
        };

        {
            let mut ctx = LifecycleContext::new(id, &mut self.physics, &self.scheduler);
            entity.base_mut().properties_mut().notify_despawn(&mut ctx);
        }
        self.events
            .on_entity_despawn
            .fire(&self.scheduler, EntityLifecycleArgs { entity: id });

        self.entity_list.retain(|e| *e != id);
        entity.base_mut().spawned = false;
        debug!("Despawned {}", id);

        if self.ticking {
            self.limbo.insert(id, entity);
        }
        true
    }

    /// Advance the engine by one frame of `delta` seconds
    ///
    /// Runs due sync tasks, steps physics, then ticks every entity that was
    /// spawned when the frame began. Entities spawned from inside a tick are
    /// registered after the loop and tick from the next frame on.
    ///
    /// # Panics
    ///
    /// Panics if `delta` is negative, NaN or infinite. With tick isolation
    /// off, an entity tick panic is re-raised after the entity is restored
    /// and the frame's deferred spawns are registered.
    pub fn tick(&mut self, delta: f64) {
        assert!(
            delta >= 0.0 && delta.is_finite(),
            "Tick delta must be non-negative and finite"
        );
        self.delta = delta;
        self.global_tick_time += delta;

        self.scheduler.run_all_sync_tasks(delta);
        self.physics.step(delta);

        let snapshot = self.entity_list.clone();
        self.ticking = true;
        for id in snapshot {
            if let Some(payload) = self.tick_entity(id) {
                self.finish_frame();
                panic::resume_unwind(payload);
            }
        }
        self.finish_frame();
    }

    /// Leave the ticking state and register spawns deferred during the frame
    fn finish_frame(&mut self) {
        self.ticking = false;
        self.limbo.clear();

        for spawn in mem::take(&mut self.pending_spawns) {
            let mut entity = E::create(spawn.ticks);
            entity.base_mut().id = Some(spawn.id);
            if let Err(e) = self.register(spawn.id, entity, spawn.properties) {
                error!("Deferred spawn of {} failed: {}", spawn.id, e);
            }
        }
    }

    /// Tick one entity and apply the commands it recorded
    ///
    /// The entity is always put back, even if its tick panicked. Returns the
    /// panic payload when tick isolation is off so the caller can resume it.
    fn tick_entity(&mut self, id: EntityId) -> Option<Box<dyn Any + Send>> {
        let ticks = self
            .entities
            .get(&id)
            .or_else(|| self.limbo.get(&id))
            .map(|entity| entity.base().ticks());
        if ticks != Some(true) {
            return None;
        }

        let (mut entity, in_limbo) = match self.entities.remove(&id) {
            Some(entity) => (entity, false),
            None => match self.limbo.remove(&id) {
                Some(entity) => (entity, true),
                None => return None,
            },
        };

        let mut commands = Vec::new();
        let mut escaped = None;
        {
            let mut ctx = TickContext::new(
                id,
                self.delta,
                self.global_tick_time,
                &self.scheduler,
                &mut self.physics,
                &mut self.current_eid,
                &mut commands,
            );
            let result = panic::catch_unwind(AssertUnwindSafe(|| entity.tick(&mut ctx)));
            if let Err(payload) = result {
                error!("Tick of {} panicked: {}", id, panic_message(payload.as_ref()));
                if !self.config.isolate_entity_ticks {
                    escaped = Some(payload);
                }
            }
        }

        if in_limbo {
            self.limbo.insert(id, entity);
        } else {
            self.entities.insert(id, entity);
        }
        self.apply_commands(commands);
        escaped
    }

    fn apply_commands(&mut self, commands: Vec<EngineCommand>) {
        for command in commands {
            match command {
                EngineCommand::Despawn(target) => {
                    // A spawn still waiting for the end of the frame is dropped outright
                    match self.pending_spawns.iter().position(|spawn| spawn.id == target) {
                        Some(index) => {
                            self.pending_spawns.remove(index);
                            debug!("Cancelled deferred spawn of {}", target);
                        }
                        None => {
                            self.despawn_entity(target);
                        }
                    }
                }
                EngineCommand::Spawn {
                    id,
                    ticks,
                    properties,
                } => self.pending_spawns.push(PendingSpawn {
                    id,
                    ticks,
                    properties,
                }),
            }
        }
    }

    /// Every spawned entity carrying a `P`, in insertion order
    pub fn get_all_by_type<P: Property>(&self) -> impl Iterator<Item = (EntityId, &P)> + '_ {
        self.entity_list.iter().filter_map(move |id| {
            let entity = self.entities.get(id)?;
            entity
                .properties()
                .try_get_property::<P>()
                .map(|property| (*id, property))
        })
    }

    /// First spawned entity carrying a `P`
    pub fn get_any_by_type<P: Property>(&self) -> Option<(EntityId, &P)> {
        self.get_all_by_type::<P>().next()
    }

    /// Spawned entity by id
    pub fn entity(&self, id: EntityId) -> Option<&E> {
        self.entities.get(&id)
    }

    /// Mutable access to a spawned entity
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut E> {
        self.entities.get_mut(&id)
    }

    /// Enable or disable ticking for a spawned entity
    pub fn set_ticks(&mut self, id: EntityId, ticks: bool) -> Result<(), EngineError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EngineError::UnknownEntity(id))?;
        entity.base_mut().set_ticks(ticks);
        Ok(())
    }

    /// Check whether `id` names a spawned entity
    pub fn is_spawned(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of spawned entities
    pub fn entity_count(&self) -> usize {
        self.entity_list.len()
    }

    /// Spawned entity ids in insertion order
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_list
    }

    /// Highest id handed out so far (0 before the first spawn)
    pub fn current_eid(&self) -> u64 {
        self.current_eid
    }

    /// Delta of the most recent tick
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Sum of all tick deltas
    pub fn global_tick_time(&self) -> f64 {
        self.global_tick_time
    }

    /// The engine's scheduler
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The engine's physics space
    pub fn physics(&self) -> &PhysicsSpace {
        &self.physics
    }

    /// Mutable access to the physics space
    pub fn physics_mut(&mut self) -> &mut PhysicsSpace {
        &mut self.physics
    }

    /// Lifecycle events
    pub fn events(&self) -> &EngineEvents {
        &self.events
    }

    /// Mutable access to the lifecycle events
    pub fn events_mut(&mut self) -> &mut EngineEvents {
        &mut self.events
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered plugins
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Register a plugin to be loaded by [`load_plugins`](Self::load_plugins)
    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) -> Result<(), EngineError> {
        self.plugins.register(plugin).map_err(EngineError::Plugin)
    }

    /// Load every registered plugin in dependency order
    pub fn load_plugins(&mut self) -> Result<(), EngineError> {
        self.plugins
            .load_all(&mut self.events, &self.scheduler, &mut self.physics)
            .map_err(EngineError::Plugin)
    }

    /// Unload every plugin and drop the handlers they registered
    pub fn unload_plugins(&mut self) -> Result<(), EngineError> {
        self.plugins
            .unload_all(&mut self.events, &self.scheduler, &mut self.physics)
            .map_err(EngineError::Plugin)
    }

    /// Despawn every entity, then unload plugins
    ///
    /// Entities are despawned in insertion order, so plugin handlers still
    /// observe each despawn.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        let ids = self.entity_list.clone();
        let count = ids.len();
        for id in ids {
            self.despawn_entity(id);
        }
        self.unload_plugins()?;
        info!(
            "Engine shut down after {:.3}s of tick time ({} entities despawned)",
            self.global_tick_time, count
        );
        Ok(())
    }
}

impl<E: EngineEntity> Default for BasicEngine<E> {
    fn default() -> Self {
        let config = EngineConfig::default();
        let physics = PhysicsSpace::new(config.gravity);
        Self::from_parts(config, Scheduler::new(), physics)
    }
}

impl<E: EngineEntity> fmt::Debug for BasicEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicEngine")
            .field("entities", &self.entity_list.len())
            .field("current_eid", &self.current_eid)
            .field("global_tick_time", &self.global_tick_time)
            .field("scheduler", &self.scheduler)
            .field("physics", &self.physics)
            .finish()
    }
}
