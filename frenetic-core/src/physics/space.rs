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
//! Entity-correlated view of a physics backend

use std::fmt;

use glam::DVec3;
use log::{debug, warn};

use super::{BodyDesc, BodyHandle, PhysicsBackend, RayHit, SimpleWorld};
use crate::engine::EntityId;

/// A ray cast hit resolved to its entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityHit {
    /// Entity owning the body that was hit
    pub entity: EntityId,
    /// Body that was hit
    pub body: BodyHandle,
    /// Distance from the ray origin
    pub distance: f64,
    /// World-space point of impact
    pub point: DVec3,
}

/// The simulation plus the set of entities that own a body in it
///
/// Holds exactly one body per entity. Bodies are tagged with their entity
/// so ray casts report entities rather than raw handles.
pub struct PhysicsSpace {
    backend: Box<dyn PhysicsBackend>,
    spawned: Vec<(EntityId, BodyHandle)>,
}

impl PhysicsSpace {
    /// Create a space backed by a [`SimpleWorld`]
    pub fn new(gravity: DVec3) -> Self {
        Self::with_backend(Box::new(SimpleWorld::new(gravity)))
    }

    /// Create a space over a custom backend
    pub fn with_backend(backend: Box<dyn PhysicsBackend>) -> Self {
        PhysicsSpace {
            backend,
            spawned: Vec::new(),
        }
    }

    /// Add a body for `entity` and tag it
    ///
    /// An entity owns at most one body. If it already has one, that body is
    /// removed first and a warning is logged.
    pub fn spawn(&mut self, entity: EntityId, desc: BodyDesc) -> BodyHandle {
        if let Some(old) = self.body_of(entity) {
            warn!("{} already owns {}; replacing it", entity, old);
            self.despawn(entity);
        }

        let handle = self.backend.add_body(desc);
        self.backend.set_tag(handle, Some(entity));
        self.spawned.push((entity, handle));
        debug!("Spawned {} for {}", handle, entity);
        handle
    }

    /// Remove the body owned by `entity`
    ///
    /// Returns the body's final state, or None if the entity had no body.
    pub fn despawn(&mut self, entity: EntityId) -> Option<BodyDesc> {
        let index = self.spawned.iter().position(|(e, _)| *e == entity)?;
        let (_, handle) = self.spawned.remove(index);
        self.backend.set_tag(handle, None);
        self.backend.remove_body(handle)
    }

    /// Advance the simulation
    pub fn step(&mut self, delta: f64) {
        self.backend.step(delta);
    }

    fn cast(
        &self,
        start: DVec3,
        direction: DVec3,
        max_distance: f64,
        filter: Option<&dyn Fn(EntityId) -> bool>,
    ) -> Vec<RayHit> {
        let backend = &self.backend;
        let accept = |handle: BodyHandle| match (filter, backend.tag(handle)) {
            (Some(filter), Some(entity)) => filter(entity),
            _ => true,
        };
        backend.ray_cast(start, direction, max_distance, &accept)
    }

    fn resolve(&self, hit: &RayHit) -> Option<EntityHit> {
        match self.backend.tag(hit.body) {
            Some(entity) => Some(EntityHit {
                entity,
                body: hit.body,
                distance: hit.distance,
                point: hit.point,
            }),
            None => {
                warn!(
                    "Ray trace hit {} at distance {} with no correlated entity",
                    hit.body, hit.distance
                );
                None
            }
        }
    }

    /// Entity owning the nearest body along the ray
    ///
    /// `filter` returns false for entities to ignore. A nearest hit whose
    /// body carries no entity tag is logged and reported as a miss.
    pub fn ray_trace_single(
        &self,
        start: DVec3,
        direction: DVec3,
        max_distance: f64,
        filter: Option<&dyn Fn(EntityId) -> bool>,
    ) -> Option<EntityHit> {
        let hits = self.cast(start, direction, max_distance, filter);
        hits.first().and_then(|hit| self.resolve(hit))
    }

    /// Every entity along the ray, nearest first
    ///
    /// Hits without an entity tag are logged and skipped.
    pub fn ray_trace_all(
        &self,
        start: DVec3,
        direction: DVec3,
        max_distance: f64,
        filter: Option<&dyn Fn(EntityId) -> bool>,
    ) -> Vec<EntityHit> {
        self.cast(start, direction, max_distance, filter)
            .iter()
            .filter_map(|hit| self.resolve(hit))
            .collect()
    }

    /// Global gravity of the simulation
    pub fn gravity(&self) -> DVec3 {
        self.backend.gravity()
    }

    /// Replace the global gravity of the simulation
    pub fn set_gravity(&mut self, gravity: DVec3) {
        self.backend.set_gravity(gravity);
    }

    /// Body owned by `entity`
    pub fn body_of(&self, entity: EntityId) -> Option<BodyHandle> {
        self.spawned
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, handle)| *handle)
    }

    /// Current state of the body owned by `entity`
    pub fn body_state(&self, entity: EntityId) -> Option<BodyDesc> {
        self.body_of(entity).and_then(|handle| self.backend.body(handle))
    }

    /// Overwrite the velocity of the body owned by `entity`
    pub fn set_velocity(&mut self, entity: EntityId, velocity: DVec3) -> bool {
        match self.body_of(entity) {
            Some(handle) => self.backend.set_velocity(handle, velocity),
            None => false,
        }
    }

    /// Check whether `entity` owns a body
    pub fn contains(&self, entity: EntityId) -> bool {
        self.body_of(entity).is_some()
    }

    /// Number of entities with a body
    pub fn entity_count(&self) -> usize {
        self.spawned.len()
    }

    /// Entities with a body, in spawn order
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.spawned.iter().map(|(entity, _)| *entity)
    }

    /// Underlying simulation
    pub fn backend(&self) -> &dyn PhysicsBackend {
        self.backend.as_ref()
    }

    /// Mutable access to the underlying simulation
    ///
    /// Bodies added directly are not correlated with any entity.
    pub fn backend_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.backend.as_mut()
    }
}

impl Default for PhysicsSpace {
    fn default() -> Self {
        Self::with_backend(Box::new(SimpleWorld::default()))
    }
}

impl fmt::Debug for PhysicsSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsSpace")
            .field("entities", &self.spawned.len())
            .field("bodies", &self.backend.body_count())
            .field("gravity", &self.gravity())
            .finish()
    }
}
