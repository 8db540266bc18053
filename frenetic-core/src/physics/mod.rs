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
//! Physics-space integration
//!
//! The rigid-body simulation is an external collaborator reached through the
//! [`PhysicsBackend`] trait. [`PhysicsSpace`] wraps a backend and keeps the
//! one-body-per-entity correlation used to map ray-cast hits back to
//! entities. [`PhysicsEntityProperty`] ties an entity's lifetime to a body.
//!
//! [`SimpleWorld`] is the built-in backend: unconstrained spheres under a
//! global gravity field, enough for queries and demos.

mod property;
mod space;
mod world;

pub use property::PhysicsEntityProperty;
pub use space::{EntityHit, PhysicsSpace};
pub use world::SimpleWorld;

use std::fmt;

use glam::DVec3;

use crate::engine::EntityId;

/// Opaque handle to a body inside a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u64);

impl BodyHandle {
    /// Wrap a backend-specific raw handle
    pub fn new(raw: u64) -> Self {
        BodyHandle(raw)
    }

    /// Raw handle value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Description (and snapshot) of a spherical rigid body
///
/// A mass of zero marks the body immovable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Center of the body
    pub position: DVec3,
    /// Linear velocity
    pub velocity: DVec3,
    /// Mass in kilograms
    pub mass: f64,
    /// Collision radius used by ray casts
    pub radius: f64,
}

impl BodyDesc {
    /// A resting sphere of unit mass at the origin
    ///
    /// # Panics
    ///
    /// Panics if `radius` is not positive and finite
    pub fn sphere(radius: f64) -> Self {
        assert!(
            radius > 0.0 && radius.is_finite(),
            "Body radius must be positive and finite"
        );
        BodyDesc {
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            mass: 1.0,
            radius,
        }
    }

    /// Place the body at `position`
    pub fn at(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    /// Give the body an initial velocity
    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the body's mass
    ///
    /// # Panics
    ///
    /// Panics if `mass` is negative or not finite
    pub fn with_mass(mut self, mass: f64) -> Self {
        assert!(mass >= 0.0 && mass.is_finite(), "Mass must be non-negative and finite");
        self.mass = mass;
        self
    }

    /// Make the body immovable
    pub fn immovable(mut self) -> Self {
        self.mass = 0.0;
        self
    }

    /// Check whether the body ignores gravity and integration
    pub fn is_immovable(&self) -> bool {
        self.mass == 0.0
    }

    /// Check that position and velocity are finite
    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// A backend-level ray cast hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Body that was hit
    pub body: BodyHandle,
    /// Distance from the ray origin along the normalized direction
    pub distance: f64,
    /// World-space point of impact
    pub point: DVec3,
}

/// The external rigid-body simulation
///
/// Every body carries an opaque tag slot; the physics space stores the
/// owning entity there so hits can be correlated back.
pub trait PhysicsBackend {
    /// Insert a body and return its handle
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Remove a body, returning its final state
    fn remove_body(&mut self, handle: BodyHandle) -> Option<BodyDesc>;

    /// Current state of a body
    fn body(&self, handle: BodyHandle) -> Option<BodyDesc>;

    /// Overwrite the linear velocity of a body
    ///
    /// Returns false for unknown handles.
    fn set_velocity(&mut self, handle: BodyHandle, velocity: DVec3) -> bool;

    /// Number of bodies in the simulation
    fn body_count(&self) -> usize;

    /// Advance the simulation by `delta` seconds
    fn step(&mut self, delta: f64);

    /// Cast a ray and return every accepted hit sorted by ascending distance
    ///
    /// `filter` returns false for bodies that should be ignored.
    fn ray_cast(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_distance: f64,
        filter: &dyn Fn(BodyHandle) -> bool,
    ) -> Vec<RayHit>;

    /// Global gravity vector
    fn gravity(&self) -> DVec3;

    /// Replace the global gravity vector
    fn set_gravity(&mut self, gravity: DVec3);

    /// Entity tag stored on a body
    fn tag(&self, handle: BodyHandle) -> Option<EntityId>;

    /// Store (or clear) the entity tag of a body
    ///
    /// Returns false for unknown handles.
    fn set_tag(&mut self, handle: BodyHandle, tag: Option<EntityId>) -> bool;
}
