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
//! Built-in sphere simulation
//!
//! Bodies move under a single global gravity field using velocity Verlet.
//! With a constant acceleration the scheme reduces to:
//!
//! ```text
//! x(t + dt) = x(t) + v(t)*dt + 0.5*g*dt²
//! v(t + dt) = v(t) + g*dt
//! ```
//!
//! There is no body-body collision response. An optional floor plane at
//! `z = height` stops falling bodies.

use std::collections::BTreeMap;

use glam::DVec3;
use log::warn;

use super::{BodyDesc, BodyHandle, PhysicsBackend, RayHit};
use crate::engine::EntityId;

struct SimpleBody {
    desc: BodyDesc,
    tag: Option<EntityId>,
}

/// Minimal [`PhysicsBackend`] with sphere bodies
///
/// Bodies are stored in handle order so stepping and ray casts are
/// deterministic.
pub struct SimpleWorld {
    bodies: BTreeMap<BodyHandle, SimpleBody>,
    next_handle: u64,
    gravity: DVec3,
    floor: Option<f64>,
}

impl SimpleWorld {
    /// Create an empty world with the given gravity
    pub fn new(gravity: DVec3) -> Self {
        SimpleWorld {
            bodies: BTreeMap::new(),
            next_handle: 1,
            gravity,
            floor: None,
        }
    }

    /// Add a floor plane at `z = height`
    ///
    /// Movable bodies that sink below it are placed on top and lose their
    /// vertical velocity.
    pub fn with_floor(mut self, height: f64) -> Self {
        self.floor = Some(height);
        self
    }

    /// Height of the floor plane, if any
    pub fn floor(&self) -> Option<f64> {
        self.floor
    }
}

impl Default for SimpleWorld {
    fn default() -> Self {
        Self::new(DVec3::new(0.0, 0.0, -9.8))
    }
}

/// Distance along a normalized ray to the first intersection with a sphere
///
/// A ray starting inside the sphere reports the exit point.
fn intersect_sphere(origin: DVec3, direction: DVec3, center: DVec3, radius: f64) -> Option<f64> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = -b - root;
    if near >= 0.0 {
        return Some(near);
    }
    let far = -b + root;
    (far >= 0.0).then_some(far)
}

impl PhysicsBackend for SimpleWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle::new(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, SimpleBody { desc, tag: None });
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> Option<BodyDesc> {
        self.bodies.remove(&handle).map(|body| body.desc)
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyDesc> {
        self.bodies.get(&handle).map(|body| body.desc)
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: DVec3) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(body) => {
                body.desc.velocity = velocity;
                true
            }
            None => false,
        }
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn step(&mut self, delta: f64) {
        if !(delta > 0.0 && delta.is_finite()) {
            return;
        }

        let gravity = self.gravity;
        for (handle, body) in self.bodies.iter_mut() {
            let desc = &mut body.desc;
            if desc.is_immovable() {
                continue;
            }

            desc.position += desc.velocity * delta + 0.5 * gravity * delta * delta;
            desc.velocity += gravity * delta;

            if let Some(height) = self.floor {
                if desc.position.z - desc.radius < height {
                    desc.position.z = height + desc.radius;
                    desc.velocity.z = desc.velocity.z.max(0.0);
                }
            }

            if !desc.is_valid() {
                warn!("{} has a non-finite state after stepping", handle);
            }
        }
    }

    fn ray_cast(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_distance: f64,
        filter: &dyn Fn(BodyHandle) -> bool,
    ) -> Vec<RayHit> {
        let direction = match direction.try_normalize() {
            Some(d) => d,
            None => return Vec::new(),
        };

        let mut hits: Vec<RayHit> = self
            .bodies
            .iter()
            .filter_map(|(handle, body)| {
                let distance =
                    intersect_sphere(origin, direction, body.desc.position, body.desc.radius)?;
                (distance <= max_distance && filter(*handle)).then(|| RayHit {
                    body: *handle,
                    distance,
                    point: origin + direction * distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn gravity(&self) -> DVec3 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: DVec3) {
        self.gravity = gravity;
    }

    fn tag(&self, handle: BodyHandle) -> Option<EntityId> {
        self.bodies.get(&handle).and_then(|body| body.tag)
    }

    fn set_tag(&mut self, handle: BodyHandle, tag: Option<EntityId>) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(body) => {
                body.tag = tag;
                true
            }
            None => false,
        }
    }
}
