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
//! Property binding an entity to a rigid body

use super::{BodyDesc, BodyHandle, PhysicsSpace};
use crate::engine::{EntityId, LifecycleContext};
use crate::property::{Property, PropertySlot};

/// Gives an entity a body in the engine's physics space
///
/// The body is added when the entity spawns and removed when it despawns.
/// On despawn the description is updated with the body's final state, so a
/// [`duplicate_clean`](Property::duplicate_clean) copy respawns where the
/// body came to rest.
#[derive(Debug)]
pub struct PhysicsEntityProperty {
    slot: PropertySlot,
    desc: BodyDesc,
    handle: Option<BodyHandle>,
    entity: Option<EntityId>,
}

impl PhysicsEntityProperty {
    /// Create a property that will spawn `desc`
    pub fn new(desc: BodyDesc) -> Self {
        PhysicsEntityProperty {
            slot: PropertySlot::new(),
            desc,
            handle: None,
            entity: None,
        }
    }

    /// Body description used at the next spawn
    pub fn desc(&self) -> &BodyDesc {
        &self.desc
    }

    /// Handle of the live body, while spawned
    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }

    /// Whether the body is currently in a physics space
    pub fn is_spawned(&self) -> bool {
        self.handle.is_some()
    }

    /// Live state of the body in `space`
    pub fn state(&self, space: &PhysicsSpace) -> Option<BodyDesc> {
        self.entity.and_then(|entity| space.body_state(entity))
    }
}

// A copy never shares the live body.
impl Clone for PhysicsEntityProperty {
    fn clone(&self) -> Self {
        PhysicsEntityProperty {
            slot: self.slot.clone(),
            desc: self.desc,
            handle: None,
            entity: None,
        }
    }
}

impl Property for PhysicsEntityProperty {
    fn slot(&self) -> &PropertySlot {
        &self.slot
    }

    fn slot_mut(&mut self) -> &mut PropertySlot {
        &mut self.slot
    }

    fn property_name(&self) -> &'static str {
        "PhysicsEntityProperty"
    }

    fn on_spawn(&mut self, ctx: &mut LifecycleContext<'_>) {
        let entity = ctx.entity();
        self.handle = Some(ctx.physics_mut().spawn(entity, self.desc));
        self.entity = Some(entity);
    }

    fn on_despawn(&mut self, ctx: &mut LifecycleContext<'_>) {
        if let Some(entity) = self.entity.take() {
            if let Some(last) = ctx.physics_mut().despawn(entity) {
                self.desc = last;
            }
        }
        self.handle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use glam::DVec3;

    #[test]
    fn test_spawn_and_despawn_manage_body() {
        let mut space = PhysicsSpace::new(DVec3::ZERO);
        let scheduler = Scheduler::new();
        let entity = EntityId::new(4);
        let mut property =
            PhysicsEntityProperty::new(BodyDesc::sphere(1.0).with_velocity(DVec3::X));

        property.on_spawn(&mut LifecycleContext::new(entity, &mut space, &scheduler));
        assert!(property.is_spawned());
        assert_eq!(space.body_of(entity), property.handle());

        space.step(3.0);
        assert_eq!(property.state(&space).unwrap().position.x, 3.0);

        property.on_despawn(&mut LifecycleContext::new(entity, &mut space, &scheduler));
        assert!(!property.is_spawned());
        assert!(!space.contains(entity));
        assert_eq!(property.desc().position.x, 3.0);
    }

    #[test]
    fn test_clone_does_not_share_body() {
        let mut space = PhysicsSpace::new(DVec3::ZERO);
        let scheduler = Scheduler::new();
        let mut property = PhysicsEntityProperty::new(BodyDesc::sphere(1.0));
        property.on_spawn(&mut LifecycleContext::new(EntityId::new(1), &mut space, &scheduler));

        let copy = property.clone();
        assert!(property.is_spawned());
        assert!(!copy.is_spawned());
        assert!(copy.state(&space).is_none());
    }
}
