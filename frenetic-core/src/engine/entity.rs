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
//! Entities driven by [`BasicEngine`](super::BasicEngine)
//!
//! An engine is generic over its entity flavor. Every flavor embeds a
//! [`BasicEntity`] carrying the identity, flags and property holder the
//! engine manages; [`Entity`] is the plain flavor with nothing else.

use std::fmt;

use super::{EntityId, TickContext};
use crate::property::PropertyHolder;

/// State the engine keeps on every entity
pub struct BasicEntity {
    pub(crate) id: Option<EntityId>,
    pub(crate) spawned: bool,
    ticks: bool,
    properties: PropertyHolder,
}

impl BasicEntity {
    /// Create an unspawned entity
    pub fn new(ticks: bool) -> Self {
        BasicEntity {
            id: None,
            spawned: false,
            ticks,
            properties: PropertyHolder::new(),
        }
    }

    /// Id assigned at spawn time
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Whether the entity is currently registered with an engine
    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    /// Whether the engine ticks this entity
    pub fn ticks(&self) -> bool {
        self.ticks
    }

    /// Enable or disable ticking
    pub fn set_ticks(&mut self, ticks: bool) {
        self.ticks = ticks;
    }

    /// Attached properties
    pub fn properties(&self) -> &PropertyHolder {
        &self.properties
    }

    /// Mutable access to the attached properties
    pub fn properties_mut(&mut self) -> &mut PropertyHolder {
        &mut self.properties
    }

    /// Run `on_tick` on every attached property, in attach order
    pub fn tick_properties(&mut self, ctx: &mut TickContext<'_>) {
        self.properties.tick_properties(ctx);
    }
}

impl fmt::Debug for BasicEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicEntity")
            .field("id", &self.id)
            .field("spawned", &self.spawned)
            .field("ticks", &self.ticks)
            .field("properties", &self.properties)
            .finish()
    }
}

/// An entity flavor an engine can own
pub trait EngineEntity: 'static {
    /// Construct an unspawned entity
    fn create(ticks: bool) -> Self
    where
        Self: Sized;

    /// Engine-managed state
    fn base(&self) -> &BasicEntity;

    /// Mutable engine-managed state
    fn base_mut(&mut self) -> &mut BasicEntity;

    /// Per-frame logic
    ///
    /// The default ticks every attached property.
    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.base_mut().tick_properties(ctx);
    }

    /// Id assigned at spawn time
    fn id(&self) -> Option<EntityId> {
        self.base().id()
    }

    /// Attached properties
    fn properties(&self) -> &PropertyHolder {
        self.base().properties()
    }

    /// Mutable access to the attached properties
    fn properties_mut(&mut self) -> &mut PropertyHolder {
        self.base_mut().properties_mut()
    }
}

/// Plain entity: identity plus properties
#[derive(Debug)]
pub struct Entity {
    base: BasicEntity,
}

impl EngineEntity for Entity {
    fn create(ticks: bool) -> Self {
        Entity {
            base: BasicEntity::new(ticks),
        }
    }

    fn base(&self) -> &BasicEntity {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BasicEntity {
        &mut self.base
    }
}
