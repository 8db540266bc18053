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
//! Capability composition through properties
//!
//! A property is a typed unit of behavior or data attached to a
//! [`PropertyHolder`]. Entities are given their capabilities (health, physics,
//! AI, render hooks) by attaching properties rather than through a type
//! hierarchy.
//!
//! # Invariants
//!
//! - A holder keeps at most one property per concrete type.
//! - A property instance is held by at most one holder. Each property carries
//!   a non-owning back-reference ([`PropertySlot`]) naming its holder; it is
//!   `None` while detached.
//!
//! Both invariants are checked at attach time and reported as
//! [`PropertyError`](crate::error::PropertyError).
//!
//! # Example
//!
//! ```
//! use frenetic_core::property::{Property, PropertyHolder, PropertySlot};
//!
//! #[derive(Clone, Default)]
//! struct Health {
//!     slot: PropertySlot,
//!     points: u32,
//! }
//!
//! impl Property for Health {
//!     fn slot(&self) -> &PropertySlot { &self.slot }
//!     fn slot_mut(&mut self) -> &mut PropertySlot { &mut self.slot }
//! }
//!
//! let mut holder = PropertyHolder::new();
//! holder.add_property(Health { points: 10, ..Default::default() }).unwrap();
//! assert_eq!(holder.get_property::<Health>().unwrap().points, 10);
//! ```

mod holder;

pub use holder::PropertyHolder;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{LifecycleContext, TickContext};

static NEXT_HOLDER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`PropertyHolder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(u64);

impl HolderId {
    pub(crate) fn next() -> Self {
        HolderId(NEXT_HOLDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Holder({})", self.0)
    }
}

/// Back-reference from a property to the holder it is attached to
///
/// Embed one in every property type. Only the holder sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySlot {
    holder: Option<HolderId>,
}

impl PropertySlot {
    /// Create a detached slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Holder this property is attached to, if any
    pub fn holder(&self) -> Option<HolderId> {
        self.holder
    }

    pub(crate) fn attach(&mut self, holder: HolderId) {
        self.holder = Some(holder);
    }

    pub(crate) fn clear(&mut self) {
        self.holder = None;
    }
}

/// Object-safe cloning and downcasting support for properties
///
/// Implemented automatically for every `Property + Clone` type.
pub trait PropertyClone {
    /// Shallow copy including the holder back-reference
    fn clone_boxed(&self) -> Box<dyn Property>;

    /// Allow downcasting to the concrete property type
    fn as_any(&self) -> &dyn Any;

    /// Allow mutable downcasting to the concrete property type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into `Box<dyn Any>` for by-value downcasting
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Property + Clone> PropertyClone for T {
    fn clone_boxed(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A capability unit attached to a [`PropertyHolder`]
///
/// Hooks are optional. `on_added` and `on_removed` fire exactly once per
/// attach/detach cycle. `on_spawn`, `on_despawn` and `on_tick` are driven by
/// the engine for properties attached to spawned entities.
pub trait Property: PropertyClone + 'static {
    /// Storage for the holder back-reference
    fn slot(&self) -> &PropertySlot;

    /// Mutable storage for the holder back-reference
    fn slot_mut(&mut self) -> &mut PropertySlot;

    /// Name used in errors and logs
    fn property_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Holder this property is attached to, if any
    fn holder(&self) -> Option<HolderId> {
        self.slot().holder()
    }

    /// Called after the property is attached to a holder
    fn on_added(&mut self) {}

    /// Called after the property is detached from its holder
    fn on_removed(&mut self) {}

    /// Called when the owning entity is spawned into an engine
    fn on_spawn(&mut self, _ctx: &mut LifecycleContext<'_>) {}

    /// Called when the owning entity is despawned
    fn on_despawn(&mut self, _ctx: &mut LifecycleContext<'_>) {}

    /// Called once per frame while the owning entity ticks
    fn on_tick(&mut self, _ctx: &mut TickContext<'_>) {}

    /// Shallow copy with the holder back-reference cleared
    ///
    /// Use this to stamp template properties onto new holders.
    fn duplicate_clean(&self) -> Box<dyn Property> {
        let mut copy = self.clone_boxed();
        copy.slot_mut().clear();
        copy
    }

    /// Box the property for heterogeneous property lists
    fn into_boxed(self) -> Box<dyn Property>
    where
        Self: Sized,
    {
        Box::new(self)
    }
}
