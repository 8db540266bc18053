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
//! Type-keyed property container

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::engine::{LifecycleContext, TickContext};
use crate::error::PropertyError;
use crate::property::{HolderId, Property};

/// Container mapping a concrete property type to its single attached instance
///
/// Properties are kept in attach order so that lifecycle hooks fire
/// deterministically.
///
/// # Thread Safety
///
/// A holder is owned by one entity and mutated from the main tick thread.
/// [`get_or_add_property`](Self::get_or_add_property) is atomic with respect
/// to the holder's own state only.
pub struct PropertyHolder {
    id: HolderId,
    properties: HashMap<TypeId, Box<dyn Property>>,
    order: Vec<TypeId>,
}

impl PropertyHolder {
    /// Create an empty holder with a fresh identity
    pub fn new() -> Self {
        PropertyHolder {
            id: HolderId::next(),
            properties: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Identity written into the back-reference of attached properties
    pub fn id(&self) -> HolderId {
        self.id
    }

    /// Attach a property
    ///
    /// # Errors
    ///
    /// - [`PropertyError::AlreadyHeld`] if the property still names a holder
    /// - [`PropertyError::DuplicateType`] if a property of the same type is
    ///   already attached; the existing one stays attached
    pub fn add_property<P: Property>(&mut self, property: P) -> Result<(), PropertyError> {
        self.add_boxed_property(Box::new(property))
    }

    /// Attach a boxed property, keyed by its runtime type
    pub fn add_boxed_property(&mut self, mut property: Box<dyn Property>) -> Result<(), PropertyError> {
        if let Some(holder) = property.holder() {
            return Err(PropertyError::AlreadyHeld {
                property: property.property_name(),
                holder,
            });
        }

        let key = Any::type_id((*property).as_any());
        if self.properties.contains_key(&key) {
            return Err(PropertyError::DuplicateType {
                property: property.property_name(),
            });
        }

        property.slot_mut().attach(self.id);
        self.order.push(key);
        self.properties.entry(key).or_insert(property).on_added();
        Ok(())
    }

    /// Attach several properties in order, stopping at the first failure
    pub fn add_properties<I>(&mut self, properties: I) -> Result<(), PropertyError>
    where
        I: IntoIterator<Item = Box<dyn Property>>,
    {
        for property in properties {
            self.add_boxed_property(property)?;
        }
        Ok(())
    }

    /// Detach the property of type `P`
    ///
    /// Returns false if no such property was attached.
    pub fn remove_property<P: Property>(&mut self) -> bool {
        self.detach(TypeId::of::<P>()).is_some()
    }

    /// Detach the property with the given type key
    pub fn remove_property_type(&mut self, key: TypeId) -> bool {
        self.detach(key).is_some()
    }

    /// Detach the property of type `P` and hand it back to the caller
    pub fn take_property<P: Property>(&mut self) -> Option<P> {
        let property = self.detach(TypeId::of::<P>())?;
        property.into_any().downcast::<P>().ok().map(|boxed| *boxed)
    }

    fn detach(&mut self, key: TypeId) -> Option<Box<dyn Property>> {
        let mut property = self.properties.remove(&key)?;
        self.order.retain(|k| *k != key);
        property.slot_mut().clear();
        property.on_removed();
        Some(property)
    }

    /// Check whether a property of type `P` is attached
    pub fn has_property<P: Property>(&self) -> bool {
        self.properties.contains_key(&TypeId::of::<P>())
    }

    /// Check whether a property with the given type key is attached
    pub fn has_property_type(&self, key: TypeId) -> bool {
        self.properties.contains_key(&key)
    }

    /// Get the property of type `P`
    ///
    /// Callers are expected to know the property is attached; a miss is
    /// reported as [`PropertyError::Missing`].
    pub fn get_property<P: Property>(&self) -> Result<&P, PropertyError> {
        self.try_get_property::<P>().ok_or(PropertyError::Missing {
            property: type_name::<P>(),
        })
    }

    /// Get the property of type `P` mutably
    pub fn get_property_mut<P: Property>(&mut self) -> Result<&mut P, PropertyError> {
        self.properties
            .get_mut(&TypeId::of::<P>())
            .and_then(|p| (**p).as_any_mut().downcast_mut::<P>())
            .ok_or(PropertyError::Missing {
                property: type_name::<P>(),
            })
    }

    /// Get the property of type `P` if it is attached
    pub fn try_get_property<P: Property>(&self) -> Option<&P> {
        self.properties
            .get(&TypeId::of::<P>())
            .and_then(|p| (**p).as_any().downcast_ref::<P>())
    }

    /// Get the property of type `P`, attaching one built by `factory` if absent
    ///
    /// Not safe under concurrent calls on the same holder.
    pub fn get_or_add_property<P, F>(&mut self, factory: F) -> Result<&mut P, PropertyError>
    where
        P: Property,
        F: FnOnce() -> P,
    {
        if !self.has_property::<P>() {
            self.add_property(factory())?;
        }
        self.get_property_mut::<P>()
    }

    /// Iterate attached properties in attach order
    pub fn properties(&self) -> impl Iterator<Item = &dyn Property> + '_ {
        self.order
            .iter()
            .filter_map(move |key| self.properties.get(key).map(|p| &**p))
    }

    /// Number of attached properties
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Check whether no properties are attached
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Detach every property, in attach order
    pub fn clear(&mut self) {
        let keys: Vec<TypeId> = self.order.clone();
        for key in keys {
            self.detach(key);
        }
    }

    pub(crate) fn notify_spawn(&mut self, ctx: &mut LifecycleContext<'_>) {
        for key in &self.order {
            if let Some(property) = self.properties.get_mut(key) {
                property.on_spawn(ctx);
            }
        }
    }

    pub(crate) fn notify_despawn(&mut self, ctx: &mut LifecycleContext<'_>) {
        for key in &self.order {
            if let Some(property) = self.properties.get_mut(key) {
                property.on_despawn(ctx);
            }
        }
    }

    pub(crate) fn tick_properties(&mut self, ctx: &mut TickContext<'_>) {
        for key in &self.order {
            if let Some(property) = self.properties.get_mut(key) {
                property.on_tick(ctx);
            }
        }
    }
}

impl Default for PropertyHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyHolder")
            .field("id", &self.id)
            .field(
                "properties",
                &self.properties().map(|p| p.property_name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
