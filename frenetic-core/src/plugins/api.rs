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
//! Plugin trait and the context handed to plugins
//!
//! # Contracts
//!
//! Plugins must:
//! - Register event handlers through their [`PluginContext`] so they are
//!   tracked under the plugin's [`EventSource`]
//! - Not create circular dependencies with other plugins

use std::any::Any;

use crate::engine::{EngineEvents, EntityLifecycleArgs};
use crate::event::{EventSource, HandlerId};
use crate::physics::PhysicsSpace;
use crate::scheduler::Scheduler;

/// Version of the plugin API
///
/// Format: MAJOR.MINOR.PATCH following semantic versioning.
pub const PLUGIN_API_VERSION: &str = "0.2.0";

/// Scoped engine access given to a plugin while it loads or unloads
pub struct PluginContext<'a> {
    source: &'a EventSource,
    events: &'a mut EngineEvents,
    scheduler: &'a Scheduler,
    physics: &'a mut PhysicsSpace,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(
        source: &'a EventSource,
        events: &'a mut EngineEvents,
        scheduler: &'a Scheduler,
        physics: &'a mut PhysicsSpace,
    ) -> Self {
        PluginContext {
            source,
            events,
            scheduler,
            physics,
        }
    }

    /// Source every handler of this plugin is tracked under
    pub fn source(&self) -> &EventSource {
        self.source
    }

    /// The engine's lifecycle events
    ///
    /// Handlers added directly should use [`source`](Self::source) so they
    /// are removed when the plugin unloads.
    pub fn events_mut(&mut self) -> &mut EngineEvents {
        self.events
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

    /// Observe entity spawns under this plugin's source
    pub fn on_entity_spawn<F>(&mut self, handler: F, priority: f64) -> HandlerId
    where
        F: FnMut(&EntityLifecycleArgs) + 'static,
    {
        self.events
            .on_entity_spawn
            .add_event(handler, self.source, priority)
    }

    /// Observe entity despawns under this plugin's source
    pub fn on_entity_despawn<F>(&mut self, handler: F, priority: f64) -> HandlerId
    where
        F: FnMut(&EntityLifecycleArgs) + 'static,
    {
        self.events
            .on_entity_despawn
            .add_event(handler, self.source, priority)
    }
}

/// Lifecycle hooks for plugins
pub trait Plugin {
    /// Get the name of this plugin
    ///
    /// Must be unique across all registered plugins.
    fn name(&self) -> &str;

    /// Get the version of this plugin
    fn version(&self) -> &str;

    /// Get the plugin API version this plugin was built against
    ///
    /// Used for compatibility checking. Should return PLUGIN_API_VERSION.
    fn api_version(&self) -> &str {
        PLUGIN_API_VERSION
    }

    /// Get the list of plugin names this plugin depends on
    ///
    /// Dependencies are loaded first and unloaded last.
    fn dependencies(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Register handlers and set up state
    ///
    /// # Errors
    ///
    /// Returns an error message if loading fails. Handlers registered before
    /// the failure are removed.
    fn load(&mut self, context: &mut PluginContext<'_>) -> Result<(), String>;

    /// Release state
    ///
    /// Handlers registered under the plugin's source are removed after this
    /// returns, whether or not it succeeds.
    fn unload(&mut self, _context: &mut PluginContext<'_>) -> Result<(), String> {
        Ok(())
    }

    /// Allow downcasting to concrete plugin types
    fn as_any(&self) -> &dyn Any;

    /// Allow mutable downcasting to concrete plugin types
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
