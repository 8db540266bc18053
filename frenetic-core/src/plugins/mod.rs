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
//! Plugin system
//!
//! Plugins extend an engine by observing its lifecycle events and scheduling
//! work, without modifying the core.
//!
//! # Features
//!
//! - **Static Registration**: plugins are registered as trait objects
//! - **Dependency Management**: dependency-ordered loading with circular
//!   dependency detection
//! - **Version Checking**: API version compatibility validation between
//!   engine and plugins
//! - **Clean Teardown**: each plugin's handlers are tracked under its own
//!   [`EventSource`](crate::event::EventSource) and removed on unload
//!
//! # Example
//!
//! ```
//! use frenetic_core::engine::BasicEngine;
//! use frenetic_core::plugins::{Plugin, PluginContext};
//! use std::any::Any;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! struct SpawnCounter {
//!     count: Rc<Cell<usize>>,
//! }
//!
//! impl Plugin for SpawnCounter {
//!     fn name(&self) -> &str { "spawn_counter" }
//!     fn version(&self) -> &str { "1.0.0" }
//!     fn load(&mut self, context: &mut PluginContext<'_>) -> Result<(), String> {
//!         let count = Rc::clone(&self.count);
//!         context.on_entity_spawn(move |_| count.set(count.get() + 1), 0.0);
//!         Ok(())
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let count = Rc::new(Cell::new(0));
//! let mut engine: BasicEngine = BasicEngine::default();
//! engine.register_plugin(Box::new(SpawnCounter { count: Rc::clone(&count) })).unwrap();
//! engine.load_plugins().unwrap();
//!
//! engine.spawn_entity(true, Vec::new()).unwrap();
//! assert_eq!(count.get(), 1);
//! ```
//!
//! # Version Compatibility
//!
//! The plugin API follows semantic versioning:
//!
//! - **Major version**: Breaking API changes
//! - **Minor version**: Backward-compatible additions (breaking while 0.x)
//! - **Patch version**: Bug fixes only

pub mod api;
pub mod registry;

pub use api::{Plugin, PluginContext, PLUGIN_API_VERSION};
pub use registry::PluginRegistry;
