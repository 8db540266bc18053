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
//! # Frenetic Core
//!
//! Entity lifecycle, capability composition, tick scheduling and
//! physics-space integration for a game engine.
//!
//! ## Features
//!
//! - **Properties**: entities gain capabilities by attaching typed
//!   properties, at most one per type, each held by one holder at a time
//! - **Scheduler**: delayed sync tasks counted down in tick time, plus
//!   background async tasks with follow-up chaining
//! - **Events**: prioritized handlers, including waitable handlers that
//!   suspend for N seconds of tick time without blocking a thread
//! - **Physics Space**: one body per entity, ray casts resolved to entities
//! - **Parallelization**: optional Rayon pool for async tasks
//! - **Extensibility**: plugins with dependency ordering and clean teardown
//!
//! ## Example
//!
//! ```rust
//! use frenetic_core::engine::BasicEngine;
//! use frenetic_core::physics::{BodyDesc, PhysicsEntityProperty};
//! use frenetic_core::property::Property;
//! use glam::DVec3;
//!
//! let mut engine: BasicEngine = BasicEngine::default();
//! let crate_id = engine
//!     .spawn_entity(
//!         true,
//!         vec![PhysicsEntityProperty::new(BodyDesc::sphere(0.5).at(DVec3::new(5.0, 0.0, 0.0)))
//!             .into_boxed()],
//!     )
//!     .unwrap();
//!
//! let hit = engine
//!     .physics()
//!     .ray_trace_single(DVec3::ZERO, DVec3::X, 100.0, None)
//!     .unwrap();
//! assert_eq!(hit.entity, crate_id);
//! ```

#![warn(missing_docs)]

/// Engine configuration
pub mod config;

/// Error types
pub mod error;

/// Entity lifecycle orchestration
pub mod engine;

/// Prioritized events with waitable handlers
pub mod event;

/// Physics-space integration
pub mod physics;

/// Plugin system for extensibility
pub mod plugins;

/// Capability composition
pub mod property;

/// Tick-driven task scheduling
pub mod scheduler;

pub use config::EngineConfig;
pub use engine::{BasicEngine, EngineEntity, Entity, EntityId};
pub use error::{EngineError, PropertyError};
pub use event::{EventSource, FreneticEvent};
pub use physics::PhysicsSpace;
pub use property::{Property, PropertyHolder, PropertySlot};
pub use scheduler::Scheduler;
