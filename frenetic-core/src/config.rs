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
//! Engine configuration
//!
//! Configuration is a plain struct with builder-style setters. Values can be
//! overlaid from the environment:
//!
//! ```bash
//! export FRENETIC_WORKER_THREADS=4
//! export FRENETIC_GRAVITY=0,0,-9.8
//! ```

use glam::DVec3;

use crate::error::EngineError;

/// Environment variable naming the async worker thread count
pub const WORKER_THREADS_ENV: &str = "FRENETIC_WORKER_THREADS";

/// Environment variable holding the initial gravity as `x,y,z`
pub const GRAVITY_ENV: &str = "FRENETIC_GRAVITY";

/// Configuration for engine construction
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Threads in the background pool used for async tasks
    ///
    /// `None` uses the pool's default sizing.
    pub worker_threads: Option<usize>,
    /// Initial global gravity of the physics space
    pub gravity: DVec3,
    /// Catch and log panics raised by entity tick callbacks
    pub isolate_entity_ticks: bool,
    /// Log a warning when an entity that is not spawned is despawned
    pub warn_on_double_despawn: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            worker_threads: None,
            gravity: DVec3::new(0.0, 0.0, -9.8),
            isolate_entity_ticks: true,
            warn_on_double_despawn: true,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the environment, starting from defaults
    pub fn from_env() -> Result<Self, EngineError> {
        Self::default().overlay_env()
    }

    /// Apply any configuration values present in the environment
    pub fn overlay_env(self) -> Result<Self, EngineError> {
        let threads = std::env::var(WORKER_THREADS_ENV).ok();
        let gravity = std::env::var(GRAVITY_ENV).ok();
        self.overlay(threads.as_deref(), gravity.as_deref())
    }

    fn overlay(mut self, threads: Option<&str>, gravity: Option<&str>) -> Result<Self, EngineError> {
        if let Some(raw) = threads {
            let count: usize = raw.trim().parse().map_err(|_| {
                EngineError::Config(format!("{} must be a positive integer, got '{}'", WORKER_THREADS_ENV, raw))
            })?;
            self = self.with_worker_threads(count)?;
        }
        if let Some(raw) = gravity {
            self.gravity = parse_vector(raw).ok_or_else(|| {
                EngineError::Config(format!("{} must be three comma separated numbers, got '{}'", GRAVITY_ENV, raw))
            })?;
        }
        Ok(self)
    }

    /// Set the async worker thread count
    pub fn with_worker_threads(mut self, count: usize) -> Result<Self, EngineError> {
        if count == 0 {
            return Err(EngineError::Config("worker thread count must be at least 1".to_string()));
        }
        self.worker_threads = Some(count);
        Ok(self)
    }

    /// Set the initial gravity
    pub fn with_gravity(mut self, gravity: DVec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Let entity tick panics propagate instead of catching them
    pub fn without_tick_isolation(mut self) -> Self {
        self.isolate_entity_ticks = false;
        self
    }

    /// Silence the double-despawn warning
    pub fn quiet_double_despawn(mut self) -> Self {
        self.warn_on_double_despawn = false;
        self
    }
}

fn parse_vector(raw: &str) -> Option<DVec3> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => Some(DVec3::new(*x, *y, *z)),
        _ => None,
    }
}
