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
//! Error types for property composition and engine orchestration
//!
//! Property misuse (attaching a property that is already held, attaching a
//! second property of the same concrete type, looking up a property that is
//! not there) is a setup-time contract breach. It is reported immediately
//! through [`PropertyError`] and never downgraded to a log line.
//!
//! Runtime failures inside scheduled work or entity ticks are not represented
//! here: those are caught at the task boundary and logged.

use std::fmt;

use crate::engine::EntityId;
use crate::property::HolderId;

/// Misuse of the property composition API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The property instance still carries a back-reference to a holder
    ///
    /// Either it is attached somewhere else, or it was cloned from an
    /// attached property without [`duplicate_clean`](crate::property::Property::duplicate_clean).
    AlreadyHeld {
        /// Type name of the offending property
        property: &'static str,
        /// Holder the property claims to belong to
        holder: HolderId,
    },
    /// A property of the same concrete type is already attached to the holder
    DuplicateType {
        /// Type name of the offending property
        property: &'static str,
    },
    /// No property of the requested type is attached
    Missing {
        /// Type name that was looked up
        property: &'static str,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::AlreadyHeld { property, holder } => {
                write!(f, "property {} is already held by {}", property, holder)
            }
            PropertyError::DuplicateType { property } => {
                write!(f, "a property of type {} is already attached", property)
            }
            PropertyError::Missing { property } => {
                write!(f, "no property of type {} is attached", property)
            }
        }
    }
}

impl std::error::Error for PropertyError {}

/// Errors surfaced by the engine and its configuration layer
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Property composition failed while building or modifying an entity
    Property(PropertyError),
    /// The entity id does not name a spawned entity
    UnknownEntity(EntityId),
    /// A plugin failed to register, load or unload
    Plugin(String),
    /// Invalid configuration value
    Config(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Property(e) => write!(f, "property error: {}", e),
            EngineError::UnknownEntity(id) => write!(f, "{} is not spawned", id),
            EngineError::Plugin(msg) => write!(f, "plugin error: {}", msg),
            EngineError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Property(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PropertyError> for EngineError {
    fn from(e: PropertyError) -> Self {
        EngineError::Property(e)
    }
}
