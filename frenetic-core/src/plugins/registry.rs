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
//! Plugin registry and loader
//!
//! This module provides the registry for managing plugins, including:
//! - Static registration via direct API calls
//! - Dependency resolution and circular dependency detection
//! - Version compatibility checking
//! - Handler teardown by event source on unload

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};
use semver::{Version, VersionReq};

use crate::engine::EngineEvents;
use crate::event::EventSource;
use crate::physics::PhysicsSpace;
use crate::plugins::api::{Plugin, PluginContext, PLUGIN_API_VERSION};
use crate::scheduler::Scheduler;

struct PluginEntry {
    plugin: Box<dyn Plugin>,
    source: EventSource,
}

/// Plugin registry for managing plugin lifecycles
///
/// Every registered plugin gets its own [`EventSource`]. Unloading a plugin
/// removes every engine event handler tracked under that source.
pub struct PluginRegistry {
    plugins: HashMap<String, PluginEntry>,
    /// Plugin load order (topologically sorted by dependencies)
    load_order: Vec<String>,
    loaded: bool,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        PluginRegistry {
            plugins: HashMap::new(),
            load_order: Vec::new(),
            loaded: false,
        }
    }

    /// Register a plugin statically
    ///
    /// # Errors
    ///
    /// - A plugin with the same name is already registered
    /// - The plugin API version is incompatible
    /// - The registry has already been loaded
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), String> {
        if self.loaded {
            return Err("Cannot register plugins after loading".to_string());
        }

        let name = plugin.name().to_string();

        if self.plugins.contains_key(&name) {
            return Err(format!("Plugin '{}' is already registered", name));
        }

        let engine_api = Version::parse(PLUGIN_API_VERSION)
            .map_err(|e| format!("Engine API version {} is malformed: {}", PLUGIN_API_VERSION, e))?;
        if !supports_plugin_api(&engine_api, plugin.api_version()) {
            return Err(format!(
                "Plugin '{}' targets API {}, which is incompatible with engine API {}",
                name,
                plugin.api_version(),
                engine_api
            ));
        }

        let source = EventSource::new(&name);
        self.plugins.insert(name, PluginEntry { plugin, source });
        Ok(())
    }

    /// Load all registered plugins in dependency order
    ///
    /// If a plugin fails to load, its handlers are removed, the plugins
    /// loaded before it are unloaded again, and the error is returned.
    ///
    /// # Errors
    ///
    /// - Missing dependencies
    /// - Circular dependencies detected
    /// - Plugin load failure
    pub fn load_all(
        &mut self,
        events: &mut EngineEvents,
        scheduler: &Scheduler,
        physics: &mut PhysicsSpace,
    ) -> Result<(), String> {
        if self.loaded {
            return Err("Registry already loaded".to_string());
        }

        let mut dependencies: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, entry) in &self.plugins {
            let deps: Vec<String> = entry
                .plugin
                .dependencies()
                .iter()
                .map(|s| s.to_string())
                .collect();

            for dep in &deps {
                if !self.plugins.contains_key(dep) {
                    return Err(format!(
                        "Plugin '{}' depends on '{}' which is not registered",
                        name, dep
                    ));
                }
            }

            dependencies.insert(name.clone(), deps);
        }

        self.load_order = dependency_order(&dependencies)?;

        let order = self.load_order.clone();
        for (index, name) in order.iter().enumerate() {
            let Some(entry) = self.plugins.get_mut(name) else {
                continue;
            };
            let mut context = PluginContext::new(&entry.source, events, scheduler, physics);
            let result = entry.plugin.load(&mut context);
            match result {
                Ok(()) => info!("Loaded plugin '{}' v{}", name, entry.plugin.version()),
                Err(e) => {
                    events.remove_by_source(&entry.source);
                    for previous in order[..index].iter().rev() {
                        if let Err(unload_error) = self.unload_one(previous, events, scheduler, physics) {
                            warn!("{}", unload_error);
                        }
                    }
                    return Err(format!("Failed to load plugin '{}': {}", name, e));
                }
            }
        }

        self.loaded = true;
        Ok(())
    }

    fn unload_one(
        &mut self,
        name: &str,
        events: &mut EngineEvents,
        scheduler: &Scheduler,
        physics: &mut PhysicsSpace,
    ) -> Result<(), String> {
        let Some(entry) = self.plugins.get_mut(name) else {
            return Ok(());
        };
        let result = {
            let mut context = PluginContext::new(&entry.source, events, scheduler, physics);
            entry.plugin.unload(&mut context)
        };
        let removed = events.remove_by_source(&entry.source);
        info!("Unloaded plugin '{}' ({} handlers removed)", name, removed);
        result.map_err(|e| format!("Failed to unload plugin '{}': {}", name, e))
    }

    /// Unload all plugins in reverse load order
    ///
    /// Every plugin is unloaded even if an earlier one fails; the first
    /// failure is returned.
    pub fn unload_all(
        &mut self,
        events: &mut EngineEvents,
        scheduler: &Scheduler,
        physics: &mut PhysicsSpace,
    ) -> Result<(), String> {
        if !self.loaded {
            return Ok(());
        }

        let order: Vec<String> = self.load_order.iter().rev().cloned().collect();
        let mut first_error = None;
        for name in &order {
            if let Err(e) = self.unload_one(name, events, scheduler, physics) {
                warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }

        self.loaded = false;
        first_error.map_or(Ok(()), Err)
    }

    /// Get a plugin by name
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(|entry| entry.plugin.as_ref())
    }

    /// Get a mutable plugin by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Plugin + '_)> {
        self.plugins
            .get_mut(name)
            .map(|entry| &mut *entry.plugin as &mut (dyn Plugin + '_))
    }

    /// Event source the plugin's handlers are tracked under
    pub fn source_of(&self, name: &str) -> Option<&EventSource> {
        self.plugins.get(name).map(|entry| &entry.source)
    }

    /// Get the number of registered plugins
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Check if the plugins are loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Names of the plugins in the order they were loaded
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an engine exposing `engine_api` can host a plugin built against
/// `plugin_api`
///
/// The plugin's version is read as a caret requirement: the engine must be
/// at least that version without crossing the next breaking release, so a
/// plugin built against 0.2.1 runs on 0.2.4 but not on 0.2.0 or 0.3.0.
/// Unparseable versions are never accepted.
fn supports_plugin_api(engine_api: &Version, plugin_api: &str) -> bool {
    Version::parse(plugin_api)
        .ok()
        .and_then(|built_against| VersionReq::parse(&format!("^{}", built_against)).ok())
        .map_or(false, |requirement| requirement.matches(engine_api))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Finished,
}

/// Order plugins so each one follows everything it depends on
///
/// Plugins are walked in name order and each emits its dependencies
/// depth-first ahead of itself, so registration order never matters.
fn dependency_order(dependencies: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>, String> {
    fn walk<'a>(
        name: &'a str,
        dependencies: &'a BTreeMap<String, Vec<String>>,
        visits: &mut HashMap<&'a str, Visit>,
        order: &mut Vec<String>,
    ) -> Result<(), String> {
        match visits.get(name) {
            Some(Visit::Finished) => return Ok(()),
            Some(Visit::InProgress) => {
                return Err(format!("Circular dependency through plugin '{}'", name));
            }
            None => {}
        }

        visits.insert(name, Visit::InProgress);
        for dependency in dependencies.get(name).into_iter().flatten() {
            walk(dependency, dependencies, visits, order)?;
        }
        visits.insert(name, Visit::Finished);
        order.push(name.to_string());
        Ok(())
    }

    let mut visits = HashMap::with_capacity(dependencies.len());
    let mut order = Vec::with_capacity(dependencies.len());
    for name in dependencies.keys() {
        walk(name, dependencies, &mut visits, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EntityId, EntityLifecycleArgs};
    use glam::DVec3;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestPlugin {
        name: String,
        version: String,
        api_version: String,
        deps: Vec<String>,
        journal: Rc<RefCell<Vec<String>>>,
        fail_load: bool,
    }

    impl TestPlugin {
        fn new(name: &str, deps: Vec<&str>, journal: &Rc<RefCell<Vec<String>>>) -> Self {
            TestPlugin {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                api_version: PLUGIN_API_VERSION.to_string(),
                deps: deps.iter().map(|s| s.to_string()).collect(),
                journal: Rc::clone(journal),
                fail_load: false,
            }
        }
    }

    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> &str {
            &self.version
        }

        fn api_version(&self) -> &str {
            &self.api_version
        }

        fn dependencies(&self) -> Vec<&str> {
            self.deps.iter().map(|s| s.as_str()).collect()
        }

        fn load(&mut self, context: &mut PluginContext<'_>) -> Result<(), String> {
            context.on_entity_spawn(|_| {}, 0.0);
            context.on_entity_despawn(|_| {}, 0.0);
            if self.fail_load {
                return Err("refused".to_string());
            }
            self.journal.borrow_mut().push(format!("load {}", self.name));
            Ok(())
        }

        fn unload(&mut self, _context: &mut PluginContext<'_>) -> Result<(), String> {
            self.journal.borrow_mut().push(format!("unload {}", self.name));
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct Harness {
        events: EngineEvents,
        scheduler: Scheduler,
        physics: PhysicsSpace,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                events: EngineEvents::default(),
                scheduler: Scheduler::new(),
                physics: PhysicsSpace::new(DVec3::ZERO),
            }
        }

        fn load(&mut self, registry: &mut PluginRegistry) -> Result<(), String> {
            registry.load_all(&mut self.events, &self.scheduler, &mut self.physics)
        }

        fn unload(&mut self, registry: &mut PluginRegistry) -> Result<(), String> {
            registry.unload_all(&mut self.events, &self.scheduler, &mut self.physics)
        }
    }

    fn journal() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_registry_creation() {
        let registry = PluginRegistry::new();
        assert_eq!(registry.plugin_count(), 0);
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_duplicate_plugin_registration() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(TestPlugin::new("test", vec![], &log))).unwrap();

        let result = registry.register(Box::new(TestPlugin::new("test", vec![], &log)));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("already registered"));
    }

    #[test]
    fn test_incompatible_api_version_rejected() {
        let log = journal();
        let mut plugin = TestPlugin::new("old", vec![], &log);
        plugin.api_version = "0.1.0".to_string();

        let result = PluginRegistry::new().register(Box::new(plugin));
        assert!(result.unwrap_err().contains("incompatible"));
    }

    #[test]
    fn test_dependency_order_load_and_unload() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry
            .register(Box::new(TestPlugin::new("render", vec!["physics"], &log)))
            .unwrap();
        registry.register(Box::new(TestPlugin::new("physics", vec![], &log))).unwrap();

        let mut harness = Harness::new();
        harness.load(&mut registry).unwrap();
        assert!(registry.is_loaded());
        assert_eq!(registry.load_order(), ["physics", "render"]);
        assert_eq!(harness.events.handler_count(), 4);

        harness.unload(&mut registry).unwrap();
        assert!(!registry.is_loaded());
        assert_eq!(harness.events.handler_count(), 0);
        assert_eq!(
            *log.borrow(),
            vec!["load physics", "load render", "unload render", "unload physics"]
        );
    }

    #[test]
    fn test_unload_keeps_foreign_handlers() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(TestPlugin::new("a", vec![], &log))).unwrap();

        let mut harness = Harness::new();
        let core = EventSource::new("core");
        harness.events.on_entity_spawn.add_event(|_| {}, &core, 0.0);

        harness.load(&mut registry).unwrap();
        harness.unload(&mut registry).unwrap();
        assert_eq!(harness.events.handler_count(), 1);
        harness.events.on_entity_spawn.fire(
            &harness.scheduler,
            EntityLifecycleArgs {
                entity: EntityId::new(1),
            },
        );
    }

    #[test]
    fn test_failed_load_rolls_back() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(TestPlugin::new("a", vec![], &log))).unwrap();
        let mut failing = TestPlugin::new("b", vec!["a"], &log);
        failing.fail_load = true;
        registry.register(Box::new(failing)).unwrap();

        let mut harness = Harness::new();
        let result = harness.load(&mut registry);
        assert!(result.unwrap_err().contains("Failed to load plugin 'b'"));
        assert!(!registry.is_loaded());
        assert_eq!(harness.events.handler_count(), 0);
        assert_eq!(*log.borrow(), vec!["load a", "unload a"]);
    }

    #[test]
    fn test_missing_dependency() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry
            .register(Box::new(TestPlugin::new("plugin_b", vec!["plugin_a"], &log)))
            .unwrap();

        let result = Harness::new().load(&mut registry);
        assert!(result.unwrap_err().contains("not registered"));
    }

    #[test]
    fn test_circular_dependency() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry
            .register(Box::new(TestPlugin::new("plugin_a", vec!["plugin_c"], &log)))
            .unwrap();
        registry
            .register(Box::new(TestPlugin::new("plugin_b", vec!["plugin_a"], &log)))
            .unwrap();
        registry
            .register(Box::new(TestPlugin::new("plugin_c", vec!["plugin_b"], &log)))
            .unwrap();

        let result = Harness::new().load(&mut registry);
        assert!(result.unwrap_err().contains("Circular dependency"));
    }

    #[test]
    fn test_register_after_load_rejected() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        Harness::new().load(&mut registry).unwrap();
        assert!(registry
            .register(Box::new(TestPlugin::new("late", vec![], &log)))
            .is_err());
    }

    #[test]
    fn test_downcast_plugin() {
        let log = journal();
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(TestPlugin::new("test", vec![], &log))).unwrap();

        let plugin = registry
            .get("test")
            .unwrap()
            .as_any()
            .downcast_ref::<TestPlugin>()
            .unwrap();
        assert_eq!(plugin.version, "1.0.0");
        assert_eq!(registry.source_of("test").unwrap().name(), "test");
    }

    #[test]
    fn test_plugin_api_acceptance() {
        let engine = |v: &str| Version::parse(v).unwrap();

        assert!(supports_plugin_api(&engine("0.2.0"), "0.2.0"));
        assert!(supports_plugin_api(&engine("0.2.7"), "0.2.1"));
        assert!(!supports_plugin_api(&engine("0.2.0"), "0.2.1"));
        assert!(!supports_plugin_api(&engine("0.3.0"), "0.2.0"));
        assert!(!supports_plugin_api(&engine("0.1.9"), "0.2.0"));

        assert!(supports_plugin_api(&engine("1.4.0"), "1.0.0"));
        assert!(!supports_plugin_api(&engine("1.0.0"), "1.2.0"));
        assert!(!supports_plugin_api(&engine("2.0.0"), "1.0.0"));

        assert!(!supports_plugin_api(&engine("0.2.0"), "0.2"));
        assert!(!supports_plugin_api(&engine("0.2.0"), "latest"));
    }

    #[test]
    fn test_dependency_order_ignores_registration_order() {
        let mut deps = BTreeMap::new();
        deps.insert("c".to_string(), vec!["a".to_string()]);
        deps.insert("b".to_string(), vec![]);
        deps.insert("a".to_string(), vec![]);
        assert_eq!(dependency_order(&deps).unwrap(), vec!["a", "b", "c"]);

        // Shared dependency of a diamond is emitted once, ahead of both users
        let mut diamond = BTreeMap::new();
        diamond.insert("hud".to_string(), vec!["net".to_string(), "audio".to_string()]);
        diamond.insert("audio".to_string(), vec!["core".to_string()]);
        diamond.insert("net".to_string(), vec!["core".to_string()]);
        diamond.insert("core".to_string(), vec![]);
        assert_eq!(
            dependency_order(&diamond).unwrap(),
            vec!["core", "audio", "net", "hud"]
        );
    }

    #[test]
    fn test_dependency_order_cycle() {
        let mut deps = BTreeMap::new();
        deps.insert("a".to_string(), vec!["b".to_string()]);
        deps.insert("b".to_string(), vec!["a".to_string()]);
        let result = dependency_order(&deps);
        assert!(result.unwrap_err().contains("Circular dependency"));

        let mut own = BTreeMap::new();
        own.insert("solo".to_string(), vec!["solo".to_string()]);
        assert_eq!(
            dependency_order(&own).unwrap_err(),
            "Circular dependency through plugin 'solo'"
        );
    }
}
