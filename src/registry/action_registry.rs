// Copyright 2024 OctoFHIR Team
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

//! Action classes instantiable by name
//!
//! Rules registered from a document (`<newRule actionClass="..."/>`) name their action
//! by class. Factories are registered up front; resolved instances are cached so every
//! rule naming the same class shares one stateless action.

use crate::action::{self, Action};
use crate::error::{ConfigError, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Produces an action instance
pub type ActionFactory = Arc<dyn Fn() -> Arc<dyn Action> + Send + Sync>;

/// Registry of action factories plus a shared instance cache
pub struct ActionRegistry {
    factories: RwLock<FxHashMap<String, ActionFactory>>,
    instances: DashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(FxHashMap::default()),
            instances: DashMap::new(),
        }
    }

    /// Create a registry holding every built-in action
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        action::register_builtin_actions(&registry);
        registry
    }

    /// Register a factory under `class_name`, dropping any cached instance
    pub fn register<F>(&self, class_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Action> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        self.instances.remove(&class_name);
        self.factories.write().insert(class_name, Arc::new(factory));
    }

    /// Check if `class_name` is registered
    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.read().contains_key(class_name.trim())
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of instances created so far
    pub fn cached_count(&self) -> usize {
        self.instances.len()
    }

    /// Shared instance of `class_name`, created on first use
    pub fn resolve(&self, class_name: &str) -> Result<Arc<dyn Action>> {
        let class_name = class_name.trim();
        if let Some(action) = self.instances.get(class_name) {
            return Ok(Arc::clone(action.value()));
        }

        let factory = self
            .factories
            .read()
            .get(class_name)
            .cloned()
            .ok_or_else(|| ConfigError::Instantiation {
                class_name: class_name.to_string(),
                message: "no action registered under this name".to_string(),
            })?;

        // Concurrent resolutions of one name settle on whichever instance lands first
        let action = self
            .instances
            .entry(class_name.to_string())
            .or_insert_with(|| factory())
            .clone();
        log::debug!("Resolved action class [{class_name}] to {}", action.name());
        Ok(action)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("classes", &self.class_names())
            .field("cached", &self.cached_count())
            .finish()
    }
}
