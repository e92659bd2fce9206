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

//! Component classes instantiable by name
//!
//! Configuration documents name components by class (`class="ConsoleAppender"`). The
//! registry maps those names, including the fully qualified names used by existing
//! logback documents, to factories producing fresh components.

use crate::error::{ConfigError, Result};
use crate::model::{
    ComponentKind, ComponentRef, ConsoleAppender, FileAppender, LevelFilter, Logger,
    PatternLayout, PatternLayoutEncoder, ThresholdFilter, component_ref,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Produces a fresh, unconfigured component
pub type ComponentFactory = Arc<dyn Fn() -> ComponentRef + Send + Sync>;

/// Registry of component factories keyed by class name
pub struct ClassRegistry {
    factories: RwLock<FxHashMap<String, ComponentFactory>>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create a registry holding every built-in component
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Register a factory under `class_name`, replacing any previous one
    pub fn register<F>(&self, class_name: impl Into<String>, factory: F)
    where
        F: Fn() -> ComponentRef + Send + Sync + 'static,
    {
        self.factories
            .write()
            .insert(class_name.into(), Arc::new(factory));
    }

    /// Make `alias` resolve to whatever `class_name` resolves to
    pub fn alias(&self, alias: impl Into<String>, class_name: &str) -> bool {
        let mut factories = self.factories.write();
        match factories.get(class_name).cloned() {
            Some(factory) => {
                factories.insert(alias.into(), factory);
                true
            }
            None => false,
        }
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

    /// Instantiate `class_name` without a supertype check
    pub fn instantiate(&self, class_name: &str) -> Result<ComponentRef> {
        let class_name = class_name.trim();
        if class_name.is_empty() {
            return Err(ConfigError::Instantiation {
                class_name: String::new(),
                message: "empty class name".to_string(),
            });
        }
        let factory = self
            .factories
            .read()
            .get(class_name)
            .cloned()
            .ok_or_else(|| ConfigError::Instantiation {
                class_name: class_name.to_string(),
                message: "class not found".to_string(),
            })?;
        Ok(factory())
    }

    /// Instantiate `class_name` and check that it satisfies `expected`
    pub fn instantiate_as(&self, class_name: &str, expected: ComponentKind) -> Result<ComponentRef> {
        let component = self.instantiate(class_name)?;
        if !component.read().is_kind(expected) {
            return Err(ConfigError::WrongSupertype {
                class_name: class_name.trim().to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(component)
    }

    fn register_builtins(&self) {
        self.register("ConsoleAppender", || component_ref(ConsoleAppender::new()));
        self.register("FileAppender", || component_ref(FileAppender::new()));
        self.register("PatternLayout", || component_ref(PatternLayout::new()));
        self.register("PatternLayoutEncoder", || {
            component_ref(PatternLayoutEncoder::new())
        });
        self.register("ThresholdFilter", || component_ref(ThresholdFilter::new()));
        self.register("LevelFilter", || component_ref(LevelFilter::new()));
        self.register("Logger", || component_ref(Logger::new("")));

        for (alias, class_name) in [
            ("ch.qos.logback.core.ConsoleAppender", "ConsoleAppender"),
            ("ch.qos.logback.core.FileAppender", "FileAppender"),
            ("ch.qos.logback.classic.PatternLayout", "PatternLayout"),
            (
                "ch.qos.logback.classic.encoder.PatternLayoutEncoder",
                "PatternLayoutEncoder",
            ),
            ("ch.qos.logback.classic.filter.ThresholdFilter", "ThresholdFilter"),
            ("ch.qos.logback.classic.filter.LevelFilter", "LevelFilter"),
            ("ch.qos.logback.classic.Logger", "Logger"),
        ] {
            self.alias(alias, class_name);
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.class_names())
            .finish()
    }
}
