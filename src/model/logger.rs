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

//! Loggers and the logger context that owns them

use super::component::{
    Component, ComponentKind, ComponentRef, PropertyDescriptor, PropertyValue, ValueType,
    component_name, wrong_value,
};
use super::level::Level;
use crate::error::PropertyError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;

/// Name of the root logger
pub const ROOT_LOGGER_NAME: &str = "ROOT";

/// Level the root logger starts with
pub const DEFAULT_ROOT_LEVEL: Level = Level::Debug;

/// Name a logger context has until `contextName` changes it
pub const DEFAULT_CONTEXT_NAME: &str = "default";

const LOGGER_KINDS: &[ComponentKind] = &[ComponentKind::Logger];
const LOGGER_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::basic("level", ValueType::Level),
    PropertyDescriptor::basic("additivity", ValueType::Boolean),
    PropertyDescriptor::collection("appender", ComponentKind::Appender),
];

/// A named logger
#[derive(Clone)]
pub struct Logger {
    name: String,
    level: Option<Level>,
    additive: bool,
    appenders: Vec<ComponentRef>,
}

impl Logger {
    /// Create a logger with no level of its own
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            additive: true,
            appenders: Vec::new(),
        }
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same logger under another name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether this is the root logger
    pub fn is_root(&self) -> bool {
        self.name.eq_ignore_ascii_case(ROOT_LOGGER_NAME)
    }

    /// Level assigned to this logger, if any
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    /// Assign or clear the level
    pub fn set_level(&mut self, level: Option<Level>) {
        self.level = level;
    }

    /// Whether events also flow to ancestor appenders
    pub fn is_additive(&self) -> bool {
        self.additive
    }

    /// Change additivity
    pub fn set_additive(&mut self, additive: bool) {
        self.additive = additive;
    }

    /// Attached appenders
    pub fn appenders(&self) -> &[ComponentRef] {
        &self.appenders
    }

    /// Attach an appender; returns `false` if that very appender was already attached
    pub fn add_appender(&mut self, appender: ComponentRef) -> bool {
        if self.appenders.iter().any(|a| Arc::ptr_eq(a, &appender)) {
            return false;
        }
        self.appenders.push(appender);
        true
    }

    /// Names of attached appenders
    pub fn appender_names(&self) -> Vec<String> {
        self.appenders
            .iter()
            .map(|a| component_name(a).unwrap_or_else(|| "<unnamed>".to_string()))
            .collect()
    }
}

impl Component for Logger {
    fn class_name(&self) -> &'static str {
        "Logger"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        LOGGER_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        LOGGER_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        match (name, &value) {
            ("level", PropertyValue::Level(level)) => self.level = Some(*level),
            ("additivity", PropertyValue::Boolean(additive)) => self.additive = *additive,
            ("level" | "additivity", _) => return Err(wrong_value(name, &value)),
            _ => return Err(PropertyError::not_found(name, self.class_name())),
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "name" => Some(PropertyValue::String(self.name.clone())),
            "level" => self.level.map(PropertyValue::Level),
            "additivity" => Some(PropertyValue::Boolean(self.additive)),
            _ => None,
        }
    }

    fn add_component(&mut self, name: &str, child: ComponentRef) -> Result<(), PropertyError> {
        if name != "appender" {
            return Err(PropertyError::not_found(name, self.class_name()));
        }
        if !self.add_appender(child) {
            log::debug!("Appender already attached to logger [{}]", self.name);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Serializable view of a configured logger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggerSnapshot {
    /// Logger name
    pub name: String,
    /// Level assigned to the logger itself
    pub level: Option<Level>,
    /// Level after inheritance
    pub effective_level: Level,
    /// Additivity flag
    pub additive: bool,
    /// Names of attached appenders
    pub appenders: Vec<String>,
}

const CONTEXT_KINDS: &[ComponentKind] = &[ComponentKind::Context];

/// Root of the configured object graph: owns every logger plus context-wide settings
pub struct LoggerContext {
    name: String,
    name_locked: bool,
    root: Arc<RwLock<Logger>>,
    loggers: IndexMap<String, Arc<RwLock<Logger>>>,
    properties: IndexMap<String, String>,
    conversion_rules: IndexMap<String, String>,
}

impl LoggerContext {
    /// Create a context with a root logger at [`DEFAULT_ROOT_LEVEL`]
    pub fn new(name: impl Into<String>) -> Self {
        let mut root = Logger::new(ROOT_LOGGER_NAME);
        root.set_level(Some(DEFAULT_ROOT_LEVEL));
        Self {
            name: name.into(),
            name_locked: false,
            root: Arc::new(RwLock::new(root)),
            loggers: IndexMap::new(),
            properties: IndexMap::new(),
            conversion_rules: IndexMap::new(),
        }
    }

    /// Create a context wrapped in a shared handle
    pub fn shared(name: impl Into<String>) -> Arc<RwLock<LoggerContext>> {
        Arc::new(RwLock::new(Self::new(name)))
    }

    /// Context name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the context; only one rename is allowed per context
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), String> {
        let name = name.into();
        if self.name_locked && self.name != name {
            return Err(format!(
                "Context has already been named [{}], cannot rename to [{name}]",
                self.name
            ));
        }
        self.name = name;
        self.name_locked = true;
        Ok(())
    }

    /// The root logger
    pub fn root_logger(&self) -> Arc<RwLock<Logger>> {
        Arc::clone(&self.root)
    }

    /// Fetch or create the logger called `name`
    pub fn get_logger(&mut self, name: &str) -> Arc<RwLock<Logger>> {
        if name.eq_ignore_ascii_case(ROOT_LOGGER_NAME) {
            return self.root_logger();
        }
        Arc::clone(
            self.loggers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(Logger::new(name)))),
        )
    }

    /// Install `prototype`, renamed to `name`, as the logger called `name`
    ///
    /// Loggers are created once: if `name` already has a logger (the root always does),
    /// that logger is returned as the error and `prototype` is dropped.
    pub fn adopt_logger(
        &mut self,
        name: &str,
        prototype: Logger,
    ) -> Result<Arc<RwLock<Logger>>, Arc<RwLock<Logger>>> {
        if let Some(existing) = self.find_logger(name) {
            return Err(existing);
        }
        let logger = Arc::new(RwLock::new(prototype.renamed(name)));
        self.loggers.insert(name.to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    /// Existing logger called `name`
    pub fn find_logger(&self, name: &str) -> Option<Arc<RwLock<Logger>>> {
        if name.eq_ignore_ascii_case(ROOT_LOGGER_NAME) {
            return Some(self.root_logger());
        }
        self.loggers.get(name).cloned()
    }

    /// Non-root loggers in creation order
    pub fn loggers(&self) -> impl Iterator<Item = &Arc<RwLock<Logger>>> {
        self.loggers.values()
    }

    /// Level in force for `name`, walking dotted ancestors up to the root
    pub fn effective_level(&self, name: &str) -> Level {
        let mut current = name;
        loop {
            if let Some(level) = self.loggers.get(current).and_then(|l| l.read().level()) {
                return level;
            }
            match current.rfind('.') {
                Some(index) => current = &current[..index],
                None => break,
            }
        }
        self.root.read().level().unwrap_or(DEFAULT_ROOT_LEVEL)
    }

    /// Context-scoped property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Store a context-scoped property
    pub fn put_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// All context-scoped properties
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Register a conversion word, returning the converter class it replaced
    pub fn add_conversion_rule(
        &mut self,
        word: impl Into<String>,
        converter_class: impl Into<String>,
    ) -> Option<String> {
        self.conversion_rules
            .insert(word.into(), converter_class.into())
    }

    /// Conversion word to converter class
    pub fn conversion_rules(&self) -> &IndexMap<String, String> {
        &self.conversion_rules
    }

    /// Snapshot of the root logger followed by every other logger
    pub fn snapshot(&self) -> Vec<LoggerSnapshot> {
        std::iter::once(&self.root)
            .chain(self.loggers.values())
            .map(|logger| {
                let mut snapshot = {
                    let logger = logger.read();
                    LoggerSnapshot {
                        name: logger.name().to_string(),
                        level: logger.level(),
                        effective_level: logger.level().unwrap_or(DEFAULT_ROOT_LEVEL),
                        additive: logger.is_additive(),
                        appenders: logger.appender_names(),
                    }
                };
                if !snapshot.name.eq_ignore_ascii_case(ROOT_LOGGER_NAME) {
                    snapshot.effective_level = self.effective_level(&snapshot.name);
                }
                snapshot
            })
            .collect()
    }
}

impl std::fmt::Debug for LoggerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerContext")
            .field("name", &self.name)
            .field("name_locked", &self.name_locked)
            .field("loggers", &self.loggers.keys().collect::<Vec<_>>())
            .field("properties", &self.properties)
            .field("conversion_rules", &self.conversion_rules)
            .finish()
    }
}

impl Component for LoggerContext {
    fn class_name(&self) -> &'static str {
        "LoggerContext"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        CONTEXT_KINDS
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "name" => Some(PropertyValue::String(self.name.clone())),
            _ => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
