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

//! Per-session interpretation state
//!
//! An [`ExecutionContext`] lives for exactly one configuration run. It owns the object
//! stack actions push to and pop from, a side table of named objects, the diagnostics
//! recorded so far and the substitution properties defined by the document.

pub mod subst;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity, SourceLocation};
use crate::error::{ConfigError, SubstitutionError};
use crate::model::{ComponentRef, LoggerContext, with_component, with_component_mut};
use crate::pattern::Pattern;
use crate::registry::ClassRegistry;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::Arc;

pub use subst::{PropertyLookup, substitute};

/// Key of the appender registry in the named-object map
pub const APPENDER_BAG: &str = "APPENDER_BAG";

/// Appenders created so far, keyed by name
pub type AppenderBag = IndexMap<String, ComponentRef>;

/// Mutable state shared by every action during one run
pub struct ExecutionContext {
    objects: Vec<ComponentRef>,
    object_map: FxHashMap<String, Box<dyn Any + Send>>,
    diagnostics: Vec<Diagnostic>,
    properties: IndexMap<String, String>,
    env_overrides: IndexMap<String, String>,
    use_process_env: bool,
    location: Option<SourceLocation>,
    classes: Arc<ClassRegistry>,
    pending_rules: Vec<(Pattern, String)>,
    debug: bool,
}

impl ExecutionContext {
    /// Create an empty context instantiating components through `classes`
    pub fn new(classes: Arc<ClassRegistry>) -> Self {
        Self {
            objects: Vec::new(),
            object_map: FxHashMap::default(),
            diagnostics: Vec::new(),
            properties: IndexMap::new(),
            env_overrides: IndexMap::new(),
            use_process_env: true,
            location: None,
            classes,
            pending_rules: Vec::new(),
            debug: false,
        }
    }

    // Object stack

    /// Push the object the current element configures
    pub fn push_object(&mut self, object: ComponentRef) {
        self.objects.push(object);
    }

    /// Pop the top object; popping an empty stack is logged and ignored
    pub fn pop_object(&mut self) -> Option<ComponentRef> {
        let popped = self.objects.pop();
        if popped.is_none() {
            log::warn!("Attempted to pop from an empty object stack");
        }
        popped
    }

    /// The top object
    pub fn peek_object(&self) -> Option<ComponentRef> {
        self.objects.last().cloned()
    }

    /// Object at `index` counted from the bottom; index 0 is the logger context
    pub fn get_object(&self, index: usize) -> Option<ComponentRef> {
        self.objects.get(index).cloned()
    }

    /// Current stack depth
    pub fn stack_depth(&self) -> usize {
        self.objects.len()
    }

    /// Whether `object` is the top of the stack
    pub fn is_top(&self, object: &ComponentRef) -> bool {
        self.objects
            .last()
            .is_some_and(|top| Arc::ptr_eq(top, object))
    }

    /// Run `f` against the logger context at the bottom of the stack
    pub fn with_logger_context<R>(&self, f: impl FnOnce(&LoggerContext) -> R) -> Option<R> {
        self.objects
            .first()
            .and_then(|root| with_component(root, f))
    }

    /// Run `f` against the logger context at the bottom of the stack, mutably
    pub fn with_logger_context_mut<R>(
        &self,
        f: impl FnOnce(&mut LoggerContext) -> R,
    ) -> Option<R> {
        self.objects
            .first()
            .and_then(|root| with_component_mut(root, f))
    }

    // Named objects

    /// Store `value` under `key`, replacing what was there
    pub fn put_object<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.object_map.insert(key.into(), Box::new(value));
    }

    /// Borrow the object under `key` if it has type `T`
    pub fn object<T: Any + Send>(&self, key: &str) -> Option<&T> {
        self.object_map.get(key)?.downcast_ref::<T>()
    }

    /// Mutably borrow the object under `key` if it has type `T`
    pub fn object_mut<T: Any + Send>(&mut self, key: &str) -> Option<&mut T> {
        self.object_map.get_mut(key)?.downcast_mut::<T>()
    }

    /// Run `f` on the object under `key`, starting from `T::default()` when absent
    ///
    /// An entry of another type under the same key is replaced.
    pub fn update_object<T, R>(&mut self, key: &str, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Any + Send + Default,
    {
        let mut value = match self.object_map.remove(key).map(|entry| entry.downcast::<T>()) {
            Some(Ok(value)) => value,
            _ => Box::<T>::default(),
        };
        let result = f(&mut value);
        self.object_map.insert(key.to_string(), value);
        result
    }

    /// Remove the object under `key`
    pub fn remove_object(&mut self, key: &str) -> Option<Box<dyn Any + Send>> {
        self.object_map.remove(key)
    }

    /// Appender registered under `name` during this run
    pub fn appender(&self, name: &str) -> Option<ComponentRef> {
        self.object::<AppenderBag>(APPENDER_BAG)?.get(name).cloned()
    }

    // Diagnostics

    /// Record `diagnostic`, stamping the current location when it has none
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        let diagnostic = diagnostic.at(self.location);
        log::log!(diagnostic.severity.log_level(), "{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Record a status message
    pub fn add_info(&mut self, message: impl Into<String>) {
        self.add_diagnostic(Diagnostic::info(message));
    }

    /// Record a warning
    pub fn add_warning(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.add_diagnostic(Diagnostic::warning(code, message));
    }

    /// Record an error
    pub fn add_error(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.add_diagnostic(Diagnostic::error(code, message));
    }

    /// Record a configuration error
    pub fn add_config_error(&mut self, error: &ConfigError) {
        self.add_error(error.code(), error.to_string());
    }

    /// Everything recorded so far, in order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Move the recorded diagnostics out
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Check if any error-level diagnostic was recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Most severe diagnostic recorded so far
    pub fn highest_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    // Locator

    /// Update the current document position
    pub fn set_location(&mut self, location: Option<SourceLocation>) {
        self.location = location;
    }

    /// Current document position
    pub fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    // Properties

    /// Define a session property; the value is trimmed and later definitions win
    pub fn add_property(&mut self, key: impl Into<String>, value: &str) {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        self.properties
            .insert(key.to_string(), value.trim().to_string());
    }

    /// Define several session properties
    pub fn add_properties<K, V>(&mut self, properties: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        for (key, value) in properties {
            self.add_property(key, value.as_ref());
        }
    }

    /// Session property `key`
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// All session properties in definition order
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Override an environment variable for this session
    pub fn set_env_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_overrides.insert(key.into(), value.into());
    }

    /// Whether the process environment is consulted after the overrides
    pub fn set_use_process_env(&mut self, enabled: bool) {
        self.use_process_env = enabled;
    }

    /// Expand `${...}` references in `input`
    pub fn subst(&self, input: &str) -> Result<String, SubstitutionError> {
        substitute(input, self)
    }

    // Misc

    /// Component classes available to actions
    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    /// Ask the interpreter to bind `action_class` to `pattern` after the current phase
    pub fn request_rule(&mut self, pattern: Pattern, action_class: impl Into<String>) {
        self.pending_rules.push((pattern, action_class.into()));
    }

    /// Rule requests made since the last call
    pub fn take_rule_requests(&mut self) -> Vec<(Pattern, String)> {
        std::mem::take(&mut self.pending_rules)
    }

    /// Enable internal status reporting
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Whether internal status reporting is enabled
    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

impl PropertyLookup for ExecutionContext {
    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        if let Some(value) = self
            .with_logger_context(|context| context.property(key).map(str::to_string))
            .flatten()
        {
            return Some(value);
        }
        if let Some(value) = self.env_overrides.get(key) {
            return Some(value.clone());
        }
        if self.use_process_env {
            return std::env::var(key).ok();
        }
        None
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("stack_depth", &self.objects.len())
            .field("named_objects", &self.object_map.keys().collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics.len())
            .field("properties", &self.properties)
            .field("location", &self.location)
            .finish()
    }
}
