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

//! Ready-made configurator wiring the built-in rules and implicit actions together
//!
//! [`JoranConfigurator`] owns the registries and the logger context a document
//! configures. Each `configure_*` call runs one interpretation session and returns a
//! [`ConfigurationReport`] with everything that session recorded.

use crate::action::{
    Action, AppenderAction, AppenderRefAction, ConfigurationAction, ContextNameAction,
    ConversionRuleAction, LayoutAction, LevelAction, LoggerAction, NestedBasicPropertyAction,
    NestedComplexPropertyAction, NewRuleAction, ParamAction, PropertyAction, RootLoggerAction,
};
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
use crate::error::{ConfigError, Result};
use crate::interpreter::Interpreter;
use crate::model::{LoggerContext, LoggerSnapshot};
use crate::pattern::Pattern;
use crate::registry::{ActionRegistry, ClassRegistry, RuleStore};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Knobs applied to every session a configurator starts
#[derive(Debug, Clone)]
pub struct ConfiguratorOptions {
    env_overrides: IndexMap<String, String>,
    properties: IndexMap<String, String>,
    use_process_environment: bool,
    debug: bool,
}

impl Default for ConfiguratorOptions {
    fn default() -> Self {
        Self {
            env_overrides: IndexMap::new(),
            properties: IndexMap::new(),
            use_process_environment: true,
            debug: false,
        }
    }
}

impl ConfiguratorOptions {
    /// Options consulting the process environment, with nothing predefined
    pub fn new() -> Self {
        Self::default()
    }

    /// Value consulted before the process environment for `key`
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    /// Session property defined before the document is read
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether `${VAR}` may fall back to the process environment
    pub fn with_process_environment(mut self, enabled: bool) -> Self {
        self.use_process_environment = enabled;
        self
    }

    /// Report every status message, as `debug="true"` on the document does
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Whether debug reporting is forced on
    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

/// Outcome of one configuration session
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationReport {
    context_name: String,
    loggers: Vec<LoggerSnapshot>,
    diagnostics: Vec<Diagnostic>,
    debug: bool,
    #[serde(skip)]
    context: Arc<RwLock<LoggerContext>>,
}

impl ConfigurationReport {
    fn new(context: Arc<RwLock<LoggerContext>>, diagnostics: Vec<Diagnostic>, debug: bool) -> Self {
        let (context_name, loggers) = {
            let guard = context.read();
            (guard.name().to_string(), guard.snapshot())
        };
        Self {
            context_name,
            loggers,
            diagnostics,
            debug,
            context,
        }
    }

    /// Every record of the session, in the order it was made
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Records at `severity` or worse
    pub fn diagnostics_at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity >= severity)
    }

    /// Check if any error-level record was made
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Worst severity recorded
    pub fn highest_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    /// Whether debug reporting was on for the session
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Name of the configured context when the session ended
    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    /// Loggers as they stood when the session ended
    pub fn loggers(&self) -> &[LoggerSnapshot] {
        &self.loggers
    }

    /// The configured context
    pub fn context(&self) -> &Arc<RwLock<LoggerContext>> {
        &self.context
    }
}

/// Configures a [`LoggerContext`] from logback-style XML documents
pub struct JoranConfigurator {
    context: Arc<RwLock<LoggerContext>>,
    classes: Arc<ClassRegistry>,
    actions: Arc<ActionRegistry>,
    options: ConfiguratorOptions,
}

impl JoranConfigurator {
    /// Create a configurator with the built-in classes and actions
    pub fn new(context: Arc<RwLock<LoggerContext>>) -> Self {
        Self::with_registries(
            context,
            Arc::new(ClassRegistry::with_builtins()),
            Arc::new(ActionRegistry::with_builtins()),
        )
    }

    /// Create a configurator over caller-supplied registries
    pub fn with_registries(
        context: Arc<RwLock<LoggerContext>>,
        classes: Arc<ClassRegistry>,
        actions: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            context,
            classes,
            actions,
            options: ConfiguratorOptions::default(),
        }
    }

    /// Replace the session options
    pub fn with_options(mut self, options: ConfiguratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Component classes available to documents
    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    /// Action classes available to `newRule`
    pub fn actions(&self) -> &Arc<ActionRegistry> {
        &self.actions
    }

    /// The context being configured
    pub fn context(&self) -> &Arc<RwLock<LoggerContext>> {
        &self.context
    }

    /// Rule table every session starts from
    pub fn default_rules(&self) -> RuleStore {
        let mut rules = RuleStore::new(Arc::clone(&self.actions));
        let table: [(&str, Arc<dyn Action>); 16] = [
            ("configuration", Arc::new(ConfigurationAction)),
            ("configuration/contextName", Arc::new(ContextNameAction)),
            ("configuration/property", Arc::new(PropertyAction)),
            ("configuration/variable", Arc::new(PropertyAction)),
            ("configuration/conversionRule", Arc::new(ConversionRuleAction)),
            ("configuration/logger", Arc::new(LoggerAction)),
            ("configuration/logger/level", Arc::new(LevelAction)),
            ("configuration/root", Arc::new(RootLoggerAction)),
            ("configuration/root/level", Arc::new(LevelAction)),
            ("*/appender-ref", Arc::new(AppenderRefAction)),
            ("*/appenderRef", Arc::new(AppenderRefAction)),
            ("configuration/appender", Arc::new(AppenderAction)),
            ("configuration/appender/layout", Arc::new(LayoutAction)),
            ("*/param", Arc::new(ParamAction)),
            ("*/newRule", Arc::new(NewRuleAction)),
            ("*/new-rule", Arc::new(NewRuleAction)),
        ];
        for (pattern, action) in table {
            rules.add_rule(Pattern::parse(pattern), action);
        }
        rules
    }

    /// Interpreter for a fresh session, with the logger context at the bottom of its stack
    pub fn build_interpreter(&self) -> Interpreter {
        let mut ic = ExecutionContext::new(Arc::clone(&self.classes));
        ic.set_use_process_env(self.options.use_process_environment);
        ic.set_debug(self.options.debug);
        for (key, value) in &self.options.env_overrides {
            ic.set_env_override(key.clone(), value.clone());
        }
        ic.add_properties(&self.options.properties);
        ic.push_object(self.context.clone());

        let mut interpreter = Interpreter::new(self.default_rules(), ic);
        interpreter.add_implicit_action(NestedComplexPropertyAction);
        interpreter.add_implicit_action(NestedBasicPropertyAction);
        interpreter
    }

    /// Run a session over `source`
    pub fn configure_str(&self, source: &str) -> ConfigurationReport {
        let mut interpreter = self.build_interpreter();
        interpreter.interpret_str(source);
        self.finish(interpreter.into_context())
    }

    /// Run a session over the file at `path`; only failing to read it is an error
    pub fn configure_file(&self, path: impl AsRef<Path>) -> Result<ConfigurationReport> {
        let path = path.as_ref();
        log::debug!("Reading configuration from {}", path.display());
        let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        Ok(self.configure_str(&source))
    }

    fn finish(&self, mut ic: ExecutionContext) -> ConfigurationReport {
        if ic.stack_depth() != 1 {
            ic.add_warning(
                DiagnosticCode::StackDiscipline,
                format!(
                    "Object stack holds {} object(s) at the end of the session, expected only the logger context",
                    ic.stack_depth()
                ),
            );
        }
        let debug = ic.is_debug();
        let diagnostics = ic.take_diagnostics();
        if debug {
            for diagnostic in &diagnostics {
                log::info!("{diagnostic}");
            }
        }
        ConfigurationReport::new(Arc::clone(&self.context), diagnostics, debug)
    }
}
