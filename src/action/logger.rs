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

//! Logger declarations and level settings

use super::{ActionData, Attributes, attribute, pop_expected, required_attribute, take_data};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::diagnostics::DiagnosticCode;
use crate::error::{ActionResult, ConfigError, PropertyError};
use crate::model::{
    ComponentKind, ComponentRef, Level, Logger, PropertyValue, TypeCoercion, with_component,
    with_component_mut,
};
use parking_lot::RwLock;
use std::sync::Arc;

fn no_logger_context() -> ConfigError {
    ConfigError::unexpected_object("no logger context at the bottom of the stack")
}

/// Set the level of `logger` from a token; `INHERITED`/`NULL` clear it
fn apply_level(logger: &ComponentRef, token: &str) -> Result<(), ConfigError> {
    let level = if Level::is_inherited_token(token) {
        None
    } else {
        Some(token.parse::<Level>().map_err(|_| PropertyError::Conversion {
            name: "level".to_string(),
            value: token.to_string(),
            target_type: "Level".to_string(),
        })?)
    };
    with_component_mut(logger, |logger: &mut Logger| {
        if level.is_none() && logger.is_root() {
            return Err(ConfigError::Other(format!(
                "The level of the root logger cannot be set to {}",
                token.trim().to_uppercase()
            )));
        }
        logger.set_level(level);
        Ok(())
    })
    .unwrap_or_else(|| {
        Err(ConfigError::unexpected_object(
            "the object at the top of the stack is not a logger",
        ))
    })
}

/// The logger called `name`, created from the registered class `class_name` when it
/// does not exist yet
fn logger_of_class(
    ic: &mut ExecutionContext,
    name: &str,
    class_name: &str,
) -> Result<Arc<RwLock<Logger>>, ConfigError> {
    let instance = ic
        .classes()
        .instantiate_as(class_name, ComponentKind::Logger)?;
    let Some(prototype) = with_component(&instance, |logger: &Logger| logger.clone()) else {
        ic.add_warning(
            DiagnosticCode::Instantiation,
            format!(
                "Class [{class_name}] is not a logger the context can hold, [{name}] uses a plain logger"
            ),
        );
        return ic
            .with_logger_context_mut(|context| context.get_logger(name))
            .ok_or_else(no_logger_context);
    };

    match ic
        .with_logger_context_mut(|context| context.adopt_logger(name, prototype))
        .ok_or_else(no_logger_context)?
    {
        Ok(logger) => {
            ic.add_info(format!("Created logger [{name}] from class [{class_name}]"));
            Ok(logger)
        }
        Err(existing) => {
            ic.add_warning(
                DiagnosticCode::Status,
                format!("Logger [{name}] already exists, class [{class_name}] is ignored"),
            );
            Ok(existing)
        }
    }
}

fn describe_level(logger: &ComponentRef) -> String {
    let guard = logger.read();
    let name = guard
        .property("name")
        .map(|v| v.to_string())
        .unwrap_or_default();
    match guard.property("level") {
        Some(level) => format!("Setting level of logger [{name}] to {level}"),
        None => format!("Logger [{name}] inherits its level"),
    }
}

/// Declares a named logger and makes it the current object
#[derive(Debug, Default)]
pub struct LoggerAction;

impl Action for LoggerAction {
    fn name(&self) -> &'static str {
        "LoggerAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let name = required_attribute(ic, element, attributes, "name")?;
        let logger = match attribute(ic, attributes, "class")? {
            Some(class_name) => logger_of_class(ic, &name, &class_name)?,
            None => ic
                .with_logger_context_mut(|context| context.get_logger(&name))
                .ok_or_else(no_logger_context)?,
        };
        let logger: ComponentRef = logger;

        if let Some(level) = attribute(ic, attributes, "level")? {
            match apply_level(&logger, &level) {
                Ok(()) => {
                    let message = describe_level(&logger);
                    ic.add_info(message);
                }
                Err(error) => ic.add_config_error(&error),
            }
        }

        if let Some(additivity) = attribute(ic, attributes, "additivity")? {
            match TypeCoercion::coerce_to_boolean(&additivity) {
                Ok(PropertyValue::Boolean(additive)) => {
                    with_component_mut(&logger, |logger: &mut Logger| {
                        logger.set_additive(additive)
                    });
                    ic.add_info(format!("Setting additivity of logger [{name}] to {additive}"));
                }
                _ => ic.add_config_error(&ConfigError::Property(PropertyError::Conversion {
                    name: "additivity".to_string(),
                    value: additivity,
                    target_type: "boolean".to_string(),
                })),
            }
        }

        ic.push_object(logger.clone());
        Ok(Some(Box::new(logger)))
    }

    fn end(&self, ic: &mut ExecutionContext, _element: &str, data: Option<ActionData>) -> ActionResult {
        if let Some(logger) = take_data::<ComponentRef>(data) {
            pop_expected(ic, &logger, "logger");
        }
        Ok(())
    }
}

/// Makes the root logger the current object
#[derive(Debug, Default)]
pub struct RootLoggerAction;

impl Action for RootLoggerAction {
    fn name(&self) -> &'static str {
        "RootLoggerAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        _element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let root: ComponentRef = ic
            .with_logger_context(|context| context.root_logger())
            .ok_or_else(no_logger_context)?;

        if let Some(level) = attribute(ic, attributes, "level")? {
            match apply_level(&root, &level) {
                Ok(()) => {
                    let message = describe_level(&root);
                    ic.add_info(message);
                }
                Err(error) => ic.add_config_error(&error),
            }
        }

        ic.push_object(root.clone());
        Ok(Some(Box::new(root)))
    }

    fn end(&self, ic: &mut ExecutionContext, _element: &str, data: Option<ActionData>) -> ActionResult {
        if let Some(root) = take_data::<ComponentRef>(data) {
            pop_expected(ic, &root, "root logger");
        }
        Ok(())
    }
}

/// Sets the level of the logger at the top of the stack from `value`
#[derive(Debug, Default)]
pub struct LevelAction;

impl Action for LevelAction {
    fn name(&self) -> &'static str {
        "LevelAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let value = required_attribute(ic, element, attributes, "value")?;
        let logger = ic
            .peek_object()
            .ok_or_else(|| ConfigError::unexpected_object("the object stack is empty"))?;
        apply_level(&logger, &value)?;
        let message = describe_level(&logger);
        ic.add_info(message);
        Ok(None)
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}
