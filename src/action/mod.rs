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

//! Actions bound to element patterns
//!
//! An [`Action`] is a stateless behaviour shared by every element it is bound to. The
//! per-occurrence state an action needs between its phases is returned from
//! [`Action::begin`] as [`ActionData`]; the interpreter keeps it on its own per-element
//! stack and hands it back to [`Action::body`] and [`Action::end`], so nested
//! occurrences of the same action never share state.

mod appender;
mod configuration;
mod conversion_rule;
mod logger;
mod nested;
mod new_rule;
mod param;
mod property;

pub use appender::{AppenderAction, AppenderRefAction, LayoutAction};
pub use configuration::{ConfigurationAction, ContextNameAction};
pub use conversion_rule::ConversionRuleAction;
pub use logger::{LevelAction, LoggerAction, RootLoggerAction};
pub use nested::{NestedBasicPropertyAction, NestedComplexPropertyAction};
pub use new_rule::NewRuleAction;
pub use param::ParamAction;
pub use property::{PropertyAction, parse_properties};

pub use crate::interpreter::sax::Attributes;

use crate::context::ExecutionContext;
use crate::diagnostics::DiagnosticCode;
use crate::error::{ActionResult, ConfigError};
use crate::model::ComponentRef;
use crate::pattern::Pattern;
use crate::registry::ActionRegistry;
use std::any::Any;
use std::sync::Arc;

/// Per-occurrence state carried from `begin` to `body` and `end`
pub type ActionData = Box<dyn Any + Send>;

/// Behaviour invoked for elements matching a rule
pub trait Action: Send + Sync {
    /// Class name the action is registered under
    fn name(&self) -> &'static str;

    /// Element opened; the returned data is handed back to the later phases
    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>>;

    /// Trimmed, non-empty character data of the element
    fn body(
        &self,
        _ic: &mut ExecutionContext,
        _element: &str,
        _text: &str,
        _data: &mut Option<ActionData>,
    ) -> ActionResult {
        Ok(())
    }

    /// Element closed; only called when `begin` succeeded
    fn end(&self, ic: &mut ExecutionContext, element: &str, data: Option<ActionData>)
    -> ActionResult;
}

/// Action consulted for elements no rule matches
pub trait ImplicitAction: Action {
    /// Whether this action takes the element at `path`
    fn is_applicable(&self, path: &Pattern, attributes: &Attributes, ic: &ExecutionContext)
    -> bool;
}

const LOGBACK_CORE: &str = "ch.qos.logback.core.joran.action";
const LOGBACK_CLASSIC: &str = "ch.qos.logback.classic.joran.action";

/// Register every built-in action under its simple name, its path in this crate and,
/// where logback has an equivalent, the name logback documents use for it
pub fn register_builtin_actions(registry: &ActionRegistry) {
    register::<ConfigurationAction>(registry, Some(LOGBACK_CLASSIC));
    register::<ContextNameAction>(registry, Some(LOGBACK_CLASSIC));
    register::<PropertyAction>(registry, Some(LOGBACK_CORE));
    register::<ConversionRuleAction>(registry, Some(LOGBACK_CORE));
    register::<LoggerAction>(registry, Some(LOGBACK_CLASSIC));
    register::<RootLoggerAction>(registry, Some(LOGBACK_CLASSIC));
    register::<LevelAction>(registry, Some(LOGBACK_CLASSIC));
    register::<AppenderAction>(registry, Some(LOGBACK_CORE));
    register::<AppenderRefAction>(registry, Some(LOGBACK_CORE));
    register::<LayoutAction>(registry, None);
    register::<ParamAction>(registry, Some(LOGBACK_CORE));
    register::<NewRuleAction>(registry, Some(LOGBACK_CORE));
    register::<NestedComplexPropertyAction>(registry, None);
    register::<NestedBasicPropertyAction>(registry, None);
}

fn register<A: Action + Default + 'static>(registry: &ActionRegistry, legacy_package: Option<&str>) {
    let simple = A::default().name();
    let mut names = vec![
        simple.to_string(),
        format!("octofhir_joran::action::{simple}"),
    ];
    if let Some(package) = legacy_package {
        names.push(format!("{package}.{simple}"));
    }
    for name in names {
        registry.register(name, || Arc::new(A::default()) as Arc<dyn Action>);
    }
}

/// Trimmed, substituted value of attribute `name`; absent and blank both yield `None`
pub(crate) fn attribute(
    ic: &ExecutionContext,
    attributes: &Attributes,
    name: &str,
) -> Result<Option<String>, ConfigError> {
    match attributes.get(name).map(str::trim) {
        Some(raw) if !raw.is_empty() => Ok(Some(ic.subst(raw)?.trim().to_string())),
        _ => Ok(None),
    }
}

/// Like [`attribute`] but a missing value is an error
pub(crate) fn required_attribute(
    ic: &ExecutionContext,
    element: &str,
    attributes: &Attributes,
    name: &str,
) -> Result<String, ConfigError> {
    attribute(ic, attributes, name)?
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::missing_attribute(element, name))
}

/// Recover the typed state an action returned from `begin`
pub(crate) fn take_data<T: Any>(data: Option<ActionData>) -> Option<T> {
    data?.downcast::<T>().ok().map(|boxed| *boxed)
}

/// Pop `expected` if it is the top of the stack; otherwise warn and leave the stack alone
pub(crate) fn pop_expected(ic: &mut ExecutionContext, expected: &ComponentRef, what: &str) -> bool {
    if ic.is_top(expected) {
        ic.pop_object();
        true
    } else {
        ic.add_warning(
            DiagnosticCode::StackDiscipline,
            format!("The object at the top of the stack is not the {what} pushed earlier"),
        );
        false
    }
}

/// Run the activation hook of `component`, recording a refusal
pub(crate) fn activate(ic: &mut ExecutionContext, component: &ComponentRef) -> bool {
    let outcome = {
        let mut guard = component.write();
        let class_name = guard.class_name();
        guard
            .as_lifecycle()
            .map(|lifecycle| lifecycle.activate())
            .map(|result| result.map_err(|message| (class_name, message)))
    };
    match outcome {
        Some(Err((class_name, message))) => {
            ic.add_config_error(&ConfigError::Activation {
                class_name: class_name.to_string(),
                message,
            });
            false
        }
        Some(Ok(())) | None => true,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::LoggerContext;
    use crate::registry::ClassRegistry;

    /// A context with a logger context at the bottom of the stack
    pub(crate) fn context_with_root() -> (ExecutionContext, Arc<parking_lot::RwLock<LoggerContext>>) {
        let mut ic = ExecutionContext::new(Arc::new(ClassRegistry::with_builtins()));
        ic.set_use_process_env(false);
        let context = LoggerContext::shared("test");
        ic.push_object(context.clone());
        (ic, context)
    }

    /// Attributes from literal pairs
    pub(crate) fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }
}
