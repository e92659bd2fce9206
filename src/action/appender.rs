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

//! Appender declarations, references and layouts

use super::{
    ActionData, Attributes, activate, attribute, pop_expected, required_attribute, take_data,
};
use crate::action::Action;
use crate::context::{APPENDER_BAG, AppenderBag, ExecutionContext};
use crate::diagnostics::DiagnosticCode;
use crate::error::{ActionResult, ConfigError};
use crate::introspection::{Aggregation, PropertyAccessor};
use crate::model::{ComponentKind, ComponentRef, component_name};

/// Instantiates an appender, names it and registers it for later references
#[derive(Debug, Default)]
pub struct AppenderAction;

impl Action for AppenderAction {
    fn name(&self) -> &'static str {
        "AppenderAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let class_name = required_attribute(ic, element, attributes, "class")?;
        let appender = ic
            .classes()
            .instantiate_as(&class_name, ComponentKind::Appender)?;
        ic.add_info(format!("About to instantiate appender of type [{class_name}]"));

        match attribute(ic, attributes, "name")? {
            Some(name) => {
                PropertyAccessor::new(appender.clone())
                    .set_property("name", &name)
                    .map_err(ConfigError::from)?;
                ic.add_info(format!("Naming appender as [{name}]"));
                let previous = ic.update_object(APPENDER_BAG, |bag: &mut AppenderBag| {
                    bag.insert(name.clone(), appender.clone())
                });
                if previous.is_some() {
                    ic.add_warning(
                        DiagnosticCode::Status,
                        format!("Appender named [{name}] was already defined, the later definition wins"),
                    );
                }
            }
            None => ic.add_warning(
                DiagnosticCode::MissingAttribute,
                format!("No name given for appender of type [{class_name}], it cannot be referenced"),
            ),
        }

        ic.push_object(appender.clone());
        Ok(Some(Box::new(appender)))
    }

    fn end(&self, ic: &mut ExecutionContext, _element: &str, data: Option<ActionData>) -> ActionResult {
        let Some(appender) = take_data::<ComponentRef>(data) else {
            return Ok(());
        };
        if activate(ic, &appender) {
            log::debug!(
                "Activated appender [{}]",
                component_name(&appender).unwrap_or_default()
            );
        }
        pop_expected(ic, &appender, "appender");
        Ok(())
    }
}

/// Attaches a previously declared appender to the logger at the top of the stack
#[derive(Debug, Default)]
pub struct AppenderRefAction;

impl Action for AppenderRefAction {
    fn name(&self) -> &'static str {
        "AppenderRefAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let reference = required_attribute(ic, element, attributes, "ref")?;
        let target = ic
            .peek_object()
            .ok_or_else(|| ConfigError::unexpected_object("the object stack is empty"))?;
        let accessor = PropertyAccessor::new(target);
        if accessor.can_contain_component("appender") != Aggregation::AsCollection {
            return Err(ConfigError::unexpected_object(format!(
                "Could not find an appender attachable at the top of the stack, found {}",
                accessor.class_name()
            ))
            .into());
        }

        let appender = ic.appender(&reference).ok_or_else(|| ConfigError::UnresolvedReference {
            name: reference.clone(),
            message: format!(
                "Could not find an appender named [{reference}]. Did you define it below instead of above in the configuration file?"
            ),
        })?;
        accessor
            .add_component("appender", &appender)
            .map_err(ConfigError::from)?;

        let owner = accessor
            .get_property("name")
            .map(|name| name.to_string())
            .unwrap_or_else(|| accessor.class_name().to_string());
        ic.add_info(format!("Attaching appender named [{reference}] to [{owner}]"));
        Ok(None)
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}

/// Instantiates a layout and hands it to the enclosing appender once activated
#[derive(Debug, Default)]
pub struct LayoutAction;

impl Action for LayoutAction {
    fn name(&self) -> &'static str {
        "LayoutAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let class_name = required_attribute(ic, element, attributes, "class")?;
        let layout = ic
            .classes()
            .instantiate_as(&class_name, ComponentKind::Layout)?;
        ic.push_object(layout.clone());
        Ok(Some(Box::new(layout)))
    }

    fn end(&self, ic: &mut ExecutionContext, element: &str, data: Option<ActionData>) -> ActionResult {
        let Some(layout) = take_data::<ComponentRef>(data) else {
            return Ok(());
        };
        activate(ic, &layout);
        if !pop_expected(ic, &layout, "layout") {
            return Ok(());
        }
        let parent = ic
            .peek_object()
            .ok_or_else(|| ConfigError::unexpected_object("no owner for the layout"))?;
        PropertyAccessor::new(parent)
            .set_component(element, &layout)
            .map_err(ConfigError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::{attrs, context_with_root};
    use crate::action::{LoggerAction, RootLoggerAction};
    use crate::error::ActionError;
    use crate::model::{ConsoleAppender, with_component};
    use std::sync::Arc;

    #[test]
    fn test_appender_is_registered_and_balanced() {
        let (mut ic, _) = context_with_root();
        let data = AppenderAction
            .begin(
                &mut ic,
                "appender",
                &attrs(&[("name", "CONSOLE"), ("class", "ConsoleAppender")]),
            )
            .unwrap();
        assert_eq!(ic.stack_depth(), 2);
        AppenderAction.end(&mut ic, "appender", data).unwrap();
        assert_eq!(ic.stack_depth(), 1);

        let appender = ic.appender("CONSOLE").unwrap();
        assert_eq!(component_name(&appender).as_deref(), Some("CONSOLE"));
        // no encoder, so activation was refused
        assert!(ic.has_errors());
    }

    #[test]
    fn test_appender_class_is_required() {
        let (mut ic, _) = context_with_root();
        let err = AppenderAction
            .begin(&mut ic, "appender", &attrs(&[("name", "X")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::Failed(ConfigError::MissingAttribute { .. })
        ));
        assert!(ic.appender("X").is_none());
    }

    #[test]
    fn test_duplicate_name_warns() {
        let (mut ic, _) = context_with_root();
        for _ in 0..2 {
            let data = AppenderAction
                .begin(
                    &mut ic,
                    "appender",
                    &attrs(&[("name", "A"), ("class", "ConsoleAppender")]),
                )
                .unwrap();
            AppenderAction.end(&mut ic, "appender", data).unwrap();
        }
        assert!(
            ic.diagnostics()
                .iter()
                .any(|d| d.is_warning() && d.message.contains("already defined"))
        );
    }

    #[test]
    fn test_appender_ref_attaches_once() {
        let (mut ic, context) = context_with_root();
        let data = AppenderAction
            .begin(
                &mut ic,
                "appender",
                &attrs(&[("name", "A"), ("class", "ConsoleAppender")]),
            )
            .unwrap();
        AppenderAction.end(&mut ic, "appender", data).unwrap();

        let data = RootLoggerAction.begin(&mut ic, "root", &attrs(&[])).unwrap();
        for _ in 0..2 {
            AppenderRefAction
                .begin(&mut ic, "appender-ref", &attrs(&[("ref", "A")]))
                .unwrap();
        }
        RootLoggerAction.end(&mut ic, "root", data).unwrap();

        let root = context.read().root_logger();
        assert_eq!(root.read().appender_names(), vec!["A".to_string()]);
        let attached = root.read().appenders()[0].clone();
        assert!(Arc::ptr_eq(&attached, &ic.appender("A").unwrap()));
    }

    #[test]
    fn test_appender_ref_unknown_name() {
        let (mut ic, _) = context_with_root();
        let data = LoggerAction
            .begin(&mut ic, "logger", &attrs(&[("name", "x")]))
            .unwrap();
        let err = AppenderRefAction
            .begin(&mut ic, "appender-ref", &attrs(&[("ref", "NOPE")]))
            .unwrap_err();
        LoggerAction.end(&mut ic, "logger", data).unwrap();
        match err {
            ActionError::Failed(error) => {
                assert!(error.to_string().contains("Could not find an appender named [NOPE]"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_appender_ref_needs_an_attachable() {
        let (mut ic, _) = context_with_root();
        let err = AppenderRefAction
            .begin(&mut ic, "appender-ref", &attrs(&[("ref", "A")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::Failed(ConfigError::UnexpectedObject { .. })
        ));
    }

    #[test]
    fn test_layout_attached_after_activation() {
        let (mut ic, _) = context_with_root();
        let appender = AppenderAction
            .begin(
                &mut ic,
                "appender",
                &attrs(&[("name", "A"), ("class", "ConsoleAppender")]),
            )
            .unwrap();
        let layout = LayoutAction
            .begin(&mut ic, "layout", &attrs(&[("class", "PatternLayout")]))
            .unwrap();
        PropertyAccessor::new(ic.peek_object().unwrap())
            .set_property("pattern", "%msg%n")
            .unwrap();
        LayoutAction.end(&mut ic, "layout", layout).unwrap();
        AppenderAction.end(&mut ic, "appender", appender).unwrap();

        let console = ic.appender("A").unwrap();
        let state = with_component(&console, |c: &ConsoleAppender| {
            (c.base().layout().is_some(), crate::model::LifeCycle::is_active(c))
        });
        assert_eq!(state, Some((true, true)));
        assert!(!ic.has_errors());
    }
}
