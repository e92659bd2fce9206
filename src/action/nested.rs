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

//! Implicit actions deriving nested configuration from the shape of the parent
//!
//! Neither action is bound to a pattern. For an element no rule matches they inspect
//! the object at the top of the stack: a tag naming one of its component slots or
//! collections creates a nested component, a tag naming one of its basic properties
//! sets that property from the element text.

use super::{ActionData, Attributes, ImplicitAction, activate, pop_expected, required_attribute};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::error::{ActionError, ActionResult, ConfigError};
use crate::introspection::{Aggregation, PropertyAccessor};
use crate::model::ComponentRef;
use crate::pattern::Pattern;

fn parent_accessor(ic: &ExecutionContext) -> Option<PropertyAccessor> {
    ic.peek_object().map(PropertyAccessor::new)
}

/// State of one nested component between its begin and end phases
struct NestedComponent {
    parent: PropertyAccessor,
    aggregation: Aggregation,
    child: ComponentRef,
}

/// Creates the component named by `class`, configures it through its children and
/// attaches it to the parent as a property or collection element
#[derive(Debug, Default)]
pub struct NestedComplexPropertyAction;

impl ImplicitAction for NestedComplexPropertyAction {
    fn is_applicable(&self, path: &Pattern, _attributes: &Attributes, ic: &ExecutionContext) -> bool {
        let (Some(tag), Some(parent)) = (path.peek_last(), parent_accessor(ic)) else {
            return false;
        };
        parent.can_contain_component(tag) != Aggregation::NotFound
    }
}

impl Action for NestedComplexPropertyAction {
    fn name(&self) -> &'static str {
        "NestedComplexPropertyAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let parent = parent_accessor(ic)
            .ok_or_else(|| ConfigError::unexpected_object("the object stack is empty"))?;
        let aggregation = parent.can_contain_component(element);
        let kind = parent.component_kind(element).ok_or_else(|| {
            ConfigError::unexpected_object(format!(
                "{} has no component slot named [{element}]",
                parent.class_name()
            ))
        })?;

        let class_name = required_attribute(ic, element, attributes, "class")?;
        let child = ic.classes().instantiate_as(&class_name, kind)?;
        log::debug!("Pushing component [{element}] of type [{class_name}] on top of the object stack");
        ic.push_object(child.clone());

        Ok(Some(Box::new(NestedComponent {
            parent,
            aggregation,
            child,
        })))
    }

    fn end(&self, ic: &mut ExecutionContext, element: &str, data: Option<ActionData>) -> ActionResult {
        let Some(NestedComponent {
            parent,
            aggregation,
            child,
        }) = super::take_data::<NestedComponent>(data)
        else {
            return Ok(());
        };

        activate(ic, &child);
        if !pop_expected(ic, &child, element) {
            return Ok(());
        }
        parent
            .attach(aggregation, element, &child)
            .map_err(|error| ActionError::Failed(error.into()))
    }
}

/// Sets a basic property of the parent from the substituted element text
#[derive(Debug, Default)]
pub struct NestedBasicPropertyAction;

impl ImplicitAction for NestedBasicPropertyAction {
    fn is_applicable(&self, path: &Pattern, _attributes: &Attributes, ic: &ExecutionContext) -> bool {
        let (Some(tag), Some(parent)) = (path.peek_last(), parent_accessor(ic)) else {
            return false;
        };
        parent.can_set_property(tag)
    }
}

impl Action for NestedBasicPropertyAction {
    fn name(&self) -> &'static str {
        "NestedBasicPropertyAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        _element: &str,
        _attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let parent = parent_accessor(ic)
            .ok_or_else(|| ConfigError::unexpected_object("the object stack is empty"))?;
        Ok(Some(Box::new(parent)))
    }

    fn body(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        text: &str,
        data: &mut Option<ActionData>,
    ) -> ActionResult {
        let Some(parent) = data
            .as_ref()
            .and_then(|data| data.downcast_ref::<PropertyAccessor>())
        else {
            return Ok(());
        };
        let value = ic.subst(text).map_err(ConfigError::from)?;
        if let Err(error) = parent.set_property(element, &value) {
            ic.add_config_error(&ConfigError::from(error));
        }
        Ok(())
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}
