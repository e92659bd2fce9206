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

//! Generic `name`/`value` parameters

use super::{ActionData, Attributes, required_attribute};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{ActionResult, ConfigError, PropertyError};
use crate::introspection::PropertyAccessor;

/// Sets one property of the object at the top of the stack
#[derive(Debug, Default)]
pub struct ParamAction;

impl Action for ParamAction {
    fn name(&self) -> &'static str {
        "ParamAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let name = required_attribute(ic, element, attributes, "name")?;
        let raw = attributes
            .get("value")
            .ok_or_else(|| ConfigError::missing_attribute(element, "value"))?;
        let value = ic.subst(raw).map_err(ConfigError::from)?;
        let target = ic
            .peek_object()
            .ok_or_else(|| ConfigError::unexpected_object("the object stack is empty"))?;

        let accessor = PropertyAccessor::new(target);
        match accessor.set_property(&name, value.trim()) {
            Ok(()) => {}
            Err(error @ PropertyError::NotFound { .. }) => ic.add_diagnostic(
                Diagnostic::warning(
                    DiagnosticCode::Property,
                    format!("Ignoring parameter [{name}] for {}", accessor.class_name()),
                )
                .with_cause(error),
            ),
            Err(error) => ic.add_config_error(&ConfigError::from(error)),
        }
        Ok(None)
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::{attrs, context_with_root};
    use crate::diagnostics::Severity;
    use crate::model::{FileAppender, component_ref, with_component};

    #[test]
    fn test_param_outcomes() {
        let (mut ic, _) = context_with_root();
        let appender = component_ref(FileAppender::new());
        ic.push_object(appender.clone());
        ic.add_property("size", "4096");

        for (name, value) in [
            ("bufferSize", "${size}"),
            ("Append", "false"),
            ("colour", "red"),
            ("prudent", "maybe"),
        ] {
            ParamAction
                .begin(&mut ic, "param", &attrs(&[("name", name), ("value", value)]))
                .unwrap();
        }

        let state = with_component(&appender, |a: &FileAppender| (a.buffer_size(), a.is_append()));
        assert_eq!(state, Some((4096, false)));
        let severities: Vec<Severity> = ic.diagnostics().iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
    }
}
