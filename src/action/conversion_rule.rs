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

//! Custom conversion words for pattern layouts

use super::{ActionData, Attributes, required_attribute};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::diagnostics::DiagnosticCode;
use crate::error::{ActionResult, ConfigError};

/// Maps `conversionWord` to `converterClass` in the logger context
#[derive(Debug, Default)]
pub struct ConversionRuleAction;

impl Action for ConversionRuleAction {
    fn name(&self) -> &'static str {
        "ConversionRuleAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let word = required_attribute(ic, element, attributes, "conversionWord")?;
        let converter = required_attribute(ic, element, attributes, "converterClass")?;

        let previous = ic
            .with_logger_context_mut(|context| context.add_conversion_rule(&word, &converter))
            .ok_or_else(|| ConfigError::unexpected_object("no logger context at the bottom of the stack"))?;
        match previous {
            Some(previous) if previous != converter => ic.add_warning(
                DiagnosticCode::Status,
                format!("Conversion word [{word}] was bound to [{previous}], now bound to [{converter}]"),
            ),
            _ => ic.add_info(format!(
                "Registering conversion word [{word}] with class [{converter}]"
            )),
        }
        Ok(None)
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}
